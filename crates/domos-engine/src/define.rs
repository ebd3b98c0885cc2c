//! Validated creation of expressions, triggers, and actions
//!
//! Formula authors write `{name}` placeholders; the dependency-edge tokens
//! (`__sens<edge>__`) embed row ids nobody knows before the rows exist.
//! These operations close that gap: insert the expression and its edges in
//! one transaction, substitute each placeholder with its edge token, verify
//! the final text parses, and only then commit. A malformed formula or a
//! bad reference spec rolls the whole definition back, so every stored
//! expression is guaranteed to parse.

use domos_core::{ActionId, ExpressionId, ModuleId, RpcKind, SensorId, TriggerActionId, TriggerId};
use domos_expr::ExprParser;
use domos_store::Store;
use tracing::info;

use crate::aggregate::AggregateFn;
use crate::error::{EngineError, EngineResult};

/// What a dependency reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefSource {
    Sensor(SensorId),
    Trigger(TriggerId),
}

/// One `{name}` reference of a formula: its source and aggregation.
#[derive(Debug, Clone)]
pub struct RefSpec {
    /// Placeholder name as written in the formula, without braces.
    pub name: String,
    pub source: RefSource,
    pub function: String,
    pub args: Vec<String>,
}

/// A formula with `{name}` placeholders and one [`RefSpec`] per placeholder.
#[derive(Debug, Clone)]
pub struct NewExpression {
    pub formula: String,
    pub refs: Vec<RefSpec>,
}

impl NewExpression {
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            refs: Vec::new(),
        }
    }

    #[must_use]
    pub fn sensor(
        mut self,
        name: impl Into<String>,
        source: SensorId,
        function: impl Into<String>,
        args: &[&str],
    ) -> Self {
        self.refs.push(RefSpec {
            name: name.into(),
            source: RefSource::Sensor(source),
            function: function.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        });
        self
    }

    #[must_use]
    pub fn trigger(
        mut self,
        name: impl Into<String>,
        source: TriggerId,
        function: impl Into<String>,
        args: &[&str],
    ) -> Self {
        self.refs.push(RefSpec {
            name: name.into(),
            source: RefSource::Trigger(source),
            function: function.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        });
        self
    }
}

/// A trigger definition: name, formula, and whether changes are recorded.
#[derive(Debug, Clone)]
pub struct NewTrigger {
    pub name: String,
    pub expression: NewExpression,
    pub record: bool,
    pub descr: Option<String>,
}

impl NewTrigger {
    pub fn new(name: impl Into<String>, expression: NewExpression) -> Self {
        Self {
            name: name.into(),
            expression,
            record: false,
            descr: None,
        }
    }

    #[must_use]
    pub fn record(mut self) -> Self {
        self.record = true;
        self
    }
}

/// An action definition: the owning module, an ident, and one value
/// expression per argument of the module's `set` RPC.
#[derive(Debug, Clone)]
pub struct NewAction {
    pub module_id: ModuleId,
    pub ident: String,
    pub descr: Option<String>,
    pub args: Vec<(String, NewExpression)>,
}

impl NewAction {
    pub fn new(module_id: ModuleId, ident: impl Into<String>) -> Self {
        Self {
            module_id,
            ident: ident.into(),
            descr: None,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, expression: NewExpression) -> Self {
        self.args.push((name.into(), expression));
        self
    }
}

/// Create an expression with its dependency edges, transactionally.
pub fn define_expression(
    store: &Store,
    parser: &ExprParser,
    new: &NewExpression,
) -> EngineResult<ExpressionId> {
    store.with_tx(|s| insert_expression(s, parser, new))
}

/// Create a trigger and its expression, transactionally.
pub fn define_trigger(store: &Store, parser: &ExprParser, new: &NewTrigger) -> EngineResult<TriggerId> {
    store.with_tx(|s| {
        let expression_id = insert_expression(s, parser, &new.expression)?;
        let id = s.add_trigger(&new.name, expression_id, new.record, new.descr.as_deref())?;
        info!(trigger = %new.name, id = %id, "trigger defined");
        Ok(id)
    })
}

/// Create an action and its argument expressions, transactionally. Every
/// argument name must be declared on the module's `set` RPC.
pub fn define_action(store: &Store, parser: &ExprParser, new: &NewAction) -> EngineResult<ActionId> {
    store.with_tx(|s| {
        let module = s.get_module(new.module_id)?;
        s.rpc_key(new.module_id, RpcKind::Set)?
            .ok_or_else(|| EngineError::MissingRpc {
                module: module.name.clone(),
                kind: RpcKind::Set,
            })?;
        let action_id = s.add_action(new.module_id, &new.ident, new.descr.as_deref())?;
        for (name, expression) in &new.args {
            let rpc_arg = s
                .find_rpc_arg(new.module_id, RpcKind::Set, name)?
                .ok_or_else(|| EngineError::UnknownRpcArg {
                    module: module.name.clone(),
                    kind: RpcKind::Set,
                    name: name.clone(),
                })?;
            let expression_id = insert_expression(s, parser, expression)?;
            s.add_action_arg(action_id, rpc_arg.id, expression_id)?;
        }
        info!(action = %new.ident, id = %action_id, "action defined");
        Ok(action_id)
    })
}

/// Bind an action to a trigger behind a guard expression, transactionally.
pub fn bind_trigger_action(
    store: &Store,
    parser: &ExprParser,
    trigger_id: TriggerId,
    action_id: ActionId,
    guard: &NewExpression,
) -> EngineResult<TriggerActionId> {
    store.with_tx(|s| {
        s.get_trigger(trigger_id)?;
        s.get_action(action_id)?;
        let expression_id = insert_expression(s, parser, guard)?;
        let id = s.add_trigger_action(trigger_id, action_id, expression_id)?;
        info!(trigger = %trigger_id, action = %action_id, "action bound to trigger");
        Ok(id)
    })
}

/// The shared body of the `define_*` operations. Runs inside the caller's
/// transaction and never opens its own.
fn insert_expression(
    store: &Store,
    parser: &ExprParser,
    new: &NewExpression,
) -> EngineResult<ExpressionId> {
    // reject bad aggregation specs before touching the database
    for spec in &new.refs {
        AggregateFn::parse(&spec.function, &spec.args)?;
    }
    for (i, spec) in new.refs.iter().enumerate() {
        if new.refs[..i].iter().any(|other| other.name == spec.name) {
            return Err(EngineError::DuplicateReference {
                name: spec.name.clone(),
            });
        }
    }

    let names = placeholders(&new.formula)?;
    for name in &names {
        if !new.refs.iter().any(|spec| &spec.name == name) {
            return Err(EngineError::UnknownPlaceholder { name: name.clone() });
        }
    }
    for spec in &new.refs {
        if !names.contains(&spec.name) {
            return Err(EngineError::UnusedReference {
                name: spec.name.clone(),
            });
        }
    }

    let expression_id = store.add_expression(&new.formula)?;
    let mut text = new.formula.clone();
    for spec in &new.refs {
        let token = match spec.source {
            RefSource::Sensor(sensor_id) => {
                let edge =
                    store.add_sensor_edge(expression_id, sensor_id, &spec.function, &spec.args)?;
                format!("__sens{edge}__")
            }
            RefSource::Trigger(trigger_id) => {
                let edge =
                    store.add_trigger_edge(expression_id, trigger_id, &spec.function, &spec.args)?;
                format!("__trig{edge}__")
            }
        };
        text = text.replace(&format!("{{{}}}", spec.name), &token);
    }
    store.set_expression_text(expression_id, &text)?;

    // the stored text must parse, or nothing is kept
    parser.parse(&text)?;
    Ok(expression_id)
}

/// Every `{name}` occurring in the formula, in order of first appearance.
fn placeholders(formula: &str) -> EngineResult<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = formula;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = match after.find('}') {
            Some(end) => end,
            None => return Err(EngineError::UnterminatedPlaceholder),
        };
        let name = &after[..end];
        if !names.iter().any(|known| known == name) {
            names.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
    Ok(names)
}
