//! Typed row views
//!
//! One struct per table (plus a few joined views). These are plain data;
//! queries in [`crate::store`] construct them.

use chrono::{DateTime, Utc};
use domos_core::{
    ActionId, EdgeId, ExpressionId, ModuleId, RpcArgId, RpcId, RpcKind, SensorId,
    TriggerActionId, TriggerId,
};

/// A registered module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    /// Queue address the module receives commands on.
    pub queue: String,
    pub active: bool,
    pub descr: Option<String>,
}

/// An RPC a module registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRpc {
    pub id: RpcId,
    pub module_id: ModuleId,
    pub kind: RpcKind,
    pub key: String,
    pub descr: Option<String>,
}

/// One declared argument of a module RPC.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcArg {
    pub id: RpcArgId,
    pub rpc_id: RpcId,
    /// Dotted names (`start.second`) nest in the outbound structure.
    pub name: String,
    pub arg_type: String,
    pub optional: bool,
    pub descr: Option<String>,
}

/// A sensor owned by a module.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub id: SensorId,
    pub module_id: ModuleId,
    pub ident: String,
    pub active: bool,
    /// Instant sensors keep no history; their value exists only in the live
    /// event that delivers it.
    pub instant: bool,
    pub descr: Option<String>,
}

/// Everything needed to create a sensor.
#[derive(Debug, Clone)]
pub struct NewSensor {
    pub ident: String,
    pub instant: bool,
    pub descr: Option<String>,
    /// Provisioning values keyed by the RPC argument they satisfy.
    pub args: Vec<(RpcArgId, String)>,
}

impl NewSensor {
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            instant: false,
            descr: None,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn instant(mut self) -> Self {
        self.instant = true;
        self
    }

    #[must_use]
    pub fn descr(mut self, descr: impl Into<String>) -> Self {
        self.descr = Some(descr.into());
        self
    }

    #[must_use]
    pub fn arg(mut self, rpc_arg: RpcArgId, value: impl Into<String>) -> Self {
        self.args.push((rpc_arg, value.into()));
        self
    }
}

/// A provisioning argument of a sensor, joined with its RPC argument name.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorArgValue {
    pub name: String,
    pub value: String,
}

/// A sensor together with its provisioning arguments; what a re-registering
/// module gets back for each sensor it already owns.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorInfo {
    pub sensor: Sensor,
    pub args: Vec<SensorArgValue>,
}

/// A sensor joined with its owning module's name, for the read-side listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorListing {
    pub sensor: Sensor,
    pub module_name: String,
}

/// One history record, newest-first when queried.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub value: String,
    pub at: DateTime<Utc>,
}

/// A sensor dependency edge of an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEdge {
    pub id: EdgeId,
    pub expression_id: ExpressionId,
    pub sensor_id: SensorId,
    /// Aggregation function name (`last`, `avg`, `sum`, `diff`, `tdiff`).
    pub function: String,
    pub args: Vec<String>,
}

/// A trigger dependency edge of an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEdge {
    pub id: EdgeId,
    pub expression_id: ExpressionId,
    pub trigger_id: TriggerId,
    pub function: String,
    pub args: Vec<String>,
}

/// A trigger: a formula with a persisted last value.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub id: TriggerId,
    pub name: String,
    pub expression_id: ExpressionId,
    /// Whether value changes append to trigger history.
    pub record: bool,
    /// Canonical numeric text of the last recomputation; `None` until the
    /// first one.
    pub lastvalue: Option<String>,
    pub descr: Option<String>,
}

/// An outbound command bound to a module.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub id: ActionId,
    pub module_id: ModuleId,
    pub ident: String,
    pub descr: Option<String>,
}

/// One argument of an action, joined with the RPC argument it fills.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionArg {
    /// Dotted RPC argument name.
    pub name: String,
    /// Formula computing the argument's value.
    pub expression_id: ExpressionId,
}

/// A trigger-to-action binding with its guard expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerAction {
    pub id: TriggerActionId,
    pub trigger_id: TriggerId,
    pub action_id: ActionId,
    /// Guard formula; the action fires only when this evaluates truthy.
    pub expression_id: ExpressionId,
}
