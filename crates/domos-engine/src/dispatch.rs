//! Action dispatch worker
//!
//! Consumes the trigger changes the propagation engine forwards. Per change:
//! fetch the trigger's action bindings, evaluate each binding's guard, and
//! for every guard that holds, evaluate the action's arguments under the
//! argument contract, assemble the nested outbound structure, and fire the
//! owning module's `set` RPC through the [`CommandSink`].
//!
//! The propagation engine persists a trigger's new value before forwarding,
//! so guards always see the value that caused the change.

use std::path::Path;
use std::sync::Arc;

use domos_core::{ChangeEvent, ChangeSource, ExpressionId, RpcKind};
use domos_expr::{evaluate, ExprParser};
use domos_store::{Store, TriggerAction};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

use crate::bindings::build_bindings;
use crate::cache::ExprCache;
use crate::error::{EngineError, EngineResult};
use crate::sink::CommandSink;

/// The action dispatch worker. Owns its own store session, like the
/// propagation engine.
pub struct ActionDispatcher {
    store: Store,
    cache: ExprCache,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    sink: Arc<dyn CommandSink>,
    queue_warn: usize,
}

impl ActionDispatcher {
    pub fn new(
        path: impl AsRef<Path>,
        rx: mpsc::UnboundedReceiver<ChangeEvent>,
        sink: Arc<dyn CommandSink>,
        queue_warn: usize,
    ) -> EngineResult<Self> {
        Ok(Self {
            store: Store::open(path)?,
            cache: ExprCache::new(ExprParser::new()),
            rx,
            sink,
            queue_warn,
        })
    }

    /// Run until shutdown is signalled or the propagation engine is gone.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!("action dispatcher started");
        loop {
            tokio::select! {
                event = self.rx.recv() => {
                    match event {
                        Some(event) => {
                            let backlog = self.rx.len();
                            if backlog > self.queue_warn {
                                warn!(backlog, "action queue backlog");
                            }
                            self.handle_event(&event).await;
                        }
                        None => break,
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        info!("action dispatcher stopped");
    }

    /// Process one forwarded trigger change.
    pub async fn handle_event(&mut self, event: &ChangeEvent) {
        let trigger_id = match event.source {
            ChangeSource::Trigger(id) => id,
            // only trigger changes carry action bindings
            ChangeSource::Sensor(_) => return,
        };
        let bindings = match self.store.actions_for_trigger(trigger_id) {
            Ok(bindings) => bindings,
            Err(e) => {
                error!(trigger = %trigger_id, error = %e, "action lookup failed, event dropped");
                return;
            }
        };
        for binding in bindings {
            if let Err(e) = self.fire_binding(&binding).await {
                error!(
                    trigger = %trigger_id,
                    action = %binding.action_id,
                    error = %e,
                    "action dispatch failed"
                );
            }
        }
    }

    async fn fire_binding(&mut self, binding: &TriggerAction) -> EngineResult<()> {
        if !self.guard_passes(binding.expression_id)? {
            trace!(action = %binding.action_id, "guard not met");
            return Ok(());
        }

        let action = self.store.get_action(binding.action_id)?;
        let module = self.store.get_module(action.module_id)?;
        let key = self
            .store
            .rpc_key(action.module_id, RpcKind::Set)?
            .ok_or_else(|| EngineError::MissingRpc {
                module: module.name.clone(),
                kind: RpcKind::Set,
            })?;

        let mut args = serde_json::Map::new();
        for arg in self.store.action_args(binding.action_id)? {
            let expr = self.cache.get(&self.store, arg.expression_id)?;
            let bindings = build_bindings(&self.store, arg.expression_id, None)?;
            let value = evaluate(&expr, &bindings)?;
            insert_nested(&mut args, &arg.name, value.to_json());
        }

        debug!(action = %action.ident, queue = %module.queue, key = %key, "firing action");
        if let Err(e) = self
            .sink
            .fire(&module.queue, &key, serde_json::Value::Object(args))
            .await
        {
            warn!(action = %action.ident, queue = %module.queue, error = %e, "outbound fire failed");
        }
        Ok(())
    }

    /// A guard holds on numeric truthiness when its value coerces to a
    /// number, on non-empty-string truthiness otherwise.
    fn guard_passes(&mut self, expression_id: ExpressionId) -> EngineResult<bool> {
        let expr = self.cache.get(&self.store, expression_id)?;
        let bindings = build_bindings(&self.store, expression_id, None)?;
        let value = evaluate(&expr, &bindings)?;
        Ok(match value.to_number() {
            Some(n) => n != 0.0,
            None => value.truthy(),
        })
    }
}

/// Insert `value` at a dotted path, building nested objects along the way:
/// `start.second` lands as `{"start":{"second":value}}`.
fn insert_nested(
    map: &mut serde_json::Map<String, serde_json::Value>,
    name: &str,
    value: serde_json::Value,
) {
    match name.split_once('.') {
        None => {
            map.insert(name.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if !entry.is_object() {
                *entry = serde_json::Value::Object(serde_json::Map::new());
            }
            if let serde_json::Value::Object(inner) = entry {
                insert_nested(inner, rest, value);
            }
        }
    }
}
