//! Trigger propagation worker
//!
//! Owns the change-event queue. Per event: query the dependency index for
//! triggers watching the source, recompute each one under the
//! trigger-recompute contract, and persist the result. A changed value
//! cascades back into the engine's own queue and is forwarded to the
//! action queue.
//!
//! One failed trigger never stops the loop: evaluation and store errors are
//! logged and the next dependent proceeds. Events carry a hop depth; a
//! cascade that would exceed the configured limit is persisted but not
//! propagated further, so dependency cycles terminate.

use std::path::Path;

use chrono::Utc;
use domos_core::{ChangeEvent, ChangeSource};
use domos_expr::{evaluate_numeric, ExprParser};
use domos_store::{Store, Trigger};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

use crate::bindings::build_bindings;
use crate::cache::ExprCache;
use crate::error::EngineResult;

/// Default hop limit for cascading recomputations.
pub const DEFAULT_MAX_CASCADE_DEPTH: u32 = 64;

/// The propagation worker.
///
/// Opens its own store session at construction; a session that cannot be
/// opened is a startup failure, not something to limp along without.
pub struct PropagationEngine {
    store: Store,
    cache: ExprCache,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    /// Own queue, for cascades.
    tx: mpsc::UnboundedSender<ChangeEvent>,
    /// Forwarded changes for the action dispatcher.
    action_tx: mpsc::UnboundedSender<ChangeEvent>,
    max_cascade_depth: u32,
    queue_warn: usize,
}

impl PropagationEngine {
    pub fn new(
        path: impl AsRef<Path>,
        action_tx: mpsc::UnboundedSender<ChangeEvent>,
        max_cascade_depth: u32,
        queue_warn: usize,
    ) -> EngineResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            store: Store::open(path)?,
            cache: ExprCache::new(ExprParser::new()),
            rx,
            tx,
            action_tx,
            max_cascade_depth,
            queue_warn,
        })
    }

    /// A sender feeding this engine's queue. The hub's `sensor_value` entry
    /// point enqueues through one of these and returns immediately.
    pub fn sender(&self) -> mpsc::UnboundedSender<ChangeEvent> {
        self.tx.clone()
    }

    /// Run until shutdown is signalled or every sender is gone.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!("propagation engine started");
        loop {
            tokio::select! {
                event = self.rx.recv() => {
                    match event {
                        Some(event) => {
                            let backlog = self.rx.len();
                            if backlog > self.queue_warn {
                                warn!(backlog, "propagation queue backlog");
                            }
                            self.handle_event(event);
                        }
                        None => break,
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        info!("propagation engine stopped");
    }

    /// Process one change event: recompute every dependent trigger.
    pub fn handle_event(&mut self, event: ChangeEvent) {
        trace!(source = %event.source, value = %event.value, depth = event.depth, "change event");
        let dependents = match self.dependents(&event.source) {
            Ok(dependents) => dependents,
            Err(e) => {
                error!(source = %event.source, error = %e, "dependency query failed, event dropped");
                return;
            }
        };
        for trigger in dependents {
            if let Err(e) = self.recompute(&trigger, &event) {
                error!(trigger = %trigger.name, error = %e, "recomputation failed, trigger skipped");
            }
        }
    }

    /// Process queued events until the queue is empty.
    ///
    /// Does the same work [`run`](Self::run) performs off the live queue,
    /// synchronously; cascades enqueued along the way are drained too.
    pub fn drain(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn dependents(&self, source: &ChangeSource) -> EngineResult<Vec<Trigger>> {
        Ok(match source {
            ChangeSource::Sensor(id) => self.store.triggers_watching_sensor(*id)?,
            ChangeSource::Trigger(id) => self.store.triggers_watching_trigger(*id)?,
        })
    }

    fn recompute(&mut self, trigger: &Trigger, event: &ChangeEvent) -> EngineResult<()> {
        let expr = self.cache.get(&self.store, trigger.expression_id)?;
        let live = match &event.source {
            ChangeSource::Sensor(id) => Some((*id, event.value.as_str())),
            ChangeSource::Trigger(_) => None,
        };
        let bindings = build_bindings(&self.store, trigger.expression_id, live)?;
        let value = evaluate_numeric(&expr, &bindings)?;

        if trigger.lastvalue.as_deref() == Some(value.as_str()) {
            trace!(trigger = %trigger.name, value = %value, "unchanged");
            return Ok(());
        }

        self.store.update_lastvalue(trigger.id, &value)?;
        if trigger.record {
            self.store.add_trigger_value(trigger.id, &value, Utc::now())?;
        }
        debug!(trigger = %trigger.name, value = %value, "trigger recomputed");

        let depth = event.depth + 1;
        if depth > self.max_cascade_depth {
            error!(
                trigger = %trigger.name,
                depth,
                "cascade depth limit reached, change not propagated"
            );
            return Ok(());
        }
        let next = ChangeEvent::trigger(trigger.id, value, depth);
        // sending to our own queue cannot fail while self holds the receiver
        let _ = self.tx.send(next.clone());
        if self.action_tx.send(next).is_err() {
            warn!(trigger = %trigger.name, "action queue closed, change not forwarded");
        }
        Ok(())
    }
}
