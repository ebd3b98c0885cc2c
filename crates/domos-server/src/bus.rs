//! In-process command delivery
//!
//! [`LocalBus`] is the [`CommandSink`] the daemon wires into the action
//! dispatcher. It routes outbound commands to whoever attached the matching
//! queue address in this process; the external message-bus client would slot
//! in behind the same trait. Delivery is fire-and-forget: a queue nobody
//! listens on fails the call, and the caller logs and moves on.

use async_trait::async_trait;
use dashmap::DashMap;
use domos_engine::{BusError, CommandSink};
use tokio::sync::mpsc;
use tracing::debug;

/// One command delivered to a module queue.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCall {
    /// RPC key the receiving module dispatches on.
    pub key: String,
    pub args: serde_json::Value,
}

/// Queue-address directory of in-process consumers.
#[derive(Default)]
pub struct LocalBus {
    queues: DashMap<String, mpsc::UnboundedSender<OutboundCall>>,
}

impl LocalBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a consumer for a queue address, replacing any previous one.
    pub fn attach(&self, queue: impl Into<String>) -> mpsc::UnboundedReceiver<OutboundCall> {
        let queue = queue.into();
        let (tx, rx) = mpsc::unbounded_channel();
        debug!(queue = %queue, "queue attached");
        self.queues.insert(queue, tx);
        rx
    }

    pub fn detach(&self, queue: &str) {
        self.queues.remove(queue);
    }
}

#[async_trait]
impl CommandSink for LocalBus {
    async fn fire(&self, queue: &str, key: &str, args: serde_json::Value) -> Result<(), BusError> {
        let sender = self
            .queues
            .get(queue)
            .ok_or_else(|| BusError::UnknownQueue(queue.to_string()))?;
        sender
            .send(OutboundCall {
                key: key.to_string(),
                args,
            })
            .map_err(|_| BusError::Closed(queue.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn attached_queue_receives_fired_commands() {
        let bus = LocalBus::new();
        let mut rx = bus.attach("domos.lamps");

        bus.fire("domos.lamps", "setLamp", json!({"power": "on"}))
            .await
            .unwrap();

        let call = rx.try_recv().unwrap();
        assert_eq!(call.key, "setLamp");
        assert_eq!(call.args, json!({"power": "on"}));
    }

    #[tokio::test]
    async fn unknown_queue_is_an_error() {
        let bus = LocalBus::new();
        let err = bus.fire("domos.nobody", "setLamp", json!({})).await;
        assert!(matches!(err, Err(BusError::UnknownQueue(q)) if q == "domos.nobody"));
    }

    #[tokio::test]
    async fn dropped_consumer_closes_the_queue() {
        let bus = LocalBus::new();
        let rx = bus.attach("domos.lamps");
        drop(rx);

        let err = bus.fire("domos.lamps", "setLamp", json!({})).await;
        assert!(matches!(err, Err(BusError::Closed(_))));
    }
}
