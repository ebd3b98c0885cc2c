//! Outbound command boundary

use async_trait::async_trait;
use thiserror::Error;

/// Delivery failure on the outbound boundary.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("no consumer attached to queue '{0}'")]
    UnknownQueue(String),

    #[error("queue '{0}' is closed")]
    Closed(String),
}

/// Where fired commands go.
///
/// `fire` delivers a keyed command with its argument structure to a module's
/// queue address. Fire-and-forget: the dispatcher logs a failure and moves
/// on, it never retries.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn fire(&self, queue: &str, key: &str, args: serde_json::Value) -> Result<(), BusError>;
}
