//! Error types for store operations

use domos_core::{SensorId, TriggerId};
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing the database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode edge arguments: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("sensor {0} is not active")]
    SensorInactive(SensorId),

    /// A trigger's own expression tried to take the trigger itself as a
    /// dependency source. Rejected at creation so the propagation engine
    /// never has to break a self-loop.
    #[error("trigger {0} cannot depend on itself")]
    SelfReference(TriggerId),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }
}
