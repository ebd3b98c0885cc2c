//! Error types for engine operations

use domos_core::RpcKind;
use domos_expr::{EvalError, ParseError};
use domos_store::StoreError;
use thiserror::Error;

use crate::aggregate::AggregateError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while defining or evaluating reactive entities.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("formula does not parse: {0}")]
    Parse(#[from] ParseError),

    #[error("formula evaluation failed: {0}")]
    Eval(#[from] EvalError),

    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("module '{module}' has no {kind} rpc")]
    MissingRpc { module: String, kind: RpcKind },

    #[error("module '{module}' declares no argument '{name}' on its {kind} rpc")]
    UnknownRpcArg {
        module: String,
        kind: RpcKind,
        name: String,
    },

    #[error("placeholder '{{{name}}}' has no reference definition")]
    UnknownPlaceholder { name: String },

    #[error("reference '{name}' never appears in the formula")]
    UnusedReference { name: String },

    #[error("duplicate reference name '{name}'")]
    DuplicateReference { name: String },

    #[error("formula has an unterminated '{{' placeholder")]
    UnterminatedPlaceholder,
}
