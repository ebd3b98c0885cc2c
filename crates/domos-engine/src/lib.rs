//! Reactive engine: aggregation, propagation, and action dispatch
//!
//! This crate turns stored formulas into a running system. A sensor or
//! trigger value change enters as a [`ChangeEvent`](domos_core::ChangeEvent);
//! the [`PropagationEngine`] recomputes every trigger whose expression
//! depends on the source, persists changed values, and cascades; the
//! [`ActionDispatcher`] picks up the forwarded changes, evaluates guard
//! expressions, and fires outbound commands through a [`CommandSink`].
//!
//! # Architecture
//!
//! ```text
//!                 +---------------------+ cascade
//!                 v                     |
//! change --> [propagation: recompute, persist] --> [dispatch: guard, fire]
//!                 |                                     |
//!              SQLite <--------------------------------+
//! ```
//!
//! Each worker owns its own store session; they coordinate through the
//! database only. The validated creation surface for formulas, triggers,
//! and actions lives in [`define`].

pub mod aggregate;
pub mod bindings;
pub mod cache;
pub mod define;
pub mod dispatch;
pub mod error;
pub mod propagation;
pub mod sink;

pub use aggregate::{AggregateError, AggregateFn};
pub use bindings::build_bindings;
pub use cache::ExprCache;
pub use define::{
    bind_trigger_action, define_action, define_expression, define_trigger, NewAction,
    NewExpression, NewTrigger, RefSource, RefSpec,
};
pub use dispatch::ActionDispatcher;
pub use error::{EngineError, EngineResult};
pub use propagation::{PropagationEngine, DEFAULT_MAX_CASCADE_DEPTH};
pub use sink::{BusError, CommandSink};
