//! Core types for the domos hub
//!
//! This crate provides the vocabulary shared by every other domos crate:
//! strongly typed row identifiers, the runtime [`Value`] produced by formula
//! evaluation, the [`ChangeEvent`] that flows through the propagation
//! pipeline, and the descriptor types a module submits when it registers.
//!
//! # Key Types
//!
//! - [`SensorId`], [`TriggerId`], [`EdgeId`], … - typed identifiers
//! - [`Value`] - number-or-string result of an evaluation
//! - [`ChangeEvent`] - a sensor or trigger value change
//! - [`ModuleDescriptor`] - registration payload of a module

pub mod descriptor;
pub mod event;
pub mod ids;
pub mod value;

pub use descriptor::{ModuleDescriptor, RpcArgDescriptor, RpcDescriptor, RpcKind, UnknownRpcKind};
pub use event::{ChangeEvent, ChangeSource};
pub use ids::{
    ActionId, EdgeId, ExpressionId, ModuleId, RpcArgId, RpcId, SensorId, TriggerActionId,
    TriggerId,
};
pub use value::{fmt_double, Value};
