//! Relational persistence for the domos hub
//!
//! Everything the hub knows lives in one SQLite database: registered modules
//! and their RPCs, sensors and their append-only history, stored formulas
//! with their dependency edges, triggers with their recorded values, and the
//! action bindings the dispatcher fires.
//!
//! [`Store`] wraps one connection. Workers each open their own store session
//! against the same database file; cross-worker coordination happens through
//! the database, never through shared memory.

pub mod error;
pub mod models;
pub mod schema;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use models::{
    Action, ActionArg, HistoryRecord, Module, ModuleRpc, NewSensor, RpcArg, Sensor,
    SensorArgValue, SensorEdge, SensorInfo, SensorListing, Trigger, TriggerAction, TriggerEdge,
};
pub use store::Store;
