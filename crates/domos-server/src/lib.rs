//! The domos hub server
//!
//! Everything the `domosd` binary is made of: the YAML configuration, the
//! in-process delivery bus standing in for the message-bus client, and the
//! [`Hub`](hub::Hub) façade that registration, sensor values, and dashboard
//! queries go through. The binary itself only wires these to the two engine
//! workers of `domos-engine`.

pub mod bus;
pub mod config;
pub mod hub;

pub use bus::{LocalBus, OutboundCall};
pub use config::{ConfigError, HubConfig};
pub use hub::{Hub, HubError, HubResult, Registration};
