//! Typed row identifiers
//!
//! Every persisted entity is addressed by its integer row id. Each id gets its
//! own newtype so that a dependency-edge id can never be passed where a sensor
//! or trigger id is expected - formula reference tokens carry *edge* ids, and
//! conflating the two id spaces has historically been the easiest way to wire
//! a formula to the wrong source.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_type!(
    /// A registered module.
    ModuleId
);
id_type!(
    /// An RPC a module exposes.
    RpcId
);
id_type!(
    /// One argument of a module RPC.
    RpcArgId
);
id_type!(
    /// A sensor owned by a module.
    SensorId
);
id_type!(
    /// A trigger (a formula with a stored last value).
    TriggerId
);
id_type!(
    /// A stored formula.
    ExpressionId
);
id_type!(
    /// A dependency edge (sensor or trigger variable) of an expression.
    ///
    /// The edge row id is the number embedded in `__sens<id>__` and
    /// `__trig<id>__` formula tokens. Sensor edges and trigger edges are
    /// separate tables, so the same numeric id may exist in both spaces;
    /// the token prefix disambiguates.
    EdgeId
);
id_type!(
    /// An action (an outbound command bound to a module).
    ActionId
);
id_type!(
    /// A trigger-to-action binding with its guard expression.
    TriggerActionId
);
