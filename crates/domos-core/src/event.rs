//! Change events
//!
//! A [`ChangeEvent`] is the unit of work of the propagation pipeline: a new
//! sensor reading entering the hub, or a trigger whose recorded value just
//! changed. Events carry the new value as text (the form it is persisted in)
//! and a cascade depth so that cyclic trigger graphs terminate.

use crate::ids::{SensorId, TriggerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSource {
    Sensor(SensorId),
    Trigger(TriggerId),
}

impl fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeSource::Sensor(id) => write!(f, "sensor {}", id),
            ChangeSource::Trigger(id) => write!(f, "trigger {}", id),
        }
    }
}

/// A value change flowing through the engine queues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub source: ChangeSource,
    /// New value in its persisted text form.
    pub value: String,
    /// Number of cascade hops that led to this event. Zero for events entering
    /// from outside (sensor readings).
    pub depth: u32,
}

impl ChangeEvent {
    /// A sensor reading arriving from a module.
    pub fn sensor(id: SensorId, value: impl Into<String>) -> Self {
        Self {
            source: ChangeSource::Sensor(id),
            value: value.into(),
            depth: 0,
        }
    }

    /// A trigger recomputation result, one hop deeper than the event that
    /// caused it.
    pub fn trigger(id: TriggerId, value: impl Into<String>, depth: u32) -> Self {
        Self {
            source: ChangeSource::Trigger(id),
            value: value.into(),
            depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_events_start_at_depth_zero() {
        let ev = ChangeEvent::sensor(SensorId::new(3), "21.5");
        assert_eq!(ev.depth, 0);
        assert_eq!(ev.source, ChangeSource::Sensor(SensorId::new(3)));
    }

    #[test]
    fn sources_display_with_their_kind() {
        assert_eq!(
            ChangeSource::Trigger(TriggerId::new(9)).to_string(),
            "trigger 9"
        );
    }
}
