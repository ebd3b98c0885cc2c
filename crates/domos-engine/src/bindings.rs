//! Binding construction for stored expressions
//!
//! Resolves every dependency edge of an expression to a [`Value`] before
//! evaluation. Each sensor edge aggregates over sensor history, each trigger
//! edge over trigger history, with two exceptions:
//!
//! - when the evaluation reacts to an incoming sensor value, edges over that
//!   exact sensor bind the just-arrived value instead of querying history;
//! - a trigger that does not record has no stored history, so its edges see
//!   the single synthetic record `lastvalue`.

use chrono::Utc;
use domos_core::{ExpressionId, SensorId, Value};
use domos_expr::Bindings;
use domos_store::{HistoryRecord, SensorEdge, Store, TriggerEdge};

use crate::aggregate::AggregateFn;
use crate::error::EngineResult;

/// Resolve all edges of `expression_id` into evaluation bindings.
///
/// `live` carries the sensor and raw value of the change being reacted to,
/// if any.
pub fn build_bindings(
    store: &Store,
    expression_id: ExpressionId,
    live: Option<(SensorId, &str)>,
) -> EngineResult<Bindings> {
    let mut bindings = Bindings::new();
    for edge in store.sensor_edges(expression_id)? {
        let value = match live {
            Some((sensor_id, raw)) if sensor_id == edge.sensor_id => Value::coerce(raw),
            _ => resolve_sensor_edge(store, &edge)?,
        };
        bindings.insert_sensor(edge.id, value);
    }
    for edge in store.trigger_edges(expression_id)? {
        bindings.insert_trigger(edge.id, resolve_trigger_edge(store, &edge)?);
    }
    Ok(bindings)
}

fn resolve_sensor_edge(store: &Store, edge: &SensorEdge) -> EngineResult<Value> {
    let function = AggregateFn::parse(&edge.function, &edge.args)?;
    let sensor = store.get_sensor(edge.sensor_id)?;
    if sensor.instant {
        // instant sensors keep no history; only a live value resolves them
        return Ok(Value::Num(0.0));
    }
    let history = store.sensor_history(edge.sensor_id, function.required_depth())?;
    Ok(function.apply(&history)?)
}

fn resolve_trigger_edge(store: &Store, edge: &TriggerEdge) -> EngineResult<Value> {
    let function = AggregateFn::parse(&edge.function, &edge.args)?;
    let trigger = store.get_trigger(edge.trigger_id)?;
    let history = if trigger.record {
        store.trigger_history(edge.trigger_id, function.required_depth())?
    } else {
        match trigger.lastvalue {
            Some(value) => vec![HistoryRecord {
                value,
                at: Utc::now(),
            }],
            None => Vec::new(),
        }
    };
    Ok(function.apply(&history)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use domos_core::ModuleDescriptor;
    use domos_store::NewSensor;

    fn store_with_module() -> (Store, domos_core::ModuleId) {
        let store = Store::open_in_memory().unwrap();
        let desc = ModuleDescriptor {
            name: "env".into(),
            queue: "domos.env".into(),
            descr: None,
            rpcs: Vec::new(),
        };
        let module = store.add_module(&desc).unwrap();
        (store, module)
    }

    #[test]
    fn live_value_overrides_history_for_that_sensor_only() {
        let (store, module) = store_with_module();
        let hall = store.add_sensor(module, &NewSensor::new("hall")).unwrap();
        let porch = store.add_sensor(module, &NewSensor::new("porch")).unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        store.add_sensor_value(hall, "1", t0).unwrap();
        store.add_sensor_value(porch, "2", t0).unwrap();

        let expr = store.add_expression("0").unwrap();
        let hall_edge = store.add_sensor_edge(expr, hall, "last", &["0".into()]).unwrap();
        let porch_edge = store.add_sensor_edge(expr, porch, "last", &["0".into()]).unwrap();

        let bindings = build_bindings(&store, expr, Some((hall, "7.5"))).unwrap();
        assert_eq!(bindings.sensors[&hall_edge], Value::Num(7.5));
        assert_eq!(bindings.sensors[&porch_edge], Value::Num(2.0));
    }

    #[test]
    fn live_value_keeps_non_numeric_text() {
        let (store, module) = store_with_module();
        let door = store.add_sensor(module, &NewSensor::new("door")).unwrap();
        let expr = store.add_expression("0").unwrap();
        let edge = store.add_sensor_edge(expr, door, "last", &["0".into()]).unwrap();

        let bindings = build_bindings(&store, expr, Some((door, "open"))).unwrap();
        assert_eq!(bindings.sensors[&edge], Value::Str("open".into()));
    }

    #[test]
    fn instant_sensor_resolves_to_zero_without_a_live_value() {
        let (store, module) = store_with_module();
        let motion = store
            .add_sensor(module, &NewSensor::new("motion").instant())
            .unwrap();
        let expr = store.add_expression("0").unwrap();
        let edge = store.add_sensor_edge(expr, motion, "last", &["0".into()]).unwrap();

        let bindings = build_bindings(&store, expr, None).unwrap();
        assert_eq!(bindings.sensors[&edge], Value::Num(0.0));

        let bindings = build_bindings(&store, expr, Some((motion, "1"))).unwrap();
        assert_eq!(bindings.sensors[&edge], Value::Num(1.0));
    }

    #[test]
    fn unrecorded_trigger_edge_sees_lastvalue_as_single_history() {
        let (store, _) = store_with_module();
        let texpr = store.add_expression("0").unwrap();
        let trigger = store.add_trigger("hall_hot", texpr, false, None).unwrap();

        let expr = store.add_expression("0").unwrap();
        let last = store.add_trigger_edge(expr, trigger, "last", &["0".into()]).unwrap();
        let diff = store.add_trigger_edge(expr, trigger, "diff", &[]).unwrap();

        // before the first recomputation there is nothing to see
        let bindings = build_bindings(&store, expr, None).unwrap();
        assert_eq!(bindings.triggers[&last], Value::Num(0.0));

        store.update_lastvalue(trigger, "4.0").unwrap();
        let bindings = build_bindings(&store, expr, None).unwrap();
        assert_eq!(bindings.triggers[&last], Value::Num(4.0));
        // one synthetic record can never produce a difference
        assert_eq!(bindings.triggers[&diff], Value::Num(0.0));
    }

    #[test]
    fn recorded_trigger_edge_aggregates_stored_history() {
        let (store, _) = store_with_module();
        let texpr = store.add_expression("0").unwrap();
        let trigger = store.add_trigger("hall_hot", texpr, true, None).unwrap();

        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        store.add_trigger_value(trigger, "2.0", t0).unwrap();
        store
            .add_trigger_value(trigger, "6.0", t0 + Duration::seconds(10))
            .unwrap();

        let expr = store.add_expression("0").unwrap();
        let diff = store.add_trigger_edge(expr, trigger, "diff", &[]).unwrap();
        let avg = store.add_trigger_edge(expr, trigger, "avg", &["2".into()]).unwrap();

        let bindings = build_bindings(&store, expr, None).unwrap();
        assert_eq!(bindings.triggers[&diff], Value::Num(4.0));
        assert_eq!(bindings.triggers[&avg], Value::Num(4.0));
    }
}
