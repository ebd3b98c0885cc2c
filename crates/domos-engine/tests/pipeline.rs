//! End-to-end pipeline tests over a shared database file
//!
//! Every worker opens its own store session against the same file, exactly
//! as the server wires things up. Events are driven synchronously through
//! `handle_event`/`drain` so the assertions stay deterministic.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domos_core::{ChangeEvent, ModuleDescriptor, RpcArgDescriptor, RpcDescriptor, RpcKind};
use domos_engine::{
    bind_trigger_action, define_action, define_trigger, ActionDispatcher, BusError, CommandSink,
    NewAction, NewExpression, NewTrigger, PropagationEngine,
};
use domos_expr::ExprParser;
use domos_store::{NewSensor, Store};
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

struct Pipeline {
    _dir: TempDir,
    path: PathBuf,
    store: Store,
    parser: ExprParser,
}

fn pipeline() -> Pipeline {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("domos.db");
    let store = Store::open(&path).unwrap();
    Pipeline {
        _dir: dir,
        path,
        store,
        parser: ExprParser::new(),
    }
}

fn lamp_module() -> ModuleDescriptor {
    ModuleDescriptor {
        name: "lamps".into(),
        queue: "domos.lamps".into(),
        descr: None,
        rpcs: vec![RpcDescriptor {
            key: "setLamp".into(),
            kind: RpcKind::Set,
            descr: None,
            args: vec![
                RpcArgDescriptor {
                    name: "power".into(),
                    arg_type: "string".into(),
                    optional: false,
                    descr: None,
                },
                RpcArgDescriptor {
                    name: "start.second".into(),
                    arg_type: "int".into(),
                    optional: true,
                    descr: None,
                },
                RpcArgDescriptor {
                    name: "start.minute".into(),
                    arg_type: "int".into(),
                    optional: true,
                    descr: None,
                },
            ],
        }],
    }
}

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<(String, String, serde_json::Value)>>,
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn fire(&self, queue: &str, key: &str, args: serde_json::Value) -> Result<(), BusError> {
        self.calls
            .lock()
            .await
            .push((queue.to_string(), key.to_string(), args));
        Ok(())
    }
}

#[test]
fn sensor_change_recomputes_dependent_trigger() {
    let p = pipeline();
    let module = p.store.add_module(&lamp_module()).unwrap();
    let hall = p.store.add_sensor(module, &NewSensor::new("hall")).unwrap();
    let trigger = define_trigger(
        &p.store,
        &p.parser,
        &NewTrigger::new(
            "hall_hot",
            NewExpression::new("{hall} >= 25").sensor("hall", hall, "last", &["0"]),
        )
        .record(),
    )
    .unwrap();

    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let mut engine = PropagationEngine::new(&p.path, action_tx, 64, 1000).unwrap();
    let tx = engine.sender();

    p.store.add_sensor_value(hall, "26.5", Utc::now()).unwrap();
    tx.send(ChangeEvent::sensor(hall, "26.5")).unwrap();
    engine.drain();

    let stored = p.store.get_trigger(trigger).unwrap();
    assert_eq!(stored.lastvalue.as_deref(), Some("1.0"));
    assert_eq!(p.store.trigger_history(trigger, 10).unwrap().len(), 1);

    let forwarded = action_rx.try_recv().unwrap();
    assert_eq!(forwarded.value, "1.0");
    assert_eq!(forwarded.depth, 1);
}

#[test]
fn unchanged_recomputation_writes_nothing_and_emits_nothing() {
    let p = pipeline();
    let module = p.store.add_module(&lamp_module()).unwrap();
    let hall = p.store.add_sensor(module, &NewSensor::new("hall")).unwrap();
    let trigger = define_trigger(
        &p.store,
        &p.parser,
        &NewTrigger::new(
            "hall_hot",
            NewExpression::new("{hall} >= 25").sensor("hall", hall, "last", &["0"]),
        )
        .record(),
    )
    .unwrap();

    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let mut engine = PropagationEngine::new(&p.path, action_tx, 64, 1000).unwrap();
    let tx = engine.sender();

    for _ in 0..2 {
        p.store.add_sensor_value(hall, "30", Utc::now()).unwrap();
        tx.send(ChangeEvent::sensor(hall, "30")).unwrap();
        engine.drain();
    }

    // one history record and one forwarded change for two equal results
    assert_eq!(p.store.trigger_history(trigger, 10).unwrap().len(), 1);
    assert!(action_rx.try_recv().is_ok());
    assert!(action_rx.try_recv().is_err());
}

#[test]
fn cascade_delivers_the_new_value_downstream() {
    let p = pipeline();
    let module = p.store.add_module(&lamp_module()).unwrap();
    let hall = p.store.add_sensor(module, &NewSensor::new("hall")).unwrap();
    let a = define_trigger(
        &p.store,
        &p.parser,
        &NewTrigger::new(
            "double",
            NewExpression::new("{hall} * 2").sensor("hall", hall, "last", &["0"]),
        ),
    )
    .unwrap();
    let b = define_trigger(
        &p.store,
        &p.parser,
        &NewTrigger::new(
            "double_plus_one",
            NewExpression::new("{double} + 1").trigger("double", a, "last", &["0"]),
        ),
    )
    .unwrap();

    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let mut engine = PropagationEngine::new(&p.path, action_tx, 64, 1000).unwrap();
    let tx = engine.sender();

    p.store.add_sensor_value(hall, "4", Utc::now()).unwrap();
    tx.send(ChangeEvent::sensor(hall, "4")).unwrap();
    engine.drain();

    assert_eq!(p.store.get_trigger(a).unwrap().lastvalue.as_deref(), Some("8.0"));
    assert_eq!(p.store.get_trigger(b).unwrap().lastvalue.as_deref(), Some("9.0"));

    let first = action_rx.try_recv().unwrap();
    let second = action_rx.try_recv().unwrap();
    assert_eq!((first.value.as_str(), first.depth), ("8.0", 1));
    assert_eq!((second.value.as_str(), second.depth), ("9.0", 2));
    assert!(action_rx.try_recv().is_err());
}

#[test]
fn dependency_cycle_terminates_at_the_depth_limit() {
    let p = pipeline();
    // two triggers watching each other; assembled in stages because a
    // formula normally cannot reference a trigger that does not exist yet
    let e1 = p.store.add_expression("0").unwrap();
    let t1 = p.store.add_trigger("ping", e1, false, None).unwrap();
    let e2 = p.store.add_expression("0").unwrap();
    let t2 = p.store.add_trigger("pong", e2, false, None).unwrap();

    let edge12 = p.store.add_trigger_edge(e1, t2, "last", &["0".into()]).unwrap();
    p.store
        .set_expression_text(e1, &format!("__trig{edge12}__ + 1"))
        .unwrap();
    let edge21 = p.store.add_trigger_edge(e2, t1, "last", &["0".into()]).unwrap();
    p.store
        .set_expression_text(e2, &format!("__trig{edge21}__ + 1"))
        .unwrap();

    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let mut engine = PropagationEngine::new(&p.path, action_tx, 6, 1000).unwrap();
    let tx = engine.sender();

    tx.send(ChangeEvent::trigger(t1, "0.0", 0)).unwrap();
    engine.drain();

    // each hop incremented by one until the limit cut the cascade
    assert_eq!(p.store.get_trigger(t1).unwrap().lastvalue.as_deref(), Some("6.0"));
    assert_eq!(p.store.get_trigger(t2).unwrap().lastvalue.as_deref(), Some("7.0"));

    let mut forwarded = 0;
    while action_rx.try_recv().is_ok() {
        forwarded += 1;
    }
    assert_eq!(forwarded, 6);
}

#[test]
fn instant_sensor_resolves_only_through_the_live_event() {
    let p = pipeline();
    let module = p.store.add_module(&lamp_module()).unwrap();
    let button = p
        .store
        .add_sensor(module, &NewSensor::new("button").instant())
        .unwrap();
    let trigger = define_trigger(
        &p.store,
        &p.parser,
        &NewTrigger::new(
            "pressed",
            NewExpression::new("{button}").sensor("button", button, "last", &["0"]),
        ),
    )
    .unwrap();

    let (action_tx, _action_rx) = mpsc::unbounded_channel();
    let mut engine = PropagationEngine::new(&p.path, action_tx, 64, 1000).unwrap();
    let tx = engine.sender();

    // no history is ever written for instant sensors; the event is all there is
    tx.send(ChangeEvent::sensor(button, "1")).unwrap();
    engine.drain();
    assert_eq!(
        p.store.get_trigger(trigger).unwrap().lastvalue.as_deref(),
        Some("1.0")
    );
}

#[tokio::test]
async fn actions_fire_with_nested_arguments_when_their_guard_holds() {
    let p = pipeline();
    let module = p.store.add_module(&lamp_module()).unwrap();
    let hall = p.store.add_sensor(module, &NewSensor::new("hall")).unwrap();
    let trigger = define_trigger(
        &p.store,
        &p.parser,
        &NewTrigger::new(
            "hall_hot",
            NewExpression::new("{hall} >= 25").sensor("hall", hall, "last", &["0"]),
        ),
    )
    .unwrap();

    let lamp_on = define_action(
        &p.store,
        &p.parser,
        &NewAction::new(module, "lamp_on")
            .arg("power", NewExpression::new("\"on\""))
            .arg("start.second", NewExpression::new("30"))
            .arg("start.minute", NewExpression::new("15 * 2")),
    )
    .unwrap();
    let lamp_off = define_action(
        &p.store,
        &p.parser,
        &NewAction::new(module, "lamp_off").arg("power", NewExpression::new("\"off\"")),
    )
    .unwrap();

    // gate both actions on the trigger's own value
    bind_trigger_action(
        &p.store,
        &p.parser,
        trigger,
        lamp_on,
        &NewExpression::new("{hot}").trigger("hot", trigger, "last", &["0"]),
    )
    .unwrap();
    bind_trigger_action(
        &p.store,
        &p.parser,
        trigger,
        lamp_off,
        &NewExpression::new("{hot} == 0").trigger("hot", trigger, "last", &["0"]),
    )
    .unwrap();

    let sink = Arc::new(RecordingSink::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let mut dispatcher = ActionDispatcher::new(&p.path, rx, sink.clone(), 1000).unwrap();
    drop(tx);

    // the propagation engine persists before forwarding; mirror that order
    p.store.update_lastvalue(trigger, "1.0").unwrap();
    dispatcher
        .handle_event(&ChangeEvent::trigger(trigger, "1.0", 1))
        .await;

    {
        let calls = sink.calls.lock().await;
        assert_eq!(calls.len(), 1);
        let (queue, key, args) = &calls[0];
        assert_eq!(queue, "domos.lamps");
        assert_eq!(key, "setLamp");
        assert_eq!(
            args,
            &serde_json::json!({
                "power": "on",
                "start": {"second": 30.0, "minute": 30.0}
            })
        );
    }

    p.store.update_lastvalue(trigger, "0.0").unwrap();
    dispatcher
        .handle_event(&ChangeEvent::trigger(trigger, "0.0", 1))
        .await;

    let calls = sink.calls.lock().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].2["power"], "off");
}
