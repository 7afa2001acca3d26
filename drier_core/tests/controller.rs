use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use drier_core::mocks::{FailingLog, FailingModel, RecordingLog, StubModel};
use drier_core::{
    ConfigManager, Controller, DrierError, ModelAdapter, ProcessState, StateStore, Switch,
    TargetConfig,
};
use drier_traits::{Clock, FixedClock};
use rstest::rstest;
use serde_json::json;

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-14T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn controller_with(model: ModelAdapter, log: RecordingLog, clock: FixedClock) -> Controller {
    let targets = ConfigManager::ephemeral(TargetConfig::default());
    let state = StateStore::ephemeral(ProcessState::initial(clock.now(), targets.get()));
    Controller::new(model, state, targets, log).with_clock(Arc::new(clock))
}

fn reading() -> serde_json::Value {
    json!({"temperature_now": 45, "humidity_now": 30, "time_remaining": 120})
}

#[rstest]
#[case(17.5, false, Switch::On, Switch::On)]
#[case(15.0, true, Switch::Off, Switch::Off)]
#[case(16.0, true, Switch::Off, Switch::Off)]
fn worked_example(
    #[case] moisture: f64,
    #[case] finish: bool,
    #[case] heater: Switch,
    #[case] fan: Switch,
) {
    let stub = StubModel::new("Basah", moisture);
    let ctrl = controller_with(stub.adapter(), RecordingLog::new(), FixedClock::new(t0()));
    let applied = ctrl.apply_reading(&reading()).unwrap();
    assert_eq!(applied.state.process_finish, finish);
    assert_eq!(applied.state.heater_status, heater);
    assert_eq!(applied.state.fan_status, fan);
    assert_eq!(applied.state.moisture_content, moisture);
    assert!(applied.log_error.is_none());
}

#[test]
fn features_reach_model_in_trained_order() {
    let stub = StubModel::new("Basah", 20.0);
    let ctrl = controller_with(stub.adapter(), RecordingLog::new(), FixedClock::new(t0()));
    ctrl.apply_reading(&reading()).unwrap();
    assert_eq!(stub.last_features().unwrap().as_array(), [30.0, 45.0, 120.0]);
}

#[test]
fn missing_fields_leave_state_untouched() {
    let stub = StubModel::new("Basah", 20.0);
    let log = RecordingLog::new();
    let ctrl = controller_with(stub.adapter(), log.clone(), FixedClock::new(t0()));
    let before = ctrl.snapshot();

    let err = ctrl
        .apply_reading(&json!({"temperature_now": 45}))
        .unwrap_err();
    assert_eq!(err.offending_fields(), vec!["humidity_now", "time_remaining"]);
    assert_eq!(ctrl.snapshot(), before);
    assert!(log.entries().is_empty());
    assert!(stub.seen().is_empty());
}

#[test]
fn prediction_failure_leaves_state_untouched() {
    let ctrl = controller_with(
        ModelAdapter::new(FailingModel, FailingModel),
        RecordingLog::new(),
        FixedClock::new(t0()),
    );
    let before = ctrl.snapshot();
    let err = ctrl.apply_reading(&reading()).unwrap_err();
    assert!(matches!(err, DrierError::Prediction(_)));
    assert_eq!(ctrl.snapshot(), before);
}

#[test]
fn log_failure_keeps_the_commit() {
    let stub = StubModel::new("Kering", 12.0);
    let targets = ConfigManager::ephemeral(TargetConfig::default());
    let state = StateStore::ephemeral(ProcessState::initial(t0(), targets.get()));
    let ctrl = Controller::new(stub.adapter(), state, targets, FailingLog);

    let applied = ctrl.apply_reading(&reading()).unwrap();
    assert!(matches!(applied.log_error, Some(DrierError::EventLog(_))));
    assert_eq!(ctrl.snapshot().clove_status, "Kering");
    assert_eq!(ctrl.snapshot().temperature_now, 45.0);
}

#[test]
fn same_reading_same_clock_same_result() {
    let clock = FixedClock::new(t0());
    let a = controller_with(
        StubModel::new("Basah", 18.25).adapter(),
        RecordingLog::new(),
        clock.clone(),
    );
    let b = controller_with(
        StubModel::new("Basah", 18.25).adapter(),
        RecordingLog::new(),
        clock,
    );
    let ra = a.apply_reading(&reading()).unwrap();
    let rb = b.apply_reading(&reading()).unwrap();
    assert_eq!(ra, rb);

    // Applying twice is idempotent with respect to the resulting state.
    let again = a.apply_reading(&reading()).unwrap();
    assert_eq!(again.state, ra.state);
}

#[test]
fn finish_is_not_sticky() {
    let stub = StubModel::new("Kering", 10.0);
    let ctrl = controller_with(stub.adapter(), RecordingLog::new(), FixedClock::new(t0()));
    assert!(ctrl.apply_reading(&reading()).unwrap().state.process_finish);
    stub.set_moisture(25.0);
    assert!(!ctrl.apply_reading(&reading()).unwrap().state.process_finish);
}

#[test]
fn log_entry_mirrors_committed_state() {
    let clock = FixedClock::new(t0());
    let log = RecordingLog::new();
    let ctrl = controller_with(
        StubModel::new("Basah", 19.3).adapter(),
        log.clone(),
        clock.clone(),
    );
    clock.advance(TimeDelta::seconds(30));
    ctrl.apply_reading(&reading()).unwrap();

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.timestamp, "2026-10-14T08:00:30.000000Z");
    assert_eq!(e.moisture_pred, 19.3);
    assert_eq!(e.heater, Switch::On);
    assert_eq!(e.target_moisture, 16);
}

#[test]
fn target_update_drives_next_decision() {
    let stub = StubModel::new("Basah", 15.0);
    let ctrl = controller_with(stub.adapter(), RecordingLog::new(), FixedClock::new(t0()));
    ctrl.update_targets(&json!({"target_moisture": 12})).unwrap();
    assert_eq!(
        ctrl.targets(),
        TargetConfig {
            target_moisture: 12,
            target_time: 4
        }
    );
    assert_eq!(ctrl.snapshot().target_moisture, 12);

    let applied = ctrl.apply_reading(&reading()).unwrap();
    assert!(!applied.state.process_finish);
    assert_eq!(applied.state.target_moisture, 12);
}

#[test]
fn invalid_target_update_changes_nothing() {
    let ctrl = controller_with(
        StubModel::new("Basah", 15.0).adapter(),
        RecordingLog::new(),
        FixedClock::new(t0()),
    );
    let err = ctrl
        .update_targets(&json!({"target_moisture": 10, "target_time": "later"}))
        .unwrap_err();
    assert!(matches!(err, DrierError::InvalidConfig(_)));
    assert_eq!(ctrl.targets(), TargetConfig::default());
}

#[test]
fn retrain_without_source_is_an_error() {
    let ctrl = controller_with(
        StubModel::new("Basah", 15.0).adapter(),
        RecordingLog::new(),
        FixedClock::new(t0()),
    );
    assert!(matches!(ctrl.retrain(), Err(DrierError::Training(_))));
}

#[test]
fn concurrent_readings_never_tear_state() {
    let stub = StubModel::new("Basah", 20.0);
    let log = RecordingLog::new();
    let ctrl = Arc::new(controller_with(
        stub.adapter(),
        log.clone(),
        FixedClock::new(t0()),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ctrl = Arc::clone(&ctrl);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let t = f64::from(i);
                    ctrl.apply_reading(&json!({
                        "temperature_now": t,
                        "humidity_now": t + 100.0,
                        "time_remaining": 60,
                    }))
                    .unwrap();
                    let s = ctrl.snapshot();
                    assert_eq!(s.humidity_now, s.temperature_now + 100.0);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(log.entries().len(), 200);
}
