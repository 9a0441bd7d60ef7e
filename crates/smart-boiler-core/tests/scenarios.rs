//! End-to-end scenarios through the engine and the in-process host.
//!
//! Each test seeds the host, feeds `state_changed` notifications the way the
//! automation platform would, and checks both the emitted decisions and the
//! resulting entity values.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use smart_boiler_core::{
    Config, Database, DetectionMethod, EntityAccessor, EntityHost, EntityState, Event,
    MemoryPersistence, ServiceCall, SmartBoiler, StateChange,
};

const SWITCH: &str = "switch.boiler";
const RATE: &str = "sensor.water_temp_change_rate";
const PEOPLE: &str = "input_number.number_of_shower_people";
const THRESHOLD: &str = "number.smart_boiler_threshold";

fn live_config() -> Config {
    Config {
        dry_run: false,
        ..Config::default()
    }
}

fn start(config: &Config, people: &str, heating: bool) -> (SmartBoiler, Arc<EntityHost>) {
    let host = Arc::new(EntityHost::new());
    host.set_state(PEOPLE, EntityState::new(people).with_attribute("min", 0));
    host.set_state(SWITCH, EntityState::new(if heating { "on" } else { "off" }));
    let boiler = SmartBoiler::setup(
        config,
        host.clone(),
        host.clone(),
        Box::new(MemoryPersistence::new()),
    )
    .unwrap();
    (boiler, host)
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-05T19:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn rate_change(rate: &str, at: DateTime<Utc>) -> StateChange {
    StateChange::new(RATE, None, Some(EntityState::new(rate)), at)
}

fn switch_on(actor: Option<&str>) -> StateChange {
    let change = StateChange::new(
        SWITCH,
        Some(EntityState::new("off")),
        Some(EntityState::new("on")),
        t0(),
    );
    match actor {
        Some(actor) => change.with_actor(actor),
        None => change,
    }
}

#[test]
fn scenario_a_strong_drop_without_heating() {
    let (boiler, host) = start(&live_config(), "2", false);

    let events = boiler.handle(&rate_change("-2.0", t0()));

    assert!(matches!(
        events.as_slice(),
        [Event::ShowerDetected {
            method: DetectionMethod::StrongDrop,
            decremented: true,
            ..
        }]
    ));
    assert_eq!(host.calls(), vec![ServiceCall::decrement(PEOPLE)]);
    assert_eq!(host.get_entity(PEOPLE).unwrap().state, "1");
    assert_eq!(boiler.detector().last_detection(), Some(t0()));
}

#[test]
fn scenario_b_weak_drop_while_heating() {
    let (boiler, _) = start(&live_config(), "1", true);
    let events = boiler.handle(&rate_change("-0.5", t0()));
    assert!(matches!(
        events.as_slice(),
        [Event::ShowerDetected {
            method: DetectionMethod::HeatingDrop,
            ..
        }]
    ));
}

#[test]
fn scenario_c_weak_drop_while_idle() {
    let (boiler, host) = start(&live_config(), "1", false);
    assert!(boiler.handle(&rate_change("-0.5", t0())).is_empty());
    assert!(host.calls().is_empty());
}

#[test]
fn scenario_d_manual_boost_lowers_threshold() {
    let (boiler, host) = start(&live_config(), "1", false);
    assert_eq!(boiler.threshold(), Some(50.0));

    let events = boiler.handle(&switch_on(Some("user123")));

    assert_eq!(boiler.threshold(), Some(45.0));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ThresholdAdjusted { from, to, .. } if *from == 50.0 && *to == 45.0)));
    assert_eq!(host.get_entity(THRESHOLD).unwrap().state, "45");
}

#[test]
fn scenario_e_automation_boost_is_ignored() {
    let (boiler, host) = start(&live_config(), "1", false);
    assert!(boiler.handle(&switch_on(None)).is_empty());
    assert_eq!(boiler.threshold(), Some(50.0));
    assert!(host.calls().is_empty());
}

#[test]
fn scenario_f_urgency_score() {
    let (boiler, host) = start(&live_config(), "3", false);
    host.set_state("sensor.showers_last_7_days_evening", EntityState::new("2"));
    host.set_state(
        "weather.home",
        EntityState::new("cloudy").with_attribute("temperature", 10.0),
    );
    assert_eq!(boiler.urgency().value, 75);
}

#[test]
fn evening_with_two_showers_and_a_boost() {
    let (boiler, host) = start(&live_config(), "2", true);

    let mut detections = 0;
    for (minute, rate) in [(0, "-2.1"), (3, "-1.8"), (10, "-0.6"), (16, "-0.4"), (40, "-2.0")] {
        let events = boiler.handle(&rate_change(rate, t0() + Duration::minutes(minute)));
        detections += events.len();
    }
    // 0 and 16 are accepted, 40 finds nobody left
    assert_eq!(detections, 2);
    assert_eq!(host.get_entity(PEOPLE).unwrap().state, "0");

    boiler.handle(&switch_on(Some("user123")));
    boiler.handle(&switch_on(Some("user123")));
    assert_eq!(boiler.threshold(), Some(40.0));
}

#[test]
fn dry_run_decides_but_changes_nothing() {
    let (boiler, host) = start(&Config::default(), "2", false);

    let shower = boiler.handle(&rate_change("-2.0", t0()));
    let boost = boiler.handle(&switch_on(Some("user123")));

    assert!(matches!(shower.as_slice(), [Event::ShowerDetected { decremented: false, .. }]));
    assert!(boost
        .iter()
        .any(|e| matches!(e, Event::ThresholdAdjusted { applied: false, to, .. } if *to == 45.0)));
    assert!(host.calls().is_empty());
    assert_eq!(host.get_entity(PEOPLE).unwrap().state, "2");
    assert_eq!(boiler.threshold(), Some(50.0));
}

#[test]
fn unavailable_rate_is_a_soft_miss() {
    let (boiler, host) = start(&live_config(), "2", true);
    for raw in ["unknown", "unavailable", "n/a", ""] {
        assert!(boiler.handle(&rate_change(raw, t0())).is_empty());
    }
    let removed = StateChange::new(RATE, Some(EntityState::new("-2.0")), None, t0());
    assert!(boiler.handle(&removed).is_empty());
    assert!(host.calls().is_empty());
}

#[test]
fn threshold_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smart-boiler.db");
    let host = Arc::new(EntityHost::new());

    {
        let db = Database::open_at(&path).unwrap();
        let boiler = SmartBoiler::setup(&live_config(), host.clone(), host.clone(), Box::new(Mutex::new(db))).unwrap();
        boiler.handle(&switch_on(Some("user123")));
        boiler.handle(&switch_on(Some("user123")));
        assert_eq!(boiler.threshold(), Some(40.0));
    }

    let db = Database::open_at(&path).unwrap();
    let boiler = SmartBoiler::setup(&live_config(), host.clone(), host, Box::new(Mutex::new(db))).unwrap();
    assert_eq!(boiler.threshold(), Some(40.0));
}
