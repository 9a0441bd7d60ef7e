//! Property tests for the detection, learning and scoring invariants.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use smart_boiler_core::storage::{DetectionConfig, EntitiesConfig, LearningConfig, UrgencyConfig};
use smart_boiler_core::threshold::next_value;
use smart_boiler_core::urgency::score;
use smart_boiler_core::{
    EntityHost, EntityState, MemoryPersistence, ShowerDetector, ThresholdAdjuster, ThresholdStore,
    UrgencyInputs,
};

const PEOPLE: &str = "input_number.number_of_shower_people";
const SWITCH: &str = "switch.boiler";

fn detector(people: u32, heating: bool) -> ShowerDetector {
    let host = Arc::new(EntityHost::new());
    host.set_state(PEOPLE, EntityState::new(people.to_string()));
    host.set_state(SWITCH, EntityState::new(if heating { "on" } else { "off" }));
    ShowerDetector::new(
        host.clone(),
        host,
        EntitiesConfig::default(),
        DetectionConfig::default(),
        false,
    )
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-05T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

proptest! {
    #[test]
    fn strong_drop_always_fires(rate in -50.0f64..-1.5001, people in 1u32..10, heating in any::<bool>()) {
        let detector = detector(people, heating);
        prop_assert!(detector.on_rate_sample(Ok(rate), t0()).is_some());
    }

    #[test]
    fn weak_drop_without_heating_never_fires(rates in prop::collection::vec(-0.3f64..0.0, 1..40)) {
        let detector = detector(100, false);
        for (i, rate) in rates.into_iter().enumerate() {
            let at = t0() + Duration::minutes(i as i64 * 20);
            prop_assert!(detector.on_rate_sample(Ok(rate), at).is_none());
        }
    }

    #[test]
    fn detections_respect_cooldown(
        steps in prop::collection::vec((0i64..1800, -3.0f64..1.0), 1..60),
        heating in any::<bool>(),
    ) {
        let detector = detector(1000, heating);
        let mut at = t0();
        let mut accepted: Vec<DateTime<Utc>> = Vec::new();
        for (gap_secs, rate) in steps {
            at += Duration::seconds(gap_secs);
            if let Some(event) = detector.on_rate_sample(Ok(rate), at) {
                accepted.push(event.at);
            }
        }
        for pair in accepted.windows(2) {
            prop_assert!(pair[1] - pair[0] >= Duration::minutes(15));
        }
    }

    #[test]
    fn threshold_stays_in_bounds(start in 0.0f64..=100.0, steps in prop::collection::vec(any::<bool>(), 0..200)) {
        let learning = LearningConfig::default();
        let mut value = start;
        for decrease in steps {
            value = next_value(value, decrease, &learning);
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn adjuster_history_stays_in_bounds(steps in prop::collection::vec(any::<bool>(), 1..100)) {
        let learning = LearningConfig::default();
        let store = Arc::new(ThresholdStore::new(&learning, Box::new(MemoryPersistence::new())));
        store.restore();
        let adjuster = ThresholdAdjuster::new(
            store.clone(),
            Arc::new(EntityHost::new()),
            "number.smart_boiler_threshold",
            learning,
            false,
        );
        for decrease in steps {
            let adjustment = adjuster.adjust(decrease).unwrap();
            prop_assert!((0.0..=100.0).contains(&adjustment.to));
            prop_assert_eq!(store.get(), Some(adjustment.to));
        }
    }

    #[test]
    fn score_is_bounded_and_deterministic(
        history in -10.0f64..50.0,
        people in -5.0f64..20.0,
        outside_temp in -40.0f64..50.0,
    ) {
        let inputs = UrgencyInputs { history, people, outside_temp };
        let config = UrgencyConfig::default();
        let first = score(&inputs, &config);
        prop_assert!(first.value <= 100);
        prop_assert_eq!(first, score(&inputs, &config));
    }
}

#[test]
fn threshold_edges() {
    let learning = LearningConfig::default();
    assert_eq!(next_value(3.0, true, &learning), 0.0);
    assert_eq!(next_value(99.0, false, &learning), 100.0);
}
