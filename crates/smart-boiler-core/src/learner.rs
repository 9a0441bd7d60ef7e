//! Learning from manual boiler overrides.
//!
//! When a person switches the boiler on by hand, the automatic trigger was
//! too conservative. Each such boost lowers the threshold one step.
//! Off-to-on transitions without an actor come from automations and carry no
//! signal.
//!
//! Every attributed boost counts, including ones unrelated to a missed
//! shower.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bus::Reactor;
use crate::events::{Event, StateChange};
use crate::signal::{STATE_OFF, STATE_ON};
use crate::threshold::{Adjustment, ThresholdAdjuster};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    On,
    Off,
    /// Anything else the host reports (`unavailable`, `unknown`, ...).
    Other,
}

impl SwitchState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            STATE_ON => SwitchState::On,
            STATE_OFF => SwitchState::Off,
            _ => SwitchState::Other,
        }
    }
}

/// A manual boost of the boiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideEvent {
    pub at: DateTime<Utc>,
    pub actor_present: bool,
    pub actor_id: Option<String>,
    /// The learning step taken, absent if the threshold was unavailable.
    pub adjustment: Option<Adjustment>,
}

pub struct OverrideLearner {
    switch_key: String,
    adjuster: Arc<ThresholdAdjuster>,
}

impl OverrideLearner {
    pub fn new(switch_key: impl Into<String>, adjuster: Arc<ThresholdAdjuster>) -> Self {
        Self {
            switch_key: switch_key.into(),
            adjuster,
        }
    }

    /// React to one transition of the boiler switch.
    pub fn on_appliance_transition(
        &self,
        previous: SwitchState,
        new: SwitchState,
        actor_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Option<OverrideEvent> {
        if previous != SwitchState::Off || new != SwitchState::On {
            return None;
        }
        let Some(actor) = actor_id else {
            tracing::debug!("boiler switched on by automation, nothing to learn");
            return None;
        };

        tracing::info!(actor, "Detection: Manual boost detected.");
        let adjustment = self.adjuster.adjust(true).ok();

        Some(OverrideEvent {
            at,
            actor_present: true,
            actor_id: Some(actor.to_string()),
            adjustment,
        })
    }
}

impl Reactor for OverrideLearner {
    fn name(&self) -> &str {
        "override_learner"
    }

    fn on_state_changed(&self, change: &StateChange) -> Vec<Event> {
        if change.entity_key != self.switch_key {
            return Vec::new();
        }
        let (Some(old), Some(new)) = (&change.old_state, &change.new_state) else {
            return Vec::new();
        };

        let Some(boost) = self.on_appliance_transition(
            SwitchState::parse(&old.state),
            SwitchState::parse(&new.state),
            change.actor_id.as_deref(),
            change.at,
        ) else {
            return Vec::new();
        };

        let mut events = vec![Event::ManualOverride {
            entity_key: change.entity_key.clone(),
            actor_id: boost.actor_id,
            at: boost.at,
        }];
        events.push(match boost.adjustment {
            Some(adjustment) => adjustment.to_event(boost.at),
            None => Event::ThresholdUnavailable {
                reason: "threshold store not initialized".to_string(),
                at: boost.at,
            },
        });
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityHost, EntityState};
    use crate::storage::LearningConfig;
    use crate::threshold::{MemoryPersistence, ThresholdStore};

    const SWITCH: &str = "switch.boiler";

    fn learner(restored: bool) -> OverrideLearner {
        let learning = LearningConfig::default();
        let store = Arc::new(ThresholdStore::new(&learning, Box::new(MemoryPersistence::new())));
        if restored {
            store.restore();
        }
        let adjuster = ThresholdAdjuster::new(
            store,
            Arc::new(EntityHost::new()),
            "number.smart_boiler_threshold",
            learning,
            false,
        );
        OverrideLearner::new(SWITCH, Arc::new(adjuster))
    }

    fn transition(old: &str, new: &str, actor: Option<&str>) -> StateChange {
        let change = StateChange::new(
            SWITCH,
            Some(EntityState::new(old)),
            Some(EntityState::new(new)),
            Utc::now(),
        );
        match actor {
            Some(actor) => change.with_actor(actor),
            None => change,
        }
    }

    #[test]
    fn manual_boost_lowers_threshold() {
        let learner = learner(true);
        let boost = learner
            .on_appliance_transition(SwitchState::Off, SwitchState::On, Some("user123"), Utc::now())
            .unwrap();
        assert!(boost.actor_present);
        assert_eq!(boost.adjustment.unwrap().to, 45.0);
        assert_eq!(learner.adjuster.store().get(), Some(45.0));
    }

    #[test]
    fn automation_boost_is_ignored() {
        let learner = learner(true);
        assert!(learner
            .on_appliance_transition(SwitchState::Off, SwitchState::On, None, Utc::now())
            .is_none());
        assert_eq!(learner.adjuster.store().get(), Some(50.0));
    }

    #[test]
    fn only_off_to_on_counts() {
        let learner = learner(true);
        for (old, new) in [("on", "off"), ("on", "on"), ("unavailable", "on"), ("off", "off")] {
            assert!(learner.on_state_changed(&transition(old, new, Some("user123"))).is_empty());
        }
        assert_eq!(learner.adjuster.store().get(), Some(50.0));
    }

    #[test]
    fn reactor_reports_override_and_adjustment() {
        let learner = learner(true);
        let events = learner.on_state_changed(&transition("off", "on", Some("user123")));
        let types: Vec<_> = events.iter().map(Event::type_name).collect();
        assert_eq!(types, vec!["ManualOverride", "ThresholdAdjusted"]);
    }

    #[test]
    fn missing_store_is_reported_not_fatal() {
        let learner = learner(false);
        let events = learner.on_state_changed(&transition("off", "on", Some("user123")));
        let types: Vec<_> = events.iter().map(Event::type_name).collect();
        assert_eq!(types, vec!["ManualOverride", "ThresholdUnavailable"]);
    }

    #[test]
    fn other_entities_are_ignored() {
        let learner = learner(true);
        let mut change = transition("off", "on", Some("user123"));
        change.entity_key = "switch.kettle".into();
        assert!(learner.on_state_changed(&change).is_empty());
    }
}
