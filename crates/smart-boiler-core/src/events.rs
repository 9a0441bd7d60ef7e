use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detector::DetectionMethod;
use crate::entity::EntityState;

/// A `state_changed` notification from the host.
///
/// `actor_id` is set when a person caused the change (UI, app, physical
/// button routed through a user context) and absent for automations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub entity_key: String,
    #[serde(default)]
    pub old_state: Option<EntityState>,
    #[serde(default)]
    pub new_state: Option<EntityState>,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
}

impl StateChange {
    pub fn new(
        entity_key: impl Into<String>,
        old_state: Option<EntityState>,
        new_state: Option<EntityState>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_key: entity_key.into(),
            old_state,
            new_state,
            actor_id: None,
            at,
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }
}

/// Every decision the core takes produces an Event.
/// Replay prints them; hosts may forward them to their logbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ShowerDetected {
        method: DetectionMethod,
        rate: f64,
        people_before: i64,
        /// False when dry-run suppressed the counter decrement.
        decremented: bool,
        at: DateTime<Utc>,
    },
    /// A person switched the boiler on by hand.
    ManualOverride {
        entity_key: String,
        actor_id: Option<String>,
        at: DateTime<Utc>,
    },
    ThresholdAdjusted {
        from: f64,
        to: f64,
        decrease: bool,
        /// False when dry-run suppressed the write.
        applied: bool,
        at: DateTime<Utc>,
    },
    /// A learning step was requested but the threshold store had no value.
    ThresholdUnavailable {
        reason: String,
        at: DateTime<Utc>,
    },
    UrgencyRecomputed {
        score: u8,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Get a human-readable description of this event
    pub fn description(&self) -> String {
        match self {
            Event::ShowerDetected { method, rate, decremented, .. } => {
                let suffix = if *decremented { "" } else { " [dry run]" };
                format!("Shower detected via {} (rate {rate}){suffix}", method.label())
            }
            Event::ManualOverride { entity_key, actor_id, .. } => format!(
                "Manual boost of {entity_key} by {}",
                actor_id.as_deref().unwrap_or("unknown user")
            ),
            Event::ThresholdAdjusted { from, to, decrease, applied, .. } => {
                let verb = if *decrease { "Decreasing" } else { "Increasing" };
                let suffix = if *applied { "" } else { " [dry run]" };
                format!("{verb} threshold from {from} to {to}{suffix}")
            }
            Event::ThresholdUnavailable { reason, .. } => {
                format!("Threshold not adjusted: {reason}")
            }
            Event::UrgencyRecomputed { score, .. } => format!("Urgency score {score}%"),
        }
    }

    /// Get the type name of this event
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ShowerDetected { .. } => "ShowerDetected",
            Event::ManualOverride { .. } => "ManualOverride",
            Event::ThresholdAdjusted { .. } => "ThresholdAdjusted",
            Event::ThresholdUnavailable { .. } => "ThresholdUnavailable",
            Event::UrgencyRecomputed { .. } => "UrgencyRecomputed",
        }
    }
}
