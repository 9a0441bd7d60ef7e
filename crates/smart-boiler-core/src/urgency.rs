//! Boiler urgency score.
//!
//! ```text
//! score = history * 5 + people * 15 + (20 - outside_temp) * 2
//! ```
//!
//! clamped to `[0, 100]` and truncated. Each input falls back to a neutral
//! value when its entity is missing or non-numeric: zero for history and
//! people, the comfort temperature for the weather. History and people are
//! counts and never go below zero.
//!
//! The aggregator holds no state; recomputing with the same entity snapshot
//! always gives the same score.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::entity::{EntityAccessor, EntityDescriptor};
use crate::events::Event;
use crate::signal;
use crate::storage::{EntitiesConfig, UrgencyConfig};

/// Metadata of the score as exposed to the host.
pub const URGENCY_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    name: "Boiler Urgency Score",
    unique_id: "boiler_urgency_score_ai",
    icon: "mdi:chart-line-variant",
    unit: Some("%"),
    min: Some(0.0),
    max: Some(100.0),
    step: None,
};

/// Snapshot of the three signals the score combines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgencyInputs {
    /// Showers seen in the recent evening window.
    pub history: f64,
    pub people: f64,
    pub outside_temp: f64,
}

/// One weighted term of the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyTerm {
    pub name: String,
    pub input: f64,
    pub weight: f64,
    pub contribution: f64,
}

impl UrgencyTerm {
    fn new(name: &str, input: f64, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            input,
            weight,
            contribution: input * weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyScore {
    /// Bounded score in `[0, 100]`.
    pub value: u8,
    /// Unclamped sum of the terms.
    pub raw: f64,
    pub terms: Vec<UrgencyTerm>,
}

impl UrgencyScore {
    pub fn to_event(&self) -> Event {
        Event::UrgencyRecomputed {
            score: self.value,
            at: Utc::now(),
        }
    }
}

/// Combine a snapshot into a score.
pub fn score(inputs: &UrgencyInputs, config: &UrgencyConfig) -> UrgencyScore {
    let terms = vec![
        UrgencyTerm::new("history", inputs.history, config.history_weight),
        UrgencyTerm::new("people", inputs.people, config.people_weight),
        UrgencyTerm::new(
            "weather",
            config.comfort_temperature - inputs.outside_temp,
            config.temperature_weight,
        ),
    ];
    let raw: f64 = terms.iter().map(|t| t.contribution).sum();
    // NaN casts to 0
    let value = raw.clamp(0.0, 100.0).trunc() as u8;
    UrgencyScore { value, raw, terms }
}

/// Polled reader that turns current entity values into a score.
pub struct UrgencyAggregator {
    accessor: Arc<dyn EntityAccessor>,
    entities: EntitiesConfig,
    config: UrgencyConfig,
}

impl UrgencyAggregator {
    pub fn new(accessor: Arc<dyn EntityAccessor>, entities: EntitiesConfig, config: UrgencyConfig) -> Self {
        Self {
            accessor,
            entities,
            config,
        }
    }

    pub fn config(&self) -> &UrgencyConfig {
        &self.config
    }

    /// Read the three signals, substituting neutral values for missing ones.
    pub fn snapshot(&self) -> UrgencyInputs {
        let accessor = self.accessor.as_ref();
        let or_neutral = |signal: signal::Signal, neutral: f64| {
            signal.unwrap_or_else(|e| {
                tracing::debug!(reason = %e, neutral, "urgency input unavailable");
                neutral
            })
        };

        UrgencyInputs {
            history: or_neutral(signal::numeric_state(accessor, &self.entities.shower_history), 0.0).max(0.0),
            people: or_neutral(signal::numeric_state(accessor, &self.entities.people_counter), 0.0).max(0.0),
            outside_temp: or_neutral(
                signal::numeric_attribute(accessor, &self.entities.weather, "temperature"),
                self.config.comfort_temperature,
            ),
        }
    }

    pub fn recompute(&self) -> UrgencyScore {
        let inputs = self.snapshot();
        let result = score(&inputs, &self.config);
        tracing::debug!(score = result.value, raw = result.raw, "urgency recomputed");
        result
    }
}
