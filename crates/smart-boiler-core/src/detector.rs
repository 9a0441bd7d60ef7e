//! Shower detection from the water-temperature rate of change.
//!
//! A strong drop means hot water is being drawn, whatever the boiler is
//! doing. A weak drop only counts while the boiler is heating, since
//! otherwise it is indistinguishable from the tank cooling on its own.
//!
//! ## Gates (first match aborts)
//!
//! ```text
//! rate missing/unparsable -> cooldown active -> nobody left to shower
//! ```
//!
//! The cooldown check and the timestamp update happen under one lock, so two
//! samples arriving together can never both be accepted.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::bus::Reactor;
use crate::entity::{EntityAccessor, ServiceCall, ServiceCaller};
use crate::events::{Event, StateChange};
use crate::signal::{self, Signal};
use crate::storage::{DetectionConfig, EntitiesConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Rate fell below the strong threshold.
    StrongDrop,
    /// Rate fell below the weak threshold while the boiler was heating.
    HeatingDrop,
}

impl DetectionMethod {
    pub fn label(&self) -> &'static str {
        match self {
            DetectionMethod::StrongDrop => "Strong Drop",
            DetectionMethod::HeatingDrop => "Heating Drop",
        }
    }
}

/// An accepted shower.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShowerEvent {
    pub at: DateTime<Utc>,
    pub method: DetectionMethod,
    pub rate: f64,
    pub people_before: i64,
    /// False when dry-run suppressed the counter decrement.
    pub decremented: bool,
}

impl ShowerEvent {
    pub fn to_event(&self) -> Event {
        Event::ShowerDetected {
            method: self.method,
            rate: self.rate,
            people_before: self.people_before,
            decremented: self.decremented,
            at: self.at,
        }
    }
}

/// Decide whether a rate sample looks like a shower.
pub fn classify(rate: f64, is_heating: bool, config: &DetectionConfig) -> Option<DetectionMethod> {
    if rate < config.strong_drop_rate {
        Some(DetectionMethod::StrongDrop)
    } else if rate < config.heating_drop_rate && is_heating {
        Some(DetectionMethod::HeatingDrop)
    } else {
        None
    }
}

pub struct ShowerDetector {
    accessor: Arc<dyn EntityAccessor>,
    services: Arc<dyn ServiceCaller>,
    entities: EntitiesConfig,
    config: DetectionConfig,
    dry_run: bool,
    last_detection: Mutex<Option<DateTime<Utc>>>,
}

impl ShowerDetector {
    pub fn new(
        accessor: Arc<dyn EntityAccessor>,
        services: Arc<dyn ServiceCaller>,
        entities: EntitiesConfig,
        config: DetectionConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            accessor,
            services,
            entities,
            config,
            dry_run,
            last_detection: Mutex::new(None),
        }
    }

    /// Time of the last accepted detection.
    pub fn last_detection(&self) -> Option<DateTime<Utc>> {
        *self
            .last_detection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Saturates instead of wrapping when the configured minutes overflow.
    fn cooldown(&self) -> Duration {
        i64::try_from(self.config.cooldown_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .unwrap_or(Duration::MAX)
    }

    /// Evaluate one rate sample taken at `now`.
    pub fn on_rate_sample(&self, sample: Signal, now: DateTime<Utc>) -> Option<ShowerEvent> {
        let rate = match sample {
            Ok(rate) => rate,
            Err(e) => {
                tracing::debug!(reason = %e, "rate sample skipped");
                return None;
            }
        };

        let event = {
            let mut last = self
                .last_detection
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            if let Some(previous) = *last {
                if now - previous < self.cooldown() {
                    tracing::debug!(%previous, "shower cooldown active");
                    return None;
                }
            }

            let people = match signal::numeric_state(self.accessor.as_ref(), &self.entities.people_counter) {
                Ok(count) => count.trunc() as i64,
                Err(e) => {
                    tracing::debug!(reason = %e, "people count unavailable");
                    return None;
                }
            };
            if people <= 0 {
                tracing::debug!(people, "no one left to shower");
                return None;
            }

            let is_heating = signal::is_on(self.accessor.as_ref(), &self.entities.boiler_switch);
            let method = classify(rate, is_heating, &self.config)?;

            *last = Some(now);
            ShowerEvent {
                at: now,
                method,
                rate,
                people_before: people,
                decremented: !self.dry_run,
            }
        };

        if self.dry_run {
            tracing::info!(
                rate,
                method = event.method.label(),
                "[DRY RUN] Would have decremented counter. Shower detected via {}!",
                event.method.label()
            );
        } else {
            tracing::info!(
                rate,
                method = event.method.label(),
                "Shower detected via {}! Decrementing counter.",
                event.method.label()
            );
            self.services
                .call_service(ServiceCall::decrement(&self.entities.people_counter));
        }

        Some(event)
    }
}

impl Reactor for ShowerDetector {
    fn name(&self) -> &str {
        "shower_detector"
    }

    fn on_state_changed(&self, change: &StateChange) -> Vec<Event> {
        if change.entity_key != self.entities.temp_rate {
            return Vec::new();
        }
        let sample = signal::parse_state(&change.entity_key, change.new_state.as_ref());
        self.on_rate_sample(sample, change.at)
            .map(|shower| vec![shower.to_event()])
            .unwrap_or_default()
    }
}
