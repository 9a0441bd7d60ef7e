//! Bounded learning steps on the threshold.
//!
//! Steps are asymmetric: a missed trigger (decrease) moves the threshold
//! further than a confirmation (increase), so the value drifts toward higher
//! sensitivity over time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::ThresholdStore;
use crate::entity::{ServiceCall, ServiceCaller};
use crate::error::ThresholdError;
use crate::events::Event;
use crate::storage::LearningConfig;

/// Outcome of one learning step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub from: f64,
    pub to: f64,
    pub decrease: bool,
    /// False in dry-run mode.
    pub applied: bool,
}

impl Adjustment {
    pub fn to_event(&self, at: DateTime<Utc>) -> Event {
        Event::ThresholdAdjusted {
            from: self.from,
            to: self.to,
            decrease: self.decrease,
            applied: self.applied,
            at,
        }
    }
}

/// Value after one step from `current`, kept within `[min, max]`.
pub fn next_value(current: f64, decrease: bool, learning: &LearningConfig) -> f64 {
    let stepped = if decrease {
        current - learning.decrease_step
    } else {
        current + learning.increase_step
    };
    stepped.clamp(learning.min, learning.max)
}

/// The only writer of the threshold on the learning path.
pub struct ThresholdAdjuster {
    store: Arc<ThresholdStore>,
    services: Arc<dyn ServiceCaller>,
    entity_key: String,
    learning: LearningConfig,
    dry_run: bool,
}

impl ThresholdAdjuster {
    pub fn new(
        store: Arc<ThresholdStore>,
        services: Arc<dyn ServiceCaller>,
        entity_key: impl Into<String>,
        learning: LearningConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            store,
            services,
            entity_key: entity_key.into(),
            learning,
            dry_run,
        }
    }

    pub fn store(&self) -> &Arc<ThresholdStore> {
        &self.store
    }

    /// Move the threshold one step down (`decrease = true`) or up.
    ///
    /// # Errors
    /// [`ThresholdError::NotInitialized`] when the store has not been
    /// restored yet. Nothing is written in that case.
    pub fn adjust(&self, decrease: bool) -> Result<Adjustment, ThresholdError> {
        let result = if self.dry_run {
            self.store
                .get()
                .map(|current| (current, next_value(current, decrease, &self.learning)))
                .ok_or_else(|| ThresholdError::NotInitialized {
                    key: self.store.key().to_string(),
                })
        } else {
            self.store
                .update(|current| next_value(current, decrease, &self.learning))
        };

        let (from, to) = match result {
            Ok(values) => values,
            Err(e) => {
                tracing::error!(error = %e, "threshold adjustment skipped");
                return Err(e);
            }
        };

        let direction = if decrease { "Decreasing" } else { "Increasing" };
        if self.dry_run {
            tracing::info!(from, to, "[DRY RUN] Would have updated threshold: {direction} threshold from {from} to {to}");
        } else {
            tracing::info!(from, to, "Learning: {direction} threshold from {from} to {to}");
            self.services
                .call_service(ServiceCall::set_value(&self.entity_key, to));
        }

        Ok(Adjustment {
            from,
            to,
            decrease,
            applied: !self.dry_run,
        })
    }
}
