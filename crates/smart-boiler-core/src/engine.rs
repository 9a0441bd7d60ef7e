//! Wiring of the reactors, the threshold and the score.
//!
//! ## Usage
//!
//! ```ignore
//! let host = Arc::new(EntityHost::new());
//! let boiler = SmartBoiler::setup(&config, host.clone(), host, persistence)?;
//! for change in notifications {
//!     for event in boiler.handle(&change) {
//!         println!("{}", event.description());
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::bus::{EventBus, EventType};
use crate::detector::ShowerDetector;
use crate::entity::{EntityAccessor, ServiceCaller};
use crate::error::{Result, ThresholdError};
use crate::events::{Event, StateChange};
use crate::learner::OverrideLearner;
use crate::storage::Config;
use crate::threshold::{Adjustment, ThresholdAdjuster, ThresholdPersistence, ThresholdStore};
use crate::urgency::{UrgencyAggregator, UrgencyScore};

pub struct SmartBoiler {
    config: Config,
    bus: EventBus,
    detector: Arc<ShowerDetector>,
    adjuster: Arc<ThresholdAdjuster>,
    aggregator: Arc<UrgencyAggregator>,
}

impl SmartBoiler {
    /// Validate the config, restore the threshold and subscribe the reactors.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn setup(
        config: &Config,
        accessor: Arc<dyn EntityAccessor>,
        services: Arc<dyn ServiceCaller>,
        persistence: Box<dyn ThresholdPersistence>,
    ) -> Result<Self> {
        config.validate()?;

        if config.dry_run {
            tracing::warn!("Smart Boiler started in DRY RUN mode! No actions will be taken.");
        } else {
            tracing::info!("Smart Boiler started in ACTIVE mode.");
        }

        let store = Arc::new(ThresholdStore::new(&config.learning, persistence));
        store.restore();

        let adjuster = Arc::new(ThresholdAdjuster::new(
            store,
            services.clone(),
            config.entities.threshold.clone(),
            config.learning.clone(),
            config.dry_run,
        ));
        let detector = Arc::new(ShowerDetector::new(
            accessor.clone(),
            services,
            config.entities.clone(),
            config.detection.clone(),
            config.dry_run,
        ));
        let learner = Arc::new(OverrideLearner::new(
            config.entities.boiler_switch.clone(),
            adjuster.clone(),
        ));
        let aggregator = Arc::new(UrgencyAggregator::new(
            accessor,
            config.entities.clone(),
            config.urgency.clone(),
        ));

        let mut bus = EventBus::new();
        bus.subscribe(EventType::StateChanged, learner);
        bus.subscribe(EventType::StateChanged, detector.clone());

        Ok(Self {
            config: config.clone(),
            bus,
            detector,
            adjuster,
            aggregator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Dispatch one host notification to every reactor.
    pub fn handle(&self, change: &StateChange) -> Vec<Event> {
        self.bus.publish(change)
    }

    pub fn threshold(&self) -> Option<f64> {
        self.adjuster.store().get()
    }

    /// The automatic trigger fired when it should not have: make it less
    /// sensitive by one step.
    pub fn report_false_positive(&self) -> Result<Adjustment, ThresholdError> {
        self.adjuster.adjust(false)
    }

    pub fn urgency(&self) -> UrgencyScore {
        self.aggregator.recompute()
    }

    pub fn aggregator(&self) -> Arc<UrgencyAggregator> {
        Arc::clone(&self.aggregator)
    }

    pub fn detector(&self) -> &ShowerDetector {
        &self.detector
    }
}
