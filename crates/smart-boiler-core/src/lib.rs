//! # Smart Boiler Core Library
//!
//! This library provides the decision logic of the Smart Boiler automation:
//! it watches state changes coming from a home-automation host, infers
//! showers and manual boiler overrides, and tunes its own sensitivity
//! threshold over time.
//!
//! ## Architecture
//!
//! - **Reactors**: [`ShowerDetector`] and [`OverrideLearner`] subscribe to
//!   `state_changed` notifications on an [`EventBus`]
//! - **Learning**: [`ThresholdAdjuster`] is the only writer of the
//!   [`ThresholdStore`], which survives restarts through SQLite
//! - **Scoring**: [`UrgencyAggregator`] is polled and combines occupancy,
//!   shower history and weather into a bounded score
//! - **Host boundary**: [`EntityAccessor`] and [`ServiceCaller`] are the only
//!   ways the core reads from or acts on the outside world
//!
//! [`SmartBoiler`] wires all of the above from a [`Config`].

pub mod bus;
pub mod detector;
pub mod engine;
pub mod entity;
pub mod error;
pub mod events;
pub mod learner;
pub mod runtime;
pub mod signal;
pub mod storage;
pub mod threshold;
pub mod urgency;

pub use bus::{EventBus, EventType, Reactor, SubscriptionId};
pub use detector::{DetectionMethod, ShowerDetector, ShowerEvent};
pub use engine::SmartBoiler;
pub use entity::{EntityAccessor, EntityDescriptor, EntityHost, EntityState, ServiceCall, ServiceCaller};
pub use error::{ConfigError, CoreError, DatabaseError, SignalError, ThresholdError};
pub use events::{Event, StateChange};
pub use learner::{OverrideEvent, OverrideLearner, SwitchState};
pub use storage::{Config, Database};
pub use threshold::{Adjustment, MemoryPersistence, ThresholdAdjuster, ThresholdPersistence, ThresholdStore};
pub use urgency::{UrgencyAggregator, UrgencyInputs, UrgencyScore, UrgencyTerm};
