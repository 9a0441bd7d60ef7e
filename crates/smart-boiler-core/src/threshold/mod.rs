//! Learning threshold: a bounded sensitivity value that survives restarts.
//!
//! [`ThresholdStore`] owns the value, [`ThresholdAdjuster`] is its only
//! writer on the learning path.

pub mod adjuster;
pub mod store;

pub use adjuster::{next_value, Adjustment, ThresholdAdjuster};
pub use store::{MemoryPersistence, ThresholdPersistence, ThresholdStore, THRESHOLD_DESCRIPTOR};
