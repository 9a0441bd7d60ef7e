//! Threshold storage and persistence.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::entity::EntityDescriptor;
use crate::error::ThresholdError;
use crate::storage::{Database, LearningConfig};

/// Metadata of the threshold as exposed to the host.
pub const THRESHOLD_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    name: "Smart Boiler Threshold",
    unique_id: "smart_boiler_learning_threshold",
    icon: "mdi:brain",
    unit: None,
    min: Some(0.0),
    max: Some(100.0),
    step: Some(1.0),
};

/// Durable backing for the threshold value.
pub trait ThresholdPersistence: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<f64>, ThresholdError>;
    fn save(&self, key: &str, value: f64) -> Result<(), ThresholdError>;
}

impl ThresholdPersistence for Mutex<Database> {
    fn load(&self, key: &str) -> Result<Option<f64>, ThresholdError> {
        let db = self
            .lock()
            .map_err(|e| ThresholdError::Persistence(format!("Lock failed: {e}")))?;
        let Some(raw) = db.kv_get(key)? else {
            return Ok(None);
        };
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => {
                tracing::warn!(key, raw = %raw, "ignoring unparsable persisted threshold");
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, value: f64) -> Result<(), ThresholdError> {
        let db = self
            .lock()
            .map_err(|e| ThresholdError::Persistence(format!("Lock failed: {e}")))?;
        db.kv_set(key, &value.to_string())?;
        Ok(())
    }
}

/// Non-durable persistence, for dry replays and tests.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    values: Mutex<HashMap<String, f64>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `value` already persisted under `key`.
    pub fn with_value(key: &str, value: f64) -> Self {
        let persistence = Self::default();
        persistence
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
        persistence
    }
}

impl ThresholdPersistence for MemoryPersistence {
    fn load(&self, key: &str) -> Result<Option<f64>, ThresholdError> {
        let values = self
            .values
            .lock()
            .map_err(|e| ThresholdError::Persistence(format!("Lock failed: {e}")))?;
        Ok(values.get(key).copied())
    }

    fn save(&self, key: &str, value: f64) -> Result<(), ThresholdError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| ThresholdError::Persistence(format!("Lock failed: {e}")))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Holds the current threshold.
///
/// The store starts uninitialized; [`restore`](Self::restore) must run before
/// any adjustment is accepted.
pub struct ThresholdStore {
    key: String,
    min: f64,
    max: f64,
    default_value: f64,
    value: RwLock<Option<f64>>,
    persistence: Box<dyn ThresholdPersistence>,
}

impl ThresholdStore {
    pub fn new(learning: &LearningConfig, persistence: Box<dyn ThresholdPersistence>) -> Self {
        Self {
            key: THRESHOLD_DESCRIPTOR.unique_id.to_string(),
            min: learning.min,
            max: learning.max,
            default_value: learning.default_threshold,
            value: RwLock::new(None),
            persistence,
        }
    }

    /// Stable persistence key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Load the last persisted value, falling back to the configured default.
    /// Out-of-range persisted values are clamped.
    pub fn restore(&self) -> f64 {
        let restored = match self.persistence.load(&self.key) {
            Ok(Some(value)) => {
                let clamped = value.clamp(self.min, self.max);
                if clamped != value {
                    tracing::warn!(stored = value, clamped, "persisted threshold out of range");
                }
                clamped
            }
            Ok(None) => self.default_value,
            Err(e) => {
                tracing::warn!(error = %e, "threshold restore failed, using default");
                self.default_value
            }
        };
        *self.write_guard() = Some(restored);
        tracing::info!(threshold = restored, "threshold restored");
        restored
    }

    /// Current value, `None` before [`restore`](Self::restore).
    pub fn get(&self) -> Option<f64> {
        *self
            .value
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Overwrite the value.
    ///
    /// Operator override only (`threshold set` in the CLI). It bypasses
    /// [`ThresholdAdjuster`](super::ThresholdAdjuster), so it neither steps nor
    /// publishes to the host. Automatic learning must go through the adjuster,
    /// which is the only caller of [`update`](Self::update).
    pub fn set(&self, value: f64) -> Result<f64, ThresholdError> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(ThresholdError::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }
        *self.write_guard() = Some(value);
        self.persist(value);
        Ok(value)
    }

    /// Atomically replace the value with `f(current)`, clamped to the bounds.
    /// Returns `(previous, new)`.
    pub fn update<F>(&self, f: F) -> Result<(f64, f64), ThresholdError>
    where
        F: FnOnce(f64) -> f64,
    {
        let mut guard = self.write_guard();
        let current = (*guard).ok_or_else(|| ThresholdError::NotInitialized {
            key: self.key.clone(),
        })?;
        let next = f(current).clamp(self.min, self.max);
        *guard = Some(next);
        self.persist(next);
        Ok((current, next))
    }

    fn persist(&self, value: f64) {
        if let Err(e) = self.persistence.save(&self.key, value) {
            tracing::warn!(error = %e, threshold = value, "threshold not persisted");
        }
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, Option<f64>> {
        self.value
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(persistence: MemoryPersistence) -> ThresholdStore {
        ThresholdStore::new(&LearningConfig::default(), Box::new(persistence))
    }

    #[test]
    fn restore_defaults_to_fifty() {
        let store = store_with(MemoryPersistence::new());
        assert_eq!(store.get(), None);
        assert_eq!(store.restore(), 50.0);
        assert_eq!(store.get(), Some(50.0));
    }

    #[test]
    fn restore_uses_persisted_value() {
        let store = store_with(MemoryPersistence::with_value(THRESHOLD_DESCRIPTOR.unique_id, 37.0));
        assert_eq!(store.restore(), 37.0);
    }

    #[test]
    fn restore_clamps_out_of_range_value() {
        let store = store_with(MemoryPersistence::with_value(THRESHOLD_DESCRIPTOR.unique_id, 140.0));
        assert_eq!(store.restore(), 100.0);
    }

    #[test]
    fn update_before_restore_is_rejected() {
        let store = store_with(MemoryPersistence::new());
        let result = store.update(|v| v - 5.0);
        assert!(matches!(result, Err(ThresholdError::NotInitialized { .. })));
        assert_eq!(store.get(), None);
    }

    #[test]
    fn set_rejects_out_of_range() {
        let store = store_with(MemoryPersistence::new());
        store.restore();
        assert!(store.set(101.0).is_err());
        assert!(store.set(f64::NAN).is_err());
        assert_eq!(store.set(12.0).unwrap(), 12.0);
    }

    #[test]
    fn sqlite_persistence_roundtrip() {
        let db = Mutex::new(Database::open_memory().unwrap());
        assert_eq!(db.load("k").unwrap(), None);
        db.save("k", 45.0).unwrap();
        assert_eq!(db.load("k").unwrap(), Some(45.0));
    }

    #[test]
    fn sqlite_persistence_ignores_garbage() {
        let db = Database::open_memory().unwrap();
        db.kv_set("k", "not a number").unwrap();
        let db = Mutex::new(db);
        assert_eq!(db.load("k").unwrap(), None);
    }

    #[test]
    fn value_survives_store_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smart-boiler.db");
        let learning = LearningConfig::default();

        let first = ThresholdStore::new(&learning, Box::new(Mutex::new(Database::open_at(&path).unwrap())));
        first.restore();
        first.update(|v| v - 5.0).unwrap();
        drop(first);

        let second = ThresholdStore::new(&learning, Box::new(Mutex::new(Database::open_at(&path).unwrap())));
        assert_eq!(second.restore(), 45.0);
    }
}
