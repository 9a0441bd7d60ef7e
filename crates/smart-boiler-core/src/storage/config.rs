//! TOML-based application configuration.
//!
//! Stores:
//! - Dry-run toggle
//! - Keys of the host entities the reactors read and command
//! - Shower detection rates and cooldown
//! - Learning step sizes and threshold bounds
//! - Urgency score weights
//!
//! Configuration is stored at `~/.config/smart-boiler/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Longest accepted shower cooldown.
pub const MAX_COOLDOWN_MINUTES: u64 = 24 * 60;

const THRESHOLD_FLOOR: f64 = 0.0;
const THRESHOLD_CEILING: f64 = 100.0;

/// Keys of the host entities the core works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitiesConfig {
    #[serde(default = "default_boiler_switch")]
    pub boiler_switch: String,
    #[serde(default = "default_temp_rate")]
    pub temp_rate: String,
    #[serde(default = "default_people_counter")]
    pub people_counter: String,
    #[serde(default = "default_threshold_entity")]
    pub threshold: String,
    #[serde(default = "default_shower_history")]
    pub shower_history: String,
    #[serde(default = "default_weather")]
    pub weather: String,
}

/// Shower detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,
    /// Rate below which a drop counts as a shower regardless of heating.
    #[serde(default = "default_strong_drop_rate")]
    pub strong_drop_rate: f64,
    /// Rate below which a drop counts only while the boiler is heating.
    #[serde(default = "default_heating_drop_rate")]
    pub heating_drop_rate: f64,
}

/// Threshold learning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "default_decrease_step")]
    pub decrease_step: f64,
    #[serde(default = "default_increase_step")]
    pub increase_step: f64,
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
}

/// Urgency score configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyConfig {
    #[serde(default = "default_history_weight")]
    pub history_weight: f64,
    #[serde(default = "default_people_weight")]
    pub people_weight: f64,
    #[serde(default = "default_temperature_weight")]
    pub temperature_weight: f64,
    /// Outside temperature at which weather adds no urgency.
    #[serde(default = "default_comfort_temperature")]
    pub comfort_temperature: f64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/smart-boiler/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Compute and log every decision without decrementing the counter or
    /// writing the threshold.
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default)]
    pub entities: EntitiesConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub urgency: UrgencyConfig,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_boiler_switch() -> String {
    "switch.boiler".into()
}
fn default_temp_rate() -> String {
    "sensor.water_temp_change_rate".into()
}
fn default_people_counter() -> String {
    "input_number.number_of_shower_people".into()
}
fn default_threshold_entity() -> String {
    "number.smart_boiler_threshold".into()
}
fn default_shower_history() -> String {
    "sensor.showers_last_7_days_evening".into()
}
fn default_weather() -> String {
    "weather.home".into()
}
fn default_cooldown_minutes() -> u64 {
    15
}
fn default_strong_drop_rate() -> f64 {
    -1.5
}
fn default_heating_drop_rate() -> f64 {
    -0.3
}
fn default_decrease_step() -> f64 {
    5.0
}
fn default_increase_step() -> f64 {
    2.0
}
fn default_threshold() -> f64 {
    50.0
}
fn default_min() -> f64 {
    0.0
}
fn default_max() -> f64 {
    100.0
}
fn default_history_weight() -> f64 {
    5.0
}
fn default_people_weight() -> f64 {
    15.0
}
fn default_temperature_weight() -> f64 {
    2.0
}
fn default_comfort_temperature() -> f64 {
    20.0
}
fn default_poll_interval_secs() -> u64 {
    30
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        Self {
            boiler_switch: default_boiler_switch(),
            temp_rate: default_temp_rate(),
            people_counter: default_people_counter(),
            threshold: default_threshold_entity(),
            shower_history: default_shower_history(),
            weather: default_weather(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: default_cooldown_minutes(),
            strong_drop_rate: default_strong_drop_rate(),
            heating_drop_rate: default_heating_drop_rate(),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            decrease_step: default_decrease_step(),
            increase_step: default_increase_step(),
            default_threshold: default_threshold(),
            min: default_min(),
            max: default_max(),
        }
    }
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            history_weight: default_history_weight(),
            people_weight: default_people_weight(),
            temperature_weight: default_temperature_weight(),
            comfort_temperature: default_comfort_temperature(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: true,
            entities: EntitiesConfig::default(),
            detection: DetectionConfig::default(),
            learning: LearningConfig::default(),
            urgency: UrgencyConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or is
    /// invalid, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };

        if self.detection.cooldown_minutes == 0 {
            return Err(invalid("detection.cooldown_minutes", "must be positive"));
        }
        if self.detection.cooldown_minutes > MAX_COOLDOWN_MINUTES {
            return Err(invalid("detection.cooldown_minutes", "must not exceed one day"));
        }
        if !self.detection.strong_drop_rate.is_finite() || !self.detection.heating_drop_rate.is_finite() {
            return Err(invalid("detection", "drop rates must be finite"));
        }
        if self.detection.strong_drop_rate > self.detection.heating_drop_rate {
            return Err(invalid(
                "detection.strong_drop_rate",
                "must not be above detection.heating_drop_rate",
            ));
        }
        let learning = &self.learning;
        if ![learning.min, learning.max, learning.default_threshold, learning.decrease_step, learning.increase_step]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(invalid("learning", "values must be finite"));
        }
        if learning.min < THRESHOLD_FLOOR || learning.max > THRESHOLD_CEILING {
            return Err(invalid("learning", "bounds must lie within [0, 100]"));
        }
        if self.learning.min > self.learning.max {
            return Err(invalid("learning.min", "must not exceed learning.max"));
        }
        if !(self.learning.min..=self.learning.max).contains(&self.learning.default_threshold) {
            return Err(invalid(
                "learning.default_threshold",
                "must lie within [learning.min, learning.max]",
            ));
        }
        if self.learning.decrease_step < 0.0 || self.learning.increase_step < 0.0 {
            return Err(invalid("learning", "step sizes must not be negative"));
        }
        if self.urgency.poll_interval_secs == 0 {
            return Err(invalid("urgency.poll_interval_secs", "must be positive"));
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key and save. The change is rejected if the key
    /// is unknown or the resulting config does not validate.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
