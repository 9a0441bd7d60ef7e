mod config;
pub mod database;

pub use config::{
    Config, DetectionConfig, EntitiesConfig, LearningConfig, UrgencyConfig, MAX_COOLDOWN_MINUTES,
};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/smart-boiler[-dev]/` based on SMART_BOILER_ENV.
///
/// Set SMART_BOILER_ENV=dev to use the development data directory, or
/// SMART_BOILER_HOME to point at an explicit directory.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("SMART_BOILER_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("SMART_BOILER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("smart-boiler-dev")
            } else {
                base_dir.join("smart-boiler")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
