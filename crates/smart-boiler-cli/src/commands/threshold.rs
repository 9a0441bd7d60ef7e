use std::sync::{Arc, Mutex};

use clap::Subcommand;
use smart_boiler_core::threshold::THRESHOLD_DESCRIPTOR;
use smart_boiler_core::{Config, Database, EntityHost, ThresholdAdjuster, ThresholdStore};

#[derive(Subcommand)]
pub enum ThresholdAction {
    /// Show the persisted threshold (default if never set)
    Get,
    /// Overwrite the threshold
    Set {
        /// New value within the configured bounds
        value: f64,
    },
    /// One learning step up (less sensitive)
    Raise,
    /// One learning step down (more sensitive)
    Lower,
    /// Forget the persisted value
    Reset,
}

fn open_store(config: &Config) -> Result<Arc<ThresholdStore>, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let store = Arc::new(ThresholdStore::new(&config.learning, Box::new(Mutex::new(db))));
    store.restore();
    Ok(store)
}

pub fn run(action: ThresholdAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    match action {
        ThresholdAction::Get => {
            let store = open_store(&config)?;
            if let Some(value) = store.get() {
                println!("{value}");
            }
        }
        ThresholdAction::Set { value } => {
            let store = open_store(&config)?;
            let value = store.set(value)?;
            println!("{value}");
        }
        ThresholdAction::Raise | ThresholdAction::Lower => {
            let decrease = matches!(action, ThresholdAction::Lower);
            // Operator commands always write, regardless of dry_run.
            let adjuster = ThresholdAdjuster::new(
                open_store(&config)?,
                Arc::new(EntityHost::new()),
                config.entities.threshold.clone(),
                config.learning.clone(),
                false,
            );
            let adjustment = adjuster.adjust(decrease)?;
            println!("{} -> {}", adjustment.from, adjustment.to);
        }
        ThresholdAction::Reset => {
            // operator override: drops the persisted value, next restore uses the default
            let db = Database::open()?;
            db.kv_delete(THRESHOLD_DESCRIPTOR.unique_id)?;
            println!("{}", config.learning.default_threshold);
        }
    }
    Ok(())
}
