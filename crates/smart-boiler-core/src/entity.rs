//! Boundary with the home-automation host.
//!
//! The core never owns the entities it reads. It sees them through
//! [`EntityAccessor`] and acts on them through fire-and-forget
//! [`ServiceCaller`] commands. [`EntityHost`] is an in-process implementation
//! of both, used by replay and by tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Snapshot of a named external entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Raw state string as reported by the host (`"on"`, `"-1.7"`, `"unavailable"`).
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Static metadata for an entity the core exposes to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityDescriptor {
    pub name: &'static str,
    pub unique_id: &'static str,
    pub icon: &'static str,
    pub unit: Option<&'static str>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

/// Read access to current entity values by key.
pub trait EntityAccessor: Send + Sync {
    /// Current state of `key`, or `None` when the host does not know it.
    fn get_entity(&self, key: &str) -> Option<EntityState>;
}

/// A command addressed to the host, e.g. `input_number.decrement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub domain: String,
    pub action: String,
    pub target_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ServiceCall {
    /// Decrement a counter entity by its configured step.
    pub fn decrement(counter_key: &str) -> Self {
        Self {
            domain: "input_number".into(),
            action: "decrement".into(),
            target_key: counter_key.into(),
            payload: None,
        }
    }

    /// Set a numeric entity to `value`.
    pub fn set_value(number_key: &str, value: f64) -> Self {
        Self {
            domain: "number".into(),
            action: "set_value".into(),
            target_key: number_key.into(),
            payload: Some(serde_json::json!({ "value": value })),
        }
    }
}

/// Fire-and-forget command channel to the host.
///
/// Implementations must not block. Retries, if any, belong to the
/// implementation; the core never retries.
pub trait ServiceCaller: Send + Sync {
    fn call_service(&self, call: ServiceCall);
}

/// In-process entity registry that also executes the services the core uses.
#[derive(Debug, Default)]
pub struct EntityHost {
    entities: Mutex<HashMap<String, EntityState>>,
    calls: Mutex<Vec<ServiceCall>>,
}

impl EntityHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the state of `key`, returning the previous one.
    pub fn set_state(&self, key: &str, state: EntityState) -> Option<EntityState> {
        self.lock_entities().insert(key.to_string(), state)
    }

    pub fn remove(&self, key: &str) -> Option<EntityState> {
        self.lock_entities().remove(key)
    }

    /// Every service call received so far, oldest first.
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_entities(&self) -> std::sync::MutexGuard<'_, HashMap<String, EntityState>> {
        self.entities
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn apply(&self, call: &ServiceCall) {
        let mut entities = self.lock_entities();
        match (call.domain.as_str(), call.action.as_str()) {
            ("input_number", "decrement") => {
                let Some(entity) = entities.get_mut(&call.target_key) else {
                    tracing::warn!(entity = %call.target_key, "decrement on unknown entity");
                    return;
                };
                let Ok(current) = entity.state.trim().parse::<f64>() else {
                    tracing::warn!(entity = %call.target_key, state = %entity.state, "decrement on non-numeric entity");
                    return;
                };
                let step = attribute_f64(entity, "step").unwrap_or(1.0);
                let min = attribute_f64(entity, "min").unwrap_or(0.0);
                entity.state = format_number((current - step).max(min));
            }
            ("number", "set_value") => {
                let value = call
                    .payload
                    .as_ref()
                    .and_then(|p| p.get("value"))
                    .and_then(Value::as_f64);
                let Some(value) = value else {
                    tracing::warn!(entity = %call.target_key, "set_value without numeric payload");
                    return;
                };
                entities
                    .entry(call.target_key.clone())
                    .or_insert_with(|| EntityState::new(""))
                    .state = format_number(value);
            }
            (domain, action) => {
                tracing::debug!(domain, action, "service not handled by in-process host");
            }
        }
    }
}

impl EntityAccessor for EntityHost {
    fn get_entity(&self, key: &str) -> Option<EntityState> {
        self.lock_entities().get(key).cloned()
    }
}

impl ServiceCaller for EntityHost {
    fn call_service(&self, call: ServiceCall) {
        self.apply(&call);
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }
}

fn attribute_f64(entity: &EntityState, name: &str) -> Option<f64> {
    entity.attributes.get(name).and_then(Value::as_f64)
}

fn format_number(value: f64) -> String {
    format!("{value}")
}
