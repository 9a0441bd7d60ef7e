//! Parse-and-validate step for external values.
//!
//! Every reactor reads the host through these helpers, so a missing entity,
//! an `unknown`/`unavailable` sentinel, and a non-numeric string are all
//! reported the same way: as a [`SignalError`] the caller treats as a soft miss.

use serde_json::Value;

use crate::entity::{EntityAccessor, EntityState};
use crate::error::SignalError;

pub const STATE_UNKNOWN: &str = "unknown";
pub const STATE_UNAVAILABLE: &str = "unavailable";
pub const STATE_ON: &str = "on";
pub const STATE_OFF: &str = "off";

/// Numeric reading of an external value, or why there is none.
pub type Signal = Result<f64, SignalError>;

/// Parse the state of an entity that may or may not exist.
pub fn parse_state(key: &str, entity: Option<&EntityState>) -> Signal {
    let entity = entity.ok_or_else(|| SignalError::Missing { key: key.to_string() })?;
    parse_raw(key, &entity.state)
}

/// Read and parse `key` from the accessor.
pub fn numeric_state(accessor: &dyn EntityAccessor, key: &str) -> Signal {
    parse_state(key, accessor.get_entity(key).as_ref())
}

/// Read and parse a numeric attribute of `key`. Numbers and numeric strings
/// are both accepted.
pub fn numeric_attribute(accessor: &dyn EntityAccessor, key: &str, attribute: &str) -> Signal {
    let entity = accessor
        .get_entity(key)
        .ok_or_else(|| SignalError::Missing { key: key.to_string() })?;
    let attr_key = format!("{key}.{attribute}");
    match entity.attributes.get(attribute) {
        None | Some(Value::Null) => Err(SignalError::Missing { key: attr_key }),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or(SignalError::Unparsable { key: attr_key, raw: n.to_string() }),
        Some(Value::String(s)) => parse_raw(&attr_key, s),
        Some(other) => Err(SignalError::Unparsable {
            key: attr_key,
            raw: other.to_string(),
        }),
    }
}

/// Whether `key` currently reports `on`. Anything else, including absence,
/// reads as off.
pub fn is_on(accessor: &dyn EntityAccessor, key: &str) -> bool {
    accessor
        .get_entity(key)
        .is_some_and(|entity| entity.state == STATE_ON)
}

fn parse_raw(key: &str, raw: &str) -> Signal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SignalError::Missing { key: key.to_string() });
    }
    if trimmed == STATE_UNKNOWN || trimmed == STATE_UNAVAILABLE {
        return Err(SignalError::Unavailable {
            key: key.to_string(),
            sentinel: trimmed.to_string(),
        });
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SignalError::Unparsable {
            key: key.to_string(),
            raw: raw.to_string(),
        })
}
