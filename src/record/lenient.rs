//! Field decoders that never fail on a wrong JSON type.

use log::debug;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::types::Mapping;

/// Integer field; anything that is not an integral JSON number decodes as `None`.
pub(crate) fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(integral))
}

/// Unsigned counter field (record numbers, totals, packet counts).
pub(crate) fn counter<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(integral)
        .and_then(|n| u64::try_from(n).ok()))
}

/// Text field; numbers are rendered to their decimal form, other types drop.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Identifier field (interface ids, prefix lengths): an integral number or a
/// string holding one. Anything else, including out of range values, fails
/// the enclosing mapping.
pub(crate) fn identifier<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Value::deserialize(deserializer)?;
    loose_unsigned(&value)
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| D::Error::custom(format!("invalid identifier {}", value)))
}

/// Optional metadata number; accepts numeric strings, anything else is `None`.
pub(crate) fn loose_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(loose_unsigned)
        .and_then(|n| T::try_from(n).ok()))
}

/// Mapping list; a missing or non-array value is an empty list and entries
/// that do not decode as a [`Mapping`] are skipped. Ids given as numeric
/// strings still decode, see [`identifier`].
pub(crate) fn mappings<'de, D>(deserializer: D) -> Result<Vec<Mapping>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(entries)) = value else {
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Mapping>(entry) {
            Ok(mapping) => Some(mapping),
            Err(e) => {
                debug!("Skipping undecodable mapping entry: {}", e);
                None
            }
        })
        .collect())
}

fn loose_unsigned(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        other => integral(other).and_then(|n| u64::try_from(n).ok()),
    }
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}
