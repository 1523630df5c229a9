//! Option bag boundary
//!
//! Hosts hand over options as a loosely-typed JSON map. The helpers here are
//! used as `deserialize_with` targets on the typed option structs and perform
//! the one-time coercions: unset values become `None`, collection wrappers
//! such as `[{"viewportItem": {...}}]` are flattened, and JSON text is parsed.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Option name to value mapping supplied by the host for one item
pub type OptionBag = Map<String, Value>;

/// Empty string, list or map, or null
pub(crate) fn is_sentinel_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Strip a single `{"<name>Item": inner}` wrapper
fn unwrap_item(value: Value) -> Value {
    match value {
        Value::Object(map) if map.len() == 1 && map.keys().all(|key| key.ends_with("Item")) => {
            map.into_iter()
                .next()
                .map(|(_, inner)| inner)
                .unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn from_value<T: DeserializeOwned, E: serde::de::Error>(value: Value) -> Result<T, E> {
    serde_json::from_value(value).map_err(E::custom)
}

/// Scalar that treats unset sentinels as absent
pub(crate) fn non_empty<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if is_sentinel_empty(&value) {
        return Ok(None);
    }
    from_value(value).map(Some)
}

/// Record stored as a single-item collection
pub(crate) fn single<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = match unwrap_item(Value::deserialize(deserializer)?) {
        Value::Array(items) => match items.into_iter().next() {
            Some(first) => unwrap_item(first),
            None => return Ok(None),
        },
        other => other,
    };
    if is_sentinel_empty(&value) {
        return Ok(None);
    }
    from_value(value).map(Some)
}

/// List of records, each possibly wrapped; a lone value becomes a one-item list
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = unwrap_item(Value::deserialize(deserializer)?);
    if is_sentinel_empty(&value) {
        return Ok(Vec::new());
    }
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .map(|item| from_value(unwrap_item(item)))
        .collect()
}

fn json_text<'de, D, T>(deserializer: D, field: &str) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = match Value::deserialize(deserializer)? {
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            serde_json::from_str(text)
                .map_err(|e| D::Error::custom(format!("{} is not valid JSON: {}", field, e)))?
        }
        other => other,
    };
    if is_sentinel_empty(&value) {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| D::Error::custom(format!("{} has the wrong shape: {}", field, e)))
}

/// `responseFormatSchema`: JSON text or an inline object
pub(crate) fn response_format<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    json_text(deserializer, "responseFormatSchema")
}

/// `setExtraHTTPHeaders`: JSON text or an inline object of strings
pub(crate) fn extra_headers<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    json_text(deserializer, "setExtraHTTPHeaders")
}

/// `waitForTimeout` of zero means disabled
pub(crate) fn is_disabled_wait(value: &Option<u64>) -> bool {
    matches!(value, None | Some(0))
}
