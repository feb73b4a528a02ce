//! JSON document helpers over a `KeyValueStore`.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::store::KeyValueStore;

/// Reads and decodes the JSON document stored under `key`.
///
/// Returns `Ok(None)` when the key is absent.
///
/// # Errors
///
/// Returns an error if the store cannot be read or the value is not valid JSON for `T`.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to decode stored JSON for key {key}"))?;
    Ok(Some(value))
}

/// Encodes `value` as JSON and stores it under `key`, replacing the old document.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)
        .with_context(|| format!("failed to encode JSON for key {key}"))?;
    store.set(key, &raw)
}
