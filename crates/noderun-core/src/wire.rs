//! Canonical JSON form of domain values.
//!
//! Enums render as their lowercase wire value, timestamps as ISO-8601
//! strings, nested configs and run collections recursively. Every type that
//! leaves the model layer implements [`WireForm`], and its serde
//! representation is the single place that shape is defined.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

/// A value with a JSON-safe canonical mapping.
pub trait WireForm: Serialize {
    /// Render as a JSON object.
    fn to_wire(&self) -> Result<Map<String, Value>, CoreError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::Serialization(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

/// Rebuild a typed value from its wire mapping.
pub fn from_wire<T: DeserializeOwned>(map: Map<String, Value>) -> Result<T, CoreError> {
    Ok(serde_json::from_value(Value::Object(map))?)
}

/// Read an absent-or-null list as empty.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl WireForm for crate::storage::StorageLocation {}
impl WireForm for crate::storage::StorageObject {}
impl WireForm for crate::storage::StorageRequest {}
