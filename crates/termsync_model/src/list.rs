//! List responses.
//!
//! Bulk-load answers with a bare JSON array or an object wrapping it under
//! `items`; anything else is rejected by [`normalize_items`]. Validation is
//! looser: `results` is accepted too and an empty answer means no findings,
//! which [`normalize_list`] handles.

use crate::error::{ModelError, ModelResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// One page of an identifier search (`returnIdOnly=true`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdPage {
    /// Identifiers on this page.
    #[serde(default, deserialize_with = "crate::id::list")]
    pub items: Vec<String>,
    /// Total number of matches, when the server reports it.
    #[serde(default)]
    pub total: Option<u64>,
}

/// Normalises a list response into its elements.
///
/// `null` and objects without a list field count as empty. When both fields
/// are present, a non-empty `items` wins over `results`.
pub fn normalize_list(value: Value) -> ModelResult<Vec<Value>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            let mut take = |key: &str| match map.remove(key) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let items = take("items");
            if items.is_empty() {
                Ok(take("results"))
            } else {
                Ok(items)
            }
        }
        other => Err(ModelError::NotAList {
            found: json_type(&other),
        }),
    }
}

/// Normalises a response that must carry a list: a bare array or an object
/// with an `items` array.
pub fn normalize_items(value: Value) -> ModelResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ModelError::NotAList {
                found: "object without an `items` array",
            }),
        },
        other => Err(ModelError::NotAList {
            found: json_type(&other),
        }),
    }
}

/// Decodes a body that must be a list of `T`, see [`normalize_items`].
///
/// Each element is decoded on its own so a malformed entry is reported with
/// its position.
pub fn decode_items<T: DeserializeOwned>(body: &[u8]) -> ModelResult<Vec<T>> {
    let value: Value = serde_json::from_slice(body)?;
    decode_each(normalize_items(value)?)
}

/// Decodes a body leniently, see [`normalize_list`]. An empty body is an
/// empty list.
pub fn decode_list<T: DeserializeOwned>(body: &[u8]) -> ModelResult<Vec<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_slice(body)?;
    decode_each(normalize_list(value)?)
}

fn decode_each<T: DeserializeOwned>(items: Vec<Value>) -> ModelResult<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|source| ModelError::Item { index, source })
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
