//! Lenient identifier and label decoding.
//!
//! SNOMED CT identifiers are 64-bit integers that Snowstorm usually sends as
//! strings. Some builds emit them as JSON numbers; both normalise to `String`.
//! Free-text labels such as severities and statuses accept any JSON value and
//! keep its textual form.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl IdRepr {
    fn into_string(self) -> String {
        match self {
            IdRepr::Text(s) => s,
            IdRepr::Unsigned(n) => n.to_string(),
            IdRepr::Signed(n) => n.to_string(),
        }
    }
}

pub(crate) fn required<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    IdRepr::deserialize(deserializer).map(IdRepr::into_string)
}

pub(crate) fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdRepr>::deserialize(deserializer)?.map(IdRepr::into_string))
}

pub(crate) fn list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<IdRepr>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(IdRepr::into_string)
        .collect())
}

pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}
