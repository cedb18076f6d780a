//! Validation findings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severities that block submission under the `warnings` policy.
pub const FATAL_SEVERITIES: [&str; 3] = ["ERROR", "CRITICAL", "FAIL"];

/// A single finding from the browser validation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFinding {
    /// Severity tag as sent by the server.
    #[serde(
        default,
        deserialize_with = "crate::id::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<String>,
    /// Human-readable message.
    #[serde(
        default,
        deserialize_with = "crate::id::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,
    /// Concept the finding refers to.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub concept_id: Option<String>,
    /// Fields not modelled here, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidationFinding {
    /// Creates a finding.
    pub fn new(severity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Some(severity.into()),
            message: Some(message.into()),
            concept_id: None,
            extra: Map::new(),
        }
    }

    /// Sets the concept.
    pub fn for_concept(mut self, concept_id: impl Into<String>) -> Self {
        self.concept_id = Some(concept_id.into());
        self
    }

    /// Returns the severity upper-cased, empty if absent.
    pub fn severity_label(&self) -> String {
        self.severity
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase()
    }

    /// Returns true if the severity is one of [`FATAL_SEVERITIES`].
    pub fn is_fatal(&self) -> bool {
        FATAL_SEVERITIES.contains(&self.severity_label().as_str())
    }
}
