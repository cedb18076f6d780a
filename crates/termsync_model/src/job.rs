//! Bulk change job snapshots.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Status of an asynchronous bulk change job.
///
/// The vocabulary is owned by the server; only the terminal values matter
/// locally, anything unrecognised is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Queued, not started.
    Pending,
    /// In progress.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with a failure.
    Failed,
    /// Cancelled before finishing.
    Cancelled,
    /// Any other status, upper-cased.
    Other(String),
}

impl JobStatus {
    /// Parses a status case-insensitively.
    pub fn parse(status: &str) -> Self {
        let upper = status.trim().to_ascii_uppercase();
        match upper.as_str() {
            "PENDING" => JobStatus::Pending,
            "RUNNING" => JobStatus::Running,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            "CANCELLED" => JobStatus::Cancelled,
            _ => JobStatus::Other(upper),
        }
    }

    /// Returns the upper-case wire form.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Other(s) => s,
        }
    }

    /// Returns true once the job will no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Other("UNKNOWN".into())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(crate::id::text(deserializer)?
            .map(|s| JobStatus::parse(&s))
            .unwrap_or_default())
    }
}

/// A snapshot of a bulk change job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkChangeJob {
    /// Job identifier.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Current status.
    #[serde(default)]
    pub status: JobStatus,
    /// Number of concepts in the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Number of concepts saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<u64>,
    /// Number of concepts that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    /// Server message, usually set on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Fields not modelled here, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BulkChangeJob {
    /// Creates a snapshot with the given id and status.
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: Some(id.into()),
            status,
            total: None,
            success: None,
            failed: None,
            message: None,
            extra: Map::new(),
        }
    }

    /// Sets the counters.
    pub fn with_counts(mut self, total: u64, success: u64, failed: u64) -> Self {
        self.total = Some(total);
        self.success = Some(success);
        self.failed = Some(failed);
        self
    }

    /// Returns true once the job will no longer change.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true if the job finished successfully.
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }
}
