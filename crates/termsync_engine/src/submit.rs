//! Bulk submission and job tracking.
//!
//! A batch is posted to the bulk endpoint, which answers with a job reference.
//! The job is then polled until the server reports a terminal status:
//!
//! ```text
//! Submitted --fetch--> Polling --sleep, fetch--> Polling ... --> Finished
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::http::{expect_success, HttpClient, HttpResponse, RepositoryClient};
use crate::sleep::Sleeper;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use termsync_model::{BulkChangeJob, Concept};
use tracing::{debug, info, warn};

const SUBMIT_ENDPOINT: &str = "Bulk update";
const POLL_ENDPOINT: &str = "Bulk status";

static BULK_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/bulk/([^/?#]+)/?$").expect("bulk location pattern is valid")
});

/// Submits a batch as a bulk change job and returns the job id.
///
/// Gateway failures listed in `retry` are retried after its delay, up to its
/// attempt limit. Any other failure status is returned immediately.
pub fn submit_batch<C: HttpClient, S: Sleeper + ?Sized>(
    client: &RepositoryClient<C>,
    batch: &[Concept],
    retry: &RetryConfig,
    sleeper: &S,
) -> Result<String> {
    let url = client.browser_url("/concepts/bulk");
    let attempts = retry.max_attempts.max(1);
    let mut attempt = 0;

    let response = loop {
        if attempt > 0 {
            sleeper.sleep(retry.delay_for_attempt(attempt));
        }
        let response = client.post_json(url.clone(), batch)?;
        attempt += 1;

        if retry.is_transient(response.status) && attempt < attempts {
            warn!(
                status = response.status,
                attempt, "bulk update hit a gateway error, retrying"
            );
            continue;
        }
        break response;
    };

    let response = expect_success(SUBMIT_ENDPOINT, response)?;
    extract_job_id(&response).ok_or_else(|| Error::MissingJobId {
        status: response.status,
        content_type: response.content_type.clone(),
        location: response.location.clone(),
        body: response.body_preview(),
    })
}

/// Extracts the bulk change id from a submission response.
///
/// The `Location` header (`.../bulk/{id}`) is preferred; a JSON body with a
/// `bulkChangeId` field is the fallback.
pub fn extract_job_id(response: &HttpResponse) -> Option<String> {
    let from_location = response.location.as_deref().and_then(|location| {
        BULK_LOCATION
            .captures(location.trim())
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_string())
    });
    if from_location.is_some() {
        return from_location;
    }

    let body: serde_json::Value = serde_json::from_slice(&response.body).ok()?;
    match body.get("bulkChangeId")? {
        serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Progress of a job being tracked.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// Accepted by the server, not yet observed.
    Submitted {
        /// Job identifier.
        job_id: String,
    },
    /// Observed in a non-terminal state.
    Polling {
        /// Job identifier being tracked.
        job_id: String,
        /// Latest snapshot.
        job: BulkChangeJob,
        /// Number of status fetches so far.
        polls: u32,
        /// Time spent sleeping between fetches.
        waited: Duration,
    },
    /// Observed in a terminal state.
    Finished(BulkChangeJob),
}

impl PollState {
    /// Returns true once the job has finished.
    pub fn is_finished(&self) -> bool {
        matches!(self, PollState::Finished(_))
    }
}

/// Polls a bulk job until it reaches a terminal status.
pub struct JobPoller<'a, C: HttpClient, S: Sleeper + ?Sized> {
    client: &'a RepositoryClient<C>,
    sleeper: &'a S,
    interval: Duration,
    max_wait: Option<Duration>,
}

impl<'a, C: HttpClient, S: Sleeper + ?Sized> JobPoller<'a, C, S> {
    /// Creates a poller that waits `interval` between fetches.
    pub fn new(client: &'a RepositoryClient<C>, sleeper: &'a S, interval: Duration) -> Self {
        Self {
            client,
            sleeper,
            interval,
            max_wait: None,
        }
    }

    /// Fails with [`Error::PollTimeout`] once waiting would exceed `max_wait`.
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Polls `job_id` until it finishes and returns the final snapshot.
    pub fn wait(&self, job_id: &str) -> Result<BulkChangeJob> {
        let mut state = PollState::Submitted {
            job_id: job_id.to_string(),
        };
        loop {
            match self.step(state)? {
                PollState::Finished(job) => return Ok(job),
                next => state = next,
            }
        }
    }

    /// Advances the state machine by one fetch.
    pub fn step(&self, state: PollState) -> Result<PollState> {
        match state {
            PollState::Submitted { job_id } => self.observe(&job_id, 1, Duration::ZERO),
            PollState::Polling {
                job_id,
                polls,
                waited,
                ..
            } => {
                let waited_next = waited + self.interval;
                if self.max_wait.is_some_and(|max| waited_next > max) {
                    return Err(Error::PollTimeout { job_id, waited });
                }
                self.sleeper.sleep(self.interval);
                self.observe(&job_id, polls + 1, waited_next)
            }
            finished @ PollState::Finished(_) => Ok(finished),
        }
    }

    /// Fetches the current snapshot of a job.
    pub fn fetch(&self, job_id: &str) -> Result<BulkChangeJob> {
        let url = self.client.browser_url(&format!("/concepts/bulk/{job_id}"));
        let response = expect_success(POLL_ENDPOINT, self.client.get(url, Vec::new())?)?;
        let mut job: BulkChangeJob =
            serde_json::from_slice(&response.body).map_err(|e| Error::Decode {
                endpoint: POLL_ENDPOINT.into(),
                source: e.into(),
            })?;
        if job.id.is_none() {
            job.id = Some(job_id.to_string());
        }
        Ok(job)
    }

    fn observe(&self, job_id: &str, polls: u32, waited: Duration) -> Result<PollState> {
        let job = self.fetch(job_id)?;
        info!(
            "Bulk {}: {} {}/{} ok, {} failed",
            job_id,
            job.status,
            count(job.success),
            count(job.total),
            count(job.failed),
        );

        if job.is_terminal() {
            debug!(job_id, polls, ?waited, "bulk job finished");
            Ok(PollState::Finished(job))
        } else {
            Ok(PollState::Polling {
                job_id: job_id.to_string(),
                job,
                polls,
                waited,
            })
        }
    }
}

fn count(value: Option<u64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}
