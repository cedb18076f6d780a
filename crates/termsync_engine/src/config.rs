//! Configuration for a termsync run.

use crate::error::{Error, Result};
use crate::validate::ValidationPolicy;
use std::time::Duration;
use termsync_model::CountRule;

/// Configuration for a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Snowstorm base URL, e.g. `https://host/snowstorm/snomed-ct`.
    pub base_url: String,
    /// Branch path, e.g. `MAIN/PROJECT/TASK`.
    pub branch: String,
    /// Query and relationship types to maintain.
    pub rule: CountRule,
    /// Identifiers requested per search page.
    pub page_size: u32,
    /// Concepts per bulk-load request.
    pub load_batch_size: usize,
    /// Concepts per validation and bulk-update request.
    pub bulk_batch_size: usize,
    /// Request timeout.
    pub timeout: Duration,
    /// Delay between job status polls.
    pub poll_interval: Duration,
    /// Upper bound on time spent waiting for one job, `None` waits forever.
    pub max_poll_wait: Option<Duration>,
    /// Report changes without validating or submitting.
    pub dry_run: bool,
    /// Validate batches before submitting them.
    pub validate: bool,
    /// Which validation findings stop the run.
    pub validation_policy: ValidationPolicy,
    /// Retry configuration for bulk submission.
    pub retry: RetryConfig,
}

impl PipelineConfig {
    /// Creates a configuration with default sizes and intervals.
    ///
    /// Dry run is on until explicitly disabled.
    pub fn new(base_url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            branch: branch.into(),
            rule: CountRule::default(),
            page_size: 10_000,
            load_batch_size: 1000,
            bulk_batch_size: 500,
            timeout: Duration::from_secs(90),
            poll_interval: Duration::from_millis(1500),
            max_poll_wait: None,
            dry_run: true,
            validate: true,
            validation_policy: ValidationPolicy::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the rule.
    pub fn with_rule(mut self, rule: CountRule) -> Self {
        self.rule = rule;
        self
    }

    /// Sets the search page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the bulk-load batch size.
    pub fn with_load_batch_size(mut self, size: usize) -> Self {
        self.load_batch_size = size;
        self
    }

    /// Sets the validation and bulk-update batch size.
    pub fn with_bulk_batch_size(mut self, size: usize) -> Self {
        self.bulk_batch_size = size;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bounds the time spent waiting for one job.
    pub fn with_max_poll_wait(mut self, wait: Duration) -> Self {
        self.max_poll_wait = Some(wait);
        self
    }

    /// Enables or disables dry run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enables or disables validation.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Sets the validation policy.
    pub fn with_validation_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = policy;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Checks that the configuration can drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base URL is empty".into()));
        }
        if self.branch.trim_matches('/').is_empty() {
            return Err(Error::Config("branch is empty".into()));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page size must be positive".into()));
        }
        if self.load_batch_size == 0 {
            return Err(Error::Config("load batch size must be positive".into()));
        }
        if self.bulk_batch_size == 0 {
            return Err(Error::Config("bulk batch size must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry needs at least one attempt".into()));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new("", "MAIN")
    }
}

/// Retry behaviour for bulk submission.
///
/// Only gateway failures are retried, after a fixed delay.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay before each retry.
    pub delay: Duration,
    /// Statuses treated as transient.
    pub transient_statuses: Vec<u16>,
}

impl RetryConfig {
    /// Creates a configuration with the given number of attempts.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::from_secs(1),
            transient_statuses: vec![502, 503, 504],
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            transient_statuses: Vec::new(),
        }
    }

    /// Sets the retry delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the transient statuses.
    pub fn with_transient_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.transient_statuses = statuses.into();
        self
    }

    /// Returns true if a response with this status should be retried.
    pub fn is_transient(&self, status: u16) -> bool {
        self.transient_statuses.contains(&status)
    }

    /// Returns the delay before the given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            self.delay
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(2)
    }
}
