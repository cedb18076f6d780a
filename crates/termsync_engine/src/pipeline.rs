//! The end-to-end run.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::http::{HttpClient, RepositoryClient};
use crate::load::load_concepts;
use crate::select::select_ids;
use crate::sleep::{Sleeper, ThreadSleeper};
use crate::submit::{submit_batch, JobPoller};
use crate::transform::{apply_count, CountChange};
use crate::validate::{validate_batch, ValidationPolicy};
use std::time::{Duration, Instant};
use termsync_model::{BulkChangeJob, Concept};
use tracing::{debug, info, warn};

/// Number of example ids reported by a dry run.
const DRY_RUN_SAMPLE: usize = 5;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every concept already held the correct count.
    NothingToDo,
    /// Changes were computed but not sent.
    DryRun {
        /// Number of concepts that would be updated.
        would_update: usize,
        /// The first few concept ids that would be updated.
        sample_ids: Vec<String>,
    },
    /// A validation batch tripped the policy; nothing was submitted.
    ValidationAborted {
        /// Index of the batch that failed validation.
        batch: usize,
        /// Number of fatal findings in that batch.
        fatal: usize,
        /// Number of non-fatal findings in that batch.
        non_fatal: usize,
        /// Policy in effect.
        policy: ValidationPolicy,
    },
    /// A bulk job ended in a status other than completed.
    JobFailed {
        /// Index of the batch whose job failed.
        batch: usize,
        /// Final job snapshot.
        job: BulkChangeJob,
    },
    /// Every batch was submitted and completed.
    Completed {
        /// Number of batches submitted.
        batches: usize,
    },
}

impl RunOutcome {
    /// Returns true unless the run was stopped by validation or a failed job.
    pub fn is_success(&self) -> bool {
        !matches!(
            self,
            RunOutcome::ValidationAborted { .. } | RunOutcome::JobFailed { .. }
        )
    }
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Number of ids matched by the query.
    pub selected: usize,
    /// Number of concepts loaded.
    pub loaded: usize,
    /// Changes applied in memory.
    pub changes: Vec<CountChange>,
    /// Jobs that completed, in submission order.
    pub completed_jobs: Vec<BulkChangeJob>,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Select, load, patch, validate and submit.
pub struct Pipeline<C: HttpClient, S: Sleeper = ThreadSleeper> {
    config: PipelineConfig,
    client: RepositoryClient<C>,
    sleeper: S,
}

impl<C: HttpClient> Pipeline<C, ThreadSleeper> {
    /// Creates a pipeline that sleeps on the current thread.
    pub fn new(config: PipelineConfig, http: C) -> Result<Self> {
        Self::with_sleeper(config, http, ThreadSleeper)
    }
}

impl<C: HttpClient, S: Sleeper> Pipeline<C, S> {
    /// Creates a pipeline with a custom sleeper.
    pub fn with_sleeper(config: PipelineConfig, http: C, sleeper: S) -> Result<Self> {
        config.validate()?;
        let client = RepositoryClient::new(config.base_url.clone(), config.branch.clone(), http);
        Ok(Self {
            config,
            client,
            sleeper,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the repository client.
    pub fn client(&self) -> &RepositoryClient<C> {
        &self.client
    }

    /// Returns the sleeper.
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Runs the whole pipeline once.
    pub fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        let config = &self.config;

        let ids = select_ids(&self.client, &config.rule.ecl, config.page_size)?;
        info!("Found {} concept IDs", ids.len());

        let mut concepts = load_concepts(&self.client, &ids, config.load_batch_size)?;
        let loaded = concepts.len();

        let (to_update, changes) = self.transform(&mut concepts);
        info!("{} concept(s) need update", to_update.len());

        let mut report = RunReport {
            selected: ids.len(),
            loaded,
            changes,
            completed_jobs: Vec::new(),
            outcome: RunOutcome::NothingToDo,
            duration: Duration::ZERO,
        };

        report.outcome = if to_update.is_empty() {
            info!("Nothing to do.");
            RunOutcome::NothingToDo
        } else if config.dry_run {
            let sample_ids: Vec<String> = to_update
                .iter()
                .take(DRY_RUN_SAMPLE)
                .map(|c| c.concept_id.clone())
                .collect();
            info!(
                "[DRY RUN] Would update {} concept(s). Example IDs: {:?}",
                to_update.len(),
                sample_ids
            );
            RunOutcome::DryRun {
                would_update: to_update.len(),
                sample_ids,
            }
        } else {
            match self.validate_all(&to_update)? {
                Some(aborted) => aborted,
                None => self.submit_all(&to_update, &mut report.completed_jobs)?,
            }
        };

        report.duration = start.elapsed();
        Ok(report)
    }

    /// Applies the count to every concept, keeping the modified ones.
    fn transform(&self, concepts: &mut [Concept]) -> (Vec<Concept>, Vec<CountChange>) {
        let mut to_update = Vec::new();
        let mut changes = Vec::new();
        for concept in concepts.iter_mut() {
            if let Some(change) = apply_count(concept, &self.config.rule) {
                debug!(
                    concept_id = %change.concept_id,
                    count = change.count,
                    created = change.created,
                    "count updated"
                );
                to_update.push(concept.clone());
                changes.push(change);
            }
        }
        (to_update, changes)
    }

    /// Validates every batch; returns the abort outcome if one trips the policy.
    fn validate_all(&self, to_update: &[Concept]) -> Result<Option<RunOutcome>> {
        let config = &self.config;
        if !config.validate {
            return Ok(None);
        }

        info!(
            "Validating {} concept(s) in batches of {} (policy IGNORE_VALIDATION_LEVEL={})",
            to_update.len(),
            config.bulk_batch_size,
            config.validation_policy
        );
        for (batch, concepts) in to_update.chunks(config.bulk_batch_size).enumerate() {
            let report = validate_batch(&self.client, concepts)?;
            report.log_samples();

            if report.should_abort(config.validation_policy) {
                warn!(
                    "Aborting due to validation policy. (fatals={}, nonfatals={}, policy={})",
                    report.fatal.len(),
                    report.non_fatal.len(),
                    config.validation_policy
                );
                return Ok(Some(RunOutcome::ValidationAborted {
                    batch,
                    fatal: report.fatal.len(),
                    non_fatal: report.non_fatal.len(),
                    policy: config.validation_policy,
                }));
            }
        }
        Ok(None)
    }

    /// Submits batches in order, waiting for each job before the next.
    fn submit_all(
        &self,
        to_update: &[Concept],
        completed: &mut Vec<BulkChangeJob>,
    ) -> Result<RunOutcome> {
        let config = &self.config;
        let poller = JobPoller::new(&self.client, &self.sleeper, config.poll_interval)
            .with_max_wait(config.max_poll_wait);

        let mut batches = 0;
        for (batch, concepts) in to_update.chunks(config.bulk_batch_size).enumerate() {
            info!("Submitting bulk update for {} concept(s)...", concepts.len());
            let job_id = submit_batch(&self.client, concepts, &config.retry, &self.sleeper)?;
            let job = poller.wait(&job_id)?;
            batches += 1;

            if !job.is_completed() {
                warn!("Bulk update did not complete successfully. Details: {:?}", job);
                return Ok(RunOutcome::JobFailed { batch, job });
            }
            completed.push(job);
        }

        info!("All bulk updates completed successfully.");
        Ok(RunOutcome::Completed { batches })
    }
}
