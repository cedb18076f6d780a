//! termsync CLI
//!
//! Recomputes the "count of clinical drug type" relationship of every clinical
//! drug concept on a Snowstorm branch and submits the corrections in bulk.
//!
//! Settings come from flags or the environment. Dry run is on unless
//! `DRY_RUN=false` is given.
//!
//! # Exit status
//!
//! - `0` when the run completed, found nothing to do, or was a dry run
//! - `1` when validation aborted the run, a bulk job failed, or an error occurred

mod client;

use clap::{ArgAction, Parser};
use client::ReqwestClient;
use std::process::ExitCode;
use std::time::Duration;
use termsync_engine::{Error, Pipeline, PipelineConfig, RunOutcome, RunReport, ValidationPolicy};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Recompute clinical drug counts on a Snowstorm branch.
#[derive(Parser, Debug)]
#[command(name = "termsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Snowstorm base URL
    #[arg(long, env = "SNOWSTORM_BASE")]
    base: String,

    /// Branch to update, e.g. MAIN/PROJECT/TASK
    #[arg(long, env = "SNOWSTORM_BRANCH")]
    branch: String,

    /// Name of the session cookie
    #[arg(long, env = "SNOWSTORM_COOKIE_NAME", default_value = "JSESSIONID")]
    cookie_name: String,

    /// Value of the session cookie
    #[arg(long, env = "SNOWSTORM_COOKIE_VALUE", hide_env_values = true)]
    cookie_value: String,

    /// Concepts per bulk-load request
    #[arg(long, env = "BATCH_SIZE_LOAD", default_value_t = 1000)]
    load_batch_size: usize,

    /// Concepts per validation and bulk-update request
    #[arg(long, env = "BATCH_SIZE_BULK", default_value_t = 500)]
    bulk_batch_size: usize,

    /// Identifiers per search page
    #[arg(long, default_value_t = 10_000)]
    page_size: u32,

    /// Request timeout in seconds
    #[arg(long, env = "TIMEOUT", default_value = "90", value_parser = parse_seconds)]
    timeout: Duration,

    /// Seconds between job status polls
    #[arg(long, env = "POLL_INTERVAL_S", default_value = "1.5", value_parser = parse_seconds)]
    poll_interval: Duration,

    /// Give up waiting for a bulk job after this many seconds
    #[arg(long, value_parser = parse_seconds)]
    max_poll_wait: Option<Duration>,

    /// Report changes without submitting; anything but "false" keeps it on
    #[arg(
        long,
        env = "DRY_RUN",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = parse_switch
    )]
    dry_run: bool,

    /// Validate before submitting; anything but "false" keeps it on
    #[arg(
        long,
        env = "VALIDATE",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = parse_switch
    )]
    validate: bool,

    /// Validation findings to ignore: none, warnings or all
    #[arg(long, env = "IGNORE_VALIDATION_LEVEL", default_value = "warnings")]
    ignore_validation_level: ValidationPolicy,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.base.trim(), self.branch.trim())
            .with_page_size(self.page_size)
            .with_load_batch_size(self.load_batch_size)
            .with_bulk_batch_size(self.bulk_batch_size)
            .with_timeout(self.timeout)
            .with_poll_interval(self.poll_interval)
            .with_dry_run(self.dry_run)
            .with_validation(self.validate)
            .with_validation_policy(self.ignore_validation_level);
        if let Some(wait) = self.max_poll_wait {
            config = config.with_max_poll_wait(wait);
        }
        config
    }
}

/// Only a literal "false" switches a setting off.
fn parse_switch(value: &str) -> Result<bool, String> {
    Ok(!value.trim().eq_ignore_ascii_case("false"))
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid number of seconds {value:?}: {e}"))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid duration {value:?}: {e}"))
}

/// Advice logged when a run fails on a transient condition.
fn rerun_hint(err: &Error) -> Option<&'static str> {
    err.is_retryable().then_some(
        "The failure looks transient. Rerunning is safe: concepts already updated are skipped.",
    )
}

fn summarize(report: &RunReport) {
    info!(
        "Selected {}, loaded {}, changed {} in {:.1}s",
        report.selected,
        report.loaded,
        report.changes.len(),
        report.duration.as_secs_f64()
    );
    match &report.outcome {
        RunOutcome::ValidationAborted {
            batch,
            fatal,
            non_fatal,
            policy,
        } => error!(
            "Validation stopped the run at batch {} ({} fatal, {} non-fatal, policy {})",
            batch + 1,
            fatal,
            non_fatal,
            policy
        ),
        RunOutcome::JobFailed { batch, job } => error!(
            "Bulk job {} for batch {} ended with status {}",
            job.id.as_deref().unwrap_or("?"),
            batch + 1,
            job.status
        ),
        _ => {}
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.config();
    let http = ReqwestClient::new(&cli.cookie_name, &cli.cookie_value, config.timeout)?;
    let pipeline = Pipeline::new(config, http)?;

    info!(
        "Branch {} on {} (dry run: {})",
        pipeline.client().branch(),
        pipeline.client().base_url(),
        pipeline.config().dry_run
    );
    let report = pipeline.run().inspect_err(|err| {
        if let Some(hint) = rerun_hint(err) {
            warn!("{}", hint);
        }
    })?;
    summarize(&report);

    Ok(if report.outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 7] = [
        "termsync",
        "--base",
        "https://snowstorm.test/",
        "--branch",
        "MAIN/TASK",
        "--cookie-value",
        "abc",
    ];

    fn parse(extra: &[&str]) -> Cli {
        Cli::try_parse_from(REQUIRED.iter().chain(extra)).unwrap()
    }

    #[test]
    fn defaults_are_safe() {
        let config = parse(&[]).config();
        assert!(config.dry_run);
        assert!(config.validate);
        assert_eq!(config.validation_policy, ValidationPolicy::IgnoreWarnings);
        assert_eq!(config.load_batch_size, 1000);
        assert_eq!(config.bulk_batch_size, 500);
        assert_eq!(config.page_size, 10_000);
        assert_eq!(config.timeout, Duration::from_secs(90));
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.max_poll_wait, None);
    }

    #[test]
    fn only_false_disables_switches() {
        assert!(!parse_switch("false").unwrap());
        assert!(!parse_switch(" FALSE ").unwrap());
        assert!(parse_switch("no").unwrap());
        assert!(parse_switch("0").unwrap());
        assert!(parse_switch("").unwrap());

        let cli = parse(&["--dry-run", "false", "--validate", "False"]);
        assert!(!cli.dry_run);
        assert!(!cli.validate);

        let cli = parse(&["--dry-run", "yes", "--validate", "0"]);
        assert!(cli.dry_run);
        assert!(cli.validate);
    }

    #[test]
    fn rerun_hint_only_for_transient_failures() {
        let gateway = Error::Http {
            endpoint: "Bulk update".into(),
            status: 504,
            body: String::new(),
        };
        assert!(rerun_hint(&gateway).is_some());
        assert!(rerun_hint(&Error::transport_retryable("connection reset")).is_some());

        let rejected = Error::Http {
            endpoint: "Bulk update".into(),
            status: 400,
            body: String::new(),
        };
        assert!(rerun_hint(&rejected).is_none());
        assert!(rerun_hint(&Error::Config("x".into())).is_none());
    }

    #[test]
    fn seconds_accept_fractions() {
        assert_eq!(parse_seconds("2.5").unwrap(), Duration::from_millis(2500));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());

        let config = parse(&["--poll-interval", "0.5", "--max-poll-wait", "600"]).config();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.max_poll_wait, Some(Duration::from_secs(600)));
    }

    #[test]
    fn validation_level_is_parsed() {
        let cli = parse(&["--ignore-validation-level", "none"]);
        assert_eq!(cli.ignore_validation_level, ValidationPolicy::StopOnAny);
        assert!(Cli::try_parse_from(REQUIRED.iter().chain(&["--ignore-validation-level", "some"])).is_err());
    }

    #[test]
    fn cookie_value_is_required() {
        assert!(Cli::try_parse_from(["termsync", "--base", "x", "--branch", "MAIN"]).is_err());
    }
}
