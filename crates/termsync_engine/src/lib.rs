//! # termsync engine
//!
//! Keeps the stored "count of contained items" relationship of clinical drug
//! concepts in step with their stated "contains" relationships.
//!
//! This crate provides:
//! - Paginated id selection by ECL
//! - Chunked bulk loading of concepts
//! - The count transformation on loaded concepts
//! - Server-side validation with a configurable abort policy
//! - Bulk submission with a single retry on gateway errors
//! - Job polling as an explicit state machine
//! - An HTTP client abstraction with a scripted mock
//!
//! ## Architecture
//!
//! A run is strictly sequential:
//! 1. Select matching concept ids
//! 2. Load full concepts
//! 3. Patch the count relationship in memory
//! 4. Validate every batch of changed concepts
//! 5. Submit each batch and wait for its job to finish
//!
//! ## Key Invariants
//!
//! - Transformation is idempotent
//! - A dry run never validates or submits
//! - Nothing is submitted once validation aborts
//! - A failed job stops the remaining batches

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod load;
mod mock;
mod pipeline;
mod select;
mod sleep;
mod submit;
mod transform;
mod validate;

pub use config::{PipelineConfig, RetryConfig};
pub use error::{body_preview, Error, Result, BODY_PREVIEW_CHARS};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, RepositoryClient};
pub use load::load_concepts;
pub use mock::MockClient;
pub use pipeline::{Pipeline, RunOutcome, RunReport};
pub use select::select_ids;
pub use sleep::{RecordingSleeper, Sleeper, ThreadSleeper};
pub use submit::{extract_job_id, submit_batch, JobPoller, PollState};
pub use transform::{apply_count, count_contained, ensure_count, CountChange};
pub use validate::{validate_batch, ValidationPolicy, ValidationReport};
