//! # termsync model
//!
//! Wire types for the Snowstorm browser API as used by termsync.
//!
//! This crate provides:
//! - `Concept`, `Axiom` and `Relationship` with unknown fields preserved
//! - `ConcreteValue` whose plain and `#`-prefixed encodings never disagree
//! - `ValidationFinding` and severity classification
//! - `BulkChangeJob` and `JobStatus`
//! - `IdPage` and list normalisation for bare-or-wrapped responses
//! - `CountRule`, the fixed terminology constants
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod concept;
mod error;
mod id;
mod job;
mod list;
mod rule;
mod validation;

pub use concept::{Axiom, Concept, ConcreteValue, Relationship, RelationshipTarget};
pub use error::{ModelError, ModelResult};
pub use job::{BulkChangeJob, JobStatus};
pub use list::{decode_items, decode_list, normalize_items, normalize_list, IdPage};
pub use rule::{
    CountRule, DEFAULT_DEFINITION_STATUS_ID, DEFAULT_MODULE_ID, EXISTENTIAL_MODIFIER,
    INTEGER_DATA_TYPE, STATED_RELATIONSHIP,
};
pub use validation::{ValidationFinding, FATAL_SEVERITIES};
