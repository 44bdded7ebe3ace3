//! GSM QA Checks
//!
//! Model representation and the check plugin contract for genome-scale
//! metabolic model quality assurance.
//!
//! A check is a pure function of a [`Model`] that reports a `(data, metric)`
//! pair, where the metric is the fraction of non-conforming entities. Checks
//! are registered explicitly in a [`CheckRegistry`] together with a
//! [`CheckDescriptor`] carrying their title, presentation hint and default
//! weight.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unnecessary_wraps)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod builtin;
pub mod check;
pub mod error;
pub mod model;

/// Version of the checks crate, recorded in result provenance
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use builtin::{builtin_registry, register_builtin};
pub use check::{
    Check, CheckDescriptor, CheckError, CheckOutcome, CheckRegistry, CheckResult, FnCheck,
    FormatType,
};
pub use error::{Error, Result};
pub use model::{Gene, Metabolite, Model, Notifications, Reaction, check_structure, validate_model};
