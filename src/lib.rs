//! GSM QA
//!
//! Quality assurance for genome-scale metabolic models: run a battery of
//! checks against a model, collect the outcomes into a result store, score
//! them by configurable cards and weights, and report on one model, several
//! models side by side or a model's git history.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use gsm_qa_checks as checks;
pub use gsm_qa_report as report;
pub use gsm_qa_runner as runner;
