//! GSM QA Report Generator
//!
//! Groups tests into cards, computes weighted scores and builds snapshot,
//! diff and history reports. Reports serialize to JSON and can be wrapped in
//! a static HTML page or exported as JUnit XML.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
// Allow common patterns
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::needless_raw_string_hashes)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::suboptimal_flops)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::redundant_closure_for_method_calls))]
#![cfg_attr(test, allow(clippy::redundant_clone))]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod config;
pub mod diff;
pub mod error;
pub mod history;
pub mod html;
pub mod junit;
pub mod organizer;
pub mod score;
pub mod snapshot;

pub use config::{
    Card, Cards, MISC_CARD, MISC_TITLE, ReportConfiguration, ScoredCard, ScoringConfig, Section,
    UnscoredPolicy,
};
pub use diff::{DiffEntry, DiffReport, DiffTest};
pub use error::{Error, Result};
pub use history::{HistoryEntry, HistoryReport, HistoryTest, format_data};
pub use html::{HtmlReport, ReportKind};
pub use junit::JunitReport;
pub use organizer::{assign_misc, card_index, configured_tests, misc_tests};
pub use score::{ScoreCalculator, Scoring, SectionTotals, WeightedScore, compute_score, weighted};
pub use snapshot::SnapshotReport;
