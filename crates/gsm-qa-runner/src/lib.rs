//! GSM QA Runner
//!
//! Runs a check registry against a model and collects the outcomes into a
//! result store. Also stores results on disk, one file per run or per git
//! commit, and loads them back across the commit history.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
// Allow common patterns
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::redundant_clone))]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod collect;
pub mod error;
pub mod executor;
pub mod git;
pub mod history;
pub mod jsonify;
pub mod manager;
pub mod result;
pub mod selection;

pub use collect::{ResultCollector, TestReport, location, split_location};
pub use error::{Error, Result};
pub use executor::{ExecutionConfig, ExecutionSummary, Executor};
pub use git::{CommandOutput, CommitInfo, GitRunner, MockGitRunner, RealGitRunner};
pub use history::{BranchStructure, DEFAULT_DEPLOYMENT, HistoryManager};
pub use jsonify::{non_finite_paths, to_json};
pub use manager::{RepoResultManager, ResultBackend, ResultManager};
pub use result::{
    Meta, Outcome, Parametrized, ScoreSummary, SectionScore, SuiteResult, TestCaseResult,
    TestScore,
};
pub use selection::{Selection, SkipReason};
