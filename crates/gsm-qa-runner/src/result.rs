//! Result store
//!
//! One [`SuiteResult`] is created per run (or loaded from JSON for history
//! and diff reports). It holds provenance in `meta` and one
//! [`TestCaseResult`] per check identifier in `tests`. The scoring
//! configuration and derived scores live next to them in `cards`, `weights`
//! and `score`.

use std::collections::BTreeMap;

use chrono::Utc;
use gsm_qa_checks::{CheckDescriptor, FormatType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::git::GitRunner;

/// Outcome of a single test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The check's assertion held
    Passed,
    /// The check's assertion did not hold
    Failed,
    /// The check could not be evaluated
    Error,
    /// The check was not run
    Skipped,
}

impl Outcome {
    /// Check if this is a passing outcome
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if this is a failing outcome
    #[must_use]
    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }

    /// Name as written to JSON
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that is either single or keyed by parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parametrized<T> {
    /// Scalar test
    Single(T),
    /// Parametrized test, keyed by parameter
    Params(BTreeMap<String, T>),
}

impl<T> Parametrized<T> {
    /// An empty parameter mapping
    #[must_use]
    pub fn empty() -> Self {
        Self::Params(BTreeMap::new())
    }

    /// Whether this value is keyed by parameter
    #[must_use]
    pub const fn is_parametrized(&self) -> bool {
        matches!(self, Self::Params(_))
    }

    /// The scalar value, if any
    #[must_use]
    pub const fn as_single(&self) -> Option<&T> {
        match self {
            Self::Single(value) => Some(value),
            Self::Params(_) => None,
        }
    }

    /// The scalar value for `None`, or the value of one parameter
    #[must_use]
    pub fn get(&self, param: Option<&str>) -> Option<&T> {
        match (self, param) {
            (Self::Single(value), None) => Some(value),
            (Self::Params(map), Some(p)) => map.get(p),
            _ => None,
        }
    }

    /// Iterate over all values regardless of shape
    pub fn values(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        match self {
            Self::Single(value) => Box::new(std::iter::once(value)),
            Self::Params(map) => Box::new(map.values()),
        }
    }

    /// Set the value, or the value of one parameter.
    ///
    /// Setting a parameter on a scalar converts it to a mapping.
    pub fn set(&mut self, param: Option<&str>, value: T) {
        let Some(p) = param else {
            *self = Self::Single(value);
            return;
        };
        match self {
            Self::Params(map) => {
                map.insert(p.to_string(), value);
            }
            Self::Single(_) => *self = Self::Params(BTreeMap::from([(p.to_string(), value)])),
        }
    }
}

/// Set an optional parametrized value in place
fn set_optional<T>(slot: &mut Option<Parametrized<T>>, param: Option<&str>, value: T) {
    slot.get_or_insert_with(Parametrized::empty).set(param, value);
}

/// Derived score of one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestScore {
    /// `1 - metric` for a scalar test
    Scalar(f64),
    /// Aggregated score plus per-parameter scores
    Parametrized {
        /// `1 - mean(metric)`
        total: f64,
        /// `1 - metric` per parameter
        params: BTreeMap<String, f64>,
    },
}

impl TestScore {
    /// The aggregated value used for cards
    #[must_use]
    pub const fn total(&self) -> f64 {
        match self {
            Self::Scalar(score) | Self::Parametrized { total: score, .. } => *score,
        }
    }
}

/// Result of one test case, possibly parametrized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    /// Human-readable title
    #[serde(default)]
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub summary: String,
    /// Presentation hint
    #[serde(default)]
    pub format_type: FormatType,
    /// Outcome
    pub result: Parametrized<Outcome>,
    /// Duration in seconds
    pub duration: Parametrized<f64>,
    /// Fraction of non-conforming entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Parametrized<f64>>,
    /// Explanation reported by the check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Parametrized<String>>,
    /// Raw data; keyed by parameter for parametrized tests
    #[serde(default)]
    pub data: Value,
    /// Derived score, set by scoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<TestScore>,
}

impl TestCaseResult {
    /// A scalar result that has not run yet
    #[must_use]
    pub fn scalar() -> Self {
        Self {
            title: String::new(),
            summary: String::new(),
            format_type: FormatType::default(),
            result: Parametrized::Single(Outcome::Skipped),
            duration: Parametrized::Single(0.0),
            metric: None,
            message: None,
            data: Value::Null,
            score: None,
        }
    }

    /// A parametrized result with no cases yet
    #[must_use]
    pub fn parametrized() -> Self {
        Self {
            result: Parametrized::empty(),
            duration: Parametrized::empty(),
            data: Value::Object(Map::new()),
            ..Self::scalar()
        }
    }

    /// Copy title, summary and format from a check descriptor
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: &CheckDescriptor) -> Self {
        self.title.clone_from(&descriptor.title);
        self.summary.clone_from(&descriptor.summary);
        self.format_type = descriptor.format_type;
        self
    }

    /// Whether this result is keyed by parameter
    #[must_use]
    pub const fn is_parametrized(&self) -> bool {
        self.result.is_parametrized()
    }

    /// Record outcome and duration of one run
    pub fn record_outcome(&mut self, param: Option<&str>, outcome: Outcome, duration: f64) {
        self.result.set(param, outcome);
        self.duration.set(param, duration);
    }

    /// Record the metric reported by the check
    pub fn record_metric(&mut self, param: Option<&str>, metric: f64) {
        set_optional(&mut self.metric, param, metric);
    }

    /// Record the message reported by the check
    pub fn record_message(&mut self, param: Option<&str>, message: impl Into<String>) {
        set_optional(&mut self.message, param, message.into());
    }

    /// Record the data reported by the check
    pub fn record_data(&mut self, param: Option<&str>, data: Value) {
        match param {
            None => self.data = data,
            Some(p) => {
                if !self.data.is_object() {
                    self.data = Value::Object(Map::new());
                }
                if let Value::Object(map) = &mut self.data {
                    map.insert(p.to_string(), data);
                }
            }
        }
    }

    /// Iterate over every recorded outcome
    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.result.values()
    }

    /// Whether any case failed or errored
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.outcomes().any(Outcome::is_fail)
    }

    /// Whether any case errored
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.outcomes().any(|o| *o == Outcome::Error)
    }

    /// Whether every case was skipped (false for zero cases)
    #[must_use]
    pub fn all_skipped(&self) -> bool {
        let mut outcomes = self.outcomes().peekable();
        outcomes.peek().is_some() && outcomes.all(|o| *o == Outcome::Skipped)
    }

    /// Total duration in seconds over all cases
    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.duration.values().sum()
    }
}

/// Environment and provenance of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// UTC time the run started, ISO-8601 with a space separator
    #[serde(default)]
    pub timestamp: String,
    /// Operating system
    #[serde(default)]
    pub platform: String,
    /// Operating system release
    #[serde(default)]
    pub release: String,
    /// Toolchain identifier
    #[serde(default)]
    pub runtime: String,
    /// Host name
    #[serde(default)]
    pub hostname: String,
    /// Crate name to version
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
    /// Git branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Git commit hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    /// Git commit author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_author: Option<String>,
}

impl Meta {
    /// Record the current environment
    #[must_use]
    pub fn collect() -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            platform: std::env::consts::OS.to_string(),
            release: os_release(),
            runtime: format!(
                "rust {} ({})",
                env!("CARGO_PKG_RUST_VERSION"),
                std::env::consts::ARCH
            ),
            hostname: hostname::get().map_or_else(
                |_| "unknown".to_string(),
                |h| h.to_string_lossy().to_string(),
            ),
            packages: BTreeMap::from([
                ("gsm-qa-checks".to_string(), gsm_qa_checks::VERSION.to_string()),
                (
                    "gsm-qa-runner".to_string(),
                    env!("CARGO_PKG_VERSION").to_string(),
                ),
            ]),
            branch: None,
            commit_hash: None,
            commit_author: None,
        }
    }

    /// Annotate with the current branch and head commit of a repository.
    ///
    /// Git failures leave the fields empty.
    pub fn add_git(&mut self, git: &dyn GitRunner) {
        match git.current_branch() {
            Ok(branch) => self.branch = Some(branch),
            Err(e) => tracing::debug!("No git branch recorded: {e}"),
        }
        match git.head_commit() {
            Ok(commit) => {
                self.commit_hash = Some(commit.hexsha);
                self.commit_author = Some(commit.author);
            }
            Err(e) => tracing::debug!("No git commit recorded: {e}"),
        }
    }
}

fn os_release() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Score of one scored section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionScore {
    /// Section identifier
    pub section: String,
    /// Section score in [0, 1]
    pub score: f64,
}

/// Overall and per-section scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Weighted overall score in [0, 1]
    pub total_score: f64,
    /// Scores of the scored sections, in configuration order
    pub sections: Vec<SectionScore>,
}

impl ScoreSummary {
    /// Score of one section
    #[must_use]
    pub fn section(&self, id: &str) -> Option<f64> {
        self.sections
            .iter()
            .find(|s| s.section == id)
            .map(|s| s.score)
    }
}

/// Results of one run of the check suite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    /// Provenance
    #[serde(default)]
    pub meta: Meta,
    /// Test identifier to result
    #[serde(default)]
    pub tests: BTreeMap<String, TestCaseResult>,
    /// Card layout used for scoring, with derived card scores
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub cards: Value,
    /// Test identifier to weight used for scoring
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub weights: BTreeMap<String, f64>,
    /// Derived scores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreSummary>,
}

impl SuiteResult {
    /// An empty result with the current environment recorded
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: Meta::collect(),
            ..Self::default()
        }
    }

    /// The result of one test, created on first access
    pub fn case_mut(&mut self, id: &str) -> &mut TestCaseResult {
        self.tests
            .entry(id.to_string())
            .or_insert_with(TestCaseResult::scalar)
    }

    /// Whether any test failed or errored
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.tests.values().any(TestCaseResult::has_failure)
    }

    /// Count cases by outcome
    #[must_use]
    pub fn outcome_counts(&self) -> BTreeMap<Outcome, usize> {
        let mut counts = BTreeMap::new();
        for outcome in self.tests.values().flat_map(TestCaseResult::outcomes) {
            *counts.entry(*outcome).or_insert(0) += 1;
        }
        counts
    }
}
