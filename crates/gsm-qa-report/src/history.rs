//! History report
//!
//! Follows the total score and every test across the commits of each
//! branch, oldest first.

use std::collections::BTreeMap;

use gsm_qa_checks::FormatType;
use gsm_qa_runner::{Error as RunnerError, HistoryManager, Outcome, Parametrized, TestCaseResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::config::{Cards, ReportConfiguration};
use crate::error::Result;
use crate::organizer::assign_misc;
use crate::score::ScoreCalculator;

/// Format type reported for the total score series
pub const SCORE_FORMAT: &str = "score";

/// One commit's value of a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Branch name
    pub branch: String,
    /// Commit hash
    pub commit: String,
    /// Metric
    pub metric: Option<f64>,
    /// Data formatted by the test's format type
    pub data: Value,
    /// Outcome
    pub result: Option<Outcome>,
}

/// A test across the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTest {
    /// Title, from the first commit reporting the test
    pub title: String,
    /// Summary
    pub summary: String,
    /// Presentation hint
    pub format_type: FormatType,
    /// Entries per commit, keyed by parameter for parametrized tests
    pub history: Parametrized<Vec<HistoryEntry>>,
}

/// One commit's total score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    /// Branch name
    pub branch: String,
    /// Commit hash
    pub commit: String,
    /// Total score
    pub metric: f64,
}

/// Total score across the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistory {
    /// Always [`SCORE_FORMAT`]
    pub format_type: String,
    /// Points in branch and commit order
    pub history: Vec<ScorePoint>,
}

impl Default for ScoreHistory {
    fn default() -> Self {
        Self {
            format_type: SCORE_FORMAT.to_string(),
            history: Vec::new(),
        }
    }
}

/// Scores of the history report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryScore {
    /// Total score per commit
    pub total_score: ScoreHistory,
}

/// Results of every commit of every branch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    /// Test identifier to history
    pub tests: BTreeMap<String, HistoryTest>,
    /// Total score history
    pub score: HistoryScore,
    /// Commits without a stored result
    pub missing: Vec<String>,
    /// Commits whose result could not be scored
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unscored: Vec<String>,
    /// Card layout
    pub cards: Cards,
    /// Configured test weights
    pub weights: BTreeMap<String, f64>,
}

/// Reduce stored data to what the history plot shows
#[must_use]
pub fn format_data(format_type: FormatType, data: Option<&Value>) -> Value {
    match (format_type, data) {
        (FormatType::Percent, _) | (_, None | Some(Value::Null)) => Value::Array(Vec::new()),
        (FormatType::Count, Some(Value::Array(items))) => Value::from(items.len()),
        (FormatType::Count, Some(Value::Object(map))) => Value::from(map.len()),
        (_, Some(value)) => value.clone(),
    }
}

impl HistoryReport {
    /// Collect the history of a loaded [`HistoryManager`]
    ///
    /// # Errors
    ///
    /// Returns an error if the history has not been loaded.
    pub fn build(history: &HistoryManager<'_>, config: &ReportConfiguration) -> Result<Self> {
        let calculator = ScoreCalculator::new(config);
        let mut report = Self {
            missing: history.missing().to_vec(),
            cards: config.cards.clone(),
            weights: config.weights.clone(),
            ..Self::default()
        };
        let mut all_tests = BTreeMap::new();

        for (branch, commits) in history.iter_branches() {
            for commit in commits.iter().rev() {
                let result = match history.get_result(commit) {
                    Ok(result) => result,
                    Err(RunnerError::MissingRevision(_)) => continue,
                    Err(e) => return Err(e.into()),
                };
                match calculator.calculate(result) {
                    Ok(scoring) => report.score.total_score.history.push(ScorePoint {
                        branch: branch.to_string(),
                        commit: commit.clone(),
                        metric: scoring.summary.total_score,
                    }),
                    Err(e) => {
                        error!("Could not score result '{commit}': {e}");
                        if !report.unscored.contains(commit) {
                            report.unscored.push(commit.clone());
                        }
                    }
                }
                for (id, case) in &result.tests {
                    report.record(id, case, branch, commit);
                    all_tests.entry(id.clone()).or_insert_with(|| case.clone());
                }
            }
        }
        assign_misc(&mut report.cards, &all_tests);
        info!(
            points = report.score.total_score.history.len(),
            tests = report.tests.len(),
            missing = report.missing.len(),
            "Built history report"
        );
        Ok(report)
    }

    fn record(&mut self, id: &str, case: &TestCaseResult, branch: &str, commit: &str) {
        let test = self.tests.entry(id.to_string()).or_insert_with(|| HistoryTest {
            title: case.title.clone(),
            summary: case.summary.clone(),
            format_type: case.format_type,
            history: if case.is_parametrized() {
                Parametrized::empty()
            } else {
                Parametrized::Single(Vec::new())
            },
        });
        let format_type = test.format_type;
        let entry = |param: Option<&str>| HistoryEntry {
            branch: branch.to_string(),
            commit: commit.to_string(),
            metric: case.metric.as_ref().and_then(|m| m.get(param)).copied(),
            data: format_data(
                format_type,
                match param {
                    None => Some(&case.data),
                    Some(p) => case.data.get(p),
                },
            ),
            result: case.result.get(param).copied(),
        };
        match (&mut test.history, &case.result) {
            (Parametrized::Single(entries), Parametrized::Single(_)) => entries.push(entry(None)),
            (Parametrized::Params(map), Parametrized::Params(outcomes)) => {
                for param in outcomes.keys() {
                    map.entry(param.clone()).or_default().push(entry(Some(param)));
                }
            }
            _ => error!("{id} at '{commit}' is shaped differently from earlier commits. Skipping."),
        }
    }

    /// Serialize the report
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MISC_CARD, MISC_TITLE, Section};
    use gsm_qa_runner::{CommitInfo, MockGitRunner, ResultBackend, SuiteResult};
    use serde_json::json;

    struct MemoryBackend(BTreeMap<String, SuiteResult>);

    impl ResultBackend for MemoryBackend {
        fn load_revision(&self, revision: &str) -> gsm_qa_runner::Result<SuiteResult> {
            self.0
                .get(revision)
                .cloned()
                .ok_or_else(|| RunnerError::MissingRevision(revision.to_string()))
        }

        fn contains(&self, revision: &str) -> bool {
            self.0.contains_key(revision)
        }
    }

    fn result(metric: f64) -> SuiteResult {
        let mut result = SuiteResult::default();
        let case = result.case_mut("t1");
        case.format_type = FormatType::Count;
        case.record_outcome(None, Outcome::Failed, 0.5);
        case.record_metric(None, metric);
        case.record_data(None, json!(["a", "b"]));
        result
            .tests
            .insert("p".to_string(), TestCaseResult::parametrized());
        let case = result.case_mut("p");
        case.format_type = FormatType::Percent;
        case.record_outcome(Some("c"), Outcome::Passed, 0.5);
        case.record_metric(Some("c"), metric);
        case.record_data(Some("c"), json!(["x"]));
        result
    }

    fn commit(hexsha: &str) -> CommitInfo {
        CommitInfo::new(hexsha, "Jane", "2024-01-01 00:00:00")
    }

    fn config() -> ReportConfiguration {
        let mut config = ReportConfiguration::default();
        config
            .cards
            .scored
            .sections
            .insert("s".to_string(), Section::new("S", &["t1"]));
        config
    }

    fn build(backend: &MemoryBackend) -> HistoryReport {
        let git = MockGitRunner::new().with_commits("main", vec![commit("c3"), commit("c2"), commit("c1")]);
        let mut manager = HistoryManager::new(&git, backend);
        manager.load_history(&[]).expect("load");
        HistoryReport::build(&manager, &config()).expect("history")
    }

    #[test]
    fn test_format_data() {
        let items = json!([1, 2, 3]);
        assert_eq!(format_data(FormatType::Percent, Some(&items)), json!([]));
        assert_eq!(format_data(FormatType::Count, Some(&items)), json!(3));
        assert_eq!(format_data(FormatType::Raw, Some(&items)), items);
        assert_eq!(format_data(FormatType::Number, None), json!([]));
        assert_eq!(format_data(FormatType::Count, Some(&json!(7))), json!(7));
    }

    #[test]
    fn test_history_oldest_first() {
        let backend = MemoryBackend(BTreeMap::from([
            ("c1".to_string(), result(1.0)),
            ("c2".to_string(), result(0.5)),
            ("c3".to_string(), result(0.0)),
        ]));
        let report = build(&backend);
        let commits: Vec<&str> = report
            .score
            .total_score
            .history
            .iter()
            .map(|p| p.commit.as_str())
            .collect();
        assert_eq!(commits, ["c1", "c2", "c3"]);
        assert_eq!(report.score.total_score.history[2].metric, 1.0);
        assert_eq!(report.score.total_score.format_type, SCORE_FORMAT);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_history_formats_test_data() {
        let backend = MemoryBackend(BTreeMap::from([("c1".to_string(), result(0.5))]));
        let report = build(&backend);
        let t1 = report.tests["t1"].history.as_single().expect("scalar");
        assert_eq!(t1[0].data, json!(2));
        assert_eq!(t1[0].metric, Some(0.5));
        assert_eq!(t1[0].branch, "main");
        let Parametrized::Params(params) = &report.tests["p"].history else {
            panic!("expected parametrized history");
        };
        assert_eq!(params["c"][0].data, json!([]));
        assert_eq!(params["c"][0].result, Some(Outcome::Passed));
    }

    #[test]
    fn test_history_lists_missing_revisions() {
        let backend = MemoryBackend(BTreeMap::from([("c2".to_string(), result(0.5))]));
        let report = build(&backend);
        assert_eq!(report.score.total_score.history.len(), 1);
        let mut missing = report.missing.clone();
        missing.sort();
        assert_eq!(missing, ["c1", "c3"]);
    }

    #[test]
    fn test_history_records_unscorable_revisions() {
        let mut unscorable = SuiteResult::default();
        unscorable
            .case_mut("other")
            .record_outcome(None, Outcome::Passed, 0.1);
        let backend = MemoryBackend(BTreeMap::from([
            ("c1".to_string(), unscorable),
            ("c2".to_string(), result(0.5)),
        ]));
        let report = build(&backend);
        assert_eq!(report.unscored, ["c1"]);
        assert_eq!(report.score.total_score.history.len(), 1);
        assert!(report.tests.contains_key("other"));
    }

    #[test]
    fn test_history_places_unconfigured_tests_in_misc() {
        let mut later = result(0.5);
        later
            .case_mut("other")
            .record_outcome(None, Outcome::Passed, 0.1);
        let backend = MemoryBackend(BTreeMap::from([
            ("c1".to_string(), result(0.5)),
            ("c2".to_string(), later),
        ]));
        let report = build(&backend);
        let misc = &report.cards.others[MISC_CARD];
        assert_eq!(misc.title, MISC_TITLE);
        assert_eq!(misc.cases, ["other", "p"]);
        assert!(!misc.cases.contains(&"t1".to_string()));
    }

    #[test]
    fn test_history_requires_loaded_manager() {
        let git = MockGitRunner::new().with_commits("main", vec![commit("c1")]);
        let backend = MemoryBackend(BTreeMap::new());
        let mut manager = HistoryManager::new(&git, &backend);
        manager.build_branch_structure(&[]).expect("structure");
        assert!(HistoryReport::build(&manager, &config()).is_err());
    }
}
