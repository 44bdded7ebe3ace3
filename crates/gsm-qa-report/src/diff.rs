//! Diff report
//!
//! Places the results of two or more models side by side. Every model is
//! scored with the same configuration.

use std::collections::BTreeMap;

use gsm_qa_checks::FormatType;
use gsm_qa_runner::{Meta, Outcome, Parametrized, SuiteResult, TestCaseResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{Cards, ReportConfiguration};
use crate::error::Result;
use crate::organizer::assign_misc;
use crate::score::ScoreCalculator;

/// One model's result of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Model label
    pub model: String,
    /// Raw data
    pub data: Value,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Message of the check
    pub message: Option<String>,
    /// Metric
    pub metric: Option<f64>,
    /// Outcome
    pub result: Option<Outcome>,
}

impl DiffEntry {
    fn new(model: &str, case: &TestCaseResult, param: Option<&str>) -> Self {
        let data = match param {
            None => case.data.clone(),
            Some(p) => case.data.get(p).cloned().unwrap_or(Value::Null),
        };
        Self {
            model: model.to_string(),
            data,
            duration: case.duration.get(param).copied(),
            message: case
                .message
                .as_ref()
                .and_then(|m| m.get(param))
                .cloned(),
            metric: case.metric.as_ref().and_then(|m| m.get(param)).copied(),
            result: case.result.get(param).copied(),
        }
    }
}

/// A test across all models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffTest {
    /// Title, from the first model reporting the test
    pub title: String,
    /// Summary
    pub summary: String,
    /// Presentation hint
    pub format_type: FormatType,
    /// Entries per model, keyed by parameter for parametrized tests
    pub diff: Parametrized<Vec<DiffEntry>>,
}

/// Total score of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTotal {
    /// Model label
    pub model: String,
    /// Total score
    pub total_score: f64,
}

/// Section score of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    /// Model label
    pub model: String,
    /// Section identifier
    pub section: String,
    /// Section score
    pub score: f64,
}

/// Entries in model order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffList<T> {
    /// One entry per model
    pub diff: Vec<T>,
}

impl<T> Default for DiffList<T> {
    fn default() -> Self {
        Self { diff: Vec::new() }
    }
}

/// Scores of all models
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffScore {
    /// Total score per model
    pub total_score: DiffList<ModelTotal>,
    /// Section scores per model
    pub sections: DiffList<ModelSection>,
}

/// Side-by-side comparison of several results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    /// Provenance of the first result
    pub meta: Meta,
    /// Test identifier to comparison
    pub tests: BTreeMap<String, DiffTest>,
    /// Scores per model
    pub score: DiffScore,
    /// Card layout, misc card covering the tests of every model
    pub cards: Cards,
    /// Configured test weights
    pub weights: BTreeMap<String, f64>,
}

impl DiffReport {
    /// Compare labelled results, in the given order
    ///
    /// # Errors
    ///
    /// Returns the scoring error of the first model that cannot be scored.
    pub fn build(results: &IndexMap<String, SuiteResult>, config: &ReportConfiguration) -> Result<Self> {
        let calculator = ScoreCalculator::new(config);
        let mut tests: BTreeMap<String, DiffTest> = BTreeMap::new();
        let mut score = DiffScore::default();
        let mut all_tests = BTreeMap::new();

        for (model, result) in results {
            for (id, case) in &result.tests {
                let test = tests.entry(id.clone()).or_insert_with(|| DiffTest {
                    title: case.title.clone(),
                    summary: case.summary.clone(),
                    format_type: case.format_type,
                    diff: if case.is_parametrized() {
                        Parametrized::empty()
                    } else {
                        Parametrized::Single(Vec::new())
                    },
                });
                push_entries(&mut test.diff, id, model, case);
                all_tests.entry(id.clone()).or_insert_with(|| case.clone());
            }

            let summary = calculator.calculate(result)?.summary;
            score.total_score.diff.push(ModelTotal {
                model: model.clone(),
                total_score: summary.total_score,
            });
            score
                .sections
                .diff
                .extend(summary.sections.into_iter().map(|s| ModelSection {
                    model: model.clone(),
                    section: s.section,
                    score: s.score,
                }));
        }

        let mut cards = config.cards.clone();
        assign_misc(&mut cards, &all_tests);
        info!(models = results.len(), tests = tests.len(), "Built diff report");
        Ok(Self {
            meta: results
                .values()
                .next()
                .map(|r| r.meta.clone())
                .unwrap_or_default(),
            tests,
            score,
            cards,
            weights: config.weights.clone(),
        })
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

fn push_entries(diff: &mut Parametrized<Vec<DiffEntry>>, id: &str, model: &str, case: &TestCaseResult) {
    match (diff, &case.result) {
        (Parametrized::Single(entries), Parametrized::Single(_)) => {
            entries.push(DiffEntry::new(model, case, None));
        }
        (Parametrized::Params(map), Parametrized::Params(outcomes)) => {
            for param in outcomes.keys() {
                map.entry(param.clone())
                    .or_default()
                    .push(DiffEntry::new(model, case, Some(param)));
            }
        }
        _ => warn!("{id} of {model} is shaped differently from earlier models. Skipping."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MISC_CARD, Section};
    use serde_json::json;

    fn result(metric: f64, extra: &str) -> SuiteResult {
        let mut result = SuiteResult::default();
        let case = result.case_mut("t1");
        case.title = "Test one".to_string();
        case.record_outcome(None, Outcome::Failed, 0.5);
        case.record_metric(None, metric);
        case.record_data(None, json!(["m1"]));

        result
            .tests
            .insert("p".to_string(), TestCaseResult::parametrized());
        let case = result.case_mut("p");
        case.record_outcome(Some("c"), Outcome::Passed, 0.25);
        case.record_metric(Some("c"), 0.0);
        case.record_outcome(Some(extra), Outcome::Error, 0.25);
        case.record_message(Some(extra), "boom");
        result
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

    fn models() -> IndexMap<String, SuiteResult> {
        IndexMap::from([
            ("a.json".to_string(), result(0.2, "e")),
            ("b.json".to_string(), result(0.6, "x")),
        ])
    }

    #[test]
    fn test_scalar_diff_in_model_order() {
        let report = DiffReport::build(&models(), &config()).expect("diff");
        let t1 = &report.tests["t1"];
        assert_eq!(t1.title, "Test one");
        let entries = t1.diff.as_single().expect("scalar");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].model, "a.json");
        assert_eq!(entries[1].metric, Some(0.6));
        assert_eq!(entries[0].data, json!(["m1"]));
        assert_eq!(entries[0].result, Some(Outcome::Failed));
    }

    #[test]
    fn test_parametrized_diff_by_param() {
        let report = DiffReport::build(&models(), &config()).expect("diff");
        let Parametrized::Params(params) = &report.tests["p"].diff else {
            panic!("expected parametrized diff");
        };
        assert_eq!(params["c"].len(), 2);
        assert_eq!(params["e"].len(), 1);
        assert_eq!(params["e"][0].message.as_deref(), Some("boom"));
        assert_eq!(params["e"][0].metric, None);
        assert_eq!(params["x"][0].model, "b.json");
    }

    #[test]
    fn test_scores_per_model() {
        let report = DiffReport::build(&models(), &config()).expect("diff");
        let totals: Vec<f64> = report
            .score
            .total_score
            .diff
            .iter()
            .map(|t| t.total_score)
            .collect();
        assert!((totals[0] - 0.8).abs() < 1e-12);
        assert!((totals[1] - 0.4).abs() < 1e-12);
        assert_eq!(report.score.sections.diff.len(), 2);
        assert_eq!(report.score.sections.diff[1].section, "s");
        assert_eq!(report.cards.others[MISC_CARD].cases, ["p"]);
    }

    #[test]
    fn test_diff_json_shape() {
        let report = DiffReport::build(&models(), &config()).expect("diff");
        let value: Value = serde_json::from_str(&report.to_json(false).expect("json")).expect("parse");
        assert!(value["score"]["total_score"]["diff"].is_array());
        assert!(value["score"]["sections"]["diff"].is_array());
        assert!(value["tests"]["t1"]["diff"].is_array());
        assert!(value["tests"]["p"]["diff"]["c"].is_array());
    }

    #[test]
    fn test_unscorable_model_is_error() {
        let mut config = config();
        config
            .cards
            .scored
            .sections
            .insert("missing".to_string(), Section::new("M", &["t_absent"]));
        assert!(DiffReport::build(&models(), &config).is_err());
    }
}
