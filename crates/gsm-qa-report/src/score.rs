//! Weighted scoring
//!
//! ## Scoring System
//!
//! - **Test score**: `1 - metric`; a parametrized test scores `1 - mean(metric)`
//!   over its parameters, and 1.0 when it has no parameters at all
//! - **Weighted**: each test contributes `score * weight` out of `weight`
//! - **Section score**: `Σ score / Σ max` over the section's listed tests
//! - **Total score**: `Σ(section_score_sum * w) / Σ(section_max_sum * w)`
//!   over all sections, `w` being the section weight
//!
//! Tests without a metric that errored or were skipped are scored according
//! to the configured [`UnscoredPolicy`]. A test that ran without reporting a
//! metric, a section with nothing to divide by and a listed test that never
//! ran are configuration errors.

use std::collections::{BTreeMap, BTreeSet};

use gsm_qa_runner::{
    Outcome, Parametrized, ScoreSummary, SectionScore, SuiteResult, TestCaseResult, TestScore,
};
use tracing::{debug, warn};

use crate::config::{Cards, ReportConfiguration, UnscoredPolicy};
use crate::error::{Error, Result};

/// Weighted contribution of one test to its section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScore {
    /// `(1 - metric) * weight`
    pub score: f64,
    /// `weight`
    pub max: f64,
}

/// Totals of one scored section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionTotals {
    /// Sum of weighted scores
    pub score: f64,
    /// Sum of weights
    pub max: f64,
    /// Section weight
    pub weight: f64,
}

impl SectionTotals {
    /// Section score in [0, 1]
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.score / self.max
    }
}

/// Everything scoring derives from a result
#[derive(Debug, Clone, PartialEq)]
pub struct Scoring {
    /// Test identifier to score; excluded and unscorable tests are absent
    pub tests: BTreeMap<String, TestScore>,
    /// Weight applied to every test of the result
    pub weights: BTreeMap<String, f64>,
    /// Section identifier to totals, in configuration order
    pub sections: Vec<(String, SectionTotals)>,
    /// Card layout with section scores filled in
    pub cards: Cards,
    /// Total and per-section scores
    pub summary: ScoreSummary,
}

impl Scoring {
    /// Write scores, weights and cards into a result store
    ///
    /// # Errors
    ///
    /// Returns an error if the card layout cannot be serialized.
    pub fn apply(self, result: &mut SuiteResult) -> Result<()> {
        for (id, case) in &mut result.tests {
            case.score = self.tests.get(id).cloned();
        }
        result.weights = self.weights;
        result.cards = serde_json::to_value(&self.cards)?;
        result.score = Some(self.summary);
        Ok(())
    }
}

/// Weighted score calculator
#[derive(Debug, Clone, Copy)]
pub struct ScoreCalculator<'c> {
    config: &'c ReportConfiguration,
}

fn validate_metric(test: &str, metric: f64) -> Result<f64> {
    if metric.is_finite() && (0.0..=1.0).contains(&metric) {
        Ok(metric)
    } else {
        Err(Error::InvalidMetric {
            test: test.to_string(),
            value: metric,
        })
    }
}

impl<'c> ScoreCalculator<'c> {
    /// Create a calculator for a configuration
    #[must_use]
    pub fn new(config: &'c ReportConfiguration) -> Self {
        Self { config }
    }

    /// Metric of one case without a reported metric, `None` when excluded
    fn unscored_metric(&self, test: &str, outcome: Outcome) -> Result<Option<f64>> {
        match outcome {
            Outcome::Error | Outcome::Skipped => match self.config.scoring.unscored {
                UnscoredPolicy::WorstCase => Ok(Some(1.0)),
                UnscoredPolicy::Exclude => Ok(None),
            },
            _ => Err(Error::MissingMetric {
                test: test.to_string(),
            }),
        }
    }

    /// Score of one test.
    ///
    /// Returns `None` when the unscored policy excludes the test.
    ///
    /// # Errors
    ///
    /// Returns an error for metrics outside [0, 1] and for tests that ran
    /// without reporting a metric.
    pub fn test_score(&self, test: &str, case: &TestCaseResult) -> Result<Option<TestScore>> {
        match &case.result {
            Parametrized::Single(outcome) => {
                let metric = match case.metric.as_ref().and_then(Parametrized::as_single) {
                    Some(metric) => Some(validate_metric(test, *metric)?),
                    None => self.unscored_metric(test, *outcome)?,
                };
                Ok(metric.map(|m| TestScore::Scalar(1.0 - m)))
            }
            Parametrized::Params(outcomes) => {
                let metrics = match &case.metric {
                    Some(Parametrized::Params(map)) => Some(map),
                    _ => None,
                };
                // A parameter counts once it has an outcome or a metric.
                let keys: BTreeSet<&String> = outcomes
                    .keys()
                    .chain(metrics.into_iter().flat_map(BTreeMap::keys))
                    .collect();
                let mut params = BTreeMap::new();
                for param in &keys {
                    let metric = match (metrics.and_then(|m| m.get(*param)), outcomes.get(*param)) {
                        (Some(metric), _) => Some(validate_metric(test, *metric)?),
                        (None, Some(outcome)) => self.unscored_metric(test, *outcome)?,
                        (None, None) => None,
                    };
                    if let Some(metric) = metric {
                        params.insert((*param).clone(), 1.0 - metric);
                    }
                }
                if params.is_empty() && !keys.is_empty() {
                    return Ok(None);
                }
                Ok(Some(TestScore::Parametrized {
                    total: aggregate(&params),
                    params,
                }))
            }
        }
    }

    /// Score a result
    ///
    /// # Errors
    ///
    /// Returns the configuration errors described in the module docs.
    pub fn calculate(&self, result: &SuiteResult) -> Result<Scoring> {
        let scored: Vec<&str> = self
            .config
            .cards
            .scored
            .sections
            .values()
            .flat_map(|s| s.cases.iter().map(String::as_str))
            .collect();

        let mut tests = BTreeMap::new();
        for (id, case) in &result.tests {
            match self.test_score(id, case) {
                Ok(Some(score)) => {
                    tests.insert(id.clone(), score);
                }
                Ok(None) => debug!("{id} is excluded from scoring"),
                Err(e) if scored.contains(&id.as_str()) => return Err(e),
                Err(e) => warn!("{id} is not scored: {e}"),
            }
        }

        let weights: BTreeMap<String, f64> = result
            .tests
            .keys()
            .map(|id| (id.clone(), self.config.weight(id)))
            .collect();

        let mut cards = self.config.cards.clone();
        let mut sections = Vec::with_capacity(cards.scored.sections.len());
        for (section_id, section) in &mut cards.scored.sections {
            let mut totals = SectionTotals {
                score: 0.0,
                max: 0.0,
                weight: section.weight,
            };
            for test in &section.cases {
                if !result.tests.contains_key(test) {
                    return Err(Error::UnexecutedTest {
                        section: section_id.clone(),
                        test: test.clone(),
                    });
                }
                let Some(score) = tests.get(test) else {
                    continue;
                };
                let weighted = weighted(score.total(), self.config.weight(test));
                totals.score += weighted.score;
                totals.max += weighted.max;
            }
            if totals.max <= 0.0 {
                return Err(Error::EmptyCard {
                    section: section_id.clone(),
                });
            }
            section.score = Some(totals.ratio());
            debug!("Section {section_id} scored {:.4}", totals.ratio());
            sections.push((section_id.clone(), totals));
        }

        let total_score = total(&sections)?;
        let summary = ScoreSummary {
            total_score,
            sections: sections
                .iter()
                .map(|(id, totals)| SectionScore {
                    section: id.clone(),
                    score: totals.ratio(),
                })
                .collect(),
        };
        debug!(total_score, "Scored {} tests", tests.len());

        Ok(Scoring {
            tests,
            weights,
            sections,
            cards,
            summary,
        })
    }
}

/// Mean score over parameters, 1.0 without parameters
fn aggregate(params: &BTreeMap<String, f64>) -> f64 {
    if params.is_empty() {
        return 1.0;
    }
    params.values().sum::<f64>() / params.len() as f64
}

/// Weighted contribution of a test score
#[must_use]
pub fn weighted(score: f64, weight: f64) -> WeightedScore {
    WeightedScore {
        score: score * weight,
        max: weight,
    }
}

/// Weighted total over sections
fn total(sections: &[(String, SectionTotals)]) -> Result<f64> {
    let (score, max) = sections
        .iter()
        .fold((0.0, 0.0), |(score, max), (_, totals)| {
            (score + totals.score * totals.weight, max + totals.max * totals.weight)
        });
    if max <= 0.0 {
        return Err(Error::Config(
            "no scored section has a positive weight".to_string(),
        ));
    }
    Ok(score / max)
}

/// Score a result store.
///
/// Returns a copy with test scores, weights, cards and the score summary
/// filled in; the input is left untouched.
///
/// # Errors
///
/// Returns the configuration errors of [`ScoreCalculator::calculate`].
pub fn compute_score(result: &SuiteResult, config: &ReportConfiguration) -> Result<SuiteResult> {
    let scoring = ScoreCalculator::new(config).calculate(result)?;
    let mut scored = result.clone();
    scoring.apply(&mut scored)?;
    Ok(scored)
}
