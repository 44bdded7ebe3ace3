//! Snapshot report
//!
//! A one-time report of a single result: unconfigured tests are moved into
//! the misc card and the result is scored.

use gsm_qa_runner::SuiteResult;
use tracing::info;

use crate::config::ReportConfiguration;
use crate::error::Result;
use crate::organizer::assign_misc;
use crate::score::ScoreCalculator;

/// Snapshot report builder
#[derive(Debug, Clone, Copy)]
pub struct SnapshotReport<'c> {
    config: &'c ReportConfiguration,
}

impl<'c> SnapshotReport<'c> {
    /// Create a builder for a configuration
    #[must_use]
    pub fn new(config: &'c ReportConfiguration) -> Self {
        Self { config }
    }

    /// Organize and score a result.
    ///
    /// # Errors
    ///
    /// Returns the scoring errors of [`ScoreCalculator::calculate`].
    pub fn build(&self, result: &SuiteResult) -> Result<SuiteResult> {
        let mut scoring = ScoreCalculator::new(self.config).calculate(result)?;
        let misc = assign_misc(&mut scoring.cards, &result.tests);
        info!(
            total_score = scoring.summary.total_score,
            misc = misc.len(),
            "Built snapshot report"
        );
        let mut report = result.clone();
        scoring.apply(&mut report)?;
        Ok(report)
    }

    /// Build the report and serialize it
    ///
    /// # Errors
    ///
    /// Returns scoring errors, or [`gsm_qa_runner::Error::NonFinite`] wrapped
    /// in [`crate::Error::Runner`].
    pub fn render_json(&self, result: &SuiteResult, pretty: bool) -> Result<String> {
        let report = self.build(result)?;
        Ok(gsm_qa_runner::to_json(&report, pretty)?)
    }
}
