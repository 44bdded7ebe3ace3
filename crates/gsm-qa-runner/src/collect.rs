//! Result collection
//!
//! Turns execution reports and check annotations into entries of a
//! [`SuiteResult`]. A report's location is the test identifier, optionally
//! followed by a bracketed parameter (`test_id[param]`); all parameters of a
//! test share one entry, sub-keyed by parameter.

use std::sync::LazyLock;

use gsm_qa_checks::{CheckDescriptor, CheckOutcome};
use regex::Regex;
use tracing::debug;

use crate::result::{Outcome, SuiteResult, TestCaseResult};

/// Trailing `[param]` suffix of a parametrized test location
static PARAM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // This regex pattern is verified at compile time, unwrap is safe here
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\[(?P<param>[a-zA-Z0-9_.\-]+)\]$").unwrap()
});

/// Split a location into test identifier and optional parameter
#[must_use]
pub fn split_location(location: &str) -> (&str, Option<&str>) {
    match PARAM_REGEX.captures(location) {
        Some(caps) => {
            let (Some(whole), Some(param)) = (caps.get(0), caps.name("param")) else {
                return (location, None);
            };
            (&location[..whole.start()], Some(param.as_str()))
        }
        None => (location, None),
    }
}

/// Location string for a test and optional parameter
#[must_use]
pub fn location(id: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{id}[{p}]"),
        None => id.to_string(),
    }
}

/// Report of one executed test case
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    /// Test identifier with optional `[param]` suffix
    pub location: String,
    /// Outcome
    pub outcome: Outcome,
    /// Duration in seconds
    pub duration: f64,
}

impl TestReport {
    /// Create a report
    #[must_use]
    pub fn new(location: impl Into<String>, outcome: Outcome, duration: f64) -> Self {
        Self {
            location: location.into(),
            outcome,
            duration,
        }
    }
}

/// Writes reports and annotations into a result store
#[derive(Debug)]
pub struct ResultCollector<'a> {
    result: &'a mut SuiteResult,
}

impl<'a> ResultCollector<'a> {
    /// Collect into the given result store
    pub fn new(result: &'a mut SuiteResult) -> Self {
        Self { result }
    }

    /// Create the entry of a check before it runs.
    ///
    /// A parametrized check with no parameter values keeps an empty entry.
    pub fn declare(&mut self, descriptor: &CheckDescriptor, parametrized: bool) {
        let case = if parametrized {
            TestCaseResult::parametrized()
        } else {
            TestCaseResult::scalar()
        };
        self.result
            .tests
            .insert(descriptor.id.clone(), case.with_descriptor(descriptor));
    }

    /// Record outcome and duration of a test case
    pub fn record_case(&mut self, id: &str, param: Option<&str>, outcome: Outcome, duration: f64) {
        match param {
            Some(p) => debug!("{id} with parameter {p} {outcome}"),
            None => debug!("{id} {outcome}"),
        }
        self.result
            .case_mut(id)
            .record_outcome(param, outcome, duration);
    }

    /// Record an execution report given by location.
    ///
    /// Returns the test identifier and parameter parsed from the location.
    pub fn record_report<'r>(&mut self, report: &'r TestReport) -> (&'r str, Option<&'r str>) {
        let (id, param) = split_location(&report.location);
        self.record_case(id, param, report.outcome, report.duration);
        (id, param)
    }

    /// Record what a check reported about itself
    pub fn record_annotation(&mut self, id: &str, param: Option<&str>, outcome: &CheckOutcome) {
        let case = self.result.case_mut(id);
        case.record_metric(param, outcome.metric);
        case.record_message(param, outcome.message.clone());
        case.record_data(param, outcome.data.clone());
    }

    /// Record why a check could not be evaluated
    pub fn record_error(&mut self, id: &str, param: Option<&str>, message: &str) {
        self.result.case_mut(id).record_message(param, message);
    }
}
