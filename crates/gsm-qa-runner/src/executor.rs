//! Check executor
//!
//! Runs every registered check against one model, sequentially, and writes
//! outcomes into a [`SuiteResult`]. A check that returns an error or panics
//! is recorded as `error`; the run always completes.

#![allow(clippy::cast_possible_truncation)]

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use gsm_qa_checks::{Check, CheckRegistry, Model};
use tracing::{debug, info, warn};

use crate::collect::{ResultCollector, location};
use crate::result::{Outcome, SuiteResult};
use crate::selection::Selection;

/// Execution configuration
#[derive(Debug, Clone, Default)]
pub struct ExecutionConfig {
    /// Which checks run
    pub selection: Selection,
    /// Dry run (record every check as skipped without evaluating)
    pub dry_run: bool,
}

/// Executor for running a check registry
#[derive(Debug)]
pub struct Executor<'r> {
    registry: &'r CheckRegistry,
    config: ExecutionConfig,
}

impl<'r> Executor<'r> {
    /// Create a new executor with default config
    #[must_use]
    pub fn new(registry: &'r CheckRegistry) -> Self {
        Self::with_config(registry, ExecutionConfig::default())
    }

    /// Create a new executor with custom config
    #[must_use]
    pub fn with_config(registry: &'r CheckRegistry, config: ExecutionConfig) -> Self {
        Self { registry, config }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run every check against the model, recording into `result`
    pub fn execute(&self, model: &Model, result: &mut SuiteResult) -> ExecutionSummary {
        let start = Instant::now();
        let mut summary = ExecutionSummary::default();
        let mut collector = ResultCollector::new(result);

        for check in self.registry.iter() {
            let descriptor = check.descriptor();
            let params = check.parameters(model);
            collector.declare(descriptor, params.is_some());

            let cases: Vec<Option<String>> = match params {
                Some(values) => values.into_iter().map(Some).collect(),
                None => vec![None],
            };
            let skip = if self.config.dry_run {
                Some("Dry run.".to_string())
            } else {
                self.config.selection.decide(descriptor).map(|r| r.to_string())
            };

            for param in &cases {
                let param = param.as_deref();
                let (outcome, duration) = match &skip {
                    Some(reason) => {
                        collector.record_error(&descriptor.id, param, reason);
                        (Outcome::Skipped, 0.0)
                    }
                    None => run_case(check, model, param, &mut collector),
                };
                summary.count(outcome);
                collector.record_case(&descriptor.id, param, outcome, duration);
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            errors = summary.errors,
            skipped = summary.skipped,
            "Executed {} checks",
            self.registry.len()
        );
        summary
    }
}

/// Evaluate one case, converting errors and panics into an `error` outcome
fn run_case(
    check: &dyn Check,
    model: &Model,
    param: Option<&str>,
    collector: &mut ResultCollector<'_>,
) -> (Outcome, f64) {
    let id = &check.descriptor().id;
    let start = Instant::now();
    let evaluated = catch_unwind(AssertUnwindSafe(|| check.evaluate(model, param)));
    let duration = start.elapsed().as_secs_f64();

    let outcome = match evaluated {
        Ok(Ok(outcome)) => {
            collector.record_annotation(id, param, &outcome);
            if outcome.passed {
                Outcome::Passed
            } else {
                Outcome::Failed
            }
        }
        Ok(Err(e)) => {
            debug!("{} raised: {e}", location(id, param));
            collector.record_error(id, param, &e.to_string());
            Outcome::Error
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("{} panicked: {message}", location(id, param));
            collector.record_error(id, param, &message);
            Outcome::Error
        }
    };
    (outcome, duration)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "check panicked".to_string())
}

/// Counts of one execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Total cases
    pub total: usize,
    /// Passed cases
    pub passed: usize,
    /// Failed cases
    pub failed: usize,
    /// Errored cases
    pub errors: usize,
    /// Skipped cases
    pub skipped: usize,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionSummary {
    fn count(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Error => self.errors += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    /// Check if no case failed or errored
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    /// Get pass rate as percentage of executed (non-skipped) cases
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        let executed = self.total - self.skipped;
        if executed == 0 {
            return 0.0;
        }
        (self.passed as f64 / executed as f64) * 100.0
    }
}
