//! JSON serialization of result stores
//!
//! `serde_json` writes non-finite floats as `null`, which would silently
//! corrupt metrics and scores. Every float of the store is inspected first
//! and serialization fails with the offending key paths.

use tracing::error;

use crate::error::{Error, Result};
use crate::result::{Parametrized, SuiteResult, TestScore};

fn check(path: String, value: f64, found: &mut Vec<String>) {
    if !value.is_finite() {
        found.push(path);
    }
}

fn check_parametrized(path: &str, value: &Parametrized<f64>, found: &mut Vec<String>) {
    match value {
        Parametrized::Single(v) => check(path.to_string(), *v, found),
        Parametrized::Params(map) => {
            for (param, v) in map {
                check(format!("{path}.{param}"), *v, found);
            }
        }
    }
}

/// Key paths of every non-finite float in the result store
#[must_use]
pub fn non_finite_paths(result: &SuiteResult) -> Vec<String> {
    let mut found = Vec::new();
    for (id, case) in &result.tests {
        check_parametrized(&format!("tests.{id}.duration"), &case.duration, &mut found);
        if let Some(metric) = &case.metric {
            check_parametrized(&format!("tests.{id}.metric"), metric, &mut found);
        }
        match &case.score {
            Some(TestScore::Scalar(score)) => {
                check(format!("tests.{id}.score"), *score, &mut found);
            }
            Some(TestScore::Parametrized { total, params }) => {
                check(format!("tests.{id}.score.total"), *total, &mut found);
                for (param, score) in params {
                    check(format!("tests.{id}.score.params.{param}"), *score, &mut found);
                }
            }
            None => {}
        }
    }
    for (id, weight) in &result.weights {
        check(format!("weights.{id}"), *weight, &mut found);
    }
    if let Some(score) = &result.score {
        check("score.total_score".to_string(), score.total_score, &mut found);
        for section in &score.sections {
            check(
                format!("score.sections.{}", section.section),
                section.score,
                &mut found,
            );
        }
    }
    found
}

/// Serialize a result store, rejecting non-finite values
///
/// # Errors
///
/// Returns [`Error::NonFinite`] listing every offending key path, or a
/// serialization error.
pub fn to_json(result: &SuiteResult, pretty: bool) -> Result<String> {
    let paths = non_finite_paths(result);
    if !paths.is_empty() {
        for path in &paths {
            error!("Non-finite value at '{path}' cannot be written as JSON");
        }
        return Err(Error::NonFinite { paths });
    }
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}
