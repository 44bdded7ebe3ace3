//! Check plugin contract and registry
//!
//! A check evaluates one property of a model and yields a `(data, metric)`
//! pair. The metric is the fraction of non-conforming entities, so `0.0` is
//! ideal. Checks are registered explicitly with a [`CheckDescriptor`] and
//! looked up by identifier.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::model::Model;

/// Presentation hint for a check's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    /// `data` is a single number
    Number,
    /// `data` is a collection, display its length
    #[default]
    Count,
    /// Display the metric as a percentage
    Percent,
    /// Display `data` as is
    Raw,
}

impl FormatType {
    /// Parse a format type name
    ///
    /// # Errors
    ///
    /// Returns an error for names other than number, count, percent and raw.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "number" => Ok(Self::Number),
            "count" => Ok(Self::Count),
            "percent" => Ok(Self::Percent),
            "raw" => Ok(Self::Raw),
            _ => Err(Error::UnknownFormatType(s.to_string())),
        }
    }
}

impl std::fmt::Display for FormatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number => write!(f, "number"),
            Self::Count => write!(f, "count"),
            Self::Percent => write!(f, "percent"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

/// Static description of a registered check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDescriptor {
    /// Stable test identifier (e.g. "test_genes_presence")
    pub id: String,
    /// Module the check belongs to (e.g. "basic")
    pub module: String,
    /// Human-readable title
    pub title: String,
    /// Longer description shown in reports
    #[serde(default)]
    pub summary: String,
    /// Presentation hint
    #[serde(default)]
    pub format_type: FormatType,
    /// Weight used when the report configuration has none for this test
    #[serde(default = "default_weight")]
    pub weight_default: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl CheckDescriptor {
    /// Create a descriptor with count format and unit weight
    #[must_use]
    pub fn new(id: impl Into<String>, module: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            module: module.into(),
            title: title.into(),
            summary: String::new(),
            format_type: FormatType::default(),
            weight_default: default_weight(),
        }
    }

    /// Set the summary
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set the format type
    #[must_use]
    pub const fn with_format(mut self, format_type: FormatType) -> Self {
        self.format_type = format_type;
        self
    }

    /// Set the default weight
    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight_default = weight;
        self
    }
}

/// What a check reports after evaluating a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Raw data the check assessed
    pub data: Value,
    /// Fraction of non-conforming entities in [0, 1]
    pub metric: f64,
    /// Short explanation of the result
    pub message: String,
    /// Whether the check's assertion held
    pub passed: bool,
}

impl CheckOutcome {
    /// A passing outcome
    #[must_use]
    pub fn passed(data: impl Into<Value>, metric: f64, message: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            metric,
            message: message.into(),
            passed: true,
        }
    }

    /// A failing outcome
    #[must_use]
    pub fn failed(data: impl Into<Value>, metric: f64, message: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            metric,
            message: message.into(),
            passed: false,
        }
    }

    /// Pass when the metric is zero, fail otherwise
    #[must_use]
    pub fn from_metric(data: impl Into<Value>, metric: f64, message: impl Into<String>) -> Self {
        if metric == 0.0 {
            Self::passed(data, metric, message)
        } else {
            Self::failed(data, metric, message)
        }
    }
}

/// A check could not be evaluated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CheckError(pub String);

impl CheckError {
    /// Create a check error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result of evaluating a check
pub type CheckResult = std::result::Result<CheckOutcome, CheckError>;

/// A pluggable unit that evaluates one model property
pub trait Check: Send + Sync {
    /// Static description of this check
    fn descriptor(&self) -> &CheckDescriptor;

    /// Parameter values for a parametrized check, `None` for a scalar check.
    ///
    /// An empty list is valid and yields a parametrized result with no cases.
    fn parameters(&self, _model: &Model) -> Option<Vec<String>> {
        None
    }

    /// Evaluate the check against a model, optionally for one parameter
    ///
    /// # Errors
    ///
    /// Returns a [`CheckError`] when the check cannot be evaluated.
    fn evaluate(&self, model: &Model, param: Option<&str>) -> CheckResult;
}

/// Evaluation function of a [`FnCheck`]
pub type EvaluateFn = fn(&Model, Option<&str>) -> CheckResult;

/// Parameter source of a [`FnCheck`]
pub type ParametersFn = fn(&Model) -> Vec<String>;

/// A check backed by plain functions
#[derive(Debug, Clone)]
pub struct FnCheck {
    descriptor: CheckDescriptor,
    evaluate: EvaluateFn,
    parameters: Option<ParametersFn>,
}

impl FnCheck {
    /// Create a scalar check
    #[must_use]
    pub fn new(descriptor: CheckDescriptor, evaluate: EvaluateFn) -> Self {
        Self {
            descriptor,
            evaluate,
            parameters: None,
        }
    }

    /// Make this check parametrized over the values returned by `parameters`
    #[must_use]
    pub fn parametrized(mut self, parameters: ParametersFn) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

impl Check for FnCheck {
    fn descriptor(&self) -> &CheckDescriptor {
        &self.descriptor
    }

    fn parameters(&self, model: &Model) -> Option<Vec<String>> {
        self.parameters.map(|f| f(model))
    }

    fn evaluate(&self, model: &Model, param: Option<&str>) -> CheckResult {
        (self.evaluate)(model, param)
    }
}

/// Registry of checks keyed by identifier, in registration order
#[derive(Default)]
pub struct CheckRegistry {
    checks: IndexMap<String, Box<dyn Check>>,
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckRegistry")
            .field("checks", &self.checks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CheckRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check
    ///
    /// # Errors
    ///
    /// Returns an error if a check with the same identifier exists.
    pub fn register(&mut self, check: impl Check + 'static) -> Result<()> {
        let id = check.descriptor().id.clone();
        if self.checks.contains_key(&id) {
            return Err(Error::DuplicateCheck(id));
        }
        self.checks.insert(id, Box::new(check));
        Ok(())
    }

    /// Look up a check
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn Check> {
        self.checks.get(id).map(AsRef::as_ref)
    }

    /// Look up a descriptor
    ///
    /// # Errors
    ///
    /// Returns an error if no check has this identifier.
    pub fn descriptor(&self, id: &str) -> Result<&CheckDescriptor> {
        self.get(id)
            .map(Check::descriptor)
            .ok_or_else(|| Error::CheckNotFound(id.to_string()))
    }

    /// Iterate over registered checks in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks.values().map(AsRef::as_ref)
    }

    /// All descriptors in registration order
    #[must_use]
    pub fn descriptors(&self) -> Vec<&CheckDescriptor> {
        self.iter().map(Check::descriptor).collect()
    }

    /// Number of registered checks
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
