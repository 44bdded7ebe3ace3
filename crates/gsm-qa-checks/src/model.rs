//! Metabolic model representation
//!
//! A cobra-style JSON model: metabolites, reactions, genes and compartments.
//! Loading performs a structural validation and reports problems as
//! notifications instead of failing on the first one.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A metabolite (species) of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metabolite {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Compartment identifier
    #[serde(default)]
    pub compartment: Option<String>,
    /// Chemical formula
    #[serde(default)]
    pub formula: Option<String>,
    /// Formal charge
    #[serde(default)]
    pub charge: Option<i32>,
    /// Cross-references to external databases
    #[serde(default)]
    pub annotation: BTreeMap<String, Value>,
}

impl Metabolite {
    /// Create a bare metabolite in a compartment
    #[must_use]
    pub fn new(id: impl Into<String>, compartment: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            compartment: Some(compartment.into()),
            formula: None,
            charge: None,
            annotation: BTreeMap::new(),
        }
    }

    /// Set the chemical formula
    #[must_use]
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Set the formal charge
    #[must_use]
    pub const fn with_charge(mut self, charge: i32) -> Self {
        self.charge = Some(charge);
        self
    }
}

fn default_upper_bound() -> f64 {
    1000.0
}

/// A reaction of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Stoichiometry: metabolite id -> coefficient
    #[serde(default)]
    pub metabolites: IndexMap<String, f64>,
    /// Lower flux bound
    #[serde(default)]
    pub lower_bound: f64,
    /// Upper flux bound
    #[serde(default = "default_upper_bound")]
    pub upper_bound: f64,
    /// Gene-protein-reaction rule
    #[serde(default)]
    pub gene_reaction_rule: String,
    /// Subsystem name
    #[serde(default)]
    pub subsystem: Option<String>,
    /// Objective coefficient
    #[serde(default)]
    pub objective_coefficient: f64,
    /// Cross-references to external databases
    #[serde(default)]
    pub annotation: BTreeMap<String, Value>,
}

impl Reaction {
    /// Create a reaction with the given stoichiometry and default bounds
    #[must_use]
    pub fn new(id: impl Into<String>, metabolites: &[(&str, f64)]) -> Self {
        Self {
            id: id.into(),
            name: None,
            metabolites: metabolites
                .iter()
                .map(|(m, c)| ((*m).to_string(), *c))
                .collect(),
            lower_bound: 0.0,
            upper_bound: default_upper_bound(),
            gene_reaction_rule: String::new(),
            subsystem: None,
            objective_coefficient: 0.0,
            annotation: BTreeMap::new(),
        }
    }

    /// Set the flux bounds
    #[must_use]
    pub const fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    /// Set the gene-protein-reaction rule
    #[must_use]
    pub fn with_gene_rule(mut self, rule: impl Into<String>) -> Self {
        self.gene_reaction_rule = rule.into();
        self
    }

    /// A reaction with a single participant exchanges mass with the boundary
    #[must_use]
    pub fn is_boundary(&self) -> bool {
        self.metabolites.len() == 1
    }
}

/// A gene of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Cross-references to external databases
    #[serde(default)]
    pub annotation: BTreeMap<String, Value>,
}

impl Gene {
    /// Create a gene
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            annotation: BTreeMap::new(),
        }
    }
}

/// A genome-scale metabolic model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Model version string
    #[serde(default)]
    pub version: Option<String>,
    /// Compartments: short id -> long name
    #[serde(default)]
    pub compartments: IndexMap<String, String>,
    /// Metabolites
    #[serde(default)]
    pub metabolites: Vec<Metabolite>,
    /// Reactions
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Genes
    #[serde(default)]
    pub genes: Vec<Gene>,
}

impl Model {
    /// Create an empty model with the given identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Load a model from a JSON file, or YAML for `.yml`/`.yaml` files
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Parse a model from a YAML string
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    /// Parse a model from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    /// Serialize to a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }

    /// Compartment identifiers, falling back to those used by metabolites
    #[must_use]
    pub fn compartment_ids(&self) -> Vec<String> {
        if !self.compartments.is_empty() {
            return self.compartments.keys().cloned().collect();
        }
        let mut seen = HashSet::new();
        self.metabolites
            .iter()
            .filter_map(|m| m.compartment.clone())
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }

    /// Metabolites located in the given compartment
    #[must_use]
    pub fn metabolites_in(&self, compartment: &str) -> Vec<&Metabolite> {
        self.metabolites
            .iter()
            .filter(|m| m.compartment.as_deref() == Some(compartment))
            .collect()
    }

    /// Add a metabolite
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        self.metabolites.push(metabolite);
    }

    /// Add a reaction
    pub fn add_reaction(&mut self, reaction: Reaction) {
        self.reactions.push(reaction);
    }

    /// Add a gene
    pub fn add_gene(&mut self, gene: Gene) {
        self.genes.push(gene);
    }
}

/// Errors and warnings found while loading a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    /// Problems that prevent the model from being tested
    pub errors: Vec<String>,
    /// Problems worth reporting that do not block testing
    pub warnings: Vec<String>,
}

impl Notifications {
    /// Whether no errors were recorded
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Load and structurally validate a model file.
///
/// Returns `None` for the model when it cannot be parsed or has structural
/// errors; all problems are listed in the notifications.
#[must_use]
pub fn validate_model(path: impl AsRef<Path>) -> (Option<Model>, Notifications) {
    let path = path.as_ref();
    let mut notifications = Notifications::default();
    let model = match Model::from_file(path) {
        Ok(model) => model,
        Err(e) => {
            notifications
                .errors
                .push(format!("Failed to load '{}': {e}", path.display()));
            return (None, notifications);
        }
    };
    check_structure(&model, &mut notifications);
    debug!(
        errors = notifications.errors.len(),
        warnings = notifications.warnings.len(),
        "Validated model '{}'",
        path.display()
    );
    if notifications.is_ok() {
        (Some(model), notifications)
    } else {
        (None, notifications)
    }
}

/// Record structural problems of an already parsed model
pub fn check_structure(model: &Model, notifications: &mut Notifications) {
    if model.id.as_deref().is_none_or(str::is_empty) {
        notifications
            .warnings
            .push("The model has no identifier".to_string());
    }

    report_duplicates(
        "metabolite",
        model.metabolites.iter().map(|m| m.id.as_str()),
        notifications,
    );
    report_duplicates(
        "reaction",
        model.reactions.iter().map(|r| r.id.as_str()),
        notifications,
    );
    report_duplicates(
        "gene",
        model.genes.iter().map(|g| g.id.as_str()),
        notifications,
    );

    let known: HashSet<&str> = model.metabolites.iter().map(|m| m.id.as_str()).collect();
    for reaction in &model.reactions {
        for met in reaction.metabolites.keys() {
            if !known.contains(met.as_str()) {
                notifications.errors.push(format!(
                    "Reaction '{}' references unknown metabolite '{met}'",
                    reaction.id
                ));
            }
        }
    }

    if !model.compartments.is_empty() {
        for met in &model.metabolites {
            if let Some(c) = &met.compartment {
                if !model.compartments.contains_key(c) {
                    warn!(metabolite = %met.id, compartment = %c, "Undeclared compartment");
                    notifications.warnings.push(format!(
                        "Metabolite '{}' is in undeclared compartment '{c}'",
                        met.id
                    ));
                }
            }
        }
    }
}

fn report_duplicates<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
    notifications: &mut Notifications,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            notifications
                .errors
                .push(format!("Duplicate {kind} identifier '{id}'"));
        }
    }
}
