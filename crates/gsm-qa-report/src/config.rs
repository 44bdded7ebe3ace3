//! Report configuration
//!
//! Describes how tests are grouped into cards, how they are weighted and how
//! tests without a metric are scored. The default configuration covering the
//! built-in checks is embedded; custom YAML files are merged on top of it.
//!
//! ```yaml
//! cards:
//!   scored:
//!     title: "Core Tests"
//!     sections:
//!       basic: {title: "Basic", cases: [test_model_id_presence], weight: 1.0}
//!   statistics: {title: "Statistics", cases: [test_genes_presence]}
//! weights: {test_model_id_presence: 2.0}
//! scoring: {unscored: worst_case}
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use gsm_qa_checks::CheckRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Error, Result};

const DEFAULT_CONFIG: &str = include_str!("default_config.yaml");

/// Key of the card holding unconfigured tests
pub const MISC_CARD: &str = "misc";

/// Title of the card holding unconfigured tests
pub const MISC_TITLE: &str = "Misc. Tests";

fn default_weight() -> f64 {
    1.0
}

/// How tests without a metric that errored or were skipped are scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscoredPolicy {
    /// Score as metric 1.0
    #[default]
    WorstCase,
    /// Leave out of the section's score and total
    Exclude,
}

impl std::str::FromStr for UnscoredPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "worst_case" => Ok(Self::WorstCase),
            "exclude" => Ok(Self::Exclude),
            other => Err(Error::Config(format!("unknown unscored policy '{other}'"))),
        }
    }
}

/// Scoring options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Policy for tests without a metric
    #[serde(default)]
    pub unscored: UnscoredPolicy,
}

/// A weighted group of tests within the scored card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Test identifiers, in display order
    #[serde(default)]
    pub cases: Vec<String>,
    /// Weight of this section in the total score
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Derived section score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Section {
    /// Create a section with unit weight
    #[must_use]
    pub fn new(title: impl Into<String>, cases: &[&str]) -> Self {
        Self {
            title: title.into(),
            cases: cases.iter().map(|c| (*c).to_string()).collect(),
            weight: default_weight(),
            score: None,
        }
    }

    /// Set the weight
    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// The card whose sections are scored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredCard {
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Section identifier to section, in display order
    #[serde(default)]
    pub sections: IndexMap<String, Section>,
}

/// A card grouping tests for display only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Test identifiers
    #[serde(default)]
    pub cases: Vec<String>,
}

/// The scored card and any number of display cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cards {
    /// Scored card
    #[serde(default)]
    pub scored: ScoredCard,
    /// Display cards by key
    #[serde(flatten)]
    pub others: IndexMap<String, Card>,
}

/// Layout and scoring configuration of reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfiguration {
    /// Card layout
    #[serde(default)]
    pub cards: Cards,
    /// Test identifier to weight
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    /// Scoring options
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Partial configuration read from a custom file
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    #[serde(default)]
    cards: CardsOverlay,
    #[serde(default)]
    weights: BTreeMap<String, f64>,
    #[serde(default)]
    scoring: Option<ScoringConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct CardsOverlay {
    #[serde(default)]
    scored: Option<ScoredOverlay>,
    #[serde(flatten)]
    others: IndexMap<String, Card>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoredOverlay {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    sections: IndexMap<String, Section>,
}

impl ReportConfiguration {
    /// The embedded default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded YAML is invalid.
    pub fn default_config() -> Result<Self> {
        debug!("Loading default configuration.");
        Self::from_yaml(DEFAULT_CONFIG)
    }

    /// Parse a complete configuration
    ///
    /// # Errors
    ///
    /// Returns an error for invalid YAML or values.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// The default configuration with custom files merged on top, in order
    ///
    /// # Errors
    ///
    /// Returns an error if a readable file holds invalid configuration.
    pub fn load<P: AsRef<Path>>(custom: &[P]) -> Result<Self> {
        let mut config = Self::default_config()?;
        for path in custom {
            config.merge_file(path)?;
        }
        Ok(config)
    }

    /// Merge a custom configuration file.
    ///
    /// A file that cannot be read is logged and skipped; returns whether the
    /// file was merged.
    ///
    /// # Errors
    ///
    /// Returns an error if the file holds invalid configuration.
    pub fn merge_file(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        debug!("Loading custom configuration '{}'.", path.display());
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                error!(
                    "Failed to load the custom configuration '{}'. Skipping.",
                    path.display()
                );
                debug!("{e}");
                return Ok(false);
            }
        };
        self.merge_yaml(&content)?;
        Ok(true)
    }

    /// Merge a custom configuration.
    ///
    /// Sections and cards are replaced or added by key, weights are
    /// extended and the scoring policy is replaced when given.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid YAML or values.
    pub fn merge_yaml(&mut self, yaml: &str) -> Result<()> {
        let overlay: ConfigOverlay = serde_yaml::from_str(yaml)?;
        if let Some(scored) = overlay.cards.scored {
            if let Some(title) = scored.title {
                self.cards.scored.title = title;
            }
            self.cards.scored.sections.extend(scored.sections);
        }
        self.cards.others.extend(overlay.cards.others);
        self.weights.extend(overlay.weights);
        if let Some(scoring) = overlay.scoring {
            self.scoring = scoring;
        }
        self.validate()
    }

    /// Reject negative or non-finite weights
    fn validate(&self) -> Result<()> {
        for (id, section) in &self.cards.scored.sections {
            if !section.weight.is_finite() || section.weight < 0.0 {
                return Err(Error::Config(format!(
                    "section '{id}' has invalid weight {}",
                    section.weight
                )));
            }
        }
        for (test, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(Error::Config(format!(
                    "weight of '{test}' is invalid: {weight}"
                )));
            }
        }
        Ok(())
    }

    /// Fill in registry default weights for tests without a configured weight
    pub fn apply_registry_defaults(&mut self, registry: &CheckRegistry) {
        for descriptor in registry.descriptors() {
            self.weights
                .entry(descriptor.id.clone())
                .or_insert(descriptor.weight_default);
        }
    }

    /// Weight of a test, 1.0 when not configured
    #[must_use]
    pub fn weight(&self, test: &str) -> f64 {
        self.weights.get(test).copied().unwrap_or(1.0)
    }

    /// Set the unscored policy
    #[must_use]
    pub const fn with_unscored(mut self, policy: UnscoredPolicy) -> Self {
        self.scoring.unscored = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_loads() {
        let config = ReportConfiguration::default_config().expect("default");
        assert_eq!(config.cards.scored.title, "Core Tests");
        let sections: Vec<_> = config.cards.scored.sections.keys().collect();
        assert_eq!(sections, ["basic", "annotation", "consistency"]);
        assert_eq!(config.cards.scored.sections["consistency"].weight, 3.0);
        assert!(config.cards.others.contains_key("statistics"));
        assert_eq!(config.scoring.unscored, UnscoredPolicy::WorstCase);
    }

    #[test]
    fn test_default_config_covers_builtin_checks() {
        let config = ReportConfiguration::default_config().expect("default");
        let registry = gsm_qa_checks::builtin_registry().expect("registry");
        let configured: Vec<&String> = config
            .cards
            .scored
            .sections
            .values()
            .flat_map(|s| &s.cases)
            .chain(config.cards.others.values().flat_map(|c| &c.cases))
            .collect();
        for descriptor in registry.descriptors() {
            assert!(configured.contains(&&descriptor.id), "{}", descriptor.id);
        }
    }

    #[test]
    fn test_section_weight_defaults_to_one() {
        let config = ReportConfiguration::from_yaml(
            "cards: {scored: {sections: {s: {cases: [t1]}}}}",
        )
        .expect("parse");
        assert_eq!(config.cards.scored.sections["s"].weight, 1.0);
        assert_eq!(config.weight("t1"), 1.0);
    }

    #[test]
    fn test_merge_replaces_and_extends() {
        let mut config = ReportConfiguration::default_config().expect("default");
        config
            .merge_yaml(
                r"
cards:
  scored:
    sections:
      basic: {title: Basic, cases: [test_model_id_presence], weight: 2.0}
      extra: {title: Extra, cases: [test_custom]}
  custom: {title: Custom, cases: [test_other]}
weights: {test_model_id_presence: 4.0}
scoring: {unscored: exclude}
",
            )
            .expect("merge");
        let sections = &config.cards.scored.sections;
        assert_eq!(sections["basic"].cases, ["test_model_id_presence"]);
        assert_eq!(sections["basic"].weight, 2.0);
        assert!(sections.contains_key("annotation"));
        assert!(sections.contains_key("extra"));
        assert_eq!(config.cards.scored.title, "Core Tests");
        assert!(config.cards.others.contains_key("statistics"));
        assert!(config.cards.others.contains_key("custom"));
        assert_eq!(config.weight("test_model_id_presence"), 4.0);
        assert_eq!(config.scoring.unscored, UnscoredPolicy::Exclude);
    }

    #[test]
    fn test_merge_without_scoring_keeps_policy() {
        let mut config = ReportConfiguration::default()
            .with_unscored(UnscoredPolicy::Exclude);
        config.merge_yaml("weights: {t: 2.0}").expect("merge");
        assert_eq!(config.scoring.unscored, UnscoredPolicy::Exclude);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = ReportConfiguration::default();
        assert!(matches!(
            config.merge_yaml("weights: {t: -1.0}"),
            Err(Error::Config(msg)) if msg.contains("weight of 't'")
        ));
        assert!(
            ReportConfiguration::from_yaml("cards: {scored: {sections: {s: {weight: -2}}}}")
                .is_err()
        );
    }

    #[test]
    fn test_load_skips_unreadable_file() {
        let config =
            ReportConfiguration::load(&["/nonexistent/config.yml"]).expect("skipped");
        assert_eq!(
            config,
            ReportConfiguration::default_config().expect("default")
        );
    }

    #[test]
    fn test_load_merges_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "weights: {{test_genes_presence: 0.5}}").expect("write");
        let config = ReportConfiguration::load(&[file.path()]).expect("load");
        assert_eq!(config.weight("test_genes_presence"), 0.5);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "cards: [").expect("write");
        assert!(ReportConfiguration::load(&[file.path()]).is_err());
    }

    #[test]
    fn test_registry_defaults_do_not_override() {
        let mut config = ReportConfiguration::default();
        config
            .weights
            .insert("test_reaction_bounds_consistency".to_string(), 5.0);
        let registry = gsm_qa_checks::builtin_registry().expect("registry");
        config.apply_registry_defaults(&registry);
        assert_eq!(config.weight("test_reaction_bounds_consistency"), 5.0);
        assert_eq!(config.weight("test_genes_presence"), 1.0);
        assert_eq!(config.weights.len(), registry.len());
    }

    #[test]
    fn test_unscored_policy_from_str() {
        assert_eq!(
            "exclude".parse::<UnscoredPolicy>().expect("parse"),
            UnscoredPolicy::Exclude
        );
        assert!("ignore".parse::<UnscoredPolicy>().is_err());
    }
}
