//! Error types for gsm-qa-report

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during scoring and report generation
#[derive(Debug, Error)]
pub enum Error {
    /// A scored section has nothing to divide by
    #[error("Section '{section}' has no scorable tests")]
    EmptyCard {
        /// Section identifier
        section: String,
    },

    /// A configured test has no result
    #[error("Test '{test}' is configured in section '{section}' but was never executed")]
    UnexecutedTest {
        /// Section identifier
        section: String,
        /// Test identifier
        test: String,
    },

    /// A test that ran did not report a metric
    #[error("Test '{test}' has no metric")]
    MissingMetric {
        /// Test identifier
        test: String,
    },

    /// A metric or weight outside its valid range
    #[error("Test '{test}' has invalid value {value}")]
    InvalidMetric {
        /// Test identifier
        test: String,
        /// Offending value
        value: f64,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (from std::io)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Result store error
    #[error("Runner error: {0}")]
    Runner(#[from] gsm_qa_runner::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_card_display() {
        let err = Error::EmptyCard {
            section: "basic".to_string(),
        };
        assert_eq!(err.to_string(), "Section 'basic' has no scorable tests");
    }

    #[test]
    fn test_unexecuted_test_display() {
        let err = Error::UnexecutedTest {
            section: "basic".to_string(),
            test: "test_x".to_string(),
        };
        assert!(err.to_string().contains("test_x"));
        assert!(err.to_string().contains("never executed"));
    }

    #[test]
    fn test_invalid_metric_display() {
        let err = Error::InvalidMetric {
            test: "t1".to_string(),
            value: 1.5,
        };
        assert_eq!(err.to_string(), "Test 't1' has invalid value 1.5");
    }

    #[test]
    fn test_from_runner_error() {
        let err: Error = gsm_qa_runner::Error::MissingRevision("c1".to_string()).into();
        assert!(matches!(err, Error::Runner(_)));
    }
}
