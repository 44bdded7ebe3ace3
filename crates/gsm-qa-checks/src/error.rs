//! Error types for gsm-qa-checks

use thiserror::Error;

/// Result type alias for gsm-qa-checks operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading models or registering checks
#[derive(Debug, Error)]
pub enum Error {
    /// A check with the same identifier was already registered
    #[error("Duplicate check: {0}")]
    DuplicateCheck(String),

    /// Check not found in registry
    #[error("Check not found: {0}")]
    CheckNotFound(String),

    /// Unknown presentation format
    #[error("Unknown format type: {0}")]
    UnknownFormatType(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CheckNotFound("test_model_id_presence".to_string());
        assert_eq!(err.to_string(), "Check not found: test_model_id_presence");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_duplicate_check_display() {
        let err = Error::DuplicateCheck("test_genes_presence".to_string());
        assert!(err.to_string().contains("test_genes_presence"));
    }
}
