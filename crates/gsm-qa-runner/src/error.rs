//! Error types for gsm-qa-runner

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running checks and managing results
#[derive(Debug, Error)]
pub enum Error {
    /// The result store holds values JSON cannot represent
    #[error("Non-finite values found at: {}", paths.join(", "))]
    NonFinite {
        /// Key paths of every offending value
        paths: Vec<String>,
    },

    /// A revision is not present in the storage backend
    #[error("No result stored for revision '{0}'")]
    MissingRevision(String),

    /// A git command failed
    #[error("Git command failed: {command} ({stderr})")]
    Git {
        /// The git invocation
        command: String,
        /// Standard error output
        stderr: String,
    },

    /// Execution error
    #[error("Execution error: {0}")]
    Execution(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Checks error
    #[error("Checks error: {0}")]
    ChecksError(#[from] gsm_qa_checks::Error),
}
