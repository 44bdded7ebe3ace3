//! Result storage
//!
//! [`ResultManager`] reads and writes single JSON files.
//! [`RepoResultManager`] keeps one file per commit in a directory,
//! `<location>/<commit>.json`, and serves as the [`ResultBackend`] of
//! history reports.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::git::GitRunner;
use crate::jsonify::to_json;
use crate::result::SuiteResult;

/// Storage keyed by revision
pub trait ResultBackend {
    /// Load the result of a revision
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRevision`] if nothing is stored for it.
    fn load_revision(&self, revision: &str) -> Result<SuiteResult>;

    /// Whether a result is stored for the revision
    fn contains(&self, revision: &str) -> bool;
}

/// Store and load results as JSON files
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultManager;

impl ResultManager {
    /// Create a manager
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Write a result to a file
    ///
    /// # Errors
    ///
    /// Returns an error if the result holds non-finite values or the file
    /// cannot be written.
    pub fn store(&self, result: &SuiteResult, path: impl AsRef<Path>, pretty: bool) -> Result<()> {
        let path = path.as_ref();
        info!("Storing result in '{}'.", path.display());
        let json = to_json(result, pretty)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a result from a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<SuiteResult> {
        let path = path.as_ref();
        info!("Loading result from '{}'.", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Store results per commit in a directory
#[derive(Debug, Clone)]
pub struct RepoResultManager {
    location: PathBuf,
    manager: ResultManager,
}

impl RepoResultManager {
    /// Manage results under `location`
    #[must_use]
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            manager: ResultManager::new(),
        }
    }

    /// Directory holding the results
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// File of a commit's result
    #[must_use]
    pub fn filename(&self, commit: &str) -> PathBuf {
        self.location.join(format!("{commit}.json"))
    }

    /// Annotate a result with git information and store it.
    ///
    /// Without an explicit `commit`, the repository's HEAD is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit cannot be determined or the file
    /// cannot be written.
    pub fn store(
        &self,
        result: &mut SuiteResult,
        git: &dyn GitRunner,
        commit: Option<&str>,
    ) -> Result<PathBuf> {
        match commit {
            Some(hexsha) => result.meta.commit_hash = Some(hexsha.to_string()),
            None => {
                let head = git.head_commit()?;
                result.meta.commit_hash = Some(head.hexsha);
                result.meta.commit_author = Some(head.author);
            }
        }
        if result.meta.branch.is_none() {
            result.meta.branch = git.current_branch().ok();
        }
        let hexsha = result
            .meta
            .commit_hash
            .clone()
            .ok_or_else(|| Error::Execution("no commit to store the result under".to_string()))?;
        std::fs::create_dir_all(&self.location)?;
        let path = self.filename(&hexsha);
        self.manager.store(result, &path, true)?;
        Ok(path)
    }

    /// Load the result of a commit
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRevision`] if no file exists for the commit.
    pub fn load(&self, commit: &str) -> Result<SuiteResult> {
        let path = self.filename(commit);
        if !path.is_file() {
            return Err(Error::MissingRevision(commit.to_string()));
        }
        let mut result = self.manager.load(&path)?;
        if result.meta.commit_hash.is_none() {
            result.meta.commit_hash = Some(commit.to_string());
        }
        Ok(result)
    }
}

impl ResultBackend for RepoResultManager {
    fn load_revision(&self, revision: &str) -> Result<SuiteResult> {
        self.load(revision)
    }

    fn contains(&self, revision: &str) -> bool {
        self.filename(revision).is_file()
    }
}
