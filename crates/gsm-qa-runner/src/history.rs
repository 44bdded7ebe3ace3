//! Result history
//!
//! Loads the stored results of every commit across the branches of a git
//! repository. Commits shared between branches are loaded once. The whole
//! history is held in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::git::{CommitInfo, GitRunner};
use crate::manager::ResultBackend;
use crate::result::SuiteResult;

/// Branch deployment results are usually published to
pub const DEFAULT_DEPLOYMENT: &str = "gh-pages";

/// Branches and the commits that touched the model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchStructure {
    /// Branch name to commit hashes, newest first
    pub branches: IndexMap<String, Vec<String>>,
    /// Commit hash to commit info, each commit once
    pub commits: IndexMap<String, CommitInfo>,
}

/// Access to results across the commit history of a repository
pub struct HistoryManager<'a> {
    git: &'a dyn GitRunner,
    backend: &'a dyn ResultBackend,
    model: Option<PathBuf>,
    history: Option<BranchStructure>,
    results: Option<HashMap<String, SuiteResult>>,
    missing: Vec<String>,
}

impl std::fmt::Debug for HistoryManager<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("model", &self.model)
            .field("history", &self.history)
            .field("loaded", &self.results.as_ref().map(HashMap::len))
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}

impl<'a> HistoryManager<'a> {
    /// Create a manager over a repository and a result backend
    #[must_use]
    pub fn new(git: &'a dyn GitRunner, backend: &'a dyn ResultBackend) -> Self {
        Self {
            git,
            backend,
            model: None,
            history: None,
            results: None,
            missing: Vec::new(),
        }
    }

    /// Only consider commits that modified this model file
    #[must_use]
    pub fn with_model(mut self, model: impl Into<PathBuf>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Record the branches and their commits, skipping the named branches
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be queried.
    pub fn build_branch_structure(&mut self, skip: &[&str]) -> Result<&BranchStructure> {
        let mut structure = BranchStructure::default();
        for branch in self.git.branches()? {
            debug!("Inspecting branch {branch}");
            if skip.contains(&branch.as_str()) {
                continue;
            }
            let commits = self.git.commits(&branch, self.model.as_deref())?;
            let hashes = commits.iter().map(|c| c.hexsha.clone()).collect();
            for commit in commits {
                structure
                    .commits
                    .entry(commit.hexsha.clone())
                    .or_insert(commit);
            }
            structure.branches.insert(branch, hashes);
        }
        debug!(
            branches = structure.branches.len(),
            commits = structure.commits.len(),
            "Built branch structure"
        );
        Ok(self.history.insert(structure))
    }

    /// The branch structure, once built
    #[must_use]
    pub fn branch_structure(&self) -> Option<&BranchStructure> {
        self.history.as_ref()
    }

    /// Iterate over branch names and their commits, newest first
    pub fn iter_branches(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.history
            .iter()
            .flat_map(|h| h.branches.iter().map(|(b, c)| (b.as_str(), c.as_slice())))
    }

    /// Iterate over every distinct commit
    pub fn iter_commits(&self) -> impl Iterator<Item = &CommitInfo> {
        self.history.iter().flat_map(|h| h.commits.values())
    }

    /// Load the results of every distinct commit into memory.
    ///
    /// Builds the branch structure first if needed. Commits without a stored
    /// result are logged and listed by [`HistoryManager::missing`].
    ///
    /// # Errors
    ///
    /// Returns an error if the branch structure cannot be built or a stored
    /// result exists but cannot be read.
    pub fn load_history(&mut self, skip: &[&str]) -> Result<()> {
        if self.history.is_none() {
            self.build_branch_structure(skip)?;
        }
        let commits: Vec<String> = self
            .history
            .as_ref()
            .map(|h| h.commits.keys().cloned().collect())
            .unwrap_or_default();
        let mut results = HashMap::with_capacity(commits.len());
        self.missing.clear();
        for commit in commits {
            match self.backend.load_revision(&commit) {
                Ok(mut result) => {
                    if result.meta.branch.is_none() {
                        result.meta.branch = self.branch_of(&commit).map(ToString::to_string);
                    }
                    results.insert(commit, result);
                }
                Err(Error::MissingRevision(_)) => {
                    error!("Could not load result '{commit}'.");
                    self.missing.push(commit);
                }
                Err(e) => {
                    error!("Result '{commit}' is unreadable: {e}");
                    return Err(e);
                }
            }
        }
        info!(
            loaded = results.len(),
            missing = self.missing.len(),
            "Loaded result history"
        );
        self.results = Some(results);
        Ok(())
    }

    fn branch_of(&self, commit: &str) -> Option<&str> {
        self.iter_branches()
            .find(|(_, commits)| commits.iter().any(|c| c == commit))
            .map(|(branch, _)| branch)
    }

    /// The result of a commit
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRevision`] if no result was loaded for it, or
    /// an error if the history has not been loaded.
    pub fn get_result(&self, commit: &str) -> Result<&SuiteResult> {
        self.results
            .as_ref()
            .ok_or_else(|| Error::Execution("load_history must be called first".to_string()))?
            .get(commit)
            .ok_or_else(|| Error::MissingRevision(commit.to_string()))
    }

    /// Whether a result was loaded for the commit
    #[must_use]
    pub fn contains(&self, commit: &str) -> bool {
        self.results
            .as_ref()
            .is_some_and(|results| results.contains_key(commit))
    }

    /// Commits whose result could not be loaded
    #[must_use]
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// The model path commits are filtered by
    #[must_use]
    pub fn model(&self) -> Option<&Path> {
        self.model.as_deref()
    }
}
