//! Git access abstraction for testability
//!
//! Provenance and history reports need a handful of read-only queries
//! against a git repository. This module provides a trait over them, a runner
//! that spawns the `git` binary, and a mock for tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Result of executing a command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code (negative for signals)
    pub exit_code: i32,
    /// Whether the command succeeded
    pub success: bool,
}

impl CommandOutput {
    /// Create a successful command output
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
            success: true,
        }
    }

    /// Create a failed command output
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
            success: false,
        }
    }
}

/// One commit of a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full commit hash
    pub hexsha: String,
    /// Author name
    pub author: String,
    /// Author date, ISO-8601 with a space separator
    pub timestamp: String,
}

impl CommitInfo {
    /// Create commit info
    #[must_use]
    pub fn new(
        hexsha: impl Into<String>,
        author: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            hexsha: hexsha.into(),
            author: author.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Field separator used in `git log` formats
const FIELD_SEP: char = '\u{1f}';

/// Read-only queries against a git repository
pub trait GitRunner: Send + Sync {
    /// Names of the local branches
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be queried.
    fn branches(&self) -> Result<Vec<String>>;

    /// Commits of a branch, newest first.
    ///
    /// With a `path`, only commits that modified that path are listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch cannot be read.
    fn commits(&self, branch: &str, path: Option<&Path>) -> Result<Vec<CommitInfo>>;

    /// Name of the checked out branch
    ///
    /// # Errors
    ///
    /// Returns an error outside a repository or with a detached HEAD.
    fn current_branch(&self) -> Result<String>;

    /// The commit HEAD points at
    ///
    /// # Errors
    ///
    /// Returns an error outside a repository.
    fn head_commit(&self) -> Result<CommitInfo>;
}

/// Git runner that executes the `git` binary
#[derive(Debug, Clone)]
pub struct RealGitRunner {
    /// Path to git binary (default: "git")
    pub git_binary: String,
    /// Working tree the commands run in
    pub repository: PathBuf,
}

impl RealGitRunner {
    /// Create a runner for a repository
    #[must_use]
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: "git".to_string(),
            repository: repository.into(),
        }
    }

    /// Create with custom git binary path
    #[must_use]
    pub fn with_binary(mut self, git_binary: impl Into<String>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    fn execute(&self, args: &[&str]) -> CommandOutput {
        use std::process::Command;

        match Command::new(&self.git_binary)
            .arg("-C")
            .arg(&self.repository)
            .args(args)
            .output()
        {
            Ok(output) => CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                success: output.status.success(),
            },
            Err(e) => CommandOutput::failure(-1, format!("Failed to execute command: {e}")),
        }
    }

    fn checked(&self, args: &[&str]) -> Result<String> {
        let output = self.execute(args);
        if output.success {
            Ok(output.stdout)
        } else {
            Err(Error::Git {
                command: format!("git {}", args.join(" ")),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

fn log_format() -> String {
    format!("--format=%H{FIELD_SEP}%an{FIELD_SEP}%ai")
}

/// Parse `git log` output written with [`log_format`]
fn parse_log(stdout: &str) -> Vec<CommitInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(FIELD_SEP);
            let hexsha = fields.next()?.trim();
            if hexsha.is_empty() {
                return None;
            }
            let author = fields.next().unwrap_or_default();
            let timestamp = fields.next().unwrap_or_default();
            Some(CommitInfo::new(hexsha, author, timestamp))
        })
        .collect()
}

impl GitRunner for RealGitRunner {
    fn branches(&self) -> Result<Vec<String>> {
        let stdout = self.checked(&["for-each-ref", "--format=%(refname:short)", "refs/heads/"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    fn commits(&self, branch: &str, path: Option<&Path>) -> Result<Vec<CommitInfo>> {
        let format = log_format();
        let path_str = path.map(|p| p.display().to_string());
        let mut args = vec!["log", format.as_str(), branch];
        if let Some(p) = &path_str {
            args.push("--");
            args.push(p);
        }
        Ok(parse_log(&self.checked(&args)?))
    }

    fn current_branch(&self) -> Result<String> {
        let branch = self.checked(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = branch.trim();
        if branch == "HEAD" {
            return Err(Error::Git {
                command: "git rev-parse --abbrev-ref HEAD".to_string(),
                stderr: "detached HEAD".to_string(),
            });
        }
        Ok(branch.to_string())
    }

    fn head_commit(&self) -> Result<CommitInfo> {
        let format = log_format();
        parse_log(&self.checked(&["log", "-1", format.as_str(), "HEAD"])?)
            .into_iter()
            .next()
            .ok_or_else(|| Error::Git {
                command: "git log -1 HEAD".to_string(),
                stderr: "no commits".to_string(),
            })
    }
}

/// Mock git runner for testing
#[derive(Debug, Clone, Default)]
pub struct MockGitRunner {
    /// Branch name to commits, newest first
    pub branches: BTreeMap<String, Vec<CommitInfo>>,
    /// Checked out branch
    pub current: Option<String>,
}

impl MockGitRunner {
    /// Create an empty mock repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch with its commits, newest first
    #[must_use]
    pub fn with_commits(mut self, branch: impl Into<String>, commits: Vec<CommitInfo>) -> Self {
        self.branches.insert(branch.into(), commits);
        self
    }

    /// Set the checked out branch
    #[must_use]
    pub fn with_current_branch(mut self, branch: impl Into<String>) -> Self {
        self.current = Some(branch.into());
        self
    }

    fn missing(what: &str) -> Error {
        Error::Git {
            command: "mock".to_string(),
            stderr: what.to_string(),
        }
    }
}

impl GitRunner for MockGitRunner {
    fn branches(&self) -> Result<Vec<String>> {
        Ok(self.branches.keys().cloned().collect())
    }

    fn commits(&self, branch: &str, _path: Option<&Path>) -> Result<Vec<CommitInfo>> {
        self.branches
            .get(branch)
            .cloned()
            .ok_or_else(|| Self::missing(&format!("unknown branch '{branch}'")))
    }

    fn current_branch(&self) -> Result<String> {
        self.current.clone().ok_or_else(|| Self::missing("no branch"))
    }

    fn head_commit(&self) -> Result<CommitInfo> {
        let branch = self.current_branch()?;
        self.commits(&branch, None)?
            .into_iter()
            .next()
            .ok_or_else(|| Self::missing("no commits"))
    }
}
