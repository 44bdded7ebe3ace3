//! GSM QA CLI Library
//!
//! Library functions for the gsm-qa command-line tool.

#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use gsm_qa_checks::{CheckRegistry, Model, builtin_registry, validate_model};
use gsm_qa_report::{
    DiffReport, HistoryReport, HtmlReport, JunitReport, ReportConfiguration, ReportKind,
    SnapshotReport, compute_score,
};
use gsm_qa_runner::{
    ExecutionConfig, ExecutionSummary, Executor, GitRunner, HistoryManager, RealGitRunner,
    RepoResultManager, ResultManager, Selection, SuiteResult,
};
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Options of a check run
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Only run these checks or modules
    pub exclusive: Vec<String>,
    /// Skip these checks or modules
    pub skip: Vec<String>,
    /// Record every check as skipped without evaluating
    pub dry_run: bool,
}

/// Output format of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Static HTML page embedding the JSON
    #[default]
    Html,
    /// Plain JSON
    Json,
}

/// Build the executor configuration
pub fn build_execution_config(config: &RunConfig) -> ExecutionConfig {
    ExecutionConfig {
        selection: Selection::new(config.exclusive.iter().cloned(), config.skip.iter().cloned()),
        dry_run: config.dry_run,
    }
}

/// The built-in check registry
pub fn load_registry() -> Result<CheckRegistry, String> {
    builtin_registry().map_err(|e| format!("Error building check registry: {e}"))
}

/// Load and validate a model, aborting with every error found
pub fn load_model(path: &Path) -> Result<Model, String> {
    let (model, notifications) = validate_model(path);
    for warning in &notifications.warnings {
        warn!("{warning}");
    }
    match model {
        Some(model) if notifications.is_ok() => Ok(model),
        _ => Err(format!(
            "Model '{}' could not be loaded:\n  {}",
            path.display(),
            notifications.errors.join("\n  ")
        )),
    }
}

/// Run the built-in checks against a model
pub fn run_checks(
    model: &Model,
    registry: &CheckRegistry,
    config: &RunConfig,
    git: Option<&dyn GitRunner>,
) -> (SuiteResult, ExecutionSummary) {
    let mut result = SuiteResult::new();
    if let Some(git) = git {
        result.meta.add_git(git);
    }
    let summary = Executor::with_config(registry, build_execution_config(config))
        .execute(model, &mut result);
    (result, summary)
}

/// Store a result as a single JSON file
pub fn store_result(result: &SuiteResult, path: &Path) -> Result<(), String> {
    ResultManager::new()
        .store(result, path, true)
        .map_err(|e| format!("Error writing result: {e}"))
}

/// Store a result under the current commit of a repository
pub fn store_in_repo(
    result: &mut SuiteResult,
    location: &Path,
    git: &dyn GitRunner,
) -> Result<PathBuf, String> {
    RepoResultManager::new(location)
        .store(result, git, None)
        .map_err(|e| format!("Error writing result: {e}"))
}

/// Load a stored result
pub fn load_result(path: &Path) -> Result<SuiteResult, String> {
    ResultManager::new()
        .load(path)
        .map_err(|e| format!("Error loading result '{}': {e}", path.display()))
}

/// Load the report configuration with custom files and registry weights
pub fn load_report_config(
    custom: &[PathBuf],
    unscored: Option<&str>,
    registry: &CheckRegistry,
) -> Result<ReportConfiguration, String> {
    let mut config =
        ReportConfiguration::load(custom).map_err(|e| format!("Error loading configuration: {e}"))?;
    config.apply_registry_defaults(registry);
    if let Some(policy) = unscored {
        config.scoring.unscored = policy.parse().map_err(|e| format!("{e}"))?;
    }
    Ok(config)
}

fn render(kind: ReportKind, json: String, format: ReportFormat) -> String {
    match format {
        ReportFormat::Json => json,
        ReportFormat::Html => HtmlReport::default().generate(kind, &json),
    }
}

/// Build a snapshot report of one result
pub fn snapshot_report(
    result: &SuiteResult,
    config: &ReportConfiguration,
    format: ReportFormat,
) -> Result<String, String> {
    let json = SnapshotReport::new(config)
        .render_json(result, true)
        .map_err(|e| format!("Error building snapshot report: {e}"))?;
    Ok(render(ReportKind::Snapshot, json, format))
}

/// Test several models and build a side-by-side report
pub fn diff_report(
    models: &[PathBuf],
    registry: &CheckRegistry,
    run: &RunConfig,
    config: &ReportConfiguration,
    format: ReportFormat,
) -> Result<String, String> {
    if models.len() < 2 {
        return Err("A diff report needs at least two models".to_string());
    }
    let mut results = IndexMap::with_capacity(models.len());
    for path in models {
        let model = load_model(path)?;
        let (result, summary) = run_checks(&model, registry, run, None);
        info!("{}: {} checks, {} failed", path.display(), summary.total, summary.failed);
        let label = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
        results.insert(label, result);
    }
    let json = DiffReport::build(&results, config)
        .and_then(|report| report.to_json(true))
        .map_err(|e| format!("Error building diff report: {e}"))?;
    Ok(render(ReportKind::Diff, json, format))
}

/// Build a history report from results stored per commit
pub fn history_report(
    repository: &Path,
    location: &Path,
    model: Option<&Path>,
    deployment: &str,
    config: &ReportConfiguration,
    format: ReportFormat,
) -> Result<String, String> {
    let git = RealGitRunner::new(repository);
    let backend = RepoResultManager::new(location);
    let mut history = HistoryManager::new(&git, &backend);
    if let Some(model) = model {
        history = history.with_model(model);
    }
    history
        .load_history(&[deployment])
        .map_err(|e| format!("Error reading history: {e}"))?;
    let json = HistoryReport::build(&history, config)
        .and_then(|report| report.to_json(true))
        .map_err(|e| format!("Error building history report: {e}"))?;
    Ok(render(ReportKind::History, json, format))
}

/// Score a result and format the section and total scores
pub fn format_score(result: &SuiteResult, config: &ReportConfiguration) -> Result<String, String> {
    let scored = compute_score(result, config).map_err(|e| format!("Error scoring result: {e}"))?;
    let mut output = String::new();
    if let Some(score) = &scored.score {
        for section in &score.sections {
            let _ = writeln!(output, "{:<24} {:>6.1}%", section.section, section.score * 100.0);
        }
        let _ = writeln!(output, "{:<24} {:>6.1}%", "total", score.total_score * 100.0);
    }
    Ok(output)
}

/// Export a result as JUnit XML
pub fn junit_report(result: &SuiteResult) -> Result<String, String> {
    JunitReport::default()
        .generate(result)
        .map_err(|e| format!("Error generating JUnit report: {e}"))
}
