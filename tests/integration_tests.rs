//! Integration tests for gsm-qa
//!
//! Tests the full pipeline from check execution through scoring, storage and
//! reporting.

use gsm_qa_checks::{
    CheckDescriptor, CheckError, CheckOutcome, CheckRegistry, CheckResult, FnCheck, Gene,
    Metabolite, Model, Reaction, builtin_registry,
};
use gsm_qa_report::{
    DiffReport, Error as ReportError, HistoryReport, MISC_CARD, ReportConfiguration,
    SnapshotReport, compute_score,
};
use gsm_qa_runner::{
    CommitInfo, Error as RunnerError, ExecutionConfig, Executor, HistoryManager, MockGitRunner,
    Outcome, Parametrized, RepoResultManager, ResultManager, Selection, SuiteResult, TestScore,
};
use indexmap::IndexMap;

fn metric_02(_model: &Model, _param: Option<&str>) -> CheckResult {
    Ok(CheckOutcome::from_metric(serde_json::json!(["x"]), 0.2, "1 of 5"))
}

fn metric_08(_model: &Model, _param: Option<&str>) -> CheckResult {
    Ok(CheckOutcome::from_metric(serde_json::json!(["x", "y", "z", "w"]), 0.8, "4 of 5"))
}

fn raises(_model: &Model, _param: Option<&str>) -> CheckResult {
    Err(CheckError::new("solver unavailable"))
}

fn panics(_model: &Model, _param: Option<&str>) -> CheckResult {
    panic!("index out of range")
}

fn not_a_number(_model: &Model, _param: Option<&str>) -> CheckResult {
    Ok(CheckOutcome::failed(serde_json::Value::Null, f64::NAN, "broken"))
}

fn toy_registry() -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    registry
        .register(FnCheck::new(CheckDescriptor::new("t1", "toy", "T1"), metric_02))
        .expect("register t1");
    registry
        .register(FnCheck::new(
            CheckDescriptor::new("t2", "toy", "T2").with_weight(2.0),
            metric_08,
        ))
        .expect("register t2");
    registry
}

fn toy_config() -> ReportConfiguration {
    ReportConfiguration::from_yaml(
        r"
cards:
  scored:
    title: Toy
    sections:
      card: {title: Card, cases: [t1, t2], weight: 1.0}
weights: {t2: 2.0}
",
    )
    .expect("config")
}

fn toy_model() -> Model {
    let mut model = Model::new("toy");
    model.add_metabolite(Metabolite::new("glc_c", "c").with_formula("C6H12O6"));
    model.add_metabolite(Metabolite::new("glc_e", "e"));
    model.add_reaction(Reaction::new("GLCt", &[("glc_e", -1.0), ("glc_c", 1.0)]).with_gene_rule("g1"));
    model.add_reaction(Reaction::new("EX_glc", &[("glc_e", -1.0)]));
    model.add_gene(Gene::new("g1"));
    model
}

fn run(registry: &CheckRegistry, config: ExecutionConfig, model: &Model) -> SuiteResult {
    let mut result = SuiteResult::new();
    Executor::with_config(registry, config).execute(model, &mut result);
    result
}

/// Two weighted tests in one card score 0.4 overall
#[test]
fn test_weighted_card_pipeline() {
    let registry = toy_registry();
    let result = run(&registry, ExecutionConfig::default(), &toy_model());
    assert_eq!(result.tests["t1"].result, Parametrized::Single(Outcome::Failed));

    let scored = compute_score(&result, &toy_config()).expect("score");
    assert_eq!(scored.tests["t1"].score, Some(TestScore::Scalar(0.8)));
    let t2 = scored.tests["t2"].score.as_ref().map(TestScore::total).expect("t2 score");
    assert!((t2 - 0.2).abs() < 1e-12);
    assert!((t2 * scored.weights["t2"] - 0.4).abs() < 1e-12);

    let summary = scored.score.expect("summary");
    assert!((summary.section("card").expect("card") - 0.4).abs() < 1e-12);
    assert!((summary.total_score - 0.4).abs() < 1e-12);
}

/// Registry weight defaults apply when the configuration gives none
#[test]
fn test_registry_weight_defaults() {
    let registry = toy_registry();
    let mut config = ReportConfiguration::from_yaml(
        "cards: {scored: {sections: {card: {cases: [t1, t2]}}}}",
    )
    .expect("config");
    config.apply_registry_defaults(&registry);
    let result = run(&registry, ExecutionConfig::default(), &toy_model());
    let summary = compute_score(&result, &config).expect("score").score.expect("summary");
    assert!((summary.total_score - 0.4).abs() < 1e-12);
}

/// The exclusive set wins over the skip set
#[test]
fn test_exclusive_forces_skip() {
    let registry = toy_registry();
    let config = ExecutionConfig {
        selection: Selection::new(["t1"], ["t1", "t2"]),
        ..ExecutionConfig::default()
    };
    let result = run(&registry, config, &toy_model());
    assert_eq!(result.tests["t1"].result, Parametrized::Single(Outcome::Failed));
    assert_eq!(result.tests["t2"].result, Parametrized::Single(Outcome::Skipped));
    assert_eq!(
        result.tests["t2"].message,
        Some(Parametrized::Single("Excluded.".to_string()))
    );
}

/// Skipped section tests are scored by the unscored policy
#[test]
fn test_skipped_section_test_is_scored_by_policy() {
    let registry = toy_registry();
    let config = ExecutionConfig {
        selection: Selection::new(["t1"], Vec::<String>::new()),
        ..ExecutionConfig::default()
    };
    let result = run(&registry, config, &toy_model());

    let worst = compute_score(&result, &toy_config()).expect("worst case");
    // (0.8 + 0.0 * 2) / 3
    let total = worst.score.expect("summary").total_score;
    assert!((total - 0.8 / 3.0).abs() < 1e-12);

    let exclude = toy_config().with_unscored(gsm_qa_report::UnscoredPolicy::Exclude);
    let total = compute_score(&result, &exclude)
        .expect("exclude")
        .score
        .expect("summary")
        .total_score;
    assert!((total - 0.8).abs() < 1e-12);
}

/// Errors and panics of checks are recorded, the run completes
#[test]
fn test_check_failures_do_not_abort_run() {
    let mut registry = toy_registry();
    registry
        .register(FnCheck::new(CheckDescriptor::new("t_raise", "toy", "Raises"), raises))
        .expect("register");
    registry
        .register(FnCheck::new(CheckDescriptor::new("t_panic", "toy", "Panics"), panics))
        .expect("register");
    let result = run(&registry, ExecutionConfig::default(), &toy_model());
    assert_eq!(result.tests.len(), 4);
    for id in ["t_raise", "t_panic"] {
        assert_eq!(result.tests[id].result, Parametrized::Single(Outcome::Error));
        assert!(result.tests[id].metric.is_none());
    }
    assert_eq!(
        result.tests["t_raise"].message,
        Some(Parametrized::Single("solver unavailable".to_string()))
    );
    assert!(result.has_failures());
}

/// Unconfigured tests end up in the misc card and do not change the score
#[test]
fn test_snapshot_assigns_misc_card() {
    let mut registry = toy_registry();
    registry
        .register(FnCheck::new(CheckDescriptor::new("t_extra", "toy", "Extra"), raises))
        .expect("register");
    let result = run(&registry, ExecutionConfig::default(), &toy_model());
    let report = SnapshotReport::new(&toy_config()).build(&result).expect("snapshot");
    assert_eq!(report.cards[MISC_CARD]["cases"], serde_json::json!(["t_extra"]));
    assert!((report.score.expect("summary").total_score - 0.4).abs() < 1e-12);
}

/// Built-in checks run, score and survive a round trip through a file
#[test]
fn test_builtin_snapshot_roundtrip() {
    let registry = builtin_registry().expect("registry");
    let mut config = ReportConfiguration::default_config().expect("config");
    config.apply_registry_defaults(&registry);
    let result = run(&registry, ExecutionConfig::default(), &toy_model());
    assert_eq!(result.tests.len(), registry.len());
    assert!(
        result.tests["test_metabolites_presence_in_compartment"].is_parametrized()
    );

    let report = SnapshotReport::new(&config).build(&result).expect("snapshot");
    let total = report.score.as_ref().expect("summary").total_score;
    assert!((0.0..=1.0).contains(&total));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("result.json");
    let manager = ResultManager::new();
    manager.store(&report, &path, true).expect("store");
    let loaded = manager.load(&path).expect("load");
    assert_eq!(loaded.meta, report.meta);
    assert_eq!(loaded.tests, report.tests);
    assert_eq!(loaded.score, report.score);
}

/// Non-finite values are rejected with their key paths
#[test]
fn test_non_finite_metric_rejected() {
    let mut registry = CheckRegistry::new();
    registry
        .register(FnCheck::new(CheckDescriptor::new("t_nan", "toy", "NaN"), not_a_number))
        .expect("register");
    let result = run(&registry, ExecutionConfig::default(), &toy_model());
    match gsm_qa_runner::to_json(&result, false) {
        Err(RunnerError::NonFinite { paths }) => assert_eq!(paths, ["tests.t_nan.metric"]),
        other => panic!("expected NonFinite, got {other:?}"),
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("result.json");
    assert!(ResultManager::new().store(&result, &path, false).is_err());
    assert!(!path.exists());
}

/// Configuration errors surface instead of dividing by zero
#[test]
fn test_configuration_errors() {
    let registry = toy_registry();
    let result = run(&registry, ExecutionConfig::default(), &toy_model());

    let unexecuted = ReportConfiguration::from_yaml(
        "cards: {scored: {sections: {card: {cases: [t1, t_missing]}}}}",
    )
    .expect("config");
    assert!(matches!(
        compute_score(&result, &unexecuted),
        Err(ReportError::UnexecutedTest { test, .. }) if test == "t_missing"
    ));

    let empty = ReportConfiguration::from_yaml("cards: {scored: {sections: {card: {cases: []}}}}")
        .expect("config");
    assert!(matches!(
        compute_score(&result, &empty),
        Err(ReportError::EmptyCard { section }) if section == "card"
    ));
}

/// Two models compared side by side
#[test]
fn test_diff_pipeline() {
    let registry = builtin_registry().expect("registry");
    let config = ReportConfiguration::default_config().expect("config");
    let complete = toy_model();
    let mut sparse = toy_model();
    sparse.id = None;

    let results = IndexMap::from([
        ("complete.json".to_string(), run(&registry, ExecutionConfig::default(), &complete)),
        ("sparse.json".to_string(), run(&registry, ExecutionConfig::default(), &sparse)),
    ]);
    let report = DiffReport::build(&results, &config).expect("diff");
    let entries = report.tests["test_model_id_presence"]
        .diff
        .as_single()
        .expect("scalar");
    assert_eq!(entries[0].result, Some(Outcome::Passed));
    assert_eq!(entries[1].result, Some(Outcome::Failed));
    let totals = &report.score.total_score.diff;
    assert_eq!(totals.len(), 2);
    assert!(totals[0].total_score > totals[1].total_score);
}

/// Results stored by commit are reported across the history
#[test]
fn test_history_pipeline() {
    let registry = toy_registry();
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = RepoResultManager::new(dir.path().join("results"));
    let commit = |hexsha: &str| CommitInfo::new(hexsha, "Jane", "2024-01-01 00:00:00");
    let git = MockGitRunner::new()
        .with_commits("main", vec![commit("c3"), commit("c2"), commit("c1")])
        .with_commits("gh-pages", vec![commit("p1")])
        .with_current_branch("main");

    for hexsha in ["c1", "c3"] {
        let mut result = run(&registry, ExecutionConfig::default(), &toy_model());
        storage.store(&mut result, &git, Some(hexsha)).expect("store");
    }
    assert!(matches!(
        storage.load("c2"),
        Err(RunnerError::MissingRevision(c)) if c == "c2"
    ));

    let mut history = HistoryManager::new(&git, &storage);
    history.load_history(&["gh-pages"]).expect("history");
    assert_eq!(history.missing(), ["c2"]);

    let report = HistoryReport::build(&history, &toy_config()).expect("report");
    let commits: Vec<&str> = report
        .score
        .total_score
        .history
        .iter()
        .map(|p| p.commit.as_str())
        .collect();
    assert_eq!(commits, ["c1", "c3"]);
    assert_eq!(report.missing, ["c2"]);
    let t1 = report.tests["t1"].history.as_single().expect("scalar");
    assert_eq!(t1.len(), 2);
    assert_eq!(t1[0].metric, Some(0.2));
}
