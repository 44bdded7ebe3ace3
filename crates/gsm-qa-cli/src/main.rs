//! GSM QA CLI
//!
//! Command-line interface for testing, scoring and reporting on genome-scale
//! metabolic models.

#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]

use clap::{Parser, Subcommand};
use gsm_qa_cli::{
    ReportFormat, RunConfig, diff_report, format_score, history_report, junit_report,
    load_model, load_registry, load_report_config, load_result, run_checks, snapshot_report,
    store_in_repo, store_result,
};
use gsm_qa_runner::{DEFAULT_DEPLOYMENT, RealGitRunner};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "gsm-qa")]
#[command(about = "Genome-scale metabolic model QA", long_about = None)]
#[command(version)]
struct Cli {
    /// Log progress
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log debugging details
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the checks against a model and store the result
    Run {
        /// Path to the model JSON file
        #[arg(value_name = "MODEL", env = "GSM_QA_MODEL")]
        model: PathBuf,

        /// Result file, when not storing by commit
        #[arg(long, default_value = "result.json")]
        filename: PathBuf,

        /// Only run these checks or modules (repeatable)
        #[arg(long)]
        exclusive: Vec<String>,

        /// Skip these checks or modules (repeatable)
        #[arg(long)]
        skip: Vec<String>,

        /// Store results by commit in this directory
        #[arg(long, env = "GSM_QA_LOCATION")]
        location: Option<PathBuf>,

        /// Git repository of the model
        #[arg(long, default_value = ".")]
        repository: PathBuf,

        /// Do not record git provenance or store by commit
        #[arg(long)]
        ignore_git: bool,

        /// Record every check as skipped without evaluating
        #[arg(long)]
        dry_run: bool,
    },

    /// Build a report
    Report {
        #[command(subcommand)]
        kind: ReportCommand,
    },

    /// Print section and total scores of a stored result
    Score {
        /// Path to the result JSON file
        #[arg(value_name = "RESULT")]
        result: PathBuf,

        #[command(flatten)]
        scoring: ScoringArgs,
    },

    /// Export a stored result as JUnit XML
    Junit {
        /// Path to the result JSON file
        #[arg(value_name = "RESULT")]
        result: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Test one model and report on it
    Snapshot {
        /// Path to the model JSON file
        #[arg(value_name = "MODEL", env = "GSM_QA_MODEL")]
        model: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        scoring: ScoringArgs,

        /// Only run these checks or modules (repeatable)
        #[arg(long)]
        exclusive: Vec<String>,

        /// Skip these checks or modules (repeatable)
        #[arg(long)]
        skip: Vec<String>,
    },

    /// Test several models and compare them
    Diff {
        /// Paths to the model JSON files
        #[arg(value_name = "MODEL", num_args = 2.., required = true)]
        models: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        scoring: ScoringArgs,
    },

    /// Report on results stored across the commit history
    History {
        /// Directory of results stored by commit
        #[arg(long, env = "GSM_QA_LOCATION")]
        location: PathBuf,

        /// Git repository of the model
        #[arg(long, default_value = ".")]
        repository: PathBuf,

        /// Only consider commits that modified this model file
        #[arg(long, env = "GSM_QA_MODEL")]
        model: Option<PathBuf>,

        /// Branch to leave out of the history
        #[arg(long, default_value = DEFAULT_DEPLOYMENT)]
        deployment: String,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        scoring: ScoringArgs,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Report file
    #[arg(long, default_value = "index.html")]
    filename: PathBuf,

    /// Write plain JSON instead of HTML
    #[arg(long)]
    json: bool,
}

impl OutputArgs {
    fn format(&self) -> ReportFormat {
        if self.json {
            ReportFormat::Json
        } else {
            ReportFormat::Html
        }
    }
}

#[derive(clap::Args)]
struct ScoringArgs {
    /// Custom report configuration merged over the default (repeatable)
    #[arg(long = "custom-config")]
    custom_config: Vec<PathBuf>,

    /// Scoring of errored or skipped tests without a metric (worst_case, exclude)
    #[arg(long)]
    unscored: Option<String>,
}

fn setup_logging(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the error and exit non-zero
fn exit_on_error<T>(result: Result<T, String>) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    })
}

fn write_output(path: &Path, content: &str) {
    if let Err(e) = std::fs::write(path, content) {
        eprintln!("Error writing {}: {e}", path.display());
        std::process::exit(1);
    }
    println!("Report written to {}", path.display());
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.debug);

    match cli.command {
        Commands::Run {
            model,
            filename,
            exclusive,
            skip,
            location,
            repository,
            ignore_git,
            dry_run,
        } => {
            let config = RunConfig {
                exclusive,
                skip,
                dry_run,
            };
            run(&model, &filename, &config, location.as_deref(), &repository, ignore_git);
        }
        Commands::Report { kind } => report(kind),
        Commands::Score { result, scoring } => {
            let registry = exit_on_error(load_registry());
            let config = exit_on_error(load_report_config(
                &scoring.custom_config,
                scoring.unscored.as_deref(),
                &registry,
            ));
            let result = exit_on_error(load_result(&result));
            print!("{}", exit_on_error(format_score(&result, &config)));
        }
        Commands::Junit { result, output } => {
            let result = exit_on_error(load_result(&result));
            let xml = exit_on_error(junit_report(&result));
            match output {
                Some(path) => write_output(&path, &xml),
                None => print!("{xml}"),
            }
        }
    }
}

fn run(
    model: &Path,
    filename: &Path,
    config: &RunConfig,
    location: Option<&Path>,
    repository: &Path,
    ignore_git: bool,
) {
    let registry = exit_on_error(load_registry());
    let model = exit_on_error(load_model(model));
    let git = RealGitRunner::new(repository);
    let git_ref: Option<&dyn gsm_qa_runner::GitRunner> = if ignore_git { None } else { Some(&git) };
    let (mut result, summary) = run_checks(&model, &registry, config, git_ref);

    let stored = match (location, git_ref) {
        (Some(location), Some(git)) => exit_on_error(store_in_repo(&mut result, location, git)),
        _ => {
            exit_on_error(store_result(&result, filename));
            filename.to_path_buf()
        }
    };
    info!("Result stored at {}", stored.display());

    println!(
        "{} checks: {} passed, {} failed, {} errors, {} skipped ({:.1}% pass rate)",
        summary.total,
        summary.passed,
        summary.failed,
        summary.errors,
        summary.skipped,
        summary.pass_rate()
    );
    if !summary.is_success() {
        std::process::exit(1);
    }
}

fn report(kind: ReportCommand) {
    let registry = exit_on_error(load_registry());
    match kind {
        ReportCommand::Snapshot {
            model,
            output,
            scoring,
            exclusive,
            skip,
        } => {
            let config = exit_on_error(load_report_config(
                &scoring.custom_config,
                scoring.unscored.as_deref(),
                &registry,
            ));
            let model = exit_on_error(load_model(&model));
            let run = RunConfig {
                exclusive,
                skip,
                dry_run: false,
            };
            let (result, _) = run_checks(&model, &registry, &run, None);
            let content = exit_on_error(snapshot_report(&result, &config, output.format()));
            write_output(&output.filename, &content);
        }
        ReportCommand::Diff {
            models,
            output,
            scoring,
        } => {
            let config = exit_on_error(load_report_config(
                &scoring.custom_config,
                scoring.unscored.as_deref(),
                &registry,
            ));
            let content = exit_on_error(diff_report(
                &models,
                &registry,
                &RunConfig::default(),
                &config,
                output.format(),
            ));
            write_output(&output.filename, &content);
        }
        ReportCommand::History {
            location,
            repository,
            model,
            deployment,
            output,
            scoring,
        } => {
            let config = exit_on_error(load_report_config(
                &scoring.custom_config,
                scoring.unscored.as_deref(),
                &registry,
            ));
            let content = exit_on_error(history_report(
                &repository,
                &location,
                model.as_deref(),
                &deployment,
                &config,
                output.format(),
            ));
            write_output(&output.filename, &content);
        }
    }
}
