use crate::config::ReportConfig;
use crate::render::ReportRenderer;
use crate::report::model::{ResultRequest, Status};
use crate::report::service::{attempt_annotated_name, ResultAssembler};
use crate::report::store::ResultStore;
use crate::steps::model::StepFilter;
use crate::steps::service::StepExtractor;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid status {0:?}, expected passed, failed, broken or skipped")]
    InvalidStatus(String),
    #[error("report renderer not found at {}", .0.display())]
    RendererMissing(PathBuf),
    #[error("no results found in {}", .0.display())]
    NoResults(PathBuf),
    #[error("report renderer exited with {status}: {stderr}")]
    Renderer { status: String, stderr: String },
}

/// Built once at startup and handed to every command.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ReportConfig>,
    pub store: Arc<ResultStore>,
}

impl AppState {
    pub fn new(config: ReportConfig) -> Self {
        let store = ResultStore::new(config.results_dir.clone());
        AppState {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }

    pub fn assembler(&self) -> ResultAssembler {
        ResultAssembler::new(self.store.clone(), StepExtractor::from_config(&self.config))
    }

    pub fn renderer(&self) -> ReportRenderer {
        ReportRenderer::from_config(&self.config)
    }

    /// Today's shared log file, if the framework has written one.
    pub fn todays_log_file(&self) -> Option<PathBuf> {
        let path = self.config.daily_log_file(Local::now().date_naive());
        path.is_file().then_some(path)
    }
}

/// Synthesizes report documents for the localization test suite.
#[derive(Parser, Debug)]
#[command(name = "report-synth", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wipe and recreate the results directory
    Clean,
    /// Delete result files older than the given age
    CleanOld {
        #[arg(long)]
        minutes: Option<u64>,
    },
    /// Write one result document built from the shared log
    Result(ResultArgs),
    /// Write skipped results for tests that never ran
    Skip {
        #[arg(long = "name", required = true)]
        names: Vec<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Create containers for results that have none
    Fix,
    /// Fix results, then render the HTML report
    Generate {
        #[arg(long)]
        clean_first: bool,
    },
    /// Serve the results through the renderer
    Serve,
}

#[derive(clap::Args, Debug)]
pub struct ResultArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub status: String,
    #[arg(long)]
    pub start_ms: Option<i64>,
    #[arg(long)]
    pub stop_ms: Option<i64>,
    #[arg(long)]
    pub error: Option<String>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Attempts that ran; more than one adds a retry history
    #[arg(long, default_value_t = 1)]
    pub attempts: u32,
    #[arg(long, default_value_t = 1)]
    pub max_attempts: u32,
    /// Log keywords that belong to this test; replaces the name table
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,
    #[arg(long)]
    pub test_class: Option<String>,
    #[arg(long)]
    pub package: Option<String>,
    #[arg(long)]
    pub suite: Option<String>,
    #[arg(long)]
    pub container: bool,
}

impl ResultArgs {
    pub fn to_request(&self, state: &AppState) -> Result<ResultRequest, ReportError> {
        let status: Status = self.status.parse()?;
        let step_filter = if self.keywords.is_empty() {
            None
        } else {
            Some(StepFilter::from_keywords(&self.keywords))
        };
        let retry_count = if self.attempts > 1 { self.attempts } else { 0 };
        Ok(ResultRequest::builder()
            .name(attempt_annotated_name(&self.name, self.attempts, self.max_attempts.max(self.attempts)))
            .status(status)
            .maybe_start(self.start_ms)
            .maybe_stop(self.stop_ms)
            .maybe_error_message(self.error.clone())
            .maybe_test_class(self.test_class.clone())
            .maybe_package(self.package.clone())
            .maybe_suite(self.suite.clone())
            .maybe_log_file(self.log_file.clone().or_else(|| state.todays_log_file()))
            .maybe_step_filter(step_filter)
            .retry_count(retry_count)
            .build())
    }
}

pub fn run(state: &AppState, command: Command) -> ExitCode {
    match command {
        Command::Clean => exit_code(state.store.clean()),
        Command::CleanOld { minutes } => {
            let minutes = minutes.unwrap_or(state.config.clean_old_after_minutes);
            exit_code(state.store.clean_old(minutes).map(|_| ()))
        }
        Command::Result(args) => match args.to_request(state) {
            // the result itself is best-effort; a bad argument is still an error
            Ok(request) => {
                if let Some(uuid) = state.assembler().report(&request, args.container) {
                    println!("{}", uuid);
                }
                ExitCode::SUCCESS
            }
            Err(err) => exit_code(Err(err)),
        },
        Command::Skip { names, reason } => {
            let assembler = state.assembler();
            let log_file = state.todays_log_file();
            for name in names {
                let request = ResultRequest::builder()
                    .name(name.clone())
                    .status(Status::Skipped)
                    .maybe_log_file(log_file.clone())
                    .build();
                if assembler.report(&request, true).is_some() {
                    info!(
                        "skipped {}{}",
                        name,
                        reason.as_deref().map(|r| format!(": {}", r)).unwrap_or_default()
                    );
                }
            }
            ExitCode::SUCCESS
        }
        Command::Fix => exit_code(state.store.backfill_containers().map(|_| ())),
        Command::Generate { clean_first } => {
            if clean_first {
                if let Err(err) = state.store.clean() {
                    return exit_code(Err(err));
                }
            }
            if let Err(err) = state.store.backfill_containers() {
                warn!("could not fix results before rendering: {}", err);
            }
            exit_code(state.renderer().generate().map(|_| ()))
        }
        Command::Serve => exit_code(state.renderer().serve()),
    }
}

fn exit_code(result: Result<(), ReportError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
