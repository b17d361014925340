#![forbid(unsafe_code)]

//! `repo-path-guard` binary.
//!
//! Runs one-shot validations from the command line, or serves the HTTP
//! controller together with the audit retention task.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use repo_path_guard::audit::retention;
use repo_path_guard::http;
use repo_path_guard::models::{PermissionResult, ProgressCallback, ValidationResult};
use repo_path_guard::{AppError, GlobalConfig, PathHandler, Result, ValidateOptions};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "repo-path-guard", about = "Cross-platform repository path validation", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured platform rules (auto, win32, posix).
    #[arg(long, global = true)]
    platform: Option<String>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a single path.
    Validate {
        path: String,
        /// Also require the path to be an existing directory.
        #[arg(long)]
        repository: bool,
        /// Deadline for the run, in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Print stage progress to stderr.
        #[arg(long)]
        progress: bool,
    },
    /// Validate several paths concurrently.
    Batch {
        #[arg(required = true)]
        paths: Vec<String>,
        /// Deadline for each run, in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Resolve read, write, and execute access for a path.
    Check {
        path: String,
        /// Deadline for the check, in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print the normalized form of a path.
    Normalize { path: String },
    /// Resolve a path against a base directory.
    Resolve {
        path: String,
        /// Base directory; defaults to the current directory.
        #[arg(long)]
        base: Option<String>,
    },
    /// Serve the HTTP controller.
    Serve,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "repo-path-guard failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    if let Some(platform) = args.platform {
        config.platform = platform;
    }

    let handler = Arc::new(PathHandler::from_config(&config)?);
    info!(platform = %handler.profile(), "path handler ready");

    let outcome = dispatch(args.command, &handler, &config).await;
    if let Err(err) = handler.flush_audit().await {
        warn!(%err, "failed to flush audit log");
    }
    outcome
}

async fn dispatch(
    command: Command,
    handler: &Arc<PathHandler>,
    config: &GlobalConfig,
) -> Result<ExitCode> {
    match command {
        Command::Validate {
            path,
            repository,
            timeout_ms,
            progress,
        } => {
            let mut options = timeout_options(timeout_ms);
            if progress {
                options.on_progress = Some(ProgressCallback::new(|update| {
                    eprintln!("[{:>3}%] {}", update.percentage, update.message);
                }));
            }
            let outcome = if repository {
                handler.validate_repository_root(&path, &options).await
            } else {
                handler.validate_path(&path, &options).await
            };
            let result = render_validation(outcome, handler, timeout_ms)?;
            print_json(&result)?;
            Ok(exit_code(result.is_valid()))
        }
        Command::Batch { paths, timeout_ms } => {
            let options = timeout_options(timeout_ms);
            let mut results = Vec::with_capacity(paths.len());
            for outcome in handler.validate_many(&paths, &options).await {
                results.push(render_validation(outcome, handler, timeout_ms)?);
            }
            print_json(&results)?;
            Ok(exit_code(results.iter().all(ValidationResult::is_valid)))
        }
        Command::Check { path, timeout_ms } => {
            let options = timeout_options(timeout_ms);
            let result = match handler.check_permissions(&path, &options).await {
                Ok(result) => result,
                Err(AppError::Timeout(_)) => {
                    PermissionResult::timed_out(effective_timeout_ms(handler, timeout_ms))
                }
                Err(err) => return Err(err),
            };
            print_json(&result)?;
            Ok(exit_code(result.errors.is_empty()))
        }
        Command::Normalize { path } => {
            println!("{}", handler.normalize_path(&path)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Resolve { path, base } => {
            println!("{}", handler.resolve_relative_path(&path, base.as_deref())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve => {
            serve(Arc::clone(handler), config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(handler: Arc<PathHandler>, config: &GlobalConfig) -> Result<()> {
    let ct = CancellationToken::new();

    let retention_handle = config.audit.enabled.then(|| {
        info!(retention_days = config.audit.retention_days, "retention service started");
        retention::spawn_retention_task(
            config.audit.log_dir.clone(),
            config.audit.retention_days,
            ct.clone(),
        )
    });

    let http_ct = ct.clone();
    let http_config = config.http.clone();
    let http_handle = tokio::spawn(async move {
        if let Err(err) = http::serve(handler, &http_config, http_ct).await {
            error!(%err, "http controller failed");
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let _ = http_handle.await;
    if let Some(handle) = retention_handle {
        let _ = handle.await;
    }
    info!("repo-path-guard shut down");
    Ok(())
}

fn timeout_options(timeout_ms: Option<u64>) -> ValidateOptions {
    timeout_ms.map_or_else(ValidateOptions::default, |ms| {
        ValidateOptions::with_timeout(Duration::from_millis(ms))
    })
}

fn effective_timeout_ms(handler: &PathHandler, timeout_ms: Option<u64>) -> u64 {
    timeout_ms.unwrap_or_else(|| {
        u64::try_from(handler.default_timeout().as_millis()).unwrap_or(u64::MAX)
    })
}

/// Turn a timeout into its in-band result; other errors propagate.
fn render_validation(
    outcome: Result<ValidationResult>,
    handler: &PathHandler,
    timeout_ms: Option<u64>,
) -> Result<ValidationResult> {
    match outcome {
        Ok(result) => Ok(result),
        Err(AppError::Timeout(_)) => Ok(ValidationResult::timed_out(effective_timeout_ms(
            handler, timeout_ms,
        ))),
        Err(err) => Err(err),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(format!("failed to render output: {err}")))?;
    println!("{text}");
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
