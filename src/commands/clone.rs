//! Clone command implementation
//!
//! Copies an existing environment to a new root and patches every file that
//! embeds the old root. Either the whole clone succeeds or the new root is
//! removed again.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

use virtphp::environment::Environment;
use virtphp::filesystem::LocalFs;
use virtphp::orchestrator::{CloneOrchestrator, CloneOutcome};
use virtphp::output::{ConsoleSink, NullSink, OutputConfig, ProgressSink};

/// How the result is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Progress lines for humans
    Text,
    /// A single JSON document describing the outcome
    Json,
}

/// Arguments for the clone command
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Path to the existing environment
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Path of the new environment
    #[arg(value_name = "NAME")]
    pub name: PathBuf,

    /// Directory a relative NAME is created in (defaults to current directory)
    #[arg(long, value_name = "PATH", env = "VIRTPHP_ENV_ROOT")]
    pub env_root: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the clone command
pub fn execute(args: CloneArgs, color_flag: &str) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let source = cwd.join(&args.source);
    let base = args.env_root.map(|root| cwd.join(root)).unwrap_or(cwd);

    let env = Environment::resolve(&source, &args.name, &base)?;

    let console;
    let sink: &dyn ProgressSink = match args.format {
        OutputFormat::Json => &NullSink,
        OutputFormat::Text => {
            console = ConsoleSink::new(OutputConfig::from_env_and_flag(color_flag), args.quiet);
            &console
        }
    };

    let outcome = CloneOrchestrator::new(&LocalFs, sink).run(&env);

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    finish(outcome)
}

fn finish(outcome: CloneOutcome) -> Result<()> {
    let Some(failure) = outcome.failure else {
        return Ok(());
    };

    let err = anyhow::Error::new(failure.error)
        .context(format!("Clone failed during step: {}", failure.step));
    match failure.rollback_error {
        Some(rollback) => Err(err.context(format!(
            "{}; the new environment must be removed by hand",
            rollback
        ))),
        None => Err(err),
    }
}
