//! Climate diagnostics runner.
//!
//! Reads a YAML run file, prepares each job's fields and renders the
//! figures of the requested diagnostic sets.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use diags_runner::{load_run_config, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "diags-runner")]
#[command(about = "Render climate diagnostics figures from a run file")]
struct Args {
    /// Run file path
    #[arg(short, long, env = "DIAGS_CONFIG")]
    config: PathBuf,

    /// Only run jobs of this set
    #[arg(short, long)]
    set: Option<String>,

    /// Number of jobs rendered in parallel (default: one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Override the results directory of the run file
    #[arg(long, env = "DIAGS_RESULTS_DIR")]
    results_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);
    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    info!(config = %args.config.display(), "Starting diagnostics runner");

    let mut config = load_run_config(&args.config)?;
    if let Some(dir) = &args.results_dir {
        config.parameters.results_dir = dir.clone();
    }
    info!(
        jobs = config.jobs.len(),
        results_dir = %config.parameters.results_dir.display(),
        "Loaded run file"
    );

    let pool = {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(jobs) = args.jobs {
            builder = builder.num_threads(jobs);
        }
        builder.build().context("Failed to build worker pool")?
    };

    let pipeline = Pipeline::new(config);
    let reports = pool.install(|| pipeline.run(args.set.as_deref()));

    println!("{}", serde_json::to_string_pretty(&reports)?);

    let failed = reports.iter().filter(|r| r.is_failure()).count();
    anyhow::ensure!(failed == 0, "{} of {} jobs failed", failed, reports.len());
    info!(jobs = reports.len(), "All jobs finished");
    Ok(())
}
