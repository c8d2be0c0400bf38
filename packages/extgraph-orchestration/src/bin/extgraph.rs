//! Batch analyzer CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use extgraph_ir::config::AnalysisConfig;
use extgraph_ir::ApiProfiles;
use extgraph_orchestration::driver::{discover_extensions, require_jobs, run_batch};

#[derive(Debug, Parser)]
#[command(
    name = "extgraph",
    about = "Detect message-passing vulnerabilities in unpacked browser extensions"
)]
struct Args {
    /// Directory containing one unpacked extension per subdirectory.
    batch_root: PathBuf,

    /// Directory the per-extension JSON reports are written to.
    #[arg(short, long, default_value = "extgraph-results")]
    output: PathBuf,

    /// Optional YAML/JSON config file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wall-clock budget per extension, in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Worker count (0 = half the CPUs).
    #[arg(long)]
    parallelize: Option<usize>,

    /// Analyze smaller extensions first.
    #[arg(long)]
    sort_by_size: bool,

    /// Also report unguarded listeners without sensitive API access.
    #[arg(long)]
    include_31_violations: bool,

    /// Additional API profile entries (YAML or JSON).
    #[arg(long)]
    api_profiles: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("extgraph: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(timeout) = args.timeout {
        config.timeout_seconds = timeout;
    }
    if let Some(parallelize) = args.parallelize {
        config.parallelize = parallelize;
    }
    if args.sort_by_size {
        config.sort_by_size_ascending = true;
    }
    if args.include_31_violations {
        config.include_31_violations_without_privileged_api_access = true;
    }
    if let Some(path) = args.api_profiles {
        config.api_profile_overrides = Some(path);
    }
    config.validate()?;

    let profiles = match &config.api_profile_overrides {
        Some(path) => ApiProfiles::with_overrides(path)?,
        None => ApiProfiles::builtin(),
    };

    let jobs = require_jobs(discover_extensions(&args.batch_root)?, &args.batch_root)?;
    let summary = run_batch(jobs, &config, &profiles, &args.output)?;
    info!(
        analyzed = summary.analyzed,
        failed = summary.failed,
        "batch finished"
    );
    println!(
        "{} extension(s) analyzed, {} failed, reports in {}",
        summary.analyzed,
        summary.failed,
        args.output.display()
    );
    Ok(())
}
