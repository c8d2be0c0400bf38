//! Batch driver.
//!
//! Analyzes a batch of unpacked extensions on a rayon pool (default
//! degree: half the CPUs), one private arena per extension, background
//! and content scripts of each extension in parallel. Every extension
//! gets a cooperative wall-clock deadline; expiry yields a partial
//! report marked timed out instead of poisoning the batch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use extgraph_ir::config::AnalysisConfig;
use extgraph_ir::features::ast::ports::parser::EstreeParser;
use extgraph_ir::features::reporting::domain::report::{
    Benchmarks, ExtensionReport, SurfaceBenchmarks, SurfaceReport,
};
use extgraph_ir::features::reporting::infrastructure::aggregate::aggregate_surface;
use extgraph_ir::pipeline::file_analysis::{analyze_tree, FileOutcome};
use extgraph_ir::shared::models::AnalysisError;
use extgraph_ir::shared::utils::Deadline;
use extgraph_ir::ApiProfiles;

use crate::error::{DriverError, Result};
use crate::manifest::read_manifest_summary;
use crate::parser_proc::SubprocessParser;

/// One unpacked extension to analyze.
#[derive(Debug, Clone)]
pub struct ExtensionJob {
    pub name: String,
    pub root: PathBuf,
}

impl ExtensionJob {
    /// Total bytes of JavaScript under the extension root.
    fn size(&self) -> u64 {
        WalkDir::new(&self.root)
            .into_iter()
            .flatten()
            .filter(|entry| {
                entry.path().extension().and_then(|e| e.to_str()) == Some("js")
            })
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len())
            .sum()
    }
}

/// Every subdirectory carrying a `manifest.json` is one job.
pub fn discover_extensions(batch_root: &Path) -> Result<Vec<ExtensionJob>> {
    let mut jobs = Vec::new();
    for entry in std::fs::read_dir(batch_root)? {
        let entry = entry?;
        let root = entry.path();
        if root.is_dir() && root.join("manifest.json").is_file() {
            jobs.push(ExtensionJob {
                name: entry.file_name().to_string_lossy().into_owned(),
                root,
            });
        }
    }
    jobs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(jobs)
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub generated_at: DateTime<Utc>,
    pub analyzed: usize,
    pub failed: usize,
    pub reports: Vec<String>,
}

/// Analyze every job and write one JSON report per extension.
pub fn run_batch(
    mut jobs: Vec<ExtensionJob>,
    config: &AnalysisConfig,
    profiles: &ApiProfiles,
    output_dir: &Path,
) -> Result<BatchSummary> {
    std::fs::create_dir_all(output_dir)?;
    if config.sort_by_size_ascending {
        jobs.sort_by_key(|job| job.size());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count())
        .build()
        .expect("worker pool construction cannot fail with positive degree");

    info!(
        extensions = jobs.len(),
        workers = config.worker_count(),
        "starting batch"
    );

    let results: Vec<std::result::Result<String, String>> = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                let report = analyze_extension(job, config, profiles);
                let path = output_dir.join(format!("{}.json", job.name));
                match write_report(&path, &report) {
                    Ok(()) => Ok(path.display().to_string()),
                    Err(e) => {
                        error!(extension = %job.name, error = %e, "cannot write report");
                        Err(job.name.clone())
                    }
                }
            })
            .collect()
    });

    let reports: Vec<String> = results.iter().flatten().cloned().collect();
    let failed = results.len() - reports.len();
    Ok(BatchSummary {
        generated_at: Utc::now(),
        analyzed: reports.len(),
        failed,
        reports,
    })
}

fn write_report(path: &Path, report: &ExtensionReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Analyze one extension. Never fails the batch: every failure mode
/// folds into the report (uncompilable files, crash entries, timeout
/// marker).
pub fn analyze_extension(
    job: &ExtensionJob,
    config: &AnalysisConfig,
    profiles: &ApiProfiles,
) -> ExtensionReport {
    let deadline = Deadline::starting_now(Duration::from_secs(config.timeout_seconds));
    let parser = SubprocessParser::new(config.parser.clone());

    let manifest = match read_manifest_summary(&job.root) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!(extension = %job.name, error = %e, "manifest intake failed");
            return ExtensionReport {
                extension: job.name.clone(),
                benchmarks: Benchmarks {
                    bp: SurfaceBenchmarks {
                        crashes: vec![e.to_string()],
                        ..SurfaceBenchmarks::default()
                    },
                    ..Benchmarks::default()
                },
                ..ExtensionReport::default()
            };
        }
    };

    // Background page and content scripts in parallel; each side owns
    // its arenas, nothing is shared.
    let ((bp, bp_bench), (cs, cs_bench)) = rayon::join(
        || analyze_surface(&manifest.background_scripts, config, profiles, &parser, &deadline),
        || analyze_surface(&manifest.content_scripts, config, profiles, &parser, &deadline),
    );

    ExtensionReport {
        extension: job.name.clone(),
        benchmarks: Benchmarks {
            bp: bp_bench,
            cs: cs_bench,
        },
        manifest_version: manifest.manifest_version,
        content_script_injected_into: manifest.injected_into,
        bp,
        cs,
    }
}

fn analyze_surface(
    files: &[PathBuf],
    config: &AnalysisConfig,
    profiles: &ApiProfiles,
    parser: &SubprocessParser,
    deadline: &Deadline,
) -> (SurfaceReport, SurfaceBenchmarks) {
    let mut outcomes: Vec<FileOutcome> = Vec::new();
    let mut uncompilable = Vec::new();
    let mut crashes = Vec::new();
    let mut timed_out = false;

    for file in files {
        if deadline.expired() {
            timed_out = true;
            break;
        }
        let file_display = file.display().to_string();
        let source = match std::fs::read_to_string(file) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %file_display, error = %e, "unreadable source file");
                uncompilable.push(file_display);
                continue;
            }
        };
        let tree = match parser.parse_file(file, config.source_type) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(file = %file_display, error = %e, "uncompilable file");
                uncompilable.push(file_display);
                continue;
            }
        };
        match analyze_tree(&tree, &source, config, profiles, Some(deadline)) {
            Ok(outcome) => outcomes.push(outcome),
            Err(AnalysisError::Timeout { .. }) => {
                timed_out = true;
                break;
            }
            Err(e @ AnalysisError::InternalInvariantViolation { .. }) => {
                error!(file = %file_display, error = %e, "invariant violation");
                crashes.push(e.to_string());
                break;
            }
            Err(e) => {
                warn!(file = %file_display, error = %e, "file analysis failed");
                crashes.push(e.to_string());
            }
        }
    }

    aggregate_surface(&outcomes, uncompilable, crashes, timed_out)
}

/// Ensure the caller sees unresolved jobs: used by the CLI to map an
/// empty discovery to a clear error.
pub fn require_jobs(jobs: Vec<ExtensionJob>, batch_root: &Path) -> Result<Vec<ExtensionJob>> {
    if jobs.is_empty() {
        return Err(DriverError::Manifest(format!(
            "no extension directories with a manifest.json under {}",
            batch_root.display()
        )));
    }
    Ok(jobs)
}
