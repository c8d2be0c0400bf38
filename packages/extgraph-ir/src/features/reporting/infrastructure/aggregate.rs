//! Surface-level aggregation.
//!
//! Folds per-file outcomes into one surface report, in the order the
//! files were analyzed. Danger numbering stays per-file; aggregation
//! never renumbers.

use crate::features::reporting::domain::report::{
    CodeStats, SurfaceBenchmarks, SurfaceReport,
};
use crate::pipeline::file_analysis::FileOutcome;

use super::code_stats::compute_code_stats;

/// Combine the outcomes of one surface (background or content scripts).
pub fn aggregate_surface(
    outcomes: &[FileOutcome],
    uncompilable: Vec<String>,
    crashes: Vec<String>,
    timed_out: bool,
) -> (SurfaceReport, SurfaceBenchmarks) {
    let mut report = SurfaceReport {
        uncompilable_files: uncompilable,
        ..SurfaceReport::default()
    };
    let mut benchmarks = SurfaceBenchmarks {
        crashes,
        timed_out,
        ..SurfaceBenchmarks::default()
    };

    for outcome in outcomes {
        report
            .exfiltration_dangers
            .extend(outcome.dangers.exfiltration_dangers.iter().cloned());
        report
            .infiltration_dangers
            .extend(outcome.dangers.infiltration_dangers.iter().cloned());
        report
            .unguarded_listener_violations
            .extend(outcome.dangers.listener_violations.iter().cloned());
        for (area, accesses) in &outcome.dangers.storage_accesses {
            report
                .extension_storage_accesses
                .entry(area.clone())
                .or_default()
                .extend(accesses.iter().cloned());
        }
        benchmarks.ingest_seconds += outcome.timings.ingest_seconds;
        benchmarks.scoping_seconds += outcome.timings.scoping_seconds;
        benchmarks.pdg_seconds += outcome.timings.pdg_seconds;
        benchmarks.detection_seconds += outcome.timings.detection_seconds;
    }
    benchmarks.total_seconds = benchmarks.ingest_seconds
        + benchmarks.scoping_seconds
        + benchmarks.pdg_seconds
        + benchmarks.detection_seconds;

    report.code_stats = if outcomes.is_empty() {
        CodeStats::default()
    } else {
        let scope_refs: Vec<_> = outcomes.iter().map(|o| &o.scopes).collect();
        compute_code_stats(&scope_refs)
    };

    (report, benchmarks)
}
