//! Result aggregation: per-file dangers into per-surface and
//! per-extension reports.

pub mod domain;
pub mod infrastructure;

pub use domain::{Benchmarks, CodeStats, ExtensionReport, SurfaceBenchmarks, SurfaceReport};
pub use infrastructure::{aggregate_surface, compute_code_stats};
