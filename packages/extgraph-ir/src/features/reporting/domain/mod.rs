pub mod report;

pub use report::{
    Benchmarks, CodeStats, ExtensionReport, SurfaceBenchmarks, SurfaceReport,
};
