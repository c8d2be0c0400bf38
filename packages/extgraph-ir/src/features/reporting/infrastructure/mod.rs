pub mod aggregate;
pub mod code_stats;

pub use aggregate::aggregate_surface;
pub use code_stats::compute_code_stats;
