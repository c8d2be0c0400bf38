//! Single-file analysis pipeline.

pub mod file_analysis;

pub use file_analysis::{analyze_file, analyze_tree, FileOutcome, StageTimings};
