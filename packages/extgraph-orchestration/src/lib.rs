//! Batch orchestration for the extension analyzer.
//!
//! Owns everything outside a single file's analysis: manifest intake,
//! the external parser subprocess, the rayon worker pool with its
//! per-extension deadlines, and JSON report writing.

pub mod driver;
pub mod error;
pub mod manifest;
pub mod parser_proc;

pub use driver::{analyze_extension, discover_extensions, run_batch, BatchSummary, ExtensionJob};
pub use error::{DriverError, Result};
pub use manifest::{read_manifest_summary, ManifestSummary};
pub use parser_proc::SubprocessParser;
