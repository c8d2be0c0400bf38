//! Configuration for one analysis run.
//!
//! Defaults cover the common case; a partial YAML or JSON file overrides
//! individual fields, and the API profile tables accept a separate
//! override file (see `features::detection::profiles`).

pub mod error;
pub mod options;

pub use error::{ConfigError, ConfigResult};
pub use options::{AnalysisConfig, ParserSelector, SourceType};
