//! Program-dependence-graph core for browser-extension message-flow
//! analysis.
//!
//! Given the ESTree JSON of an extension's background and content
//! scripts, the crate resolves lexical scopes, overlays control-flow,
//! control-dependence, call, and lazy data-dependence edges on the
//! syntax tree, and reports source/sink flow pairs that let a web page
//! attacker read privileged data out of the extension or push payloads
//! into privileged APIs, storage, or the DOM.
//!
//! The analysis entry point for one file is
//! [`pipeline::analyze_file`]; the orchestration crate drives it per
//! extension and writes the JSON reports.

pub mod config;
pub mod features;
pub mod pipeline;
pub mod shared;

pub use config::{AnalysisConfig, ParserSelector, SourceType};
pub use features::ast::{ingest_document, ingest_json, EstreeParser, SyntaxTree};
pub use features::detection::{ApiProfiles, FileDangers};
pub use features::reporting::{
    aggregate_surface, Benchmarks, ExtensionReport, SurfaceBenchmarks, SurfaceReport,
};
pub use pipeline::{analyze_file, analyze_tree, FileOutcome};
pub use shared::models::{AnalysisError, AnalysisResult};
pub use shared::utils::Deadline;
