//! Error types for the analysis core.
//!
//! Errors are recovered at the smallest granularity that keeps the batch
//! alive: parse errors at the file level, resolution errors at the function
//! subtree, graph limits at the flow level, timeouts at the extension level.

use thiserror::Error;

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The external parser rejected the file; it is recorded as
    /// uncompilable and the rest of the extension continues.
    #[error("parse failure in {file}: {message}")]
    ParseFailure { file: String, message: String },

    /// Scope resolution hit an inconsistency; the affected function
    /// subtree is skipped.
    #[error("scope resolution failure: {message}")]
    ResolveFailure { message: String },

    /// An edge count or flow depth exceeded its configured bound.
    #[error("graph limit exceeded: {limit} (bound {bound})")]
    GraphLimit { limit: &'static str, bound: usize },

    /// The extension-level wall clock expired.
    #[error("analysis deadline exceeded after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed AST document: {0}")]
    Json(#[from] serde_json::Error),

    /// A structural invariant failed. Fatal for the extension; the message
    /// is recorded as a crash entry in the report benchmarks.
    #[error("internal invariant violation: {message}")]
    InternalInvariantViolation { message: String },
}

impl AnalysisError {
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseFailure {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn resolve(message: impl Into<String>) -> Self {
        Self::ResolveFailure {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InternalInvariantViolation {
            message: message.into(),
        }
    }

    /// Whether the error poisons the whole extension or only the current
    /// file/flow.
    pub fn is_fatal_for_extension(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::InternalInvariantViolation { .. }
        )
    }
}
