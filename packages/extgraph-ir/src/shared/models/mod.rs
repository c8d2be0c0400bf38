//! Shared model types used across every analysis feature.

pub mod error;
pub mod span;

pub use error::{AnalysisError, AnalysisResult};
pub use span::{ByteRange, Location, Span};
