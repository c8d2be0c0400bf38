//! Contract with the external ESTree parser.

use crate::config::SourceType;
use crate::features::ast::domain::SyntaxTree;
use crate::shared::models::AnalysisResult;
use std::path::Path;

/// A pluggable source → ESTree-JSON converter.
///
/// The production implementation spawns a subprocess per file (see the
/// orchestration crate); tests substitute an in-memory document.
pub trait EstreeParser: Send + Sync {
    fn parse_file(&self, source_path: &Path, source_type: SourceType)
        -> AnalysisResult<SyntaxTree>;
}
