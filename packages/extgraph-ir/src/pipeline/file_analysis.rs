//! Per-file analysis pipeline.
//!
//! Ingest → scope resolution → PDG assembly → detection, with stage
//! timings and cooperative deadline checks between stages. All derived
//! structures live only for the duration of this call; nothing is shared
//! across files.

use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::features::ast::domain::SyntaxTree;
use crate::features::ast::infrastructure::ingest::ingest_document;
use crate::features::data_flow::infrastructure::engine::FlowEngine;
use crate::features::detection::domain::danger::FileDangers;
use crate::features::detection::infrastructure::detector::Detector;
use crate::features::detection::infrastructure::profiles::ApiProfiles;
use crate::features::pdg::infrastructure::calls::CallGraph;
use crate::features::pdg::infrastructure::cfg::ControlFlow;
use crate::features::pdg::infrastructure::def_use::DataDeps;
use crate::features::scoping::domain::ScopeTree;
use crate::features::scoping::infrastructure::resolver::resolve_scopes;
use crate::shared::models::AnalysisResult;
use crate::shared::utils::{Deadline, SourceText};

/// Seconds spent per stage of one file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub ingest_seconds: f64,
    pub scoping_seconds: f64,
    pub pdg_seconds: f64,
    pub detection_seconds: f64,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub file: String,
    pub dangers: FileDangers,
    pub scopes: ScopeTree,
    pub timings: StageTimings,
    /// The data-dependence edge budget was hit somewhere in this file.
    pub graph_truncated: bool,
}

/// Analyze one file from its raw ESTree JSON document.
pub fn analyze_file(
    file: &str,
    document: &Value,
    source: &str,
    config: &AnalysisConfig,
    profiles: &ApiProfiles,
    deadline: Option<&Deadline>,
) -> AnalysisResult<FileOutcome> {
    if let Some(deadline) = deadline {
        deadline.check()?;
    }
    let started = Instant::now();
    let tree = ingest_document(file, document)?;
    let ingest_seconds = started.elapsed().as_secs_f64();
    debug!(file, nodes = tree.len(), "ingested syntax tree");

    let mut outcome = analyze_tree(&tree, source, config, profiles, deadline)?;
    outcome.timings.ingest_seconds = ingest_seconds;
    Ok(outcome)
}

/// Analyze an already-ingested syntax tree (the subprocess parser hands
/// trees over directly).
pub fn analyze_tree(
    tree: &SyntaxTree,
    source: &str,
    config: &AnalysisConfig,
    profiles: &ApiProfiles,
    deadline: Option<&Deadline>,
) -> AnalysisResult<FileOutcome> {
    let file = tree.file.as_str();
    let mut timings = StageTimings::default();

    if let Some(deadline) = deadline {
        deadline.check()?;
    }
    let started = Instant::now();
    let scopes = resolve_scopes(tree)?;
    timings.scoping_seconds = started.elapsed().as_secs_f64();
    debug!(
        file,
        scopes = scopes.scopes.len(),
        bindings = scopes.bindings.len(),
        "resolved scopes"
    );

    if let Some(deadline) = deadline {
        deadline.check()?;
    }
    let started = Instant::now();
    let cfg = ControlFlow::build(tree);
    let calls = CallGraph::build(tree, &scopes);
    timings.pdg_seconds = started.elapsed().as_secs_f64();

    if let Some(deadline) = deadline {
        deadline.check()?;
    }
    let started = Instant::now();
    let deps = DataDeps::new(tree, &scopes, &cfg, &calls, config.max_pdg_edges);
    let engine = FlowEngine::new(&deps, config.max_flow_depth);
    let source_text = SourceText::new(source);
    let detector = Detector {
        tree,
        scopes: &scopes,
        calls: &calls,
        deps: &deps,
        engine: &engine,
        profiles,
        source: &source_text,
        report_unguarded_listeners: config.include_31_violations_without_privileged_api_access,
    };
    let dangers = detector.detect();
    timings.detection_seconds = started.elapsed().as_secs_f64();
    debug!(
        file,
        dangers = dangers.danger_count(),
        "detection finished"
    );

    let graph_truncated = deps.truncated();
    Ok(FileOutcome {
        file: file.to_owned(),
        dangers,
        scopes,
        timings,
        graph_truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ast::test_support::estree;

    #[test]
    fn pipeline_produces_an_outcome_for_trivial_input() {
        let doc = estree::program(vec![estree::let_decl("a", estree::literal_num(1.0))]);
        let outcome = analyze_file(
            "bg.js",
            &doc,
            "let a = 1;",
            &AnalysisConfig::default(),
            &ApiProfiles::builtin(),
            None,
        )
        .unwrap();
        assert_eq!(outcome.file, "bg.js");
        assert_eq!(outcome.dangers.danger_count(), 0);
        assert!(!outcome.graph_truncated);
    }

    #[test]
    fn expired_deadline_stops_the_pipeline() {
        let doc = estree::program(vec![]);
        let deadline = Deadline::starting_now(std::time::Duration::ZERO);
        let result = analyze_file(
            "bg.js",
            &doc,
            "",
            &AnalysisConfig::default(),
            &ApiProfiles::builtin(),
            Some(&deadline),
        );
        assert!(result.is_err());
    }
}
