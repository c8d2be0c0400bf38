//! Per-extension report structures.
//!
//! Serializes to the per-extension JSON document: one entry per analyzed
//! surface (background page `bp`, content scripts `cs`) plus benchmarks
//! and manifest-derived fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::features::detection::domain::danger::{
    Danger, ListenerViolation, StorageAccess,
};

/// Identifier-name statistics of one surface; `-1` when the surface has
/// no identifiers of that kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeStats {
    pub avg_variable_name_length: f64,
    pub avg_function_name_length: f64,
    pub avg_parameter_name_length: f64,
    pub one_character_identifier_percentage: f64,
}

impl Default for CodeStats {
    fn default() -> Self {
        Self {
            avg_variable_name_length: -1.0,
            avg_function_name_length: -1.0,
            avg_parameter_name_length: -1.0,
            one_character_identifier_percentage: -1.0,
        }
    }
}

/// Stage timings of one surface, in seconds, plus crash entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceBenchmarks {
    pub ingest_seconds: f64,
    pub scoping_seconds: f64,
    pub pdg_seconds: f64,
    pub detection_seconds: f64,
    pub total_seconds: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crashes: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    pub bp: SurfaceBenchmarks,
    pub cs: SurfaceBenchmarks,
}

/// Findings of one surface across all of its files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceReport {
    pub code_stats: CodeStats,
    pub exfiltration_dangers: Vec<Danger>,
    pub infiltration_dangers: Vec<Danger>,
    #[serde(rename = "31_violations_without_sensitive_api_access")]
    pub unguarded_listener_violations: Vec<ListenerViolation>,
    pub extension_storage_accesses: BTreeMap<String, Vec<StorageAccess>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uncompilable_files: Vec<String>,
}

/// The whole per-extension result document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionReport {
    pub extension: String,
    pub benchmarks: Benchmarks,
    pub manifest_version: u32,
    pub content_script_injected_into: Vec<String>,
    pub bp: SurfaceReport,
    pub cs: SurfaceReport,
}
