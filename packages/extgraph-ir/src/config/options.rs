//! Analysis configuration.
//!
//! Every option has a serde default so a partial YAML or JSON file only
//! overrides what it names. `AnalysisConfig::load` accepts either format,
//! selected by file extension.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{ConfigError, ConfigResult};

/// How a file is handed to the external parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Script,
    Module,
    Commonjs,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Script => "script",
            SourceType::Module => "module",
            SourceType::Commonjs => "commonjs",
        }
    }
}

/// Selector for the external ESTree parser process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserSelector {
    /// Program to spawn, e.g. `node`.
    pub program: String,
    /// Leading arguments, e.g. the path of a parser script. The source
    /// path, output path, and source type are appended in that order.
    #[serde(default)]
    pub args: Vec<String>,
    /// Subprocess timeout in seconds.
    #[serde(default = "default_parser_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ParserSelector {
    fn default() -> Self {
        Self {
            program: "node".to_owned(),
            args: vec!["parser/estree.js".to_owned()],
            timeout_seconds: default_parser_timeout(),
        }
    }
}

fn default_parser_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Wall-clock budget per extension.
    pub timeout_seconds: u64,
    /// Worker count for the extension-level pool. 0 means
    /// "half the available CPUs".
    pub parallelize: usize,
    /// Analyze smaller extensions first.
    pub sort_by_size_ascending: bool,
    /// Also report unguarded listeners that never touch a sensitive API.
    pub include_31_violations_without_privileged_api_access: bool,
    /// Per-extension override of how sources are parsed.
    pub source_type: SourceType,
    pub parser: ParserSelector,
    /// Depth bound for flow enumeration; deeper flows are truncated.
    pub max_flow_depth: usize,
    /// Data-dependence edge budget per file.
    pub max_pdg_edges: usize,
    /// Optional file of additions to the built-in API profile tables.
    pub api_profile_overrides: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 600,
            parallelize: 0,
            sort_by_size_ascending: false,
            include_31_violations_without_privileged_api_access: false,
            source_type: SourceType::Script,
            parser: ParserSelector::default(),
            max_flow_depth: 64,
            max_pdg_edges: 200_000,
            api_profile_overrides: None,
        }
    }
}

impl AnalysisConfig {
    /// Load from a YAML (`.yml`/`.yaml`) or JSON file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );
        let config: Self = if is_yaml {
            serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_seconds",
                reason: "must be positive".to_owned(),
            });
        }
        if self.max_flow_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_flow_depth",
                reason: "must be positive".to_owned(),
            });
        }
        if self.max_pdg_edges == 0 {
            return Err(ConfigError::Invalid {
                field: "max_pdg_edges",
                reason: "must be positive".to_owned(),
            });
        }
        if self.parser.program.is_empty() {
            return Err(ConfigError::Invalid {
                field: "parser.program",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }

    /// Effective worker degree for the extension pool.
    pub fn worker_count(&self) -> usize {
        if self.parallelize > 0 {
            self.parallelize
        } else {
            (num_cpus::get() / 2).max(1)
        }
    }
}
