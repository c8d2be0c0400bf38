//! API profile tables.
//!
//! Two static tables keyed by dotted API name: sensitive sources (calls
//! whose results or callback parameters carry privileged data) and sinks
//! (argument positions that must not receive attacker data). The built-in
//! defaults ship with the crate and an override file can add entries
//! without code changes. `browser.*` names normalize to `chrome.*` before
//! lookup.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{ConfigError, ConfigResult};

/// Which hop of the API carries the sensitive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SourceShape {
    /// `api(.., cb)`: parameter `param` of the callback argument.
    /// `callback: None` means the last argument.
    Callback {
        callback: Option<usize>,
        param: usize,
    },
    /// The call's own value (promise style or plain return).
    Result,
}

/// What the data reaching a sink means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    /// Privileged browser API result (cookies, history, tabs, ...).
    PrivilegedApi,
    /// Extension storage read.
    StorageRead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Dotted name; `*` matches one segment.
    pub pattern: String,
    #[serde(flatten)]
    pub shape: SourceShape,
    pub category: SourceCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkCategory {
    /// Outgoing message surface (postMessage, sendMessage).
    Messaging,
    /// Extension storage write.
    StorageWrite,
    /// DOM injection / code execution.
    Dom,
    /// Privileged browser API invocation.
    PrivilegedApi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkProfile {
    pub pattern: String,
    /// Tainted argument positions; empty means every argument.
    #[serde(default)]
    pub args: Vec<usize>,
    pub category: SinkCategory,
}

impl SinkProfile {
    pub fn taints_argument(&self, position: usize) -> bool {
        self.args.is_empty() || self.args.contains(&position)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiProfiles {
    #[serde(default)]
    pub sources: Vec<SourceProfile>,
    #[serde(default)]
    pub sinks: Vec<SinkProfile>,
}

impl ApiProfiles {
    /// The versioned built-in tables.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Built-ins plus the entries of an override file (YAML or JSON).
    pub fn with_overrides(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );
        let overrides: Self = if is_yaml {
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
        let mut merged = Self::builtin();
        merged.sources.extend(overrides.sources);
        merged.sinks.extend(overrides.sinks);
        Ok(merged)
    }

    pub fn source_for(&self, dotted: &str) -> Option<&SourceProfile> {
        self.sources_for(dotted).into_iter().next()
    }

    /// Every source profile matching a dotted name (an API can expose
    /// both callback and promise shapes).
    pub fn sources_for(&self, dotted: &str) -> Vec<&SourceProfile> {
        let normalized = normalize(dotted);
        self.sources
            .iter()
            .filter(|profile| pattern_matches(&profile.pattern, &normalized))
            .collect()
    }

    pub fn sink_for(&self, dotted: &str) -> Option<&SinkProfile> {
        let normalized = normalize(dotted);
        self.sinks
            .iter()
            .find(|profile| pattern_matches(&profile.pattern, &normalized))
    }
}

/// `browser.cookies.getAll` and `chrome.cookies.getAll` are the same API.
pub fn normalize(dotted: &str) -> String {
    match dotted.strip_prefix("browser.") {
        Some(rest) => format!("chrome.{rest}"),
        None => dotted.to_owned(),
    }
}

/// Segment-wise match; `*` matches exactly one segment, a trailing `**`
/// matches the rest.
fn pattern_matches(pattern: &str, dotted: &str) -> bool {
    let mut pattern_segments = pattern.split('.').peekable();
    let mut name_segments = dotted.split('.').peekable();
    loop {
        match (pattern_segments.next(), name_segments.next()) {
            (None, None) => return true,
            (Some("**"), _) => return true,
            (Some("*"), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            _ => return false,
        }
    }
}

static BUILTIN: Lazy<ApiProfiles> = Lazy::new(|| {
    let callback_source = |pattern: &str, category: SourceCategory| SourceProfile {
        pattern: pattern.to_owned(),
        shape: SourceShape::Callback {
            callback: None,
            param: 0,
        },
        category,
    };
    let result_source = |pattern: &str, category: SourceCategory| SourceProfile {
        pattern: pattern.to_owned(),
        shape: SourceShape::Result,
        category,
    };
    let sink = |pattern: &str, args: &[usize], category: SinkCategory| SinkProfile {
        pattern: pattern.to_owned(),
        args: args.to_vec(),
        category,
    };

    ApiProfiles {
        sources: vec![
            callback_source("chrome.cookies.getAll", SourceCategory::PrivilegedApi),
            callback_source("chrome.cookies.get", SourceCategory::PrivilegedApi),
            callback_source("chrome.history.search", SourceCategory::PrivilegedApi),
            callback_source("chrome.history.getVisits", SourceCategory::PrivilegedApi),
            callback_source("chrome.tabs.query", SourceCategory::PrivilegedApi),
            callback_source("chrome.tabs.get", SourceCategory::PrivilegedApi),
            callback_source("chrome.tabs.getCurrent", SourceCategory::PrivilegedApi),
            callback_source("chrome.bookmarks.getTree", SourceCategory::PrivilegedApi),
            callback_source("chrome.bookmarks.search", SourceCategory::PrivilegedApi),
            callback_source("chrome.bookmarks.getRecent", SourceCategory::PrivilegedApi),
            callback_source("chrome.downloads.search", SourceCategory::PrivilegedApi),
            callback_source("chrome.identity.getProfileUserInfo", SourceCategory::PrivilegedApi),
            callback_source("chrome.identity.getAuthToken", SourceCategory::PrivilegedApi),
            callback_source("chrome.topSites.get", SourceCategory::PrivilegedApi),
            callback_source("chrome.sessions.getRecentlyClosed", SourceCategory::PrivilegedApi),
            callback_source("chrome.management.getAll", SourceCategory::PrivilegedApi),
            callback_source("chrome.webRequest.**", SourceCategory::PrivilegedApi),
            callback_source("chrome.storage.*.get", SourceCategory::StorageRead),
            result_source("chrome.storage.*.get", SourceCategory::StorageRead),
            result_source("chrome.cookies.getAll", SourceCategory::PrivilegedApi),
            result_source("chrome.tabs.query", SourceCategory::PrivilegedApi),
            result_source("chrome.history.search", SourceCategory::PrivilegedApi),
        ],
        sinks: vec![
            sink("*.postMessage", &[0], SinkCategory::Messaging),
            sink("chrome.tabs.sendMessage", &[1], SinkCategory::Messaging),
            sink("chrome.runtime.sendMessage", &[0], SinkCategory::Messaging),
            sink("chrome.storage.*.set", &[0], SinkCategory::StorageWrite),
            sink("document.write", &[0], SinkCategory::Dom),
            sink("document.writeln", &[0], SinkCategory::Dom),
            sink("eval", &[0], SinkCategory::Dom),
            sink("Function", &[], SinkCategory::Dom),
            sink("setTimeout", &[0], SinkCategory::Dom),
            sink("setInterval", &[0], SinkCategory::Dom),
            sink("*.insertAdjacentHTML", &[1], SinkCategory::Dom),
            sink("chrome.tabs.executeScript", &[], SinkCategory::PrivilegedApi),
            sink("chrome.scripting.executeScript", &[], SinkCategory::PrivilegedApi),
            sink("chrome.tabs.create", &[0], SinkCategory::PrivilegedApi),
            sink("chrome.tabs.update", &[], SinkCategory::PrivilegedApi),
            sink("chrome.windows.create", &[0], SinkCategory::PrivilegedApi),
            sink("chrome.downloads.download", &[0], SinkCategory::PrivilegedApi),
            sink("chrome.cookies.set", &[0], SinkCategory::PrivilegedApi),
            sink("chrome.cookies.remove", &[0], SinkCategory::PrivilegedApi),
            sink("chrome.history.deleteUrl", &[0], SinkCategory::PrivilegedApi),
            sink("chrome.bookmarks.create", &[0], SinkCategory::PrivilegedApi),
            sink("chrome.management.setEnabled", &[], SinkCategory::PrivilegedApi),
            sink("chrome.permissions.request", &[0], SinkCategory::PrivilegedApi),
        ],
    }
});

/// DOM properties whose assignment executes or injects markup.
pub const DOM_WRITE_PROPERTIES: &[&str] = &["innerHTML", "outerHTML", "srcdoc"];
