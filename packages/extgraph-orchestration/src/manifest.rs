//! Minimal manifest intake.
//!
//! Manifest semantics live outside this system; the driver only needs to
//! locate the code and fill two report fields, so this reads exactly the
//! fields it uses: manifest version, background script paths, and
//! content-script files with their match patterns.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{DriverError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestSummary {
    pub manifest_version: u32,
    pub background_scripts: Vec<PathBuf>,
    pub content_scripts: Vec<PathBuf>,
    /// Match patterns the content scripts inject into.
    pub injected_into: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    manifest_version: Option<u32>,
    background: Option<RawBackground>,
    content_scripts: Option<Vec<RawContentScript>>,
}

#[derive(Debug, Deserialize)]
struct RawBackground {
    service_worker: Option<String>,
    scripts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawContentScript {
    js: Option<Vec<String>>,
    matches: Option<Vec<String>>,
}

/// Read `manifest.json` from an unpacked extension directory.
pub fn read_manifest_summary(extension_root: &Path) -> Result<ManifestSummary> {
    let path = extension_root.join("manifest.json");
    let text = std::fs::read_to_string(&path)
        .map_err(|_| DriverError::Manifest(path.display().to_string()))?;
    let raw: RawManifest = serde_json::from_str(&text)
        .map_err(|_| DriverError::Manifest(path.display().to_string()))?;

    let mut summary = ManifestSummary {
        manifest_version: raw.manifest_version.unwrap_or(2),
        ..ManifestSummary::default()
    };

    if let Some(background) = raw.background {
        if let Some(worker) = background.service_worker {
            summary.background_scripts.push(extension_root.join(worker));
        }
        for script in background.scripts.unwrap_or_default() {
            summary.background_scripts.push(extension_root.join(script));
        }
    }
    for entry in raw.content_scripts.unwrap_or_default() {
        for js in entry.js.unwrap_or_default() {
            summary.content_scripts.push(extension_root.join(js));
        }
        summary.injected_into.extend(entry.matches.unwrap_or_default());
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_mv3_service_worker_and_content_scripts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{
                "manifest_version": 3,
                "background": {"service_worker": "bg.js"},
                "content_scripts": [
                    {"js": ["cs.js"], "matches": ["https://*/*"]}
                ]
            }"#,
        )
        .unwrap();
        let summary = read_manifest_summary(dir.path()).unwrap();
        assert_eq!(summary.manifest_version, 3);
        assert_eq!(summary.background_scripts, vec![dir.path().join("bg.js")]);
        assert_eq!(summary.content_scripts, vec![dir.path().join("cs.js")]);
        assert_eq!(summary.injected_into, vec!["https://*/*"]);
    }

    #[test]
    fn mv2_scripts_list_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{"manifest_version": 2, "background": {"scripts": ["a.js", "b.js"]}}"#,
        )
        .unwrap();
        let summary = read_manifest_summary(dir.path()).unwrap();
        assert_eq!(summary.background_scripts.len(), 2);
        assert!(summary.content_scripts.is_empty());
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_manifest_summary(dir.path()),
            Err(DriverError::Manifest(_))
        ));
    }
}
