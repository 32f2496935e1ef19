//! Sidecar metadata parser
//!
//! Each model file may have a sibling `<stem>.json` carrying activation
//! text, negative text, and a preferred weight. A missing sidecar is
//! normal; a broken one is skipped with a warning.

use crate::error::{CoreError, ScanReport};
use crate::models::{LoraEntry, SidecarMetadata};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Parser for sidecar JSON files
#[derive(Debug, Default)]
pub struct SidecarParser {
    /// Skip files whose sidecar has no activation text
    require_activation_text: bool,
}

impl SidecarParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_require_activation_text(mut self, require: bool) -> Self {
        self.require_activation_text = require;
        self
    }

    /// Sibling sidecar path for a model file
    pub fn sidecar_path(model_file: &Path) -> PathBuf {
        model_file.with_extension("json")
    }

    /// Parse a sidecar file
    pub fn parse(&self, path: &Path) -> Result<SidecarMetadata, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CoreError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        serde_json::from_str(&content).map_err(|e| CoreError::JsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
            source: e,
        })
    }

    /// Read the sidecar for a model file with graceful degradation.
    ///
    /// Missing sidecars are normal and return empty metadata silently;
    /// unreadable or malformed ones also return empty metadata but leave
    /// a warning in the report.
    pub fn read_graceful(&self, model_file: &Path, report: &mut ScanReport) -> SidecarMetadata {
        let path = Self::sidecar_path(model_file);
        match self.parse(&path) {
            Ok(metadata) => {
                debug!(path = %path.display(), "Loaded sidecar metadata");
                metadata
            }
            Err(CoreError::FileNotFound { .. }) => SidecarMetadata::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read sidecar metadata");
                report.sidecar_failures += 1;
                report.add_warning(format!("sidecar:{}", path.display()), e.to_string());
                SidecarMetadata::default()
            }
        }
    }

    /// Build a cache entry for a model file, or skip it per policy
    pub fn build_entry(&self, model_file: &Path, report: &mut ScanReport) -> Option<LoraEntry> {
        let metadata = self.read_graceful(model_file, report);
        let entry = LoraEntry::new(model_file.to_path_buf(), metadata);

        if self.require_activation_text && !entry.has_activation_text() {
            debug!(file = %model_file.display(), "Skipping LoRA without activation text");
            report.skipped_no_activation += 1;
            return None;
        }

        report.entries_built += 1;
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            SidecarParser::sidecar_path(Path::new("/m/Lora/a.safetensors")),
            PathBuf::from("/m/Lora/a.json")
        );
    }

    #[test]
    fn test_missing_sidecar_is_silent() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("ghost.safetensors");
        std::fs::write(&model, b"").unwrap();

        let parser = SidecarParser::new();
        let mut report = ScanReport::new();
        let metadata = parser.read_graceful(&model, &mut report);

        assert!(metadata.activation_text.is_none());
        assert!(!report.has_errors());
        assert_eq!(report.sidecar_failures, 0);
    }

    #[test]
    fn test_malformed_sidecar_warns() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("broken.safetensors");
        std::fs::write(&model, b"").unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{oops").unwrap();

        let parser = SidecarParser::new();
        let mut report = ScanReport::new();
        let metadata = parser.read_graceful(&model, &mut report);

        assert!(metadata.activation_text.is_none());
        assert_eq!(report.sidecar_failures, 1);
        assert!(report.has_errors());
    }

    #[test]
    fn test_build_entry_reads_sidecar() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("inkwash.safetensors");
        std::fs::write(&model, b"").unwrap();
        std::fs::write(
            dir.path().join("inkwash.json"),
            r#"{"activation text": "ink wash", "preferred weight": 0.8}"#,
        )
        .unwrap();

        let parser = SidecarParser::new();
        let mut report = ScanReport::new();
        let entry = parser.build_entry(&model, &mut report).unwrap();

        assert_eq!(entry.name, "inkwash");
        assert_eq!(entry.activation_text, "ink wash");
        assert_eq!(entry.preferred_weight, Some(0.8));
        assert_eq!(report.entries_built, 1);
    }

    #[test]
    fn test_build_entry_strict_mode_skips() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("bare.safetensors");
        std::fs::write(&model, b"").unwrap();

        let strict = SidecarParser::new().with_require_activation_text(true);
        let mut report = ScanReport::new();
        assert!(strict.build_entry(&model, &mut report).is_none());
        assert_eq!(report.skipped_no_activation, 1);
        assert_eq!(report.entries_built, 0);

        let lax = SidecarParser::new();
        let mut report = ScanReport::new();
        assert!(lax.build_entry(&model, &mut report).is_some());
        assert_eq!(report.entries_built, 1);
    }
}
