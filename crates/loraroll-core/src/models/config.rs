//! Runtime configuration for loraroll
//!
//! Persisted as `loraroll.json`; loads degrade to defaults on any I/O or
//! parse error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file name inside the config directory
const CONFIG_FILE: &str = "loraroll.json";

/// User-facing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RollConfig {
    /// Root of the LoRA model tree
    pub lora_dir: PathBuf,

    /// Directory holding the per-folder cache files
    pub cache_dir: PathBuf,

    /// Weight forced onto every injected reference (0.0 = use the
    /// sidecar's preferred weight, then `default_multiplier`)
    pub weight_override: f64,

    /// Fallback weight when neither override nor sidecar provide one
    pub default_multiplier: f64,

    /// Skip files whose sidecar has no activation text
    pub require_activation_text: bool,

    /// Report the chosen LoRA name alongside the mutated prompt
    pub show_lora_name: bool,
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            lora_dir: PathBuf::from("models/Lora"),
            cache_dir: default_cache_dir(),
            weight_override: 0.0,
            default_multiplier: 1.0,
            require_activation_text: false,
            show_lora_name: false,
        }
    }
}

/// `<platform cache dir>/loraroll`, falling back to a dotdir in cwd
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".loraroll"))
        .join("loraroll")
}

impl RollConfig {
    /// Default config file location: `<platform config dir>/loraroll/loraroll.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("loraroll").join(CONFIG_FILE))
    }

    /// Load configuration from `path`.
    /// Returns defaults on any I/O or parse error (graceful degradation).
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Load from the default location, or defaults when none exists
    pub fn load_default() -> Self {
        Self::default_path()
            .map(|p| Self::load(&p))
            .unwrap_or_default()
    }

    /// Persist configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}
