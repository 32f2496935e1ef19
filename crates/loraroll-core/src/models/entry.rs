//! LoRA entry and sidecar metadata models

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A selectable LoRA, derived from a model file and its sidecar JSON.
///
/// Immutable once built. The persisted field names match the cache files
/// written by the WebUI LoRA-picker extensions, so existing cache files
/// keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraEntry {
    /// Path to the model file (`.pt`, `.ckpt`, `.safetensors`)
    #[serde(rename = "file")]
    pub file_path: PathBuf,

    /// File stem, used inside the reference token
    pub name: String,

    /// Reference token as cached, e.g. `<lora:styleA:1>`.
    /// The weight is re-resolved at injection time.
    #[serde(rename = "prompt")]
    pub reference_token: String,

    /// Recommended positive-prompt fragment (may be empty)
    #[serde(default)]
    pub activation_text: String,

    /// Recommended negative-prompt fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_text: Option<String>,

    /// Author-preferred weight from the sidecar (0.0 means unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_weight: Option<f64>,
}

impl LoraEntry {
    /// Build an entry from a model file path and its sidecar metadata
    pub fn new(file_path: PathBuf, metadata: SidecarMetadata) -> Self {
        let name = file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            reference_token: format!("<lora:{}:1>", name),
            name,
            file_path,
            activation_text: metadata.activation_text.unwrap_or_default(),
            negative_text: metadata.negative_text.filter(|t| !t.trim().is_empty()),
            preferred_weight: metadata.preferred_weight,
        }
    }

    /// True when the sidecar provided a usable activation text
    pub fn has_activation_text(&self) -> bool {
        !self.activation_text.trim().is_empty()
    }
}

/// Sidecar metadata as found in `<model>.json` next to a model file.
///
/// The on-disk keys contain spaces (the format predates this tool).
/// Everything is optional; a missing or unreadable sidecar degrades to
/// `SidecarMetadata::default()`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SidecarMetadata {
    #[serde(rename = "activation text")]
    pub activation_text: Option<String>,

    #[serde(rename = "negative text")]
    pub negative_text: Option<String>,

    /// Some sidecar writers emit this as a number, others as a string
    #[serde(rename = "preferred weight", deserialize_with = "flexible_weight")]
    #[serde(default)]
    pub preferred_weight: Option<f64>,

    /// Untyped fields from other sidecar writers
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Accept `0.8`, `"0.8"`, or `null` for the preferred weight
fn flexible_weight<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
