//! Output formatting for the loraroll CLI
//!
//! Table and JSON renderings of folders, entries, and roll outcomes.

use comfy_table::{Cell, Color, ContentArrangement, Table};
use loraroll_core::{LoraEntry, LoraStore, RollOutcome};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum CliError {
    NoLoraFound { folder: String },
    Core(loraroll_core::CoreError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NoLoraFound { folder } => {
                write!(f, "No valid LoRA files found in cache for folder: {}", folder)
            }
            CliError::Core(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<loraroll_core::CoreError> for CliError {
    fn from(e: loraroll_core::CoreError) -> Self {
        CliError::Core(e)
    }
}

// ============================================================================
// Folder Listing
// ============================================================================

/// Render the selectable folders with their file counts
pub fn format_folder_table(store: &LoraStore, json: bool, no_color: bool) -> String {
    let rows: Vec<(String, usize)> = store
        .folders()
        .into_iter()
        .map(|f| {
            let count = store.index().files(&f).map(|files| files.len()).unwrap_or(0);
            (f, count)
        })
        .collect();

    if json {
        let value: Vec<serde_json::Value> = rows
            .iter()
            .map(|(folder, count)| {
                serde_json::json!({ "folder": folder, "files": count })
            })
            .collect();
        return serde_json::to_string_pretty(&value).unwrap_or_default();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Folder", "Files"]);

    for (folder, count) in rows {
        let folder_cell = if no_color {
            Cell::new(&folder)
        } else {
            Cell::new(&folder).fg(Color::Cyan)
        };
        table.add_row(vec![folder_cell, Cell::new(count)]);
    }

    table.to_string()
}

// ============================================================================
// Entry Rendering
// ============================================================================

/// Render a picked entry
pub fn format_entry(entry: &LoraEntry, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(entry).unwrap_or_default();
    }

    let mut out = String::new();
    out.push_str(&format!("Name:            {}\n", entry.name));
    out.push_str(&format!("File:            {}\n", entry.file_path.display()));
    out.push_str(&format!("Reference:       {}\n", entry.reference_token));
    if entry.has_activation_text() {
        out.push_str(&format!("Activation text: {}\n", entry.activation_text));
    }
    if let Some(ref negative) = entry.negative_text {
        out.push_str(&format!("Negative text:   {}\n", negative));
    }
    if let Some(weight) = entry.preferred_weight {
        out.push_str(&format!("Preferred weight: {}\n", weight));
    }
    out.trim_end().to_string()
}

/// Render a roll outcome: one prompt pair per batch image
pub fn format_outcome(outcome: &RollOutcome, show_name: bool, json: bool) -> String {
    if json {
        let batches: Vec<serde_json::Value> = outcome
            .batches
            .iter()
            .map(|b| {
                serde_json::json!({
                    "prompt": b.prompt,
                    "negative_prompt": b.negative_prompt,
                })
            })
            .collect();
        let mut value = serde_json::json!({
            "weight": outcome.weight,
            "batches": batches,
        });
        if show_name {
            value["lora"] = serde_json::Value::String(outcome.entry.name.clone());
        }
        return serde_json::to_string_pretty(&value).unwrap_or_default();
    }

    let mut out = String::new();
    if show_name {
        out.push_str(&format!(
            "Chosen LoRA: {} (weight {})\n\n",
            outcome.entry.name, outcome.weight
        ));
    }

    for (i, batch) in outcome.batches.iter().enumerate() {
        if outcome.batches.len() > 1 {
            out.push_str(&format!("Batch {} Prompt: {}\n", i + 1, batch.prompt));
            if !batch.negative_prompt.is_empty() {
                out.push_str(&format!("Batch {} Negative: {}\n", i + 1, batch.negative_prompt));
            }
        } else {
            out.push_str(&format!("{}\n", batch.prompt));
            if !batch.negative_prompt.is_empty() {
                out.push_str(&format!("Negative: {}\n", batch.negative_prompt));
            }
        }
    }

    out.trim_end().to_string()
}

pub fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1_024 {
        format!("{:.1}KB", bytes as f64 / 1_024.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loraroll_core::models::SidecarMetadata;
    use std::path::PathBuf;

    fn entry() -> LoraEntry {
        LoraEntry::new(
            PathBuf::from("/models/Lora/inkwash.safetensors"),
            SidecarMetadata {
                activation_text: Some("ink wash".to_string()),
                negative_text: None,
                preferred_weight: Some(0.8),
                extra: Default::default(),
            },
        )
    }

    #[test]
    fn test_format_entry_plain() {
        let text = format_entry(&entry(), false);
        assert!(text.contains("inkwash"));
        assert!(text.contains("Activation text: ink wash"));
        assert!(!text.contains("Negative text"));
    }

    #[test]
    fn test_format_entry_json_roundtrips() {
        let text = format_entry(&entry(), true);
        let parsed: LoraEntry = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, entry());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2048), "2.0KB");
        assert_eq!(format_size(3 * 1_048_576), "3.0MB");
    }
}
