//! Folder scanner
//!
//! Walks the LoRA model tree and builds the subfolder index the selector
//! draws from. A file is registered under every ancestor folder, so
//! selecting a parent folder draws from its whole subtree.

use crate::error::ScanReport;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Model file extensions recognized as LoRAs
pub const LORA_EXTENSIONS: [&str; 3] = ["pt", "ckpt", "safetensors"];

/// True when the path carries one of the recognized model extensions
pub fn is_lora_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            LORA_EXTENSIONS.iter().any(|known| *known == e)
        })
        .unwrap_or(false)
}

/// Discover all model files under `root`, in walk order
pub fn discover_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                debug!(error = %err, "Skipping unreadable directory entry");
                None
            }
        })
    {
        let path = entry.path();
        if entry.file_type().is_file() && is_lora_file(path) {
            files.push(path.to_path_buf());
        }
    }

    debug!(root = %root.display(), count = files.len(), "Discovered model files");
    files
}

/// Folder labels mapped to the model files beneath them.
///
/// Labels are `/`-separated paths relative to the parent of the scan
/// root, so a tree rooted at `models/Lora` yields labels like `Lora`
/// and `Lora/style`.
#[derive(Debug, Default, Clone)]
pub struct SubfolderIndex {
    folders: BTreeMap<String, Vec<PathBuf>>,
}

impl SubfolderIndex {
    /// Scan `root` and build the index
    pub fn build(root: &Path, report: &mut ScanReport) -> Self {
        if !root.is_dir() {
            warn!(root = %root.display(), "LoRA directory does not exist");
            report.add_warning(
                "scanner",
                format!("LoRA directory not found: {}", root.display()),
            );
            return Self::default();
        }

        let base = root.parent().unwrap_or(root);
        let mut folders: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

        for file in discover_files(root) {
            report.files_seen += 1;
            let rel = file.strip_prefix(base).unwrap_or(&file);

            let mut dir = rel.parent();
            while let Some(d) = dir {
                if d.as_os_str().is_empty() {
                    break;
                }
                folders.entry(folder_label(d)).or_default().push(file.clone());
                dir = d.parent();
            }
        }

        Self { folders }
    }

    /// Sorted folder labels
    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.folders.keys().map(String::as_str)
    }

    /// Files registered under a folder label (subtree included)
    pub fn files(&self, folder: &str) -> Option<&[PathBuf]> {
        self.folders.get(folder).map(Vec::as_slice)
    }

    pub fn contains(&self, folder: &str) -> bool {
        self.folders.contains_key(folder)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

/// Normalize a relative directory to a `/`-separated label
fn folder_label(dir: &Path) -> String {
    let parts: Vec<String> = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => Some(os.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.join("/")
}
