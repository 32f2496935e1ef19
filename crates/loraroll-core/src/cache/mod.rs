//! Caching layer for loraroll-core
//!
//! Persists discovered LoRA lists as one JSON file per folder.

pub mod folder_cache;

pub use folder_cache::{ClearOutcome, FolderCache, CACHE_VERSION};
