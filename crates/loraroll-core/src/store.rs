//! In-memory LoRA store
//!
//! Holds the folder index and the process-lifetime entry lists. The map
//! is read-mostly and rebuilt only on an explicit populate, so DashMap
//! per-entry locking plus a parking_lot RwLock for the status line is
//! all the synchronization this needs.

use crate::cache::FolderCache;
use crate::error::{CoreError, ScanReport};
use crate::models::{LoraEntry, RollConfig};
use crate::parsers::SidecarParser;
use crate::prompt::{self, InjectionOutcome};
use crate::scanner::SubfolderIndex;
use crate::selector;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a populate was satisfied
#[derive(Debug, Clone)]
pub struct PopulateOutcome {
    pub from_cache: bool,
    pub entry_count: usize,
    pub report: ScanReport,
}

/// Inputs for one generation run
#[derive(Debug, Clone, Default)]
pub struct RollRequest {
    pub prompt: String,
    pub negative_prompt: String,
    /// Generation seed; `None` means a fresh random pick
    pub seed: Option<u64>,
    /// Per-run weight override; `None` falls back to the config
    pub weight_override: Option<f64>,
    /// Images in the run (batch size × iterations)
    pub batch_count: usize,
}

/// Result of one generation run's injection
#[derive(Debug, Clone)]
pub struct RollOutcome {
    pub entry: LoraEntry,
    pub weight: f64,
    pub batches: Vec<InjectionOutcome>,
}

/// Process-lifetime store of discovered LoRAs
pub struct LoraStore {
    config: RollConfig,
    index: SubfolderIndex,
    cache: FolderCache,

    /// Folder label → cached entries.
    /// Arc values keep reads cheap while a populate swaps the list.
    entries: DashMap<String, Arc<Vec<LoraEntry>>>,

    /// Human-readable status of the last cache operation
    status: RwLock<String>,
}

impl LoraStore {
    /// Build a store by scanning the configured LoRA tree
    pub fn new(config: RollConfig) -> (Self, ScanReport) {
        let mut report = ScanReport::new();
        let index = SubfolderIndex::build(&config.lora_dir, &mut report);
        let cache = FolderCache::new(config.cache_dir.clone());

        info!(
            lora_dir = %config.lora_dir.display(),
            folders = index.len(),
            files = report.files_seen,
            "LoRA store initialized"
        );

        let store = Self {
            config,
            index,
            cache,
            entries: DashMap::new(),
            status: RwLock::new("No folder cached".to_string()),
        };
        (store, report)
    }

    pub fn config(&self) -> &RollConfig {
        &self.config
    }

    pub fn index(&self) -> &SubfolderIndex {
        &self.index
    }

    pub fn cache(&self) -> &FolderCache {
        &self.cache
    }

    /// Selectable folder labels
    pub fn folders(&self) -> Vec<String> {
        self.index.folders().map(str::to_string).collect()
    }

    /// Status line of the last cache operation
    pub fn status(&self) -> String {
        self.status.read().clone()
    }

    fn set_status(&self, status: impl Into<String>) {
        *self.status.write() = status.into();
    }

    /// Entries currently held in memory for a folder
    pub fn entries(&self, folder: &str) -> Option<Arc<Vec<LoraEntry>>> {
        self.entries.get(folder).map(|e| Arc::clone(e.value()))
    }

    /// Populate a folder's entry list.
    ///
    /// Tries the on-disk cache first unless `force`; on miss, scans the
    /// folder's files and writes the cache back. Scan problems degrade
    /// into the returned report and the status line.
    pub fn populate(&self, folder: &str, force: bool) -> Result<PopulateOutcome, CoreError> {
        let files = self
            .index
            .files(folder)
            .ok_or_else(|| CoreError::UnknownFolder {
                folder: folder.to_string(),
            })?;

        if !force {
            if let Some(cached) = self.cache.load(folder) {
                let count = cached.len();
                self.entries.insert(folder.to_string(), Arc::new(cached));
                self.set_status(format!("Loaded existing cache for {}", folder));
                debug!(folder, count, "Populated from disk cache");
                return Ok(PopulateOutcome {
                    from_cache: true,
                    entry_count: count,
                    report: ScanReport::new(),
                });
            }
        }

        let started = Instant::now();
        let mut report = ScanReport::new();
        let parser =
            SidecarParser::new().with_require_activation_text(self.config.require_activation_text);

        let built: Vec<LoraEntry> = files
            .iter()
            .filter_map(|file| parser.build_entry(file, &mut report))
            .collect();

        if let Err(e) = self.cache.save(folder, &built) {
            warn!(folder, error = %e, "Failed to save cache, keeping in-memory list");
            report.add_warning(format!("cache:{}", folder), e.to_string());
        }

        let count = built.len();
        self.entries.insert(folder.to_string(), Arc::new(built));
        self.set_status(format!(
            "Cached {} LoRAs in {:.1} seconds",
            count,
            started.elapsed().as_secs_f64()
        ));
        debug!(folder, count, "Populated from scan");

        Ok(PopulateOutcome {
            from_cache: false,
            entry_count: count,
            report,
        })
    }

    /// Populate on first use, the way the per-run callback does
    pub fn ensure_populated(&self, folder: &str) -> Result<(), CoreError> {
        if self.entries.contains_key(folder) {
            return Ok(());
        }
        self.populate(folder, false).map(|_| ())
    }

    /// Run the full per-request flow: populate on demand, pick, inject.
    ///
    /// `Ok(None)` means no LoRA was found for the folder — the caller
    /// should pass its prompt through unchanged (a no-op for that run).
    pub fn roll(&self, folder: &str, request: &RollRequest) -> Result<Option<RollOutcome>, CoreError> {
        self.ensure_populated(folder)?;

        let entries = match self.entries(folder) {
            Some(e) => e,
            None => return Ok(None),
        };

        let picked = match selector::pick(&entries, request.seed) {
            Some(e) => e.clone(),
            None => {
                debug!(folder, "No valid LoRA files found in cache");
                return Ok(None);
            }
        };

        let override_weight = request.weight_override.unwrap_or(self.config.weight_override);
        let weight = prompt::resolve_weight(
            override_weight,
            picked.preferred_weight,
            self.config.default_multiplier,
        );

        let batches = prompt::inject_batch(
            &request.prompt,
            &request.negative_prompt,
            &picked,
            weight,
            request.batch_count,
        );

        Ok(Some(RollOutcome {
            entry: picked,
            weight,
            batches,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn fixture() -> (TempDir, RollConfig) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("Lora");

        write(&root.join("style").join("inkwash.safetensors"), b"");
        write(
            &root.join("style").join("inkwash.json"),
            br#"{"activation text": "ink wash", "preferred weight": 0.8}"#,
        );
        write(&root.join("style").join("plain.pt"), b"");
        write(&root.join("chars").join("knight.safetensors"), b"");
        write(
            &root.join("chars").join("knight.json"),
            br#"{"activation text": "knight armor", "negative text": "modern"}"#,
        );

        let config = RollConfig {
            lora_dir: root,
            cache_dir: dir.path().join("cache"),
            ..Default::default()
        };
        (dir, config)
    }

    #[test]
    fn test_populate_scans_then_hits_cache() {
        let (_dir, config) = fixture();
        let (store, _) = LoraStore::new(config);

        let first = store.populate("Lora/style", false).unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.entry_count, 2);
        assert!(store.status().starts_with("Cached 2 LoRAs"));

        let second = store.populate("Lora/style", false).unwrap();
        assert!(second.from_cache);
        assert_eq!(store.status(), "Loaded existing cache for Lora/style");
    }

    #[test]
    fn test_force_recache_rescans() {
        let (_dir, config) = fixture();
        let (store, _) = LoraStore::new(config);

        store.populate("Lora/style", false).unwrap();
        let forced = store.populate("Lora/style", true).unwrap();
        assert!(!forced.from_cache);
    }

    #[test]
    fn test_populate_unknown_folder_errors() {
        let (_dir, config) = fixture();
        let (store, _) = LoraStore::new(config);

        let err = store.populate("Lora/nope", false).unwrap_err();
        assert!(matches!(err, CoreError::UnknownFolder { .. }));
    }

    #[test]
    fn test_strict_mode_drops_bare_files() {
        let (_dir, mut config) = fixture();
        config.require_activation_text = true;
        let (store, _) = LoraStore::new(config);

        let outcome = store.populate("Lora/style", false).unwrap();
        assert_eq!(outcome.entry_count, 1);
        assert_eq!(outcome.report.skipped_no_activation, 1);
    }

    #[test]
    fn test_roll_injects_seeded() {
        let (_dir, config) = fixture();
        let (store, _) = LoraStore::new(config);

        let request = RollRequest {
            prompt: "scenery".to_string(),
            negative_prompt: "lowres".to_string(),
            seed: Some(42),
            batch_count: 2,
            ..Default::default()
        };

        let outcome = store.roll("Lora/chars", &request).unwrap().unwrap();
        assert_eq!(outcome.entry.name, "knight");
        assert_eq!(outcome.weight, 1.0);
        assert_eq!(outcome.batches.len(), 2);
        assert_eq!(
            outcome.batches[0].prompt,
            "<lora:knight:1>, knight armor, scenery"
        );
        assert_eq!(outcome.batches[0].negative_prompt, "lowres, modern");

        // Same seed, same pick
        let again = store.roll("Lora/chars", &request).unwrap().unwrap();
        assert_eq!(again.entry, outcome.entry);
    }

    #[test]
    fn test_roll_weight_resolution() {
        let (_dir, config) = fixture();
        let (store, _) = LoraStore::new(config);

        // inkwash has preferred weight 0.8; pin selection to it by seed search
        let entries_request = |seed| RollRequest {
            prompt: "x".to_string(),
            seed: Some(seed),
            ..Default::default()
        };
        let seed = (0..100)
            .find(|&s| {
                store
                    .roll("Lora/style", &entries_request(s))
                    .unwrap()
                    .map(|o| o.entry.name == "inkwash")
                    .unwrap_or(false)
            })
            .expect("some seed selects inkwash");

        let outcome = store.roll("Lora/style", &entries_request(seed)).unwrap().unwrap();
        assert_eq!(outcome.weight, 0.8);

        // Per-run override beats the preferred weight
        let mut request = entries_request(seed);
        request.weight_override = Some(0.4);
        let outcome = store.roll("Lora/style", &request).unwrap().unwrap();
        assert_eq!(outcome.weight, 0.4);
    }

    #[test]
    fn test_roll_empty_folder_is_noop() {
        let (_dir, mut config) = fixture();
        config.require_activation_text = true;
        let (store, _) = LoraStore::new(config);

        // chars has one entry with activation text; style keeps one.
        // Build a folder that strict mode empties completely.
        let root = store.config.lora_dir.clone();
        write(&root.join("bare").join("only.pt"), b"");
        let (store, _) = LoraStore::new(RollConfig {
            lora_dir: root,
            require_activation_text: true,
            ..store.config.clone()
        });

        let outcome = store
            .roll("Lora/bare", &RollRequest::default())
            .unwrap();
        assert!(outcome.is_none());
    }
}
