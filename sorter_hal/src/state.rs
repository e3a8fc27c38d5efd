//! Persistent machine state.
//!
//! One JSON document holds everything that must survive a restart:
//! stepper absolute positions and the bin → category binding matrix.
//! The whole document is rewritten on every change.
//!
//! ```json
//! {
//!   "version": 1,
//!   "stepper_positions": { "chute": 4000, "carousel": -1200 },
//!   "bin_categories": [[["misc", null, null], [null, null, null]]],
//!   "saved_at": 1760000000
//! }
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sorter_common::store::{BindingStore, CategoryMatrix, PositionStore, StoreError};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// On-disk document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    /// Version of the document format.
    pub version: u32,
    /// Absolute stepper positions [steps] keyed by stepper name.
    #[serde(default)]
    pub stepper_positions: BTreeMap<String, i64>,
    /// Saved binding matrix, absent until the first binding.
    #[serde(default)]
    pub bin_categories: Option<CategoryMatrix>,
    /// Timestamp of last save (Unix epoch seconds).
    #[serde(default)]
    pub saved_at: u64,
}

impl PersistedState {
    /// Current document format version.
    pub const CURRENT_VERSION: u32 = 1;
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            stepper_positions: BTreeMap::new(),
            bin_categories: None,
            saved_at: 0,
        }
    }
}

/// JSON-file backed store implementing both persistence traits.
///
/// The document is cached in memory; reads never touch the disk after
/// `open`.
pub struct BlobStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
    writes: AtomicU64,
}

impl BlobStore {
    /// Open the store at `path`, starting empty if the file is absent.
    ///
    /// # Errors
    /// `StoreError::Io` if the file exists but cannot be read,
    /// `StoreError::Malformed` if it is not a valid document.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let state: PersistedState = serde_json::from_reader(reader)?;
            if state.version != PersistedState::CURRENT_VERSION {
                warn!(
                    "State file version {} differs from current {}, starting fresh",
                    state.version,
                    PersistedState::CURRENT_VERSION
                );
                PersistedState::default()
            } else {
                info!(
                    "Loaded state for {} steppers from {:?} (saved at {})",
                    state.stepper_positions.len(),
                    path,
                    state.saved_at
                );
                state
            }
        } else {
            debug!("State file {:?} does not exist, starting fresh", path);
            PersistedState::default()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
            writes: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the cached document.
    pub fn snapshot(&self) -> PersistedState {
        self.state.lock().clone()
    }

    /// Number of documents written since `open`.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn update(&self, mutate: impl FnOnce(&mut PersistedState)) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        mutate(&mut *state);
        state.saved_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.write(&*state)
    }

    // Temp file + rename: the document on disk is never truncated.
    fn write(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, state)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl BindingStore for BlobStore {
    fn load_bindings(&self) -> Result<Option<CategoryMatrix>, StoreError> {
        Ok(self.state.lock().bin_categories.clone())
    }

    fn save_bindings(&self, matrix: &CategoryMatrix) -> Result<(), StoreError> {
        self.update(|s| s.bin_categories = Some(matrix.clone()))?;
        debug!("Saved bin bindings to {:?}", self.path);
        Ok(())
    }
}

impl PositionStore for BlobStore {
    fn load_position(&self, name: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.state.lock().stepper_positions.get(name).copied())
    }

    fn save_position(&self, name: &str, steps: i64) -> Result<(), StoreError> {
        self.update(|s| {
            s.stepper_positions.insert(name.to_string(), steps);
        })
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<PersistedState>,
    binding_writes: AtomicU64,
    position_writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a binding matrix.
    pub fn with_bindings(matrix: CategoryMatrix) -> Self {
        let store = Self::default();
        store.state.lock().bin_categories = Some(matrix);
        store
    }

    pub fn binding_writes(&self) -> u64 {
        self.binding_writes.load(Ordering::Relaxed)
    }

    pub fn position_writes(&self) -> u64 {
        self.position_writes.load(Ordering::Relaxed)
    }
}

impl BindingStore for MemoryStore {
    fn load_bindings(&self) -> Result<Option<CategoryMatrix>, StoreError> {
        Ok(self.state.lock().bin_categories.clone())
    }

    fn save_bindings(&self, matrix: &CategoryMatrix) -> Result<(), StoreError> {
        self.state.lock().bin_categories = Some(matrix.clone());
        self.binding_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl PositionStore for MemoryStore {
    fn load_position(&self, name: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.state.lock().stepper_positions.get(name).copied())
    }

    fn save_position(&self, name: &str, steps: i64) -> Result<(), StoreError> {
        self.state
            .lock()
            .stepper_positions
            .insert(name.to_string(), steps);
        self.position_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn matrix() -> CategoryMatrix {
        vec![vec![
            vec![Some("misc".to_string()), None],
            vec![None, Some("plates".to_string())],
        ]]
    }

    #[test]
    fn open_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = BlobStore::open(dir.path().join("data.json")).unwrap();
        assert_eq!(store.load_bindings().unwrap(), None);
        assert_eq!(store.load_position("chute").unwrap(), None);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn positions_and_bindings_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");
        {
            let store = BlobStore::open(&path).unwrap();
            store.save_position("chute", 4000).unwrap();
            store.save_position("carousel", -400).unwrap();
            store.save_bindings(&matrix()).unwrap();
            assert_eq!(store.write_count(), 3);
        }

        let store = BlobStore::open(&path).unwrap();
        assert_eq!(store.load_position("chute").unwrap(), Some(4000));
        assert_eq!(store.load_position("carousel").unwrap(), Some(-400));
        assert_eq!(store.load_bindings().unwrap(), Some(matrix()));
        assert!(store.snapshot().saved_at > 0);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn document_uses_named_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = BlobStore::open(&path).unwrap();
        store.save_position("intake", 12).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["stepper_positions"]["intake"], 12);
        assert_eq!(raw["version"], 1);
    }

    #[test]
    fn malformed_document_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            BlobStore::open(&path),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn other_version_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(
            &path,
            r#"{"version": 99, "stepper_positions": {"chute": 5}}"#,
        )
        .unwrap();
        let store = BlobStore::open(&path).unwrap();
        assert_eq!(store.load_position("chute").unwrap(), None);
    }

    #[test]
    fn memory_store_counts_writes() {
        let store = MemoryStore::with_bindings(matrix());
        assert_eq!(store.load_bindings().unwrap(), Some(matrix()));
        assert_eq!(store.binding_writes(), 0);
        store.save_bindings(&matrix()).unwrap();
        store.save_position("chute", 1).unwrap();
        assert_eq!(store.binding_writes(), 1);
        assert_eq!(store.position_writes(), 1);
    }
}
