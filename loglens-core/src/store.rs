//! Store — durable key/value and record-batch persistence.
//!
//! The core treats persistence as a capability behind the [`Store`] trait:
//! small string values under named keys (rule sets, preferences) plus a
//! record batch that is overwritten wholesale on every flush. Two
//! implementations live here:
//!
//! - [`FsStore`]: a JSON settings file plus timestamped batch files under a
//!   `logs/` directory, loading the most recent batch on startup.
//! - [`MemoryStore`]: in-process, with injectable failures for exercising
//!   the error paths in tests.
//!
//! Contract details callers rely on: `load_batch` on an empty or absent
//! store returns an empty Vec, never an error; `load` returns `None` for an
//! absent key.

use crate::error::{Error, Result};
use chrono::Local;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Durable key/value and batch persistence capability.
#[allow(async_fn_in_trait)]
pub trait Store {
    /// Persist a string value under a key, overwriting any previous value.
    async fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Load the value stored under a key, or `None` when absent.
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Persist a full record batch, superseding the previous batch.
    async fn save_batch(&self, records: &[String]) -> Result<()>;

    /// Load the most recently persisted batch; empty when none exists.
    async fn load_batch(&self) -> Result<Vec<String>>;

    /// Delete the persisted batch.
    async fn clear_batch(&self) -> Result<()>;
}

// ============================================
// Filesystem store
// ============================================

/// Filesystem-backed [`Store`].
///
/// Layout under the root directory:
/// - `settings.json` — one JSON object of string values keyed by setting name
/// - `logs/messages_%Y%m%d_%H%M%S.json` — one pretty-printed JSON array of
///   serialized records per batch; `load_batch` picks the newest by
///   modification time
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    async fn read_settings(&self) -> Result<HashMap<String, String>> {
        let path = self.settings_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn batch_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.logs_dir();
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl Store for FsStore {
    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut settings = self.read_settings().await?;
        settings.insert(key.to_string(), value.to_string());

        tokio::fs::create_dir_all(&self.root).await?;
        let json = serde_json::to_string_pretty(&settings)?;
        tokio::fs::write(self.settings_path(), json).await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_settings().await?.get(key).cloned())
    }

    async fn save_batch(&self, records: &[String]) -> Result<()> {
        let dir = self.logs_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("messages_{}.json", timestamp));
        let json = serde_json::to_string_pretty(records)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn load_batch(&self) -> Result<Vec<String>> {
        let files = self.batch_files().await?;
        match newest_file(&files).await {
            Some(path) => {
                let content = tokio::fs::read_to_string(&path).await?;
                Ok(serde_json::from_str(&content)?)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn clear_batch(&self) -> Result<()> {
        for path in self.batch_files().await? {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

/// Most recently modified path, falling back to name order when metadata is
/// unavailable (the timestamped names sort chronologically anyway).
async fn newest_file(paths: &[PathBuf]) -> Option<PathBuf> {
    let mut newest: Option<((std::time::SystemTime, String), PathBuf)> = None;
    for path in paths {
        let modified = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.modified().unwrap_or(std::time::UNIX_EPOCH),
            Err(_) => std::time::UNIX_EPOCH,
        };
        let key = (modified, file_name_owned(path));
        if newest.as_ref().map_or(true, |(k, _)| key > *k) {
            newest = Some((key, path.clone()));
        }
    }
    newest.map(|(_, path)| path)
}

fn file_name_owned(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================
// In-memory store
// ============================================

/// In-process [`Store`] for tests and embedding.
///
/// `fail_batch_saves` / `fail_batch_clears` make the corresponding
/// operations return errors, for exercising the non-fatal persistence
/// failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    batch: Mutex<Option<Vec<String>>>,
    batch_saves: Mutex<Vec<usize>>,
    fail_batch_saves: AtomicBool,
    fail_batch_clears: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `save_batch` calls fail.
    pub fn fail_batch_saves(&self, fail: bool) {
        self.fail_batch_saves.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `clear_batch` calls fail.
    pub fn fail_batch_clears(&self, fail: bool) {
        self.fail_batch_clears.store(fail, Ordering::SeqCst);
    }

    /// Sizes of every batch passed to `save_batch` so far, including failed
    /// attempts.
    pub fn batch_save_sizes(&self) -> Vec<usize> {
        self.batch_saves.lock().expect("lock poisoned").clone()
    }

    /// Number of `save_batch` calls observed.
    pub fn batch_save_count(&self) -> usize {
        self.batch_saves.lock().expect("lock poisoned").len()
    }
}

impl Store for MemoryStore {
    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().expect("lock poisoned").get(key).cloned())
    }

    async fn save_batch(&self, records: &[String]) -> Result<()> {
        self.batch_saves
            .lock()
            .expect("lock poisoned")
            .push(records.len());
        if self.fail_batch_saves.load(Ordering::SeqCst) {
            return Err(Error::Store("injected save_batch failure".to_string()));
        }
        *self.batch.lock().expect("lock poisoned") = Some(records.to_vec());
        Ok(())
    }

    async fn load_batch(&self) -> Result<Vec<String>> {
        Ok(self
            .batch
            .lock()
            .expect("lock poisoned")
            .clone()
            .unwrap_or_default())
    }

    async fn clear_batch(&self) -> Result<()> {
        if self.fail_batch_clears.load(Ordering::SeqCst) {
            return Err(Error::Store("injected clear_batch failure".to_string()));
        }
        *self.batch.lock().expect("lock poisoned") = None;
        Ok(())
    }
}
