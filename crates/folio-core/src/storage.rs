//! Key/value persistence for session state.
//!
//! A [`StateStore`] wraps a pluggable [`StorageBackend`]: the durable
//! [`FileBackend`] (one JSON document, atomic tmp+rename writes) when the
//! state directory is usable, the [`MemoryBackend`] otherwise. Entries carry
//! a write timestamp and an optional expiry; reading an expired entry
//! returns absent-value and prunes it.
//!
//! Persistence is strictly best-effort: every store method catches backend
//! errors, logs them, and degrades to a no-op so the application continues
//! on in-memory defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::paths;

/// One persisted value with its write metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: Value,
    pub written_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            written_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at = chrono::TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta));
        Self {
            value,
            written_at: now,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Utc::now() >= deadline)
    }
}

/// Where entries physically live. Implementations must tolerate concurrent
/// calls from blocking-task contexts.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>>;
    fn write(&self, key: &str, entry: StoredEntry) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile fallback backend.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredEntry>> {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>> {
        Ok(self.entries().get(key).cloned())
    }

    fn write(&self, key: &str, entry: StoredEntry) -> Result<()> {
        self.entries().insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Durable backend: all entries in one JSON document on disk.
///
/// Writes go through a temp file + rename so a crash mid-write never leaves
/// a truncated document behind.
pub struct FileBackend {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path: PathBuf = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, StoredEntry>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state from {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse state from {}", self.path.display()))
    }

    fn save(&self, entries: &HashMap<String, StoredEntry>) -> Result<()> {
        let contents = serde_json::to_string_pretty(entries).context("Failed to serialize state")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)
            .with_context(|| format!("Failed to write state to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, entry: StoredEntry) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut entries = self.load()?;
        entries.insert(key.to_string(), entry);
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Best-effort session state store over a backend.
pub struct StateStore {
    backend: Box<dyn StorageBackend>,
}

impl StateStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Opens the durable store at the default state path, degrading to the
    /// in-memory backend when the directory cannot be used.
    pub fn open_default() -> Self {
        match FileBackend::new(paths::state_path()) {
            Ok(backend) => Self::new(Box::new(backend)),
            Err(err) => {
                tracing::warn!("state dir unavailable, using in-memory store: {err:#}");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Reads a value. Expired entries read as absent and are pruned.
    /// Backend failures are logged and read as absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.backend.read(key) {
            Ok(Some(entry)) if entry.is_expired() => {
                if let Err(err) = self.backend.remove(key) {
                    tracing::warn!(key, "failed to prune expired entry: {err:#}");
                }
                None
            }
            Ok(Some(entry)) => Some(entry.value),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key, "state read failed: {err:#}");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: Value) {
        self.put(key, StoredEntry::new(value));
    }

    pub fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) {
        self.put(key, StoredEntry::with_ttl(value, ttl));
    }

    fn put(&self, key: &str, entry: StoredEntry) {
        if let Err(err) = self.backend.write(key, entry) {
            tracing::warn!(key, "state write failed: {err:#}");
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(err) = self.backend.remove(key) {
            tracing::warn!(key, "state remove failed: {err:#}");
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore").finish_non_exhaustive()
    }
}
