//! Persisted records of managed functions and secrets.
//!
//! The state file is JSON (`.faasform/state.json` by default). Every mutation
//! bumps the serial and is written to disk immediately, so a crash between
//! two API calls never loses an identity the server already assigned.

use crate::function::{FunctionSpec, FunctionState};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Format version written by this build.
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Whole state file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateFile {
    pub version: u32,

    /// Incremented on every write
    #[serde(default)]
    pub serial: u64,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,

    /// Managed functions by name
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionRecord>,

    /// Managed secrets by name
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretRecord>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            last_updated: None,
            functions: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }
}

/// Record of one managed function
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionRecord {
    /// Server-assigned identity
    pub id: String,

    /// Desired state that was last applied successfully
    pub spec: FunctionSpec,

    /// Last observed state, absent until the first successful read
    #[serde(default)]
    pub observed: Option<FunctionState>,

    /// Set when the function was created but never confirmed running;
    /// the next apply replaces it.
    #[serde(default)]
    pub tainted: bool,
}

/// Record of one managed secret. The value itself is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretRecord {
    pub id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub created_at: String,
    /// blake3 of the value, to detect changes
    pub value_hash: String,
}

// ============================================================================
// Store
// ============================================================================

/// Shared handle on the state file.
///
/// Resources reconcile in parallel, so all access goes through a mutex and
/// each mutation is flushed before the lock is released.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    inner: Mutex<StateFile>,
}

impl StateStore {
    /// Load the state file, or start empty if it doesn't exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read state file: {}", path.display()))?;
            let state: StateFile = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
            if state.version > STATE_VERSION {
                bail!(
                    "State file {} has version {}, this build supports up to {}",
                    path.display(),
                    state.version,
                    STATE_VERSION
                );
            }
            log::debug!(
                "Loaded state from {} (serial {})",
                path.display(),
                state.serial
            );
            state
        } else {
            log::debug!("State file does not exist, using empty state");
            StateFile::default()
        };

        Ok(Self {
            path,
            inner: Mutex::new(state),
        })
    }

    /// Empty store that is never written to disk
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            inner: Mutex::new(StateFile::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, StateFile> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> StateFile {
        self.lock().clone()
    }

    pub fn function(&self, name: &str) -> Option<FunctionRecord> {
        self.lock().functions.get(name).cloned()
    }

    pub fn secret(&self, name: &str) -> Option<SecretRecord> {
        self.lock().secrets.get(name).cloned()
    }

    pub fn put_function(&self, name: &str, record: FunctionRecord) -> Result<()> {
        self.mutate(|state| {
            state.functions.insert(name.to_string(), record);
        })
    }

    /// Returns whether a record was removed
    pub fn remove_function(&self, name: &str) -> Result<bool> {
        let mut removed = false;
        self.mutate(|state| removed = state.functions.remove(name).is_some())?;
        Ok(removed)
    }

    pub fn put_secret(&self, name: &str, record: SecretRecord) -> Result<()> {
        self.mutate(|state| {
            state.secrets.insert(name.to_string(), record);
        })
    }

    pub fn remove_secret(&self, name: &str) -> Result<bool> {
        let mut removed = false;
        self.mutate(|state| removed = state.secrets.remove(name).is_some())?;
        Ok(removed)
    }

    /// Apply a change, bump the serial and flush to disk
    fn mutate(&self, change: impl FnOnce(&mut StateFile)) -> Result<()> {
        let mut state = self.lock();
        change(&mut state);
        state.serial += 1;
        state.last_updated = Some(Utc::now());
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        save(&self.path, &state)
    }
}

/// Write to a sibling temp file and rename over the target
fn save(path: &Path, state: &StateFile) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
    }

    let content = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)
        .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

    log::debug!("Saved state to {} (serial {})", path.display(), state.serial);
    Ok(())
}
