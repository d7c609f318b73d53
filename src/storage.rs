//! Two-tier key-value persistence.
//!
//! State is mirrored into two tiers: a durable tier (one JSON file per
//! logical key under the data directory) that survives restarts, and a
//! session tier (in-memory) that lives as long as the process. Writes
//! are best-effort: every operation returns a [`StorageError`] the
//! caller is expected to log and ignore rather than propagate.

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Persistence failure.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single key-value tier.
///
/// Values are JSON text; typed access lives on [`Storage`]. A missing
/// key reads as `Ok(None)`, a present-but-unreadable key is an error.
pub trait StorageTier: Send + Sync {
    /// Read the raw value stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write the raw value under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Durable tier: one `<key>.json` file per key.
pub struct FileTier {
    dir: PathBuf,
}

impl FileTier {
    /// Create a file tier rooted at `dir`, creating the directory.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageTier for FileTier {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session tier: in-memory, cleared when the process exits.
#[derive(Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<String, String>>,
}

impl StorageTier for MemoryTier {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Which tier an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Survives restarts.
    Durable,
    /// Process lifetime only.
    Session,
}

/// Typed access to the two persistence tiers.
pub struct Storage {
    durable: Arc<dyn StorageTier>,
    session: Arc<dyn StorageTier>,
}

impl Storage {
    /// Pair an explicit durable and session tier.
    pub fn new(durable: Arc<dyn StorageTier>, session: Arc<dyn StorageTier>) -> Self {
        Self { durable, session }
    }

    /// Open the standard pairing: files under `data_dir` plus an
    /// in-memory session tier.
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self::new(
            Arc::new(FileTier::open(data_dir)?),
            Arc::new(MemoryTier::default()),
        ))
    }

    /// Fully in-memory storage, for tests.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryTier::default()),
            Arc::new(MemoryTier::default()),
        )
    }

    fn tier(&self, tier: Tier) -> &dyn StorageTier {
        match tier {
            Tier::Durable => self.durable.as_ref(),
            Tier::Session => self.session.as_ref(),
        }
    }

    /// Read and parse the value under `key`, `None` when absent.
    pub fn read<T: DeserializeOwned>(
        &self,
        tier: Tier,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        match self.tier(tier).read(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Serialize and write `value` under `key`.
    pub fn write<T: Serialize>(
        &self,
        tier: Tier,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.tier(tier).write(key, &text)
    }

    /// Remove `key` from the given tier.
    pub fn remove(&self, tier: Tier, key: &str) -> Result<(), StorageError> {
        self.tier(tier).remove(key)
    }
}

/// Persisted key layout.
///
/// All user-scoped keys go through the helpers here so the
/// `<prefix>_<userId>` convention lives in exactly one place.
pub mod keys {
    /// Auth state snapshot (both tiers).
    pub const AUTH: &str = "auth";
    /// Bare token string (both tiers).
    pub const AUTH_TOKEN: &str = "authToken";
    /// Materials collection cache (durable tier, process-wide).
    pub const MATERIALS: &str = "materials";

    /// Per-user activity log key.
    pub fn activities(user_id: &str) -> String {
        format!("activities_{}", user_id)
    }

    /// Per-user dashboard aggregate key.
    pub fn dashboard(user_id: &str) -> String {
        format!("dashboard_{}", user_id)
    }
}
