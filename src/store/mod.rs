//! Persistent store for the housekeeping collections.
//!
//! Every collection is one named record holding an ordered JSON array. Records
//! are read and written wholesale; there is no partial-field patch primitive.
//! Each record carries a version that increases on every write, and writes
//! name the version they were computed from so stale read-modify-write cycles
//! are rejected instead of silently overwriting newer state.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

pub mod file;

pub use file::FileStore;

/// Collection keys.
pub mod keys {
    pub const ROOMS: &str = "rooms";
    pub const STAFF: &str = "staff-data";
    pub const ASSIGNMENTS: &str = "assignments-data";
    pub const SUPPLIES: &str = "supplies-data";
    pub const COMPLETIONS: &str = "completion-records";
    pub const LOGIN_HISTORY: &str = "login-history";
    pub const CHECKLIST_PREFIX: &str = "cleaning-tasks-";

    pub fn checklist(room_number: &str) -> String {
        format!("{}{}", CHECKLIST_PREFIX, room_number)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid store key: {0}")]
    InvalidKey(String),
    #[error("Stale write to {key}: expected version {expected}, found {found}")]
    StaleWrite {
        key: String,
        expected: u64,
        found: u64,
    },
}

/// Raw stored body plus its version. Version 0 means "absent".
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub body: String,
    pub version: u64,
}

#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<StoredRecord>, StoreError>;
    /// Replaces the record if its current version equals `expected_version`,
    /// returning the new version.
    async fn write(&self, key: &str, body: &str, expected_version: u64)
        -> Result<u64, StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Process-local backend; contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<String, StoredRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn read(&self, key: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn write(
        &self,
        key: &str,
        body: &str,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let current = records.get(key).map(|r| r.version).unwrap_or(0);
        if current != expected_version {
            return Err(StoreError::StaleWrite {
                key: key.to_string(),
                expected: expected_version,
                found: current,
            });
        }
        let version = current + 1;
        records.insert(
            key.to_string(),
            StoredRecord {
                body: body.to_string(),
                version,
            },
        );
        Ok(version)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.records.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// A typed collection read together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    pub version: u64,
}

impl<T> Snapshot<T> {
    pub fn is_absent(&self) -> bool {
        self.version == 0
    }
}

/// Proof that the holder owns the store's write gate.
pub struct WriteGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Shared handle over a backend. Cloning is cheap; all clones share the
/// same write gate so read-modify-write cycles run one at a time.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StoreBackend>,
    gate: Arc<Mutex<()>>,
}

impl Store {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    /// Waits for the write gate. Every mutation holds it for its whole
    /// read-validate-write cycle.
    pub async fn exclusive(&self) -> WriteGuard {
        WriteGuard {
            _guard: self.gate.clone().lock_owned().await,
        }
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Snapshot<T>, StoreError> {
        match self.backend.read(key).await? {
            Some(record) => Ok(Snapshot {
                records: serde_json::from_str(&record.body)?,
                version: record.version,
            }),
            None => Ok(Snapshot {
                records: Vec::new(),
                version: 0,
            }),
        }
    }

    pub async fn save<T: Serialize>(
        &self,
        _guard: &WriteGuard,
        key: &str,
        expected_version: u64,
        records: &[T],
    ) -> Result<u64, StoreError> {
        let body = serde_json::to_string(records)?;
        let version = self.backend.write(key, &body, expected_version).await?;
        debug!(key, version, count = records.len(), "collection written");
        Ok(version)
    }

    pub async fn remove(&self, _guard: &WriteGuard, key: &str) -> Result<(), StoreError> {
        self.backend.remove(key).await
    }

    pub async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.backend.keys().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn absent_collection_reads_empty_at_version_zero() {
        let store = Store::in_memory();
        let snapshot: Snapshot<String> = store.load("missing").await.unwrap();
        assert!(snapshot.is_absent());
        assert!(snapshot.records.is_empty());
    }

    #[tokio::test]
    async fn writes_bump_version_and_reject_stale_snapshots() {
        let store = Store::in_memory();
        let guard = store.exclusive().await;

        let v1 = store
            .save(&guard, "names", 0, &["a".to_string()])
            .await
            .unwrap();
        assert_eq!(v1, 1);

        let snapshot: Snapshot<String> = store.load("names").await.unwrap();
        assert_eq!(snapshot.records, vec!["a".to_string()]);
        assert_eq!(snapshot.version, 1);

        store
            .save(&guard, "names", 1, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        let stale = store.save(&guard, "names", 1, &["c".to_string()]).await;
        assert_matches!(
            stale,
            Err(StoreError::StaleWrite {
                expected: 1,
                found: 2,
                ..
            })
        );
    }

    #[tokio::test]
    async fn remove_makes_record_absent() {
        let store = Store::in_memory();
        let guard = store.exclusive().await;
        store.save(&guard, "x", 0, &[1u32, 2, 3]).await.unwrap();
        store.remove(&guard, "x").await.unwrap();
        assert!(store.load::<u32>("x").await.unwrap().is_absent());
        assert!(store.keys().await.unwrap().is_empty());
    }
}
