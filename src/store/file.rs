use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{StoreBackend, StoreError, StoredRecord};

const EXTENSION: &str = "json";

/// Directory-backed store: one `<key>.json` file per collection.
///
/// Versions are tracked per process. A file found on disk that this process
/// has not written yet is treated as version 1.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    versions: Mutex<HashMap<String, u64>>,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "opened file store");
        Ok(Self {
            dir,
            versions: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", key, EXTENSION)))
    }

    async fn current_version(
        &self,
        versions: &HashMap<String, u64>,
        key: &str,
        path: &Path,
    ) -> Result<u64, StoreError> {
        if let Some(version) = versions.get(key) {
            return Ok(*version);
        }
        match fs::metadata(path).await {
            Ok(_) => Ok(1),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StoreBackend for FileStore {
    async fn read(&self, key: &str) -> Result<Option<StoredRecord>, StoreError> {
        let path = self.path_for(key)?;
        let versions = self.versions.lock().await;
        let body = match fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let version = self.current_version(&versions, key, &path).await?;
        Ok(Some(StoredRecord { body, version }))
    }

    async fn write(
        &self,
        key: &str,
        body: &str,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let path = self.path_for(key)?;
        let mut versions = self.versions.lock().await;
        let current = self.current_version(&versions, key, &path).await?;
        if current != expected_version {
            return Err(StoreError::StaleWrite {
                key: key.to_string(),
                expected: expected_version,
                found: current,
            });
        }

        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await?;

        let version = current + 1;
        versions.insert(key.to_string(), version);
        debug!(key, version, "file record replaced");
        Ok(version)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let mut versions = self.versions.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        versions.insert(key.to_string(), 0);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[tokio::test]
    async fn rejects_keys_that_escape_the_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert_matches!(
            store.read("../etc/passwd").await,
            Err(StoreError::InvalidKey(_))
        );
    }

    #[tokio::test]
    async fn existing_files_start_at_version_one() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("rooms.json"), "[]").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        let record = store.read("rooms").await.unwrap().unwrap();
        assert_eq!(record.version, 1);
        assert_matches!(
            store.write("rooms", "[1]", 0).await,
            Err(StoreError::StaleWrite { found: 1, .. })
        );
        assert_eq!(store.write("rooms", "[1]", 1).await.unwrap(), 2);
        assert_eq!(store.keys().await.unwrap(), vec!["rooms".to_string()]);
    }
}
