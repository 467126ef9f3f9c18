//! Local JSON file tier
//!
//! The file holds a single JSON array of key strings and is rewritten in
//! full on every insert. Key volumes are small (one short string per
//! message ever sent), so the simplicity of a whole-file overwrite beats
//! an append log that would need compaction.

use std::path::{Path, PathBuf};

use ahash::AHashSet;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{GuardError, store::SentKeyStore};

/// File-backed sent-key store.
///
/// The in-memory set mirrors the file; the file is only read once at open.
#[derive(Debug)]
pub struct FileSentKeyStore {
    path: PathBuf,
    keys: RwLock<AHashSet<String>>,
}

impl FileSentKeyStore {
    /// Open the store, loading any existing key file.
    ///
    /// A missing file is an empty store; the parent directory is created
    /// so the first write succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, GuardError> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let keys = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let entries: Vec<String> = serde_json::from_slice(&bytes)?;
                entries.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AHashSet::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            path = %path.display(),
            keys = keys.len(),
            "Sent-key file loaded"
        );

        Ok(Self {
            path,
            keys: RwLock::new(keys),
        })
    }

    /// Number of recorded keys.
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The file this store persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, keys: &AHashSet<String>) -> Result<(), GuardError> {
        let mut entries: Vec<&String> = keys.iter().collect();
        entries.sort();
        let bytes = serde_json::to_vec_pretty(&entries)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl SentKeyStore for FileSentKeyStore {
    async fn contains_any(&self, keys: &[String]) -> Result<bool, GuardError> {
        let recorded = self.keys.read().await;
        Ok(keys.iter().any(|key| recorded.contains(key)))
    }

    async fn insert(&self, keys: &[String]) -> Result<(), GuardError> {
        let mut recorded = self.keys.write().await;
        let before = recorded.len();
        recorded.extend(keys.iter().cloned());

        if recorded.len() != before {
            self.persist(&recorded).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), GuardError> {
        let mut recorded = self.keys.write().await;
        recorded.clear();
        self.persist(&recorded).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn keys(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSentKeyStore::open(dir.path().join("sent-messages.json"))
            .await
            .unwrap();

        assert!(!store.contains_any(&keys(&["msg:order:newOrder:A-1"])).await.unwrap());

        store
            .insert(&keys(&["msg:order:newOrder:A-1", "msg:phone:newOrder:2010"]))
            .await
            .unwrap();

        assert!(store.contains_any(&keys(&["msg:order:newOrder:A-1"])).await.unwrap());
        assert!(
            store
                .contains_any(&keys(&["msg:name:newOrder:x", "msg:phone:newOrder:2010"]))
                .await
                .unwrap()
        );
        assert!(!store.contains_any(&keys(&["msg:order:shipped:A-1"])).await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent-messages.json");

        {
            let store = FileSentKeyStore::open(&path).await.unwrap();
            store.insert(&keys(&["msg:order:newOrder:A-1"])).await.unwrap();
        }

        let reopened = FileSentKeyStore::open(&path).await.unwrap();
        assert!(
            reopened
                .contains_any(&keys(&["msg:order:newOrder:A-1"]))
                .await
                .unwrap()
        );
        assert_eq!(reopened.len().await, 1);
    }

    #[tokio::test]
    async fn test_file_is_a_json_array_of_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent-messages.json");

        let store = FileSentKeyStore::open(&path).await.unwrap();
        store
            .insert(&keys(&["msg:order:newOrder:A-1", "msg:name:newOrder:سارة"]))
            .await
            .unwrap();

        let raw = tokio::fs::read(&path).await.unwrap();
        let parsed: Vec<String> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains(&"msg:name:newOrder:سارة".to_string()));
    }

    #[tokio::test]
    async fn test_clear_empties_store_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent-messages.json");

        let store = FileSentKeyStore::open(&path).await.unwrap();
        store.insert(&keys(&["msg:order:newOrder:A-1"])).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.is_empty().await);
        let reopened = FileSentKeyStore::open(&path).await.unwrap();
        assert!(reopened.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_insert_does_not_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent-messages.json");

        let store = FileSentKeyStore::open(&path).await.unwrap();
        store.insert(&keys(&["msg:order:newOrder:A-1"])).await.unwrap();
        let modified = tokio::fs::metadata(&path).await.unwrap().modified().unwrap();

        store.insert(&keys(&["msg:order:newOrder:A-1"])).await.unwrap();
        let modified_again = tokio::fs::metadata(&path).await.unwrap().modified().unwrap();
        assert_eq!(modified, modified_again);

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent-messages.json");
        tokio::fs::write(&path, b"{not an array}").await.unwrap();

        assert!(FileSentKeyStore::open(&path).await.is_err());
    }
}
