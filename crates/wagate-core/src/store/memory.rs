//! In-memory `DocumentStore`, used by tests and ephemeral deployments.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use wagate_types::error::RepositoryError;

use super::DocumentStore;
use super::keys::is_valid_key;

/// Documents kept in a sorted map guarded by an async RwLock.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<BTreeMap<String, serde_json::Value>>,
    fail_deletes: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Make every `delete_doc` fail with an I/O error until switched off.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

fn check_key(key: &str) -> Result<(), RepositoryError> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidKey(key.to_string()))
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn read_doc(&self, key: &str) -> Result<Option<serde_json::Value>, RepositoryError> {
        check_key(key)?;
        Ok(self.docs.read().await.get(key).cloned())
    }

    async fn write_doc(&self, key: &str, value: &serde_json::Value) -> Result<(), RepositoryError> {
        check_key(key)?;
        self.docs.write().await.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete_doc(&self, key: &str) -> Result<(), RepositoryError> {
        check_key(key)?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Io(format!("delete of {key} refused")));
        }
        self.docs.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .docs
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_missing_returns_none() {
        let store = MemoryDocumentStore::new();
        assert!(store.read_doc("inbox/s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let store = MemoryDocumentStore::new();
        store.write_doc("inbox/s1", &json!([1, 2])).await.unwrap();
        assert_eq!(store.read_doc("inbox/s1").await.unwrap(), Some(json!([1, 2])));

        store.delete_doc("inbox/s1").await.unwrap();
        assert!(store.read_doc("inbox/s1").await.unwrap().is_none());
        // Deleting again is a no-op.
        store.delete_doc("inbox/s1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_keys_by_prefix() {
        let store = MemoryDocumentStore::new();
        for key in ["credentials/b", "credentials/a", "inbox/a", "auto_reply/rules"] {
            store.write_doc(key, &json!({})).await.unwrap();
        }
        let keys = store.list_keys("credentials/").await.unwrap();
        assert_eq!(keys, vec!["credentials/a", "credentials/b"]);
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn test_rejects_invalid_keys() {
        let store = MemoryDocumentStore::new();
        let err = store.write_doc("../x", &json!(1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidKey(_)));
    }
}
