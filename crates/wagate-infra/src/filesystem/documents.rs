//! JSON-file document store.
//!
//! Each document lives at `{root}/{collection}/{name}.json`, e.g.
//! `{data_dir}/store/inbox/s1.json`. Writes go to a temporary sibling file
//! that is renamed over the target, so readers never see a half-written
//! document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;
use wagate_core::store::DocumentStore;
use wagate_core::store::keys::is_valid_key;
use wagate_types::error::RepositoryError;

const EXTENSION: &str = "json";

/// Filesystem-backed implementation of `DocumentStore`.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    /// Store documents under `root` (created lazily on first write).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location inside a data directory: `{data_dir}/store`.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("store"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, RepositoryError> {
        if !is_valid_key(key) {
            return Err(RepositoryError::InvalidKey(key.to_string()));
        }
        let mut path = self.root.clone();
        path.extend(key.split('/'));
        path.set_extension(EXTENSION);
        Ok(path)
    }

    /// Key for a document file under the root, if it is one.
    fn key_for(&self, path: &Path) -> Option<String> {
        if path.extension()? != EXTENSION {
            return None;
        }
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");
        let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
        let key = segments?.join("/");
        is_valid_key(&key).then_some(key)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> RepositoryError {
    RepositoryError::Io(format!("{}: {err}", path.display()))
}

impl DocumentStore for FileDocumentStore {
    async fn read_doc(&self, key: &str) -> Result<Option<serde_json::Value>, RepositoryError> {
        let path = self.path_for(key)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&path, err)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| RepositoryError::InvalidDocument(format!("{key}: {e}")))
    }

    async fn write_doc(&self, key: &str, value: &serde_json::Value) -> Result<(), RepositoryError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let content = serde_json::to_string_pretty(value)
            .map_err(|e| RepositoryError::InvalidDocument(format!("{key}: {e}")))?;
        let tmp = path.with_extension(format!("{EXTENSION}.tmp-{}", Uuid::now_v7()));
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(&path, err));
        }
        Ok(())
    }

    async fn delete_doc(&self, key: &str) -> Result<(), RepositoryError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path, err)),
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, RepositoryError> {
        // Only walk the directory the prefix points into.
        let start = match prefix.rfind('/') {
            Some(idx) => {
                let mut dir = self.root.clone();
                dir.extend(prefix[..idx].split('/'));
                dir
            }
            None => self.root.clone(),
        };

        let mut keys = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(io_error(&dir, err)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| io_error(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_for(&path) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::in_data_dir(dir.path());
        assert!(store.read_doc("inbox/s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_creates_collection_dirs_and_pretty_json() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::in_data_dir(dir.path());
        store
            .write_doc("inbox/s1", &json!([{"from": "a", "text": "hi"}]))
            .await
            .unwrap();

        let path = dir.path().join("store").join("inbox").join("s1.json");
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains('\n'), "expected pretty-printed JSON");
        assert_eq!(
            store.read_doc("inbox/s1").await.unwrap(),
            Some(json!([{"from": "a", "text": "hi"}]))
        );
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path());
        for n in 0..3 {
            store.write_doc("auto_reply/rules", &json!([n])).await.unwrap();
        }
        let mut entries = tokio::fs::read_dir(dir.path().join("auto_reply")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["rules.json"]);
        assert_eq!(store.read_doc("auto_reply/rules").await.unwrap(), Some(json!([2])));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path());
        store.write_doc("credentials/s1", &json!({})).await.unwrap();
        store.delete_doc("credentials/s1").await.unwrap();
        store.delete_doc("credentials/s1").await.unwrap();
        assert!(store.read_doc("credentials/s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_keys_by_prefix() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path());
        for key in ["credentials/b", "credentials/a", "inbox/a"] {
            store.write_doc(key, &json!({})).await.unwrap();
        }
        // Stray files are ignored.
        tokio::fs::write(dir.path().join("credentials").join("notes.txt"), "x")
            .await
            .unwrap();

        assert_eq!(
            store.list_keys("credentials/").await.unwrap(),
            vec!["credentials/a", "credentials/b"]
        );
        assert_eq!(store.list_keys("").await.unwrap().len(), 3);
        assert!(store.list_keys("groups/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path());
        let err = store.write_doc("../escape", &json!(1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_corrupt_document_is_reported() {
        let dir = tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path());
        tokio::fs::create_dir_all(dir.path().join("inbox")).await.unwrap();
        tokio::fs::write(dir.path().join("inbox").join("s1.json"), "{not json")
            .await
            .unwrap();
        assert!(matches!(
            store.read_doc("inbox/s1").await,
            Err(RepositoryError::InvalidDocument(_))
        ));
    }
}
