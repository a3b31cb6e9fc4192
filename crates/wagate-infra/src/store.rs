//! Runtime selection of the durable document store.

use std::path::Path;

use anyhow::Context;
use wagate_core::store::DocumentStore;
use wagate_types::config::StoreBackend;
use wagate_types::error::RepositoryError;

use crate::filesystem::FileDocumentStore;
use crate::sqlite::pool::{DatabasePool, database_url};
use crate::sqlite::SqliteDocumentStore;

/// The document store chosen by `[store] backend` in `config.toml`.
#[derive(Clone)]
pub enum DocumentBackend {
    File(FileDocumentStore),
    Sqlite(SqliteDocumentStore),
}

impl DocumentBackend {
    /// Open the configured backend under `data_dir`.
    pub async fn open(data_dir: &Path, backend: StoreBackend) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let store = match backend {
            StoreBackend::File => Self::File(FileDocumentStore::in_data_dir(data_dir)),
            StoreBackend::Sqlite => {
                let url = database_url(data_dir);
                let pool = DatabasePool::new(&url)
                    .await
                    .with_context(|| format!("failed to open database {url}"))?;
                Self::Sqlite(SqliteDocumentStore::new(pool))
            }
        };
        tracing::info!(backend = ?store.kind(), data_dir = %data_dir.display(), "document store opened");
        Ok(store)
    }

    pub fn kind(&self) -> StoreBackend {
        match self {
            Self::File(_) => StoreBackend::File,
            Self::Sqlite(_) => StoreBackend::Sqlite,
        }
    }
}

impl DocumentStore for DocumentBackend {
    async fn read_doc(&self, key: &str) -> Result<Option<serde_json::Value>, RepositoryError> {
        match self {
            Self::File(store) => store.read_doc(key).await,
            Self::Sqlite(store) => store.read_doc(key).await,
        }
    }

    async fn write_doc(&self, key: &str, value: &serde_json::Value) -> Result<(), RepositoryError> {
        match self {
            Self::File(store) => store.write_doc(key, value).await,
            Self::Sqlite(store) => store.write_doc(key, value).await,
        }
    }

    async fn delete_doc(&self, key: &str) -> Result<(), RepositoryError> {
        match self {
            Self::File(store) => store.delete_doc(key).await,
            Self::Sqlite(store) => store.delete_doc(key).await,
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, RepositoryError> {
        match self {
            Self::File(store) => store.list_keys(prefix).await,
            Self::Sqlite(store) => store.list_keys(prefix).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use wagate_core::repository::rules::RuleRepository;
    use wagate_types::rule::AutoReplyRule;

    #[tokio::test]
    async fn test_open_each_backend() {
        for backend in [StoreBackend::File, StoreBackend::Sqlite] {
            let dir = tempfile::tempdir().unwrap();
            let store = DocumentBackend::open(dir.path(), backend).await.unwrap();
            assert_eq!(store.kind(), backend);

            store.write_doc("inbox/s1", &json!([1])).await.unwrap();
            assert_eq!(store.read_doc("inbox/s1").await.unwrap(), Some(json!([1])));
            assert_eq!(store.list_keys("inbox/").await.unwrap(), vec!["inbox/s1"]);
        }
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        for backend in [StoreBackend::File, StoreBackend::Sqlite] {
            let dir = tempfile::tempdir().unwrap();
            {
                let store = DocumentBackend::open(dir.path(), backend).await.unwrap();
                let rules = RuleRepository::new(Arc::new(store));
                rules
                    .save(&[AutoReplyRule::new("hi", "Hello!")])
                    .await
                    .unwrap();
            }
            let store = DocumentBackend::open(dir.path(), backend).await.unwrap();
            let rules = RuleRepository::new(Arc::new(store)).load().await.unwrap();
            assert_eq!(rules, vec![AutoReplyRule::new("hi", "Hello!")]);
        }
    }

    #[tokio::test]
    async fn test_open_creates_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        DocumentBackend::open(&nested, StoreBackend::File).await.unwrap();
        assert!(nested.is_dir());
    }
}
