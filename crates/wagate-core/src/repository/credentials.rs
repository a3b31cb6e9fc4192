//! Credential record persistence.

use std::sync::Arc;

use chrono::Utc;
use wagate_types::error::RepositoryError;
use wagate_types::session::{CredentialRecord, SessionId};

use super::{decode, encode};
use crate::store::{DocumentStore, keys};
use crate::sync::KeyedMutex;

/// Reads and writes `credentials/{session_id}` documents.
///
/// Writes for one session are serialized so that rapid credential rotations
/// land in the order the provider reported them.
pub struct CredentialRepository<S: DocumentStore> {
    store: Arc<S>,
    locks: KeyedMutex,
}

impl<S: DocumentStore> CredentialRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: KeyedMutex::new(),
        }
    }

    pub async fn load(&self, id: &SessionId) -> Result<Option<CredentialRecord>, RepositoryError> {
        let key = keys::credentials(id);
        match self.store.read_doc(&key).await? {
            Some(value) => Ok(Some(decode(&key, value)?)),
            None => Ok(None),
        }
    }

    /// Persist a new credential snapshot, replacing the previous one.
    pub async fn save(
        &self,
        id: &SessionId,
        credentials: serde_json::Value,
    ) -> Result<CredentialRecord, RepositoryError> {
        let key = keys::credentials(id);
        let _guard = self.locks.lock(&key).await;
        let record = CredentialRecord {
            session_id: id.clone(),
            credentials,
            updated_at: Utc::now(),
        };
        self.store.write_doc(&key, &encode(&key, &record)?).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: &SessionId) -> Result<(), RepositoryError> {
        let key = keys::credentials(id);
        let _guard = self.locks.lock(&key).await;
        self.store.delete_doc(&key).await
    }

    /// Every session that has a stored credential record.
    ///
    /// Keys that do not form a valid session id are skipped.
    pub async fn list_session_ids(&self) -> Result<Vec<SessionId>, RepositoryError> {
        let keys = self.store.list_keys(keys::CREDENTIALS_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|key| {
                let raw = key.strip_prefix(keys::CREDENTIALS_PREFIX)?;
                match SessionId::parse(raw) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "skipping credential document");
                        None
                    }
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryDocumentStore;
    use serde_json::json;

    fn repo() -> (Arc<MemoryDocumentStore>, CredentialRepository<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        (store.clone(), CredentialRepository::new(store))
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let (_, repo) = repo();
        let id = SessionId::parse("s1").unwrap();
        assert!(repo.load(&id).await.unwrap().is_none());

        repo.save(&id, json!({"token": "a"})).await.unwrap();
        repo.save(&id, json!({"token": "b"})).await.unwrap();

        let record = repo.load(&id).await.unwrap().unwrap();
        assert_eq!(record.session_id, id);
        assert_eq!(record.credentials, json!({"token": "b"}));
    }

    #[tokio::test]
    async fn test_delete_forgets_credentials() {
        let (_, repo) = repo();
        let id = SessionId::parse("s1").unwrap();
        repo.save(&id, json!({})).await.unwrap();
        repo.delete(&id).await.unwrap();
        assert!(repo.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_session_ids() {
        let (_, repo) = repo();
        for raw in ["beta", "alpha"] {
            repo.save(&SessionId::parse(raw).unwrap(), json!({})).await.unwrap();
        }
        let ids: Vec<String> = repo
            .list_session_ids()
            .await
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let (store, repo) = repo();
        store.write_doc("credentials/s1", &json!("nope")).await.unwrap();
        let err = repo.load(&SessionId::parse("s1").unwrap()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidDocument(_)));
    }
}
