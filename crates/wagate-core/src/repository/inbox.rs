//! Per-session inbox persistence.

use std::sync::Arc;

use wagate_types::error::RepositoryError;
use wagate_types::message::InboxEntry;
use wagate_types::session::SessionId;

use super::{decode, encode};
use crate::store::{DocumentStore, keys};
use crate::sync::KeyedMutex;

/// Append-only inbox stored as one JSON array per session (`inbox/{id}`).
///
/// Appends are a read-modify-write of the whole document, serialized per
/// session through a FIFO lock so concurrent appends keep arrival order.
pub struct InboxRepository<S: DocumentStore> {
    store: Arc<S>,
    locks: KeyedMutex,
}

impl<S: DocumentStore> InboxRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: KeyedMutex::new(),
        }
    }

    /// Append one entry. Returns the inbox length after the append.
    pub async fn append(&self, id: &SessionId, entry: &InboxEntry) -> Result<usize, RepositoryError> {
        let key = keys::inbox(id);
        let _guard = self.locks.lock(&key).await;

        let mut entries = self.read(&key).await?.unwrap_or_default();
        entries.push(entry.clone());
        self.store.write_doc(&key, &encode(&key, &entries)?).await?;
        Ok(entries.len())
    }

    /// The session's inbox in arrival order, or None if it has never
    /// received a message.
    pub async fn list(&self, id: &SessionId) -> Result<Option<Vec<InboxEntry>>, RepositoryError> {
        self.read(&keys::inbox(id)).await
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<InboxEntry>>, RepositoryError> {
        match self.store.read_doc(key).await? {
            Some(value) => Ok(Some(decode(key, value)?)),
            None => Ok(None),
        }
    }
}
