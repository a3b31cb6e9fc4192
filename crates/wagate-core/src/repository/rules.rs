//! Global auto-reply rule set persistence.

use std::sync::Arc;

use wagate_types::error::RepositoryError;
use wagate_types::rule::AutoReplyRule;

use super::{decode, encode};
use crate::store::{DocumentStore, keys};

/// Stores the rule list as a single JSON array at `auto_reply/rules`.
pub struct RuleRepository<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> RuleRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The stored rule list; empty when none has been saved.
    pub async fn load(&self) -> Result<Vec<AutoReplyRule>, RepositoryError> {
        match self.store.read_doc(keys::AUTO_REPLY_RULES).await? {
            Some(value) => decode(keys::AUTO_REPLY_RULES, value),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save(&self, rules: &[AutoReplyRule]) -> Result<(), RepositoryError> {
        let value = encode(keys::AUTO_REPLY_RULES, &rules)?;
        self.store.write_doc(keys::AUTO_REPLY_RULES, &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryDocumentStore;

    #[tokio::test]
    async fn test_load_defaults_to_empty() {
        let repo = RuleRepository::new(Arc::new(MemoryDocumentStore::new()));
        assert!(repo.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_whole_list() {
        let repo = RuleRepository::new(Arc::new(MemoryDocumentStore::new()));
        repo.save(&[AutoReplyRule::new("a", "1"), AutoReplyRule::new("b", "2")])
            .await
            .unwrap();
        repo.save(&[AutoReplyRule::new("c", "3")]).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), vec![AutoReplyRule::new("c", "3")]);
    }
}
