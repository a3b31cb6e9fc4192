//! Keyword auto-reply engine.
//!
//! Matching is a pure function of (text, rule list): rules are scanned in
//! order and the first one whose keyword occurs in the text, ignoring case,
//! wins. The engine holds the current rule list as an immutable snapshot;
//! replacing the list swaps the snapshot in one step, so a matcher sees
//! either the old list or the new one.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use wagate_types::error::GatewayError;
use wagate_types::message::InboundMessage;
use wagate_types::rule::{AutoReplyRule, ReplyAction, validate_rules};

use crate::repository::rules::RuleRepository;
use crate::store::DocumentStore;

/// First rule whose keyword is a case-insensitive substring of `text`.
pub fn find_reply<'a>(text: &str, rules: &'a [AutoReplyRule]) -> Option<&'a AutoReplyRule> {
    let text = text.to_lowercase();
    rules
        .iter()
        .find(|rule| text.contains(&rule.keyword.to_lowercase()))
}

pub struct AutoReplyEngine<S: DocumentStore> {
    repo: RuleRepository<S>,
    snapshot: watch::Sender<Arc<Vec<AutoReplyRule>>>,
    write_lock: Mutex<()>,
}

impl<S: DocumentStore> AutoReplyEngine<S> {
    /// Build the engine from the persisted rule set.
    pub async fn load(repo: RuleRepository<S>) -> Result<Self, GatewayError> {
        let rules = repo.load().await?;
        tracing::debug!(rule_count = rules.len(), "auto-reply rules loaded");
        let (snapshot, _) = watch::channel(Arc::new(rules));
        Ok(Self {
            repo,
            snapshot,
            write_lock: Mutex::new(()),
        })
    }

    /// Current rule snapshot.
    pub fn rules(&self) -> Arc<Vec<AutoReplyRule>> {
        self.snapshot.borrow().clone()
    }

    /// Validate, persist and publish a replacement rule set.
    ///
    /// Nothing is written if validation fails. Concurrent replacements are
    /// applied one at a time, so the persisted and in-memory lists agree.
    pub async fn set_rules(&self, rules: Vec<AutoReplyRule>) -> Result<Arc<Vec<AutoReplyRule>>, GatewayError> {
        validate_rules(&rules)?;
        let _guard = self.write_lock.lock().await;
        self.repo.save(&rules).await?;
        let rules = Arc::new(rules);
        self.snapshot.send_replace(rules.clone());
        tracing::info!(rule_count = rules.len(), "auto-reply rules replaced");
        Ok(rules)
    }

    /// Reply action for an inbound message, if any rule matches.
    pub fn evaluate(&self, message: &InboundMessage) -> Option<ReplyAction> {
        let text = message.text_payload()?;
        let rules = self.rules();
        find_reply(text, &rules).map(|rule| ReplyAction {
            target: message.source_id.clone(),
            text: rule.reply.clone(),
            matched_keyword: rule.keyword.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryDocumentStore;
    use chrono::Utc;

    fn rules(pairs: &[(&str, &str)]) -> Vec<AutoReplyRule> {
        pairs.iter().map(|(k, r)| AutoReplyRule::new(*k, *r)).collect()
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = rules(&[("hi", "A"), ("hi there", "B")]);
        assert_eq!(find_reply("hi there", &rules).unwrap().reply, "A");
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let rules = rules(&[("Price", "10k")]);
        assert_eq!(find_reply("what's the PRICE today?", &rules).unwrap().reply, "10k");
        assert!(find_reply("how much?", &rules).is_none());
    }

    #[test]
    fn test_no_rules_no_reply() {
        assert!(find_reply("anything", &[]).is_none());
    }

    #[test]
    fn test_matching_is_deterministic() {
        let rules = rules(&[("a", "1"), ("b", "2"), ("ab", "3")]);
        for _ in 0..10 {
            assert_eq!(find_reply("xab", &rules).unwrap().reply, "1");
        }
        let reordered = vec![rules[2].clone(), rules[0].clone(), rules[1].clone()];
        assert_eq!(find_reply("xab", &reordered).unwrap().reply, "3");
    }

    async fn engine() -> AutoReplyEngine<MemoryDocumentStore> {
        let repo = RuleRepository::new(Arc::new(MemoryDocumentStore::new()));
        AutoReplyEngine::load(repo).await.unwrap()
    }

    #[tokio::test]
    async fn test_set_rules_persists_and_swaps_snapshot() {
        let store = Arc::new(MemoryDocumentStore::new());
        let engine = AutoReplyEngine::load(RuleRepository::new(store.clone())).await.unwrap();
        let before = engine.rules();

        engine.set_rules(rules(&[("hi", "Hello")])).await.unwrap();

        // Previously taken snapshots are unaffected.
        assert!(before.is_empty());
        assert_eq!(engine.rules().len(), 1);

        let reloaded = AutoReplyEngine::load(RuleRepository::new(store)).await.unwrap();
        assert_eq!(*reloaded.rules(), rules(&[("hi", "Hello")]));
    }

    #[tokio::test]
    async fn test_invalid_rules_are_rejected_without_side_effects() {
        let engine = engine().await;
        engine.set_rules(rules(&[("hi", "Hello")])).await.unwrap();

        let err = engine.set_rules(rules(&[("", "x")])).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRules(_)));
        assert_eq!(*engine.rules(), rules(&[("hi", "Hello")]));
    }

    #[tokio::test]
    async fn test_evaluate_targets_message_source() {
        let engine = engine().await;
        engine.set_rules(rules(&[("hi", "Hello")])).await.unwrap();

        let message = InboundMessage {
            from_self: false,
            source_id: "6281@s.whatsapp.net".to_string(),
            text: Some("Hi!".to_string()),
            timestamp: Utc::now(),
            message_id: "m1".to_string(),
        };
        let action = engine.evaluate(&message).unwrap();
        assert_eq!(action.target, "6281@s.whatsapp.net");
        assert_eq!(action.text, "Hello");
        assert_eq!(action.matched_keyword, "hi");
    }
}
