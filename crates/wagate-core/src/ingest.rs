//! Inbound message ingestion.
//!
//! Every qualifying inbound message is appended to its session's inbox and
//! then run through the auto-reply engine. A failed reply is reported but
//! never undoes the inbox append.

use std::sync::Arc;

use wagate_types::address::TargetAddress;
use wagate_types::error::GatewayError;
use wagate_types::message::{InboundMessage, InboxEntry, OutboundPayload, SendReceipt};
use wagate_types::rule::ReplyAction;
use wagate_types::session::SessionId;

use crate::auto_reply::AutoReplyEngine;
use crate::provider::ConnectionHandle;
use crate::repository::inbox::InboxRepository;
use crate::store::DocumentStore;

/// Why an inbound event was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Echo of a message this session sent.
    FromSelf,
    /// No text payload (media, reactions, protocol messages).
    NoText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Sent { action: ReplyAction, receipt: SendReceipt },
    Failed { action: ReplyAction, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Discarded(DiscardReason),
    Recorded {
        entry: InboxEntry,
        reply: Option<ReplyOutcome>,
    },
}

pub struct IngestPipeline<S: DocumentStore> {
    inbox: InboxRepository<S>,
    auto_reply: Arc<AutoReplyEngine<S>>,
}

impl<S: DocumentStore> IngestPipeline<S> {
    pub fn new(inbox: InboxRepository<S>, auto_reply: Arc<AutoReplyEngine<S>>) -> Self {
        Self { inbox, auto_reply }
    }

    pub fn inbox(&self) -> &InboxRepository<S> {
        &self.inbox
    }

    /// Record `message` for `session_id` and send the auto-reply, if any.
    ///
    /// Returns an error only when the inbox append fails; in that case no
    /// reply is attempted.
    pub async fn ingest<H: ConnectionHandle>(
        &self,
        session_id: &SessionId,
        handle: &H,
        message: InboundMessage,
    ) -> Result<IngestOutcome, GatewayError> {
        if message.from_self {
            return Ok(IngestOutcome::Discarded(DiscardReason::FromSelf));
        }
        let Some(text) = message.text_payload() else {
            return Ok(IngestOutcome::Discarded(DiscardReason::NoText));
        };

        let entry = InboxEntry {
            source_id: message.source_id.clone(),
            text: text.to_string(),
            timestamp: message.timestamp,
            message_id: message.message_id.clone(),
        };
        let inbox_len = self.inbox.append(session_id, &entry).await?;
        tracing::debug!(
            session_id = %session_id,
            message_id = %entry.message_id,
            inbox_len,
            "inbound message recorded"
        );

        let reply = match self.auto_reply.evaluate(&message) {
            Some(action) => Some(send_reply(session_id, handle, action).await),
            None => None,
        };
        Ok(IngestOutcome::Recorded { entry, reply })
    }
}

async fn send_reply<H: ConnectionHandle>(
    session_id: &SessionId,
    handle: &H,
    action: ReplyAction,
) -> ReplyOutcome {
    let target = TargetAddress::from_provider(action.target.clone());
    match handle.send(&target, OutboundPayload::Text(action.text.clone())).await {
        Ok(receipt) => {
            tracing::info!(
                session_id = %session_id,
                to = %target,
                keyword = %action.matched_keyword,
                "auto-reply sent"
            );
            ReplyOutcome::Sent { action, receipt }
        }
        Err(e) => {
            tracing::warn!(session_id = %session_id, to = %target, error = %e, "auto-reply failed");
            ReplyOutcome::Failed {
                action,
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::loopback::LoopbackProvider;
    use crate::provider::{ConnectRequest, ConnectionProvider};
    use crate::repository::rules::RuleRepository;
    use crate::store::memory::MemoryDocumentStore;
    use chrono::Utc;
    use wagate_types::rule::AutoReplyRule;
    use wagate_types::session::AccountIdentity;

    struct Fixture {
        pipeline: IngestPipeline<MemoryDocumentStore>,
        provider: LoopbackProvider,
        session_id: SessionId,
    }

    async fn fixture(rules: Vec<AutoReplyRule>) -> Fixture {
        let store = Arc::new(MemoryDocumentStore::new());
        let engine = AutoReplyEngine::load(RuleRepository::new(store.clone())).await.unwrap();
        engine.set_rules(rules).await.unwrap();
        Fixture {
            pipeline: IngestPipeline::new(InboxRepository::new(store), Arc::new(engine)),
            provider: LoopbackProvider::new(),
            session_id: SessionId::parse("s1").unwrap(),
        }
    }

    async fn open_handle(f: &Fixture) -> crate::provider::loopback::LoopbackHandle {
        let credentials = serde_json::json!({
            "account": AccountIdentity { id: "6280@s.whatsapp.net".into(), name: None }
        });
        f.provider
            .connect(ConnectRequest {
                session_id: f.session_id.clone(),
                credentials: Some(credentials),
                event_buffer: 16,
            })
            .await
            .unwrap()
            .handle
    }

    fn inbound(text: Option<&str>, from_self: bool) -> InboundMessage {
        InboundMessage {
            from_self,
            source_id: "6281@s.whatsapp.net".to_string(),
            text: text.map(str::to_string),
            timestamp: Utc::now(),
            message_id: "m1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_self_and_textless_messages_are_discarded() {
        let f = fixture(vec![AutoReplyRule::new("hi", "A")]).await;
        let handle = open_handle(&f).await;

        let outcome = f
            .pipeline
            .ingest(&f.session_id, &handle, inbound(Some("hi"), true))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Discarded(DiscardReason::FromSelf));

        for text in [None, Some("")] {
            let outcome = f
                .pipeline
                .ingest(&f.session_id, &handle, inbound(text, false))
                .await
                .unwrap();
            assert_eq!(outcome, IngestOutcome::Discarded(DiscardReason::NoText));
        }

        assert!(f.pipeline.inbox().list(&f.session_id).await.unwrap().is_none());
        assert!(f.provider.sent(&f.session_id).is_empty());
    }

    #[tokio::test]
    async fn test_matching_message_is_recorded_and_answered() {
        let f = fixture(vec![AutoReplyRule::new("hi", "A"), AutoReplyRule::new("hi there", "B")]).await;
        let handle = open_handle(&f).await;

        let outcome = f
            .pipeline
            .ingest(&f.session_id, &handle, inbound(Some("hi there"), false))
            .await
            .unwrap();
        match outcome {
            IngestOutcome::Recorded {
                entry,
                reply: Some(ReplyOutcome::Sent { action, .. }),
            } => {
                assert_eq!(entry.text, "hi there");
                assert_eq!(action.text, "A");
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let sent = f.provider.sent(&f.session_id);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.as_str(), "6281@s.whatsapp.net");
        assert_eq!(sent[0].payload, OutboundPayload::Text("A".to_string()));
    }

    #[tokio::test]
    async fn test_reply_failure_keeps_inbox_entry() {
        let f = fixture(vec![AutoReplyRule::new("hi", "A")]).await;
        let handle = open_handle(&f).await;
        f.provider.set_fail_send(true);

        let outcome = f
            .pipeline
            .ingest(&f.session_id, &handle, inbound(Some("hi"), false))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            IngestOutcome::Recorded {
                reply: Some(ReplyOutcome::Failed { .. }),
                ..
            }
        ));
        assert_eq!(f.pipeline.inbox().list(&f.session_id).await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_message_is_recorded_without_reply() {
        let f = fixture(vec![AutoReplyRule::new("price", "10k")]).await;
        let handle = open_handle(&f).await;

        let outcome = f
            .pipeline
            .ingest(&f.session_id, &handle, inbound(Some("hello"), false))
            .await
            .unwrap();
        assert!(matches!(outcome, IngestOutcome::Recorded { reply: None, .. }));
        assert!(f.provider.sent(&f.session_id).is_empty());
    }
}
