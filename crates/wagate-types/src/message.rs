//! Inbound and outbound message types.
//!
//! `InboundMessage` is what a connection provider emits; `InboxEntry` is the
//! immutable record the gateway persists for each qualifying inbound message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbound message event as reported by the connection provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sent by the session's own account (echo of an outgoing message).
    pub from_self: bool,
    /// Chat the message arrived in; replies are addressed here.
    pub source_id: String,
    /// Text payload, if the message carries one.
    pub text: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub message_id: String,
}

impl InboundMessage {
    /// The text payload, when present and non-empty.
    pub fn text_payload(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// A persisted inbox record.
///
/// Serialized with the field names of the on-disk inbox format
/// (`from`, `text`, `timestamp` in epoch seconds, `id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxEntry {
    #[serde(rename = "from")]
    pub source_id: String,
    pub text: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "id")]
    pub message_id: String,
}

/// Media attachment sent through a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub caption: Option<String>,
}

impl MediaPayload {
    /// Coarse media category derived from the MIME type.
    pub fn kind(&self) -> MediaKind {
        let top = self.mime_type.split('/').next().unwrap_or_default();
        match top {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            _ => MediaKind::Document,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

/// Payload handed to the connection provider for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPayload {
    Text(String),
    Media(MediaPayload),
}

/// Provider acknowledgement of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub to: String,
}

/// Metadata of a group chat the session participates in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: String,
    pub subject: String,
    pub owner: Option<String>,
    pub participants: Vec<String>,
}

/// Result of checking whether an address is registered on the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressLookup {
    pub address: String,
    pub exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_inbox_entry_uses_document_field_names() {
        let entry = InboxEntry {
            source_id: "6281234567@s.whatsapp.net".to_string(),
            text: "hello".to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            message_id: "ABC123".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["from"], "6281234567@s.whatsapp.net");
        assert_eq!(json["timestamp"], 1_700_000_000);
        assert_eq!(json["id"], "ABC123");

        let back: InboxEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_text_payload_ignores_empty_text() {
        let mut msg = InboundMessage {
            from_self: false,
            source_id: "x@s.whatsapp.net".to_string(),
            text: Some(String::new()),
            timestamp: Utc::now(),
            message_id: "1".to_string(),
        };
        assert_eq!(msg.text_payload(), None);
        msg.text = None;
        assert_eq!(msg.text_payload(), None);
        msg.text = Some("hi".to_string());
        assert_eq!(msg.text_payload(), Some("hi"));
    }

    #[test]
    fn test_media_kind_from_mime() {
        let media = |mime: &str| MediaPayload {
            data: vec![1],
            mime_type: mime.to_string(),
            caption: None,
        };
        assert_eq!(media("image/png").kind(), MediaKind::Image);
        assert_eq!(media("video/mp4").kind(), MediaKind::Video);
        assert_eq!(media("audio/ogg").kind(), MediaKind::Audio);
        assert_eq!(media("application/pdf").kind(), MediaKind::Document);
    }
}
