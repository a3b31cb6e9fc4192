//! Document key layout.

use wagate_types::session::SessionId;

pub const CREDENTIALS_PREFIX: &str = "credentials/";
pub const INBOX_PREFIX: &str = "inbox/";

/// The global auto-reply rule set.
pub const AUTO_REPLY_RULES: &str = "auto_reply/rules";

pub fn credentials(id: &SessionId) -> String {
    format!("{CREDENTIALS_PREFIX}{id}")
}

pub fn inbox(id: &SessionId) -> String {
    format!("{INBOX_PREFIX}{id}")
}

/// Validate a document key: non-empty `/`-separated segments of
/// `[A-Za-z0-9_-]`. Stores that map keys onto paths rely on this to keep
/// documents inside their root.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}
