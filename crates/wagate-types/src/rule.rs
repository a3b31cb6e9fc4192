use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// A keyword-triggered canned reply.
///
/// Rules live in a single global, ordered list; the first rule whose keyword
/// appears in an inbound message (case-insensitive) wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoReplyRule {
    pub keyword: String,
    pub reply: String,
}

impl AutoReplyRule {
    pub fn new(keyword: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            reply: reply.into(),
        }
    }
}

/// Reply the gateway should send in response to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyAction {
    /// Chat to reply into (the inbound message's source).
    pub target: String,
    pub text: String,
    /// Keyword of the rule that produced this reply.
    pub matched_keyword: String,
}

/// Check that every rule in a replacement set is usable.
///
/// An empty keyword would match every message, so it is rejected along with
/// empty replies.
pub fn validate_rules(rules: &[AutoReplyRule]) -> Result<(), RuleError> {
    for (index, rule) in rules.iter().enumerate() {
        if rule.keyword.trim().is_empty() {
            return Err(RuleError::EmptyKeyword { index });
        }
        if rule.reply.trim().is_empty() {
            return Err(RuleError::EmptyReply { index });
        }
    }
    Ok(())
}
