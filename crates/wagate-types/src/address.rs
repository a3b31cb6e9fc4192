//! Target address normalization.
//!
//! Callers hand the gateway phone numbers in whatever shape users type them
//! (`0812-3456-789`, `+62 812 3456 789`, ...). Before anything is sent, the
//! raw input is canonicalized into a network address such as
//! `62812345679@s.whatsapp.net`. Normalization is pure: the same input always
//! yields the same address or the same error.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::error::AddressError;

/// Network suffix for individual accounts.
pub const USER_SUFFIX: &str = "@s.whatsapp.net";

/// Network suffix for group chats.
pub const GROUP_SUFFIX: &str = "@g.us";

/// Kind of recipient an address points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    User,
    Group,
}

/// Canonical recipient address understood by the connection provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetAddress(String);

impl TargetAddress {
    /// Wrap an address reported by the connection provider itself.
    ///
    /// Provider-originated chat ids (such as the source of an inbound
    /// message) are already canonical and are not re-validated.
    pub fn from_provider(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this address points at a user or a group.
    pub fn kind(&self) -> AddressKind {
        if self.0.ends_with(GROUP_SUFFIX) {
            AddressKind::Group
        } else {
            AddressKind::User
        }
    }

    /// The part before the `@`.
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Country and trunk prefixes used to canonicalize national numbers.
///
/// Defaults to Indonesia: country code `62`, national trunk prefix `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingPlan {
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_trunk_prefix")]
    pub trunk_prefix: String,
}

fn default_country_code() -> String {
    "62".to_string()
}

fn default_trunk_prefix() -> String {
    "0".to_string()
}

impl Default for NumberingPlan {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            trunk_prefix: default_trunk_prefix(),
        }
    }
}

impl NumberingPlan {
    /// Canonicalize a raw phone number or network address.
    ///
    /// - Inputs already carrying a network suffix pass through unchanged,
    ///   provided their local part is well-formed.
    /// - Otherwise every non-digit is stripped; a leading trunk prefix is
    ///   rewritten into the country code, and the result must start with the
    ///   country code.
    ///
    /// # Examples
    ///
    /// ```
    /// use wagate_types::address::NumberingPlan;
    ///
    /// let plan = NumberingPlan::default();
    /// assert_eq!(
    ///     plan.normalize("081234567").unwrap().as_str(),
    ///     "6281234567@s.whatsapp.net"
    /// );
    /// ```
    pub fn normalize(&self, raw: &str) -> Result<TargetAddress, AddressError> {
        let raw = raw.trim();
        if raw.contains('@') {
            return parse_network_address(raw);
        }

        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(AddressError::NoDigits);
        }

        let number = if !self.trunk_prefix.is_empty() && digits.starts_with(&self.trunk_prefix) {
            format!("{}{}", self.country_code, &digits[self.trunk_prefix.len()..])
        } else if digits.starts_with(&self.country_code) {
            digits
        } else {
            return Err(AddressError::UnsupportedPrefix {
                digits,
                country_code: self.country_code.clone(),
                trunk_prefix: self.trunk_prefix.clone(),
            });
        };

        if number.len() <= self.country_code.len() {
            return Err(AddressError::TooShort(number));
        }

        Ok(TargetAddress(format!("{number}{USER_SUFFIX}")))
    }
}

/// Normalize with the default numbering plan.
pub fn normalize(raw: &str) -> Result<TargetAddress, AddressError> {
    NumberingPlan::default().normalize(raw)
}

/// Validate an address that already carries a network suffix.
fn parse_network_address(raw: &str) -> Result<TargetAddress, AddressError> {
    let malformed = || AddressError::MalformedAddress(raw.to_string());

    let (local, domain) = raw.split_once('@').ok_or_else(malformed)?;
    let well_formed = match format!("@{domain}").as_str() {
        USER_SUFFIX => !local.is_empty() && local.chars().all(|c| c.is_ascii_digit()),
        // Legacy group ids look like `<creator>-<timestamp>`.
        GROUP_SUFFIX => {
            !local.is_empty()
                && !local.starts_with('-')
                && !local.ends_with('-')
                && local.chars().all(|c| c.is_ascii_digit() || c == '-')
        }
        _ => false,
    };

    if well_formed {
        Ok(TargetAddress(raw.to_string()))
    } else {
        Err(malformed())
    }
}
