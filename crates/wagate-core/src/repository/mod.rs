//! Typed repositories over the `DocumentStore` port.
//!
//! Each repository owns one document family and knows its JSON shape; the
//! store underneath only sees opaque values.

pub mod credentials;
pub mod inbox;
pub mod rules;

use serde::Serialize;
use serde::de::DeserializeOwned;
use wagate_types::error::RepositoryError;

fn decode<T: DeserializeOwned>(key: &str, value: serde_json::Value) -> Result<T, RepositoryError> {
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::InvalidDocument(format!("{key}: {e}")))
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::InvalidDocument(format!("{key}: {e}")))
}
