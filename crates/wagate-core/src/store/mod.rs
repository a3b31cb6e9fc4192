//! Durable document store port.
//!
//! The gateway persists three kinds of JSON documents: one credential record
//! per session, one inbox per session and one global auto-reply rule set.
//! Implementations live in wagate-infra (file and SQLite backends); the
//! in-memory store here backs tests.

pub mod keys;
pub mod memory;

use std::sync::Arc;

use wagate_types::error::RepositoryError;

/// Trait for key -> JSON document persistence.
///
/// Keys are `/`-separated paths such as `inbox/s1`.
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait DocumentStore: Send + Sync + 'static {
    /// Read a document. Returns None if it does not exist.
    fn read_doc(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<serde_json::Value>, RepositoryError>> + Send;

    /// Write (create or replace) a document.
    fn write_doc(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a document. No-op if it does not exist.
    fn delete_doc(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List every key starting with `prefix`, sorted ascending.
    fn list_keys(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;
}

impl<T: DocumentStore> DocumentStore for Arc<T> {
    fn read_doc(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<serde_json::Value>, RepositoryError>> + Send
    {
        (**self).read_doc(key)
    }

    fn write_doc(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send {
        (**self).write_doc(key, value)
    }

    fn delete_doc(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send {
        (**self).delete_doc(key)
    }

    fn list_keys(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send {
        (**self).list_keys(prefix)
    }
}
