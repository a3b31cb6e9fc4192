//! SQLite storage layer.
//!
//! Document store backed by SQLite with WAL mode and split read/write
//! connection pools.

pub mod documents;
pub mod pool;

pub use documents::SqliteDocumentStore;
pub use pool::DatabasePool;
