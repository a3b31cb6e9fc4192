//! Session lifecycle, message pipeline and port definitions for wagate.
//!
//! This crate defines the "ports" (`DocumentStore`, `ConnectionProvider`,
//! `ConnectionHandle`) that outer layers implement, plus everything that
//! runs between them: the session registry, lifecycle manager, restart
//! scheduler, inbound ingestion and the auto-reply engine. It depends only
//! on `wagate-types` -- never on `wagate-infra` or any database/IO crate.

pub mod auto_reply;
pub mod event;
pub mod ingest;
pub mod lifecycle;
pub mod provider;
pub mod registry;
pub mod repository;
pub mod retry;
pub mod session;
pub mod store;
pub mod sync;
