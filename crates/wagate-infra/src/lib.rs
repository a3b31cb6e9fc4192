//! Infrastructure layer for wagate.
//!
//! Contains implementations of the ports defined in `wagate-core`:
//! file-backed and SQLite-backed document stores, backend selection, the
//! `config.toml` loader and data directory resolution.

pub mod config;
pub mod filesystem;
pub mod sqlite;
pub mod store;
