//! Shared domain types for wagate.
//!
//! This crate contains the core domain types used across the gateway:
//! session identity and lifecycle phases, target addresses, inbox records,
//! auto-reply rules, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, chrono, thiserror.

pub mod address;
pub mod config;
pub mod error;
pub mod message;
pub mod rule;
pub mod session;
