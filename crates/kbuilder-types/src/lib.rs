//! Shared domain types for kbuilder.
//!
//! This crate contains the core domain types used across the kbuilder bot:
//! the build configuration being assembled, wizard sessions, dispatch records,
//! process configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, secrecy.

pub mod build;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod session;
