//! Infrastructure implementations for kbuilder.
//!
//! Concrete adapters for the ports defined in `kbuilder-core`: the GitHub
//! workflow-dispatch client, the Telegram Bot API transport, and the
//! environment + TOML configuration loader.

pub mod config;
pub mod github;
pub mod telegram;
