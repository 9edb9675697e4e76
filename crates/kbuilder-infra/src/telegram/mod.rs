//! Telegram Bot API transport.
//!
//! [`TelegramClient`] speaks the HTTP Bot API (long polling, messages,
//! callback acknowledgements); [`updates`] turns raw updates into the
//! wizard's session-keyed inputs.

pub mod client;
pub mod types;
pub mod updates;

pub use client::{TelegramClient, UpdateBatch};
pub use updates::{normalize_update, InboundEvent};
