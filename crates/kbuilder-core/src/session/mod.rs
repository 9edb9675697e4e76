//! Wizard session lifecycle and storage.
//!
//! `state` holds the `WizardSession` lifecycle helpers; `store` is the
//! in-memory, per-session-locked store the wizard engine borrows from.

pub mod state;
pub mod store;
