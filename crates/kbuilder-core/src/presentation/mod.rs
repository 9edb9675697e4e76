//! Transport-agnostic presentation layer.
//!
//! `inbound` normalizes chat payloads into wizard inputs; `render` turns
//! wizard replies into message text plus an optional button grid. Chat
//! transports only translate these to and from their wire formats.

pub mod inbound;
pub mod render;
