//! The build wizard: replies, answer validation, and the state machine.

pub mod engine;
pub mod reply;
pub mod validate;
