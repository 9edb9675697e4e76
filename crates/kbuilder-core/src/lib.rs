//! Business logic and port definitions for kbuilder.
//!
//! This crate owns the build wizard: the session store, the step-by-step
//! state machine, the `DispatchClient` port the infrastructure layer
//! implements, and transport-agnostic message rendering. It depends only on
//! `kbuilder-types` -- never on `kbuilder-infra` or any HTTP crate.

pub mod defaults;
pub mod dispatch;
pub mod presentation;
pub mod session;
pub mod wizard;
