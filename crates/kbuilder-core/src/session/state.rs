//! WizardSession lifecycle logic.
//!
//! The `WizardSession` struct lives in `kbuilder-types`; this module provides
//! an extension trait (`WizardSessionExt`) with lifecycle methods: advancing
//! through steps, restarting for edits, and tracking activity for expiry.
//! The extension trait pattern is used because Rust does not allow inherent
//! impls for types defined in another crate.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use kbuilder_types::build::BuildConfiguration;
use kbuilder_types::session::{SessionId, WizardSession, WizardStep};

/// Create a new `WizardSession` for a fresh wizard run.
///
/// Starts at `CollectCompiler` with the draft seeded from `defaults`.
pub fn new_wizard_session(
    session_id: SessionId,
    defaults: BuildConfiguration,
    now: DateTime<Utc>,
) -> WizardSession {
    WizardSession {
        session_id,
        current_step: WizardStep::FIRST,
        draft: defaults,
        created_at: now,
        last_activity_at: now,
    }
}

/// Extension trait for `WizardSession` lifecycle management.
pub trait WizardSessionExt {
    /// Move to the next step and return it.
    fn advance(&mut self) -> WizardStep;

    /// Go back to the first step, keeping the draft so previous answers
    /// show up as the current values.
    fn restart(&mut self);

    /// Record activity at `now`.
    fn touch(&mut self, now: DateTime<Utc>);

    /// Whether the session has been idle for longer than `ttl`.
    fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool;
}

impl WizardSessionExt for WizardSession {
    fn advance(&mut self) -> WizardStep {
        self.current_step = self.current_step.next();
        self.current_step
    }

    fn restart(&mut self) {
        self.current_step = WizardStep::FIRST;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.last_activity_at) > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::defaults;

    fn session() -> WizardSession {
        new_wizard_session(SessionId::new("chat:1"), defaults(), Utc::now())
    }

    #[test]
    fn test_new_session_starts_at_compiler() {
        let state = session();

        assert_eq!(state.current_step, WizardStep::CollectCompiler);
        assert_eq!(state.draft, defaults());
        assert_eq!(state.created_at, state.last_activity_at);
    }

    #[test]
    fn test_advance_moves_one_step() {
        let mut state = session();

        assert_eq!(state.advance(), WizardStep::CollectRepoUrl);
        assert_eq!(state.advance(), WizardStep::CollectBranch);
        assert_eq!(state.current_step, WizardStep::CollectBranch);
    }

    #[test]
    fn test_restart_keeps_draft() {
        let mut state = session();
        state.draft.compiler = "Clang-20".to_string();
        state.current_step = WizardStep::AwaitingConfirmation;

        state.restart();

        assert_eq!(state.current_step, WizardStep::CollectCompiler);
        assert_eq!(state.draft.compiler, "Clang-20");
    }

    #[test]
    fn test_is_stale_after_ttl() {
        let mut state = session();
        let start = Utc::now();
        state.touch(start);

        let ttl = Duration::from_secs(60);
        assert!(!state.is_stale(ttl, start + TimeDelta::seconds(30)));
        assert!(state.is_stale(ttl, start + TimeDelta::seconds(61)));
    }

    #[test]
    fn test_touch_updates_activity() {
        let mut state = session();
        let later = state.last_activity_at + TimeDelta::seconds(5);
        state.touch(later);
        assert_eq!(state.last_activity_at, later);
    }
}
