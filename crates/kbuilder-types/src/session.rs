use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::build::{BuildConfiguration, BuildField};

use std::fmt;
use std::str::FromStr;

/// Opaque key identifying one user's wizard session.
///
/// The chat transport decides what goes in here; for Telegram it is the
/// `(chat, user)` pair so two people in the same group get separate wizards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build a session id from a chat id and the id of the user within it.
    pub fn from_chat_user(chat_id: i64, user_id: i64) -> Self {
        Self(format!("{chat_id}:{user_id}"))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Steps of the build wizard, in order.
///
/// `Idle` and `Done` mean there is no active wizard for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Idle,
    CollectCompiler,
    CollectRepoUrl,
    CollectBranch,
    CollectContainer,
    CollectNotes,
    CollectKsuMode,
    AwaitingConfirmation,
    Dispatching,
    Done,
}

impl WizardStep {
    /// First step of a fresh wizard run.
    pub const FIRST: WizardStep = WizardStep::CollectCompiler;

    /// The step that follows this one. `Done` and `Idle` are fixed points.
    pub fn next(&self) -> WizardStep {
        match self {
            WizardStep::Idle => WizardStep::Idle,
            WizardStep::CollectCompiler => WizardStep::CollectRepoUrl,
            WizardStep::CollectRepoUrl => WizardStep::CollectBranch,
            WizardStep::CollectBranch => WizardStep::CollectContainer,
            WizardStep::CollectContainer => WizardStep::CollectNotes,
            WizardStep::CollectNotes => WizardStep::CollectKsuMode,
            WizardStep::CollectKsuMode => WizardStep::AwaitingConfirmation,
            WizardStep::AwaitingConfirmation => WizardStep::Dispatching,
            WizardStep::Dispatching => WizardStep::Done,
            WizardStep::Done => WizardStep::Done,
        }
    }

    /// The configuration field a `Collect*` step fills in.
    pub fn field(&self) -> Option<BuildField> {
        match self {
            WizardStep::CollectCompiler => Some(BuildField::Compiler),
            WizardStep::CollectRepoUrl => Some(BuildField::KernelRepositoryUrl),
            WizardStep::CollectBranch => Some(BuildField::KernelBranch),
            WizardStep::CollectContainer => Some(BuildField::ContainerImage),
            WizardStep::CollectNotes => Some(BuildField::Notes),
            WizardStep::CollectKsuMode => Some(BuildField::KsuMode),
            _ => None,
        }
    }

    /// The `Collect*` step that fills in `field`.
    pub fn for_field(field: BuildField) -> WizardStep {
        match field {
            BuildField::Compiler => WizardStep::CollectCompiler,
            BuildField::KernelRepositoryUrl => WizardStep::CollectRepoUrl,
            BuildField::KernelBranch => WizardStep::CollectBranch,
            BuildField::ContainerImage => WizardStep::CollectContainer,
            BuildField::Notes => WizardStep::CollectNotes,
            BuildField::KsuMode => WizardStep::CollectKsuMode,
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.field().is_some()
    }

    /// Whether a wizard is in progress at this step.
    pub fn is_active(&self) -> bool {
        !matches!(self, WizardStep::Idle | WizardStep::Done)
    }

    /// 1-based position among the `Collect*` steps, if this is one.
    pub fn number(&self) -> Option<usize> {
        match self {
            WizardStep::CollectCompiler => Some(1),
            WizardStep::CollectRepoUrl => Some(2),
            WizardStep::CollectBranch => Some(3),
            WizardStep::CollectContainer => Some(4),
            WizardStep::CollectNotes => Some(5),
            WizardStep::CollectKsuMode => Some(6),
            _ => None,
        }
    }

    /// Number of `Collect*` steps.
    pub fn total() -> usize {
        6
    }
}

impl WizardStep {
    /// Stable snake_case name, used in logs and button payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::Idle => "idle",
            WizardStep::CollectCompiler => "collect_compiler",
            WizardStep::CollectRepoUrl => "collect_repo_url",
            WizardStep::CollectBranch => "collect_branch",
            WizardStep::CollectContainer => "collect_container",
            WizardStep::CollectNotes => "collect_notes",
            WizardStep::CollectKsuMode => "collect_ksu_mode",
            WizardStep::AwaitingConfirmation => "awaiting_confirmation",
            WizardStep::Dispatching => "dispatching",
            WizardStep::Done => "done",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WizardStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(WizardStep::Idle),
            "collect_compiler" => Ok(WizardStep::CollectCompiler),
            "collect_repo_url" => Ok(WizardStep::CollectRepoUrl),
            "collect_branch" => Ok(WizardStep::CollectBranch),
            "collect_container" => Ok(WizardStep::CollectContainer),
            "collect_notes" => Ok(WizardStep::CollectNotes),
            "collect_ksu_mode" => Ok(WizardStep::CollectKsuMode),
            "awaiting_confirmation" => Ok(WizardStep::AwaitingConfirmation),
            "dispatching" => Ok(WizardStep::Dispatching),
            "done" => Ok(WizardStep::Done),
            other => Err(format!("unknown wizard step: '{other}'")),
        }
    }
}

/// Per-user state of one wizard run.
///
/// Owned by the session store; only the wizard engine mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    pub session_id: SessionId,
    pub current_step: WizardStep,
    /// Partially filled configuration, seeded from the defaults.
    pub draft: BuildConfiguration,
    pub created_at: DateTime<Utc>,
    /// Last time input for this session was processed. Drives staleness.
    pub last_activity_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names_parse_back() {
        let mut step = WizardStep::Idle;
        loop {
            assert_eq!(step.as_str().parse::<WizardStep>(), Ok(step));
            if step == WizardStep::Done {
                break;
            }
            step = if step == WizardStep::Idle {
                WizardStep::FIRST
            } else {
                step.next()
            };
        }
        assert!("collect_everything".parse::<WizardStep>().is_err());
    }

    #[test]
    fn test_steps_advance_in_order() {
        let mut step = WizardStep::FIRST;
        let mut visited = vec![step];
        while step != WizardStep::Done {
            step = step.next();
            visited.push(step);
        }

        assert_eq!(
            visited,
            vec![
                WizardStep::CollectCompiler,
                WizardStep::CollectRepoUrl,
                WizardStep::CollectBranch,
                WizardStep::CollectContainer,
                WizardStep::CollectNotes,
                WizardStep::CollectKsuMode,
                WizardStep::AwaitingConfirmation,
                WizardStep::Dispatching,
                WizardStep::Done,
            ]
        );
    }

    #[test]
    fn test_terminal_steps_are_fixed_points() {
        assert_eq!(WizardStep::Done.next(), WizardStep::Done);
        assert_eq!(WizardStep::Idle.next(), WizardStep::Idle);
    }

    #[test]
    fn test_collect_steps_map_to_fields() {
        assert_eq!(WizardStep::CollectBranch.field(), Some(BuildField::KernelBranch));
        assert_eq!(WizardStep::CollectKsuMode.field(), Some(BuildField::KsuMode));
        assert_eq!(WizardStep::AwaitingConfirmation.field(), None);
        assert!(!WizardStep::Dispatching.is_collecting());
    }

    #[test]
    fn test_for_field_inverts_field() {
        let mut step = WizardStep::FIRST;
        while let Some(field) = step.field() {
            assert_eq!(WizardStep::for_field(field), step);
            step = step.next();
        }
    }

    #[test]
    fn test_active_excludes_idle_and_done() {
        assert!(!WizardStep::Idle.is_active());
        assert!(!WizardStep::Done.is_active());
        assert!(WizardStep::CollectNotes.is_active());
        assert!(WizardStep::Dispatching.is_active());
    }

    #[test]
    fn test_session_id_from_chat_user() {
        let id = SessionId::from_chat_user(-100123, 42);
        assert_eq!(id.to_string(), "-100123:42");
    }
}
