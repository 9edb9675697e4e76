//! Outcome types for workflow dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::build::BuildConfiguration;
use crate::error::DispatchError;

use std::fmt;

/// Link the user can follow to watch the triggered run.
///
/// The dispatch API does not return a run id, so this is usually the
/// workflow's Actions page rather than the run itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRef(pub String);

impl TrackingRef {
    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a single dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Triggered { tracking: TrackingRef },
    Failed { error: DispatchError },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Triggered { .. })
    }
}

impl From<Result<TrackingRef, DispatchError>> for DispatchOutcome {
    fn from(result: Result<TrackingRef, DispatchError>) -> Self {
        match result {
            Ok(tracking) => DispatchOutcome::Triggered { tracking },
            Err(error) => DispatchOutcome::Failed { error },
        }
    }
}

/// What `/status` remembers about the last dispatch for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// UUID v7 minted per attempt, used to correlate logs.
    pub dispatch_id: Uuid,
    pub config: BuildConfiguration,
    pub outcome: DispatchOutcome,
    pub dispatched_at: DateTime<Utc>,
}
