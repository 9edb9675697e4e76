//! In-memory wizard session store.
//!
//! `SessionStore` is the only owner of `WizardSession` values. Maps are
//! `DashMap`s so different sessions never contend on a global lock, and
//! values are cloned on read so no `DashMap` guard is ever held across an
//! `.await` point.
//!
//! Operations on one session id are serialized by [`SessionStore::lock`]:
//! callers take the per-session guard, read the session, mutate their copy,
//! and `save` it back before releasing the guard.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use kbuilder_types::build::BuildConfiguration;
use kbuilder_types::dispatch::DispatchRecord;
use kbuilder_types::session::{SessionId, WizardSession, WizardStep};

use super::state::{new_wizard_session, WizardSessionExt};

/// Exclusive hold on one session id. Dropping it lets the next input through.
pub type SessionGuard = OwnedMutexGuard<()>;

/// Concurrent store of wizard sessions and their last dispatch records.
///
/// Sessions are volatile: nothing here survives a process restart.
pub struct SessionStore {
    sessions: DashMap<SessionId, WizardSession>,
    /// Per-session mutexes. Entries are kept for the life of the process so
    /// two inputs for one id can never end up holding different mutexes.
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
    last_dispatch: DashMap<SessionId, DispatchRecord>,
    defaults: BuildConfiguration,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store. New sessions are seeded from `defaults`;
    /// sessions idle longer than `ttl` are treated as absent.
    pub fn new(defaults: BuildConfiguration, ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            locks: DashMap::new(),
            last_dispatch: DashMap::new(),
            defaults,
            ttl,
        }
    }

    /// Wait for exclusive access to `session_id`.
    pub async fn lock(&self, session_id: &SessionId) -> SessionGuard {
        let lock = self
            .locks
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Return the live session for `session_id`, creating a fresh one if
    /// none exists or the existing one has gone stale.
    ///
    /// Creation is atomic: two calls for the same absent id yield the same
    /// session.
    pub fn get_or_create(&self, session_id: &SessionId) -> WizardSession {
        let now = Utc::now();
        let mut entry = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| {
                tracing::debug!(session = %session_id, "created wizard session");
                new_wizard_session(session_id.clone(), self.defaults.clone(), now)
            });

        if entry.is_stale(self.ttl, now) {
            tracing::debug!(session = %session_id, "replaced stale wizard session");
            *entry = new_wizard_session(session_id.clone(), self.defaults.clone(), now);
        }

        entry.value().clone()
    }

    /// Return the live session for `session_id`, or `None` if absent or stale.
    pub fn get(&self, session_id: &SessionId) -> Option<WizardSession> {
        let now = Utc::now();
        self.sessions
            .get(session_id)
            .map(|r| r.value().clone())
            .filter(|session| !session.is_stale(self.ttl, now))
    }

    /// Store `session`, replacing whatever was stored for its id.
    pub fn save(&self, session: WizardSession) {
        self.sessions.insert(session.session_id.clone(), session);
    }

    /// Remove the session for `session_id`, returning it if present.
    pub fn clear(&self, session_id: &SessionId) -> Option<WizardSession> {
        let removed = self.sessions.remove(session_id).map(|(_, v)| v);
        if removed.is_some() {
            tracing::debug!(session = %session_id, "cleared wizard session");
        }
        removed
    }

    /// Remember the outcome of the latest dispatch for `session_id`.
    pub fn record_dispatch(&self, session_id: &SessionId, record: DispatchRecord) {
        self.last_dispatch.insert(session_id.clone(), record);
    }

    /// The most recent dispatch for `session_id`, if any.
    pub fn last_dispatch(&self, session_id: &SessionId) -> Option<DispatchRecord> {
        self.last_dispatch
            .get(session_id)
            .map(|r| r.value().clone())
    }

    /// Drop every stale session that is not mid-dispatch. Returns how many
    /// were removed.
    pub fn sweep_stale(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| {
            session.current_step == WizardStep::Dispatching || !session.is_stale(self.ttl, now)
        });
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::debug!(removed, "swept stale wizard sessions");
        }
        removed
    }

    /// Number of stored sessions (stale ones included until swept).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
