//! The build wizard state machine.
//!
//! `WizardEngine` takes one normalized input for one session, applies the
//! transition for the session's current step, and returns the replies to
//! render. Sessions are borrowed from the [`SessionStore`] under its
//! per-session lock, so two inputs from the same user never interleave.
//!
//! Transition table:
//!
//! | Step                 | Input              | Next                        |
//! |----------------------|--------------------|-----------------------------|
//! | `Collect*`           | `cancel`           | cleared                     |
//! | `Collect*`           | valid answer       | next step                   |
//! | `Collect*`           | invalid answer     | same step, error shown      |
//! | AwaitingConfirmation | `confirm`          | Dispatching -> Done, cleared|
//! | AwaitingConfirmation | `edit`             | CollectCompiler (draft kept)|
//! | AwaitingConfirmation | `cancel`           | cleared                     |
//! | AwaitingConfirmation | anything else      | same step, summary again    |
//! | no session           | any answer         | unchanged, "no active build"|
//! | any                  | button for another step | unchanged, prompt again |

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use kbuilder_types::dispatch::DispatchRecord;
use kbuilder_types::error::{DispatchError, ValidationError};
use kbuilder_types::session::{SessionId, WizardSession, WizardStep};

use crate::dispatch::DispatchClient;
use crate::presentation::inbound::{Command, Input, Token, KEYWORD_CONFIRM, KEYWORD_EDIT};
use crate::session::state::WizardSessionExt;
use crate::session::store::SessionStore;

use super::reply::{Prompt, Reply, StatusReport};
use super::validate::apply_answer;

/// Drives wizard sessions and hands finished configurations to a
/// [`DispatchClient`].
pub struct WizardEngine<D: DispatchClient> {
    store: Arc<SessionStore>,
    dispatcher: D,
    dispatch_timeout: Duration,
}

impl<D: DispatchClient> WizardEngine<D> {
    pub fn new(store: Arc<SessionStore>, dispatcher: D, dispatch_timeout: Duration) -> Self {
        Self {
            store,
            dispatcher,
            dispatch_timeout,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Process one input for `session_id` and return the replies to send back.
    pub async fn handle(&self, session_id: &SessionId, input: Input) -> Vec<Reply> {
        match input {
            Input::Command(Command::Start) => vec![Reply::Welcome],
            Input::Command(Command::Help) => vec![Reply::Help],
            Input::Command(Command::Unknown(name)) => vec![Reply::UnknownCommand(name)],
            Input::Command(Command::Status) => vec![Reply::Status(self.status(session_id))],
            Input::Command(Command::Build) => self.start_build(session_id).await,
            Input::Command(Command::Cancel) => self.cancel(session_id).await,
            Input::Token(token) => self.answer(session_id, None, token).await,
            Input::Choice { step, token } => self.answer(session_id, Some(step), token).await,
        }
    }

    /// Active step (if any) and last dispatch for `session_id`.
    ///
    /// Lock-free: a status query during a dispatch reports `Dispatching`
    /// instead of waiting for it.
    pub fn status(&self, session_id: &SessionId) -> StatusReport {
        StatusReport {
            active_step: self
                .store
                .get(session_id)
                .map(|session| session.current_step)
                .filter(WizardStep::is_active),
            last_dispatch: self.store.last_dispatch(session_id),
        }
    }

    async fn start_build(&self, session_id: &SessionId) -> Vec<Reply> {
        let _guard = self.store.lock(session_id).await;

        let live = self
            .store
            .get(session_id)
            .filter(|session| session.current_step.is_active());
        if let Some(session) = live {
            tracing::debug!(session = %session_id, step = %session.current_step, "build already in progress");
            return vec![self.current_prompt(&session, true)];
        }

        let session = self.store.get_or_create(session_id);
        tracing::info!(session = %session_id, "build wizard started");
        vec![self.current_prompt(&session, false)]
    }

    async fn cancel(&self, session_id: &SessionId) -> Vec<Reply> {
        let _guard = self.store.lock(session_id).await;

        let had_live_session = self.store.get(session_id).is_some();
        self.store.clear(session_id);

        if had_live_session {
            tracing::info!(session = %session_id, "build wizard cancelled");
            vec![Reply::Cancelled]
        } else {
            vec![Reply::NoActiveBuild]
        }
    }

    /// Apply an answer. `offered_at` is set for button presses: the step the
    /// button was rendered for. A press from an older message is ignored and
    /// the current prompt shown again.
    async fn answer(
        &self,
        session_id: &SessionId,
        offered_at: Option<WizardStep>,
        token: Token,
    ) -> Vec<Reply> {
        let _guard = self.store.lock(session_id).await;

        let Some(mut session) = self
            .store
            .get(session_id)
            .filter(|session| session.current_step.is_active())
        else {
            return vec![Reply::NoActiveBuild];
        };

        match offered_at {
            Some(step) if step != session.current_step => {
                tracing::warn!(
                    session = %session_id,
                    button_step = %step,
                    step = %session.current_step,
                    choice = token.as_str(),
                    "stale button press ignored"
                );
                return vec![self.current_prompt(&session, false)];
            }
            _ => {}
        }
        session.touch(Utc::now());

        if token.is_cancel() {
            self.store.clear(session_id);
            tracing::info!(session = %session_id, step = %session.current_step, "build wizard cancelled");
            return vec![Reply::Cancelled];
        }

        match session.current_step {
            step if step.is_collecting() => self.collect(session, &token),
            WizardStep::AwaitingConfirmation => self.confirm(session, &token).await,
            // Dispatching and Done never outlive the lock held above.
            _ => vec![Reply::NoActiveBuild],
        }
    }

    fn collect(&self, mut session: WizardSession, token: &Token) -> Vec<Reply> {
        let step = session.current_step;
        let Some(field) = step.field() else {
            return vec![Reply::NoActiveBuild];
        };

        if let Err(error) = apply_answer(&mut session.draft, field, token) {
            tracing::debug!(session = %session.session_id, %step, %error, "answer rejected");
            let mut prompt = Prompt::new(step, session.draft.value_of(field));
            prompt.error = Some(error);
            self.store.save(session);
            return vec![Reply::Prompt(prompt)];
        }

        let accepted = (field, session.draft.value_of(field).to_string());
        let next = session.advance();
        tracing::debug!(session = %session.session_id, from = %step, to = %next, "answer accepted");

        let reply = match next.field() {
            Some(next_field) => {
                let mut prompt = Prompt::new(next, session.draft.value_of(next_field));
                prompt.accepted = Some(accepted);
                Reply::Prompt(prompt)
            }
            None => Reply::Summary {
                config: session.draft.clone(),
                unrecognized: None,
            },
        };
        self.store.save(session);
        vec![reply]
    }

    async fn confirm(&self, mut session: WizardSession, token: &Token) -> Vec<Reply> {
        if token.is_keyword(KEYWORD_CONFIRM) {
            return self.dispatch(session).await;
        }

        if token.is_keyword(KEYWORD_EDIT) {
            session.restart();
            tracing::debug!(session = %session.session_id, "editing build configuration");
            let reply = self.current_prompt(&session, false);
            self.store.save(session);
            return vec![reply];
        }

        let reply = Reply::Summary {
            config: session.draft.clone(),
            unrecognized: Some(token.as_str().to_string()),
        };
        self.store.save(session);
        vec![reply]
    }

    async fn dispatch(&self, mut session: WizardSession) -> Vec<Reply> {
        let session_id = session.session_id.clone();

        // Every required field was validated on entry; this only trips if the
        // defaults themselves are blank.
        if let Some(field) = session.draft.missing_fields().first().copied() {
            session.current_step = WizardStep::for_field(field);
            let mut prompt = Prompt::new(session.current_step, "");
            prompt.error = Some(ValidationError::Empty {
                field: field.label(),
            });
            self.store.save(session);
            return vec![Reply::Prompt(prompt)];
        }

        session.advance();
        self.store.save(session.clone());

        let dispatch_id = Uuid::now_v7();
        tracing::info!(session = %session_id, %dispatch_id, "dispatching build");

        let result = match tokio::time::timeout(
            self.dispatch_timeout,
            self.dispatcher.dispatch(&session.draft),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Transient(format!(
                "no response within {} seconds",
                self.dispatch_timeout.as_secs()
            ))),
        };

        match &result {
            Ok(tracking) => {
                tracing::info!(session = %session_id, %dispatch_id, %tracking, "build dispatched");
            }
            Err(error) => {
                tracing::warn!(session = %session_id, %dispatch_id, %error, "build dispatch failed");
            }
        }

        session.advance();
        let record = DispatchRecord {
            dispatch_id,
            config: session.draft,
            outcome: result.into(),
            dispatched_at: Utc::now(),
        };
        self.store.record_dispatch(&session_id, record.clone());
        self.store.clear(&session_id);

        vec![Reply::Dispatched(record)]
    }

    /// Re-render whatever the session is currently waiting for.
    fn current_prompt(&self, session: &WizardSession, resumed: bool) -> Reply {
        match session.current_step.field() {
            Some(field) => {
                let mut prompt = Prompt::new(session.current_step, session.draft.value_of(field));
                prompt.resumed = resumed;
                Reply::Prompt(prompt)
            }
            None => Reply::Summary {
                config: session.draft.clone(),
                unrecognized: None,
            },
        }
    }
}
