//! `kbuilder run`: the long-polling bot loop.
//!
//! One task polls Telegram and routes each update into its session's
//! mailbox; session workers run the wizard and send the replies. A second
//! task sweeps abandoned sessions. On shutdown polling stops first, then
//! in-flight inputs (including a running dispatch) get a grace period to
//! finish.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use kbuilder_core::presentation::render::{render, RenderedMessage};
use kbuilder_core::session::store::SessionStore;
use kbuilder_core::wizard::reply::Reply;
use kbuilder_infra::telegram::{normalize_update, InboundEvent};
use kbuilder_types::config::BotConfig;
use kbuilder_types::dispatch::DispatchRecord;

use crate::mailbox::Mailboxes;
use crate::state::AppState;

/// How often abandoned sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How long a session worker waits for more input before retiring.
const WORKER_IDLE: Duration = Duration::from_secs(300);

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Extra time on top of the dispatch timeout for in-flight work at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the bot until `shutdown` is cancelled.
pub async fn run(config: BotConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let state = AppState::init(&config)?;

    let me = state
        .telegram
        .get_me()
        .await
        .context("Telegram rejected the bot token")?;
    tracing::info!(
        bot = me.username.as_deref().unwrap_or("unknown"),
        owner = %config.github.owner,
        repo = %config.github.repo,
        workflow = %config.github.workflow,
        "kbuilder started"
    );

    let sweeper = tokio::spawn(sweep_sessions(Arc::clone(&state.store), shutdown.clone()));

    let tracker = TaskTracker::new();
    poll_updates(&state, &tracker, &shutdown).await;

    tracker.close();
    let grace = config.wizard.dispatch_timeout + SHUTDOWN_GRACE;
    if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
        tracing::warn!(pending = tracker.len(), "shutting down with inputs still in flight");
    }

    sweeper.await.context("session sweeper panicked")?;
    tracing::info!("kbuilder stopped");
    Ok(())
}

async fn poll_updates(state: &AppState, tracker: &TaskTracker, shutdown: &CancellationToken) {
    let worker_state = state.clone();
    let mailboxes = Mailboxes::new(
        move |event: InboundEvent| {
            let state = worker_state.clone();
            async move { process_event(&state, event).await }
        },
        WORKER_IDLE,
        tracker.clone(),
    );

    let mut offset = None;
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = state.telegram.get_updates(offset) => result,
        };

        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, retry_in = ?backoff, "polling for updates failed");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };
        backoff = INITIAL_BACKOFF;

        if let Some(next) = batch.next_offset {
            offset = Some(next);
        }

        for update in batch.updates {
            if let Some(query) = &update.callback_query {
                acknowledge(state, query.id.clone());
            }
            if let Some(event) = normalize_update(&update) {
                mailboxes.deliver(event.session_id.clone(), event).await;
            }
        }
    }

    tracing::debug!(workers = mailboxes.active(), "polling stopped");
    mailboxes.close();
}

/// Run one input through the wizard and send every reply.
pub(crate) async fn process_event(state: &AppState, event: InboundEvent) {
    let InboundEvent {
        session_id,
        chat_id,
        input,
    } = event;

    let replies = state.engine.handle(&session_id, input).await;

    for reply in &replies {
        let message = render(reply);
        if let Err(e) = state.telegram.send_message(chat_id, &message).await {
            tracing::warn!(session = %session_id, chat_id, error = %e, "failed to send reply");
        }

        if let Reply::Dispatched(record) = reply {
            notify(state, chat_id, &message, record);
        }
    }
}

/// Copy a dispatch result to the notification chat. Fire-and-forget.
fn notify(state: &AppState, origin_chat: i64, message: &RenderedMessage, record: &DispatchRecord) {
    let Some(notify_chat) = state.notify_chat_id.filter(|id| *id != origin_chat) else {
        return;
    };

    let copy = RenderedMessage {
        text: format!(
            "📣 <b>Build request</b> <code>{}</code>\n\n{}",
            record.dispatch_id, message.text
        ),
        keyboard: Vec::new(),
    };
    let telegram = Arc::clone(&state.telegram);
    let dispatch_id = record.dispatch_id;

    tokio::spawn(async move {
        if let Err(e) = telegram.send_message(notify_chat, &copy).await {
            tracing::warn!(%dispatch_id, chat_id = notify_chat, error = %e, "failed to send notification");
        }
    });
}

/// Stop the button spinner. Fire-and-forget.
fn acknowledge(state: &AppState, callback_query_id: String) {
    let telegram = Arc::clone(&state.telegram);
    tokio::spawn(async move {
        if let Err(e) = telegram.answer_callback_query(&callback_query_id).await {
            tracing::debug!(error = %e, "failed to answer callback query");
        }
    });
}

async fn sweep_sessions(store: Arc<SessionStore>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                store.sweep_stale();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbuilder_core::presentation::inbound::normalize_text;
    use kbuilder_types::config::{GithubConfig, TelegramConfig, WizardConfig};
    use kbuilder_types::session::SessionId;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:abc";
    const CHAT: i64 = 555;
    const NOTIFY_CHAT: i64 = -999;

    fn bot_config(server: &MockServer, notify_chat_id: Option<i64>) -> BotConfig {
        BotConfig {
            telegram: TelegramConfig {
                bot_token: SecretString::from(TOKEN.to_string()),
                notify_chat_id,
                api_url: server.uri(),
            },
            github: GithubConfig {
                token: SecretString::from("ghp_test".to_string()),
                owner: "acme".to_string(),
                repo: "kernels".to_string(),
                workflow: "build.yml".to_string(),
                git_ref: "main".to_string(),
                api_url: server.uri(),
                web_url: "https://github.com".to_string(),
                resolve_run_url: false,
            },
            wizard: WizardConfig::default(),
        }
    }

    fn event(text: &str) -> InboundEvent {
        InboundEvent {
            session_id: SessionId::from_chat_user(CHAT, 1),
            chat_id: CHAT,
            input: normalize_text(text),
        }
    }

    async fn mount_send_message(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "message_id": 1, "chat": { "id": CHAT } }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn start_command_sends_welcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .and(body_partial_json(serde_json::json!({
                "chat_id": CHAT,
                "parse_mode": "HTML"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "message_id": 1, "chat": { "id": CHAT } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = AppState::init(&bot_config(&server, None)).unwrap();
        process_event(&state, event("/start")).await;
    }

    #[tokio::test]
    async fn confirmed_build_dispatches_and_notifies() {
        let server = MockServer::start().await;
        mount_send_message(&server).await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/kernels/actions/workflows/build.yml/dispatches"))
            .and(body_partial_json(serde_json::json!({
                "ref": "main",
                "inputs": { "compiler": "Clang-20", "ksu": "" }
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .and(body_partial_json(serde_json::json!({ "chat_id": NOTIFY_CHAT })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "message_id": 2, "chat": { "id": NOTIFY_CHAT } }
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        let state = AppState::init(&bot_config(&server, Some(NOTIFY_CHAT))).unwrap();
        for text in [
            "/build",
            "Clang-20",
            "https://example.com/k.git",
            "main",
            "fedora:40",
            "skip",
            "skip",
            "confirm",
        ] {
            process_event(&state, event(text)).await;
        }

        // The notification is sent from a detached task.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let record = state
            .store
            .last_dispatch(&SessionId::from_chat_user(CHAT, 1))
            .unwrap();
        assert!(record.outcome.is_success());
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let store = Arc::new(SessionStore::new(
            kbuilder_core::defaults::defaults(),
            Duration::from_secs(3600),
        ));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweep_sessions(store, shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
