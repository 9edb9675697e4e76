//! Application state wiring the bot together.
//!
//! AppState holds the concrete instances the poll loop and the session
//! workers share. The wizard engine is generic over its dispatch client;
//! here it is pinned to the GitHub implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use kbuilder_core::defaults::defaults;
use kbuilder_core::session::store::SessionStore;
use kbuilder_core::wizard::engine::WizardEngine;
use kbuilder_infra::github::GithubDispatchClient;
use kbuilder_infra::telegram::TelegramClient;
use kbuilder_types::config::BotConfig;

/// Long-poll wait passed to `getUpdates`.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(30);

pub type ConcreteEngine = WizardEngine<GithubDispatchClient>;

/// Shared state for the running bot.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConcreteEngine>,
    pub store: Arc<SessionStore>,
    pub telegram: Arc<TelegramClient>,
    /// Chat that receives a copy of every dispatch result.
    pub notify_chat_id: Option<i64>,
}

impl AppState {
    /// Build clients and the wizard from a resolved configuration.
    ///
    /// Performs no network activity.
    pub fn init(config: &BotConfig) -> anyhow::Result<Self> {
        let store = Arc::new(SessionStore::new(defaults(), config.wizard.session_ttl));

        let github = GithubDispatchClient::new(config.github.clone(), config.wizard.dispatch_timeout)
            .context("failed to create GitHub client")?;
        let engine = Arc::new(WizardEngine::new(
            Arc::clone(&store),
            github,
            config.wizard.dispatch_timeout,
        ));

        let telegram = TelegramClient::new(
            config.telegram.api_url.clone(),
            config.telegram.bot_token.clone(),
            POLL_TIMEOUT,
        )
        .context("failed to create Telegram client")?;

        Ok(Self {
            engine,
            store,
            telegram: Arc::new(telegram),
            notify_chat_id: config.telegram.notify_chat_id,
        })
    }
}
