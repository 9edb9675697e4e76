//! Process configuration types for kbuilder.
//!
//! `FileConfig` is the on-disk `config.toml` shape; every field is optional
//! or defaulted so an empty file is valid. `BotConfig` is the resolved form
//! the process runs with, after environment overrides have been applied and
//! credentials have been checked.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Top-level `config.toml` contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub wizard: WizardSection,
}

/// `[telegram]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSection {
    /// Bot token from @BotFather. Usually supplied via `TELEGRAM_BOT_TOKEN`.
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Chat that receives a copy of every dispatch result.
    #[serde(default)]
    pub notify_chat_id: Option<i64>,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            notify_chat_id: None,
            api_url: default_telegram_api_url(),
        }
    }
}

/// `[github]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSection {
    /// Token with `actions:write` on the target repository.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_repo")]
    pub repo: String,
    /// Workflow file name under `.github/workflows/`.
    #[serde(default = "default_workflow")]
    pub workflow: String,
    /// Git ref the workflow runs on.
    #[serde(default = "default_git_ref")]
    pub git_ref: String,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    /// Web origin used to build tracking links.
    #[serde(default = "default_github_web_url")]
    pub web_url: String,
    /// Look up the newest run after dispatching to link it directly.
    #[serde(default)]
    pub resolve_run_url: bool,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            token: None,
            owner: default_owner(),
            repo: default_repo(),
            workflow: default_workflow(),
            git_ref: default_git_ref(),
            api_url: default_github_api_url(),
            web_url: default_github_web_url(),
            resolve_run_url: false,
        }
    }
}

/// `[wizard]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardSection {
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl Default for WizardSection {
    fn default() -> Self {
        Self {
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_owner() -> String {
    "zyexro".to_string()
}

fn default_repo() -> String {
    "kernel_builder".to_string()
}

fn default_workflow() -> String {
    "main.yml".to_string()
}

fn default_git_ref() -> String {
    "main".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_web_url() -> String {
    "https://github.com".to_string()
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

fn default_session_ttl_secs() -> u64 {
    3600
}

/// Resolved configuration the bot runs with.
///
/// Credentials are wrapped in [`SecretString`] so they never show up in
/// `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    pub github: GithubConfig,
    pub wizard: WizardConfig,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub notify_chat_id: Option<i64>,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: SecretString,
    pub owner: String,
    pub repo: String,
    pub workflow: String,
    pub git_ref: String,
    pub api_url: String,
    pub web_url: String,
    pub resolve_run_url: bool,
}

impl GithubConfig {
    /// Actions page for the configured workflow. Used as the fallback tracking link.
    pub fn workflow_page_url(&self) -> String {
        format!(
            "{}/{}/{}/actions/workflows/{}",
            self.web_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.workflow
        )
    }
}

#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Upper bound on a single dispatch call.
    pub dispatch_timeout: Duration,
    /// Sessions idle longer than this are treated as abandoned.
    pub session_ttl: Duration,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::from_secs(default_dispatch_timeout_secs()),
            session_ttl: Duration::from_secs(default_session_ttl_secs()),
        }
    }
}
