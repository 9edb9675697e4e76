//! Configuration loader for kbuilder.
//!
//! Reads an optional `config.toml`, applies environment overrides on top and
//! resolves the result into a [`BotConfig`]. The two credentials are
//! required; everything else has a default.
//!
//! Environment lookups go through an explicit map so tests never touch the
//! process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use kbuilder_types::config::{
    BotConfig, FileConfig, GithubConfig, TelegramConfig, WizardConfig,
};
use kbuilder_types::error::ConfigError;

pub const ENV_CONFIG_PATH: &str = "KBUILDER_CONFIG";
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_OWNER: &str = "GITHUB_OWNER";
pub const ENV_GITHUB_REPO: &str = "GITHUB_REPO";
pub const ENV_GITHUB_WORKFLOW: &str = "GITHUB_WORKFLOW";
pub const ENV_GITHUB_REF: &str = "GITHUB_REF";
pub const ENV_NOTIFY_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const ENV_TELEGRAM_API_URL: &str = "TELEGRAM_API_URL";
pub const ENV_DISPATCH_TIMEOUT: &str = "KBUILDER_DISPATCH_TIMEOUT_SECS";
pub const ENV_SESSION_TTL: &str = "KBUILDER_SESSION_TTL_SECS";
pub const ENV_RESOLVE_RUN_URL: &str = "KBUILDER_RESOLVE_RUN_URL";

/// Snapshot of the process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Non-empty value of `key`.
fn lookup<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Where to look for `config.toml`.
///
/// Priority:
/// 1. `explicit` (the `--config` flag)
/// 2. `$KBUILDER_CONFIG`
/// 3. `<config_dir>/kbuilder/config.toml`
pub fn config_path(explicit: Option<&Path>, env: &HashMap<String, String>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = lookup(env, ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("kbuilder").join("config.toml"))
}

/// Read `path` as a [`FileConfig`].
///
/// - Missing file: defaults.
/// - Unreadable file: [`ConfigError::Io`].
/// - Malformed TOML: [`ConfigError::Parse`].
pub async fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(FileConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Io(format!("{}: {err}", path.display())));
        }
    };

    toml::from_str(&content).map_err(|err| ConfigError::Parse(format!("{}: {err}", path.display())))
}

/// Apply environment overrides to `file` and check credentials.
pub fn resolve(file: FileConfig, env: &HashMap<String, String>) -> Result<BotConfig, ConfigError> {
    let FileConfig {
        telegram,
        github,
        wizard,
    } = file;

    let bot_token = lookup(env, ENV_TELEGRAM_TOKEN)
        .map(str::to_string)
        .or(telegram.bot_token)
        .filter(|t| !t.trim().is_empty())
        .ok_or(ConfigError::Missing(ENV_TELEGRAM_TOKEN))?;
    let github_token = lookup(env, ENV_GITHUB_TOKEN)
        .map(str::to_string)
        .or(github.token)
        .filter(|t| !t.trim().is_empty())
        .ok_or(ConfigError::Missing(ENV_GITHUB_TOKEN))?;

    let notify_chat_id = match lookup(env, ENV_NOTIFY_CHAT_ID) {
        Some(raw) => Some(raw.parse::<i64>().map_err(|e| ConfigError::Invalid {
            key: ENV_NOTIFY_CHAT_ID,
            reason: e.to_string(),
        })?),
        None => telegram.notify_chat_id,
    };

    let dispatch_timeout_secs = env_u64(env, ENV_DISPATCH_TIMEOUT)?.unwrap_or(wizard.dispatch_timeout_secs);
    if dispatch_timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            key: ENV_DISPATCH_TIMEOUT,
            reason: "must be at least 1 second".to_string(),
        });
    }
    let session_ttl_secs = env_u64(env, ENV_SESSION_TTL)?.unwrap_or(wizard.session_ttl_secs);
    if session_ttl_secs == 0 {
        return Err(ConfigError::Invalid {
            key: ENV_SESSION_TTL,
            reason: "must be at least 1 second".to_string(),
        });
    }

    let resolve_run_url = match lookup(env, ENV_RESOLVE_RUN_URL) {
        Some(raw) => parse_bool(raw).ok_or_else(|| ConfigError::Invalid {
            key: ENV_RESOLVE_RUN_URL,
            reason: format!("expected true or false, got '{raw}'"),
        })?,
        None => github.resolve_run_url,
    };

    let env_or = |key: &str, fallback: String| {
        lookup(env, key).map(str::to_string).unwrap_or(fallback)
    };

    Ok(BotConfig {
        telegram: TelegramConfig {
            bot_token: SecretString::from(bot_token),
            notify_chat_id,
            api_url: env_or(ENV_TELEGRAM_API_URL, telegram.api_url),
        },
        github: GithubConfig {
            token: SecretString::from(github_token),
            owner: env_or(ENV_GITHUB_OWNER, github.owner),
            repo: env_or(ENV_GITHUB_REPO, github.repo),
            workflow: env_or(ENV_GITHUB_WORKFLOW, github.workflow),
            git_ref: env_or(ENV_GITHUB_REF, github.git_ref),
            api_url: env_or(ENV_GITHUB_API_URL, github.api_url),
            web_url: github.web_url,
            resolve_run_url,
        },
        wizard: WizardConfig {
            dispatch_timeout: Duration::from_secs(dispatch_timeout_secs),
            session_ttl: Duration::from_secs(session_ttl_secs),
        },
    })
}

/// Load the full configuration: file (if any) plus environment.
pub async fn load_config(
    explicit: Option<&Path>,
    env: &HashMap<String, String>,
) -> Result<BotConfig, ConfigError> {
    let file = match config_path(explicit, env) {
        Some(path) => load_file_config(&path).await?,
        None => FileConfig::default(),
    };
    resolve(file, env)
}

fn env_u64(env: &HashMap<String, String>, key: &'static str) -> Result<Option<u64>, ConfigError> {
    lookup(env, key)
        .map(|raw| {
            raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
