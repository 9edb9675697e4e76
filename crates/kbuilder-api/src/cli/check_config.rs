//! `kbuilder check-config`: show the resolved configuration.
//!
//! Credentials are never printed, only whether they are set.

use kbuilder_types::config::BotConfig;

const REDACTED: &str = "********";

/// Redacted view of the configuration as JSON.
pub fn redacted_json(config: &BotConfig) -> serde_json::Value {
    serde_json::json!({
        "telegram": {
            "bot_token": REDACTED,
            "api_url": config.telegram.api_url,
            "notify_chat_id": config.telegram.notify_chat_id,
        },
        "github": {
            "token": REDACTED,
            "owner": config.github.owner,
            "repo": config.github.repo,
            "workflow": config.github.workflow,
            "git_ref": config.github.git_ref,
            "api_url": config.github.api_url,
            "workflow_page": config.github.workflow_page_url(),
            "resolve_run_url": config.github.resolve_run_url,
        },
        "wizard": {
            "dispatch_timeout_secs": config.wizard.dispatch_timeout.as_secs(),
            "session_ttl_secs": config.wizard.session_ttl.as_secs(),
        },
    })
}

pub fn check_config(config: &BotConfig, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&redacted_json(config))?);
        return Ok(());
    }

    let row = |label: &str, value: &str| {
        println!("  {:<18} {}", console::style(label).dim(), value);
    };

    println!();
    println!("  {} Configuration OK", console::style("✓").green().bold());
    println!();
    row("Telegram token", REDACTED);
    row("Telegram API", &config.telegram.api_url);
    row(
        "Notify chat",
        &config
            .telegram
            .notify_chat_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "(none)".to_string()),
    );
    row("GitHub token", REDACTED);
    row(
        "Workflow",
        &format!(
            "{}/{} {} @ {}",
            config.github.owner, config.github.repo, config.github.workflow, config.github.git_ref
        ),
    );
    row("GitHub API", &config.github.api_url);
    row("Tracking link", &config.github.workflow_page_url());
    row(
        "Resolve run URL",
        if config.github.resolve_run_url { "yes" } else { "no" },
    );
    row(
        "Dispatch timeout",
        &format!("{}s", config.wizard.dispatch_timeout.as_secs()),
    );
    row("Session TTL", &format!("{}s", config.wizard.session_ttl.as_secs()));
    println!();

    Ok(())
}
