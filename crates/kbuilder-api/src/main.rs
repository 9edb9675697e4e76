//! kbuilder entry point.
//!
//! Binary name: `kbuilder`
//!
//! Parses CLI arguments, sets up tracing, loads configuration, then runs the
//! bot or the requested maintenance command.

mod cli;
mod mailbox;
mod state;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use kbuilder_infra::config::{load_config, process_env};
use kbuilder_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_filter(), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = execute(cli).await;
    shutdown_tracing();
    result
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    // Missing credentials abort here, before any network activity.
    let config = load_config(cli.config.as_deref(), &process_env())
        .await
        .context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let shutdown = CancellationToken::new();
            let token = shutdown.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                tracing::info!("shutdown signal received");
                token.cancel();
            });

            cli::run::run(config, shutdown).await
        }
        Commands::CheckConfig { json } => cli::check_config::check_config(&config, json),
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
