//! CLI definitions for the `kbuilder` binary.

pub mod check_config;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Telegram bot that configures and triggers kernel builds on GitHub Actions.
#[derive(Parser)]
#[command(name = "kbuilder", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config.toml (default: $KBUILDER_CONFIG, then the user config dir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Default log filter for the chosen verbosity. `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,kbuilder=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Commands {
    /// Run the bot (default).
    Run,

    /// Print the resolved configuration with secrets redacted, then exit.
    CheckConfig {
        /// Output machine-readable JSON instead of styled text.
        #[arg(long)]
        json: bool,
    },
}
