// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Banner Rotation CLI
//!
//! The `rotation` binary runs the banner rotation daemon and talks to a
//! running one.
//!
//! ## Commands
//!
//! - `rotation serve` - Run the gRPC daemon in the foreground
//! - `rotation config show|validate|generate` - Configuration management
//! - `rotation banner add|remove|click|pick` - Call a running daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use banner_rotation::commands::{self, BannerCommand, ConfigCommand};
use banner_rotation::daemon;
use rotation_core::domain::node_config::{LogFormat, NodeConfigManifest};

/// Banner rotation service - UCB1 banner selection over gRPC
#[derive(Parser)]
#[command(name = "rotation")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery, which also honours
    /// ROTATION_CONFIG_PATH)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, env = "ROTATION_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rotation daemon in the foreground
    #[command(name = "serve")]
    Serve,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Call a running daemon
    #[command(name = "banner")]
    Banner {
        /// gRPC endpoint of the daemon
        #[arg(
            long,
            global = true,
            env = "ROTATION_ENDPOINT",
            default_value = "http://127.0.0.1:50051"
        )]
        endpoint: String,

        #[command(subcommand)]
        command: BannerCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = NodeConfigManifest::load_or_default(cli.config)
                .context("Failed to load configuration")?;
            let logging = &config.spec.observability.logging;
            let level = cli.log_level.as_deref().unwrap_or(&logging.level);
            init_logging(level, logging.format)?;

            daemon::start_daemon(config).await
        }
        Commands::Config { command } => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Compact)?;
            commands::config::handle_command(command, cli.config).await
        }
        Commands::Banner { endpoint, command } => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Compact)?;
            commands::banner::handle_command(command, &endpoint).await
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }

    Ok(())
}
