//! Herald CLI - send notifications from the command line.

mod commands;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use herald_core::config::HeraldConfig;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Herald - multi-channel notification dispatcher")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: ~/.herald/herald.json)
    #[arg(long, global = true, env = "HERALD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a notification
    Send {
        /// Channel name; repeat to fan out over several channels
        #[arg(short, long = "channel", required = true)]
        channels: Vec<String>,

        /// Recipient; repeat to send to several recipients
        #[arg(short, long = "to", required = true)]
        recipients: Vec<String>,

        /// Notification title
        #[arg(long)]
        title: String,

        /// Notification body
        #[arg(long)]
        body: String,

        /// Extra data entries as key=value; repeatable
        #[arg(short, long = "data")]
        data: Vec<String>,

        /// Attachment file path; repeatable
        #[arg(long = "attach")]
        attachments: Vec<String>,

        /// Per-call timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// List registered channels and their configuration state
    Channels,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => HeraldConfig::load(path)?,
        None => HeraldConfig::load_default()?,
    };
    tracing::debug!(path = ?cli.config, "configuration loaded");

    match cli.command {
        Commands::Send {
            channels,
            recipients,
            title,
            body,
            data,
            attachments,
            timeout_secs,
        } => {
            commands::send::run(
                &config,
                &channels,
                &recipients,
                &title,
                &body,
                &data,
                &attachments,
                timeout_secs,
            )
            .await
        }
        Commands::Channels => {
            commands::channels::run(&config);
            Ok(())
        }
    }
}
