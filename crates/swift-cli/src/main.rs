//! Swift CLI - command-line client for Swift object storage

mod commands;

use anyhow::Context;
use clap::Parser;
use commands::Command;
use std::time::Duration;
use swift_client::{Config, StorageClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "swift")]
#[command(about = "Command-line client for Swift-style object storage")]
#[command(version)]
struct Args {
    /// Authentication endpoint URL
    #[arg(short = 'A', long, env = "SWIFT_AUTH_URL")]
    auth_url: String,

    /// Account user, sent as X-Auth-User
    #[arg(short = 'U', long, env = "SWIFT_USER")]
    user: String,

    /// Account key, sent as X-Auth-Key
    #[arg(short = 'K', long, env = "SWIFT_KEY", hide_env_values = true)]
    key: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", env = "SWIFT_TIMEOUT")]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long, env = "SWIFT_DEBUG")]
    debug: bool,

    /// Print every HTTP exchange to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so listings on stdout stay pipeable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter(args.debug).into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Auth endpoint: {}", args.auth_url);

    let config = Config::new(args.auth_url, args.user, args.key)
        .with_timeout(Duration::from_secs(args.timeout));
    let mut client = StorageClient::new(config).context("failed to build storage client")?;

    if args.verbose {
        client = client.with_observer(|event| {
            match event.status {
                Some(status) => eprintln!("{} {} -> {}", event.method, event.url, status),
                None => eprintln!("{} {} -> no response", event.method, event.url),
            }
        });
    }

    commands::run(&client, args.command).await
}

/// Filter used when `RUST_LOG` is unset
fn default_filter(debug: bool) -> String {
    let log_level = if debug { "debug" } else { "info" };
    format!("swift_client={},swift={}", log_level, log_level)
}
