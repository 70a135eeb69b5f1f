//! Trackboard - cross-track leaderboard aggregator
//!
//! One invocation processes one cursor window of the roster and rewrites the
//! composite leaderboard. Meant to be driven by an external scheduler that
//! guarantees runs never overlap.
//!
//! # Exit Codes
//!
//! - 0: Success, document written and cursor advanced
//! - 1: Run aborted (missing identity roster, unreadable or unwritable store)
//! - 2: Configuration error

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackboard_backend::{
    aggregator::Aggregator,
    config::{Cli, RunConfig},
    scrapers::{FixedDelayPacer, PolytrackClient},
};

#[tokio::main]
async fn main() -> ExitCode {
    load_env();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match RunConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("⚙️ Configuration error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("🛑 Run aborted: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(config: RunConfig) -> Result<()> {
    info!(
        "🚀 Trackboard starting: {} tracks in roster, window {}, api {}",
        config.roster.len(),
        config.options.window_size,
        config.client.base_url
    );

    let client =
        PolytrackClient::new(config.client.clone()).context("Failed to build leaderboard client")?;
    let pacer = FixedDelayPacer::new(config.request_delay);
    let aggregator = Aggregator::new(client, pacer, config.options.clone());

    let summary = aggregator.run(&config.roster, &config.paths).await?;

    info!(
        processed = ?summary.tracks_processed,
        unavailable = ?summary.tracks_unavailable,
        identity_updates = summary.identity_updates,
        renames = summary.renames,
        next_cursor = summary.next_cursor,
        "📊 Run complete"
    );
    Ok(())
}

fn init_tracing(default_level: &str) {
    let default_directive = format!(
        "trackboard_backend={level},trackboard={level}",
        level = default_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) A data directory given only via the environment may carry its own .env
    if let Ok(dir) = std::env::var("LEADERBOARD_DATA_DIR") {
        let candidate = Path::new(&dir).join(".env");
        if candidate.exists() {
            let _ = dotenv::from_path(&candidate);
        }
    }
}
