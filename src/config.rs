//! Run configuration
//!
//! Every knob is a CLI flag with an environment fallback. Relative file paths
//! resolve against the data directory.

use crate::aggregator::scoring::{DEFAULT_PENALTY_FALLBACK_SECS, DEFAULT_PENALTY_MULTIPLIER};
use crate::aggregator::{PenaltyPolicy, RunOptions, ScanSettings, StorePaths};
use crate::models::TrackDescriptor;
use crate::scrapers::polytrack_api::{DEFAULT_API_BASE, DEFAULT_API_VERSION, MAX_PAGE_AMOUNT};
use crate::scrapers::PolytrackClientConfig;
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default roster used when no tracks file is configured.
const DEFAULT_TRACKS: [(&str, &str); 6] = [
    ("92bb4c33f5d1f8baf684dc214f0f321967c92dab87726ab0aba27cea9dbd8734", "1"),
    ("8103eafa75228d2db501bb2995deca1a9a4f29d45ee50c221dd5ccbcaefd7a72", "2"),
    ("3f7c652ae4a0804012a4415a515aef803b806ac750aad5c579a4fddd2aea6c52", "3"),
    ("8c8f09a092f13b46a4f60b1175c8b6f7eb56e72e55802463ff90d8b0c5a6223f", "4"),
    ("19d9532f837b4e639fb4474ba3c198d26e0fba23ed95bd7bb8b6c6db359ef4f3", "5"),
    ("8091591f45280c361e6a4fd126566e3b9a99e47c86776278554512c78b00bb0a", "6"),
];

pub fn default_roster() -> Vec<TrackDescriptor> {
    DEFAULT_TRACKS
        .iter()
        .map(|(id, name)| TrackDescriptor::new(*id, *name))
        .collect()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "trackboard")]
#[command(about = "Aggregate per-track leaderboards into a composite player standing")]
pub struct Cli {
    /// Leaderboard service base URL
    #[arg(long, env = "LEADERBOARD_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Game version sent with every query
    #[arg(long, env = "LEADERBOARD_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Entries requested per page
    #[arg(long, env = "LEADERBOARD_PAGE_AMOUNT", default_value_t = 100)]
    pub page_amount: u32,

    /// Deepest absolute rank scanned per track
    #[arg(long, env = "LEADERBOARD_MAX_DEPTH", default_value_t = 10_000)]
    pub max_depth: u32,

    /// Tracks processed per run
    #[arg(long, env = "LEADERBOARD_WINDOW_SIZE", default_value_t = 3)]
    pub window_size: usize,

    /// Minimum delay between remote calls
    #[arg(long, env = "LEADERBOARD_REQUEST_DELAY_MS", default_value_t = 500)]
    pub request_delay_ms: u64,

    /// Only count verified runs
    #[arg(long, env = "LEADERBOARD_ONLY_VERIFIED", default_value_t = false)]
    pub only_verified: bool,

    #[arg(long, env = "LEADERBOARD_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Penalty when nobody has a time on a track
    #[arg(
        long,
        env = "LEADERBOARD_PENALTY_FALLBACK_SECS",
        default_value_t = DEFAULT_PENALTY_FALLBACK_SECS
    )]
    pub penalty_fallback_secs: f64,

    /// Base directory for relative file paths
    #[arg(long, env = "LEADERBOARD_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    #[arg(long, env = "IDENTITY_FILE", default_value = "players.json")]
    pub identity_file: PathBuf,

    #[arg(long, env = "CURSOR_FILE", default_value = "cursor.json")]
    pub cursor_file: PathBuf,

    #[arg(long, env = "LEADERBOARD_FILE", default_value = "leaderboard.json")]
    pub leaderboard_file: PathBuf,

    /// TOML roster (`[[tracks]] id = "..." name = "..."`)
    #[arg(long, env = "TRACKS_FILE")]
    pub tracks_file: Option<PathBuf>,

    /// Process every track and rebuild the document; cursor is left alone
    #[arg(long, default_value_t = false)]
    pub full_rebuild: bool,

    /// Default log directive when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    tracks: Vec<TrackDescriptor>,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub client: PolytrackClientConfig,
    pub request_delay: Duration,
    pub options: RunOptions,
    pub paths: StorePaths,
    pub roster: Vec<TrackDescriptor>,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.window_size == 0 {
            bail!("window size must be at least 1");
        }
        if cli.page_amount == 0 {
            bail!("page amount must be at least 1");
        }
        if cli.max_depth == 0 {
            bail!("max depth must be at least 1");
        }
        if !(cli.penalty_fallback_secs.is_finite() && cli.penalty_fallback_secs >= 0.0) {
            bail!("penalty fallback must be a non-negative number");
        }

        let roster = match &cli.tracks_file {
            Some(path) => load_roster(&resolve_data_path(&cli.data_dir, path))?,
            None => default_roster(),
        };
        if roster.is_empty() {
            bail!("track roster is empty");
        }

        Ok(Self {
            client: PolytrackClientConfig {
                base_url: cli.api_base.clone(),
                version: cli.api_version.clone(),
                only_verified: cli.only_verified,
                timeout: Duration::from_secs(cli.request_timeout_secs),
            },
            request_delay: Duration::from_millis(cli.request_delay_ms),
            options: RunOptions {
                window_size: cli.window_size,
                full_rebuild: cli.full_rebuild,
                scan: ScanSettings {
                    page_size: cli.page_amount.min(MAX_PAGE_AMOUNT),
                    max_depth: cli.max_depth,
                },
                penalty: PenaltyPolicy {
                    multiplier: DEFAULT_PENALTY_MULTIPLIER,
                    fallback_secs: cli.penalty_fallback_secs,
                },
            },
            paths: StorePaths {
                identity: resolve_data_path(&cli.data_dir, &cli.identity_file),
                cursor: resolve_data_path(&cli.data_dir, &cli.cursor_file),
                leaderboard: resolve_data_path(&cli.data_dir, &cli.leaderboard_file),
            },
            roster,
        })
    }
}

pub fn load_roster(path: &Path) -> Result<Vec<TrackDescriptor>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tracks file {}", path.display()))?;
    let parsed: RosterFile = toml::from_str(&content)
        .with_context(|| format!("Invalid tracks file {}", path.display()))?;
    Ok(parsed.tracks)
}

/// Absolute paths pass through; relative ones join the data directory.
pub fn resolve_data_path(data_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}
