//! Aggregation run
//!
//! One invocation: pick the cursor window, scan each track for the tracked
//! identities, reconcile identities, fold the fresh track results into the
//! composite leaderboard, then advance the cursor. The cursor only moves
//! after the composite document has been written.

use super::reconcile::reconcile_identities;
use super::scoring::{track_result, PenaltyPolicy};
use super::search::{locate_tracked_entries, ScanSettings};
use crate::models::{LocatedEntry, TrackDescriptor};
use crate::scrapers::{LeaderboardSource, Pacer};
use crate::storage::composite::{apply_renames, merge, rebuild};
use crate::storage::{CompositeStore, IdentityStore, Rename, TrackCursor};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct StorePaths {
    pub identity: PathBuf,
    pub cursor: PathBuf,
    pub leaderboard: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub window_size: usize,
    /// Process the whole roster and rebuild the document from scratch
    pub full_rebuild: bool,
    pub scan: ScanSettings,
    pub penalty: PenaltyPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            window_size: 3,
            full_rebuild: false,
            scan: ScanSettings::default(),
            penalty: PenaltyPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub tracks_processed: Vec<String>,
    /// Tracks whose first page failed; stored results were kept
    pub tracks_unavailable: Vec<String>,
    pub identity_updates: usize,
    pub renames: usize,
    pub players_ranked: usize,
    pub next_cursor: usize,
}

pub struct Aggregator<S, P> {
    source: S,
    pacer: P,
    options: RunOptions,
}

impl<S: LeaderboardSource, P: Pacer> Aggregator<S, P> {
    pub fn new(source: S, pacer: P, options: RunOptions) -> Self {
        Self {
            source,
            pacer,
            options,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub async fn run(&self, roster: &[TrackDescriptor], paths: &StorePaths) -> Result<RunSummary> {
        if roster.is_empty() {
            bail!("track roster is empty");
        }

        let mut identities = IdentityStore::load(&paths.identity)
            .context("Cannot run without a tracked identity roster")?;
        if identities.is_empty() {
            warn!("⚠️ Identity store is empty; every track will come back without results");
        }

        let mut cursor =
            TrackCursor::load(&paths.cursor, roster.len()).context("Failed to load cursor")?;
        let composite = CompositeStore::new(&paths.leaderboard);
        let mut existing = composite
            .load()
            .context("Failed to load composite leaderboard")?;

        let (window, next_index) = if self.options.full_rebuild {
            (roster.to_vec(), cursor.index())
        } else {
            cursor.window(roster, self.options.window_size)
        };
        info!(
            "🗂️ Processing {} of {} tracks (cursor {})",
            window.len(),
            roster.len(),
            cursor.index()
        );

        let targets = identities.hashes();
        let mut summary = RunSummary::default();
        let mut renames: Vec<Rename> = Vec::new();
        let mut scanned: Vec<(TrackDescriptor, HashMap<String, LocatedEntry>)> =
            Vec::with_capacity(window.len());

        for track in window {
            info!("🏁 Fetching {} leaderboard...", track.name);
            let outcome = locate_tracked_entries(
                &self.source,
                &self.pacer,
                &track,
                &targets,
                &self.options.scan,
            )
            .await;

            if !outcome.obtained_data() {
                warn!(track = %track.name, "❌ No data obtained; keeping stored results");
                summary.tracks_unavailable.push(track.name.clone());
                continue;
            }

            let report = reconcile_identities(&mut identities, &outcome.found)
                .context("Failed to persist identity update")?;
            summary.identity_updates += report.updated;
            renames.extend(report.renames);

            summary.tracks_processed.push(track.name.clone());
            scanned.push((track, outcome.found));
        }

        // Rows are built after every reconciliation so names are final.
        let fresh: Vec<_> = scanned
            .iter()
            .map(|(track, found)| track_result(track, &identities, found))
            .collect();

        let rekeyed = apply_renames(&mut existing, &renames);
        if rekeyed > 0 {
            info!("✏️ Re-keyed {} stored rows after renames", rekeyed);
        }

        let mut doc = if self.options.full_rebuild {
            rebuild(
                existing,
                fresh,
                &summary.tracks_unavailable,
                &identities,
                &self.options.penalty,
            )
        } else {
            merge(existing, fresh, &identities, &self.options.penalty)
        };

        composite
            .save(&mut doc)
            .context("Failed to write composite leaderboard")?;

        if !self.options.full_rebuild {
            cursor
                .advance(next_index)
                .context("Failed to persist cursor")?;
        }

        summary.renames = renames.len();
        summary.players_ranked = doc.players.len();
        summary.next_cursor = if self.options.full_rebuild {
            cursor.index()
        } else {
            next_index
        };

        info!(
            "✅ {} updated ({} tracks processed, {} unavailable, {} players ranked)",
            composite.path().display(),
            summary.tracks_processed.len(),
            summary.tracks_unavailable.len(),
            summary.players_ranked
        );

        Ok(summary)
    }
}
