//! Composite leaderboard store
//!
//! `leaderboard.json` holds every track's results plus the derived player
//! standings. A windowed run only replaces the tracks it processed; all
//! other tracks stay exactly as they were.

use super::{read_json, write_json_atomic, StoreError};
use crate::aggregator::scoring::{compute_standings, PenaltyPolicy};
use crate::models::{CompositeLeaderboard, TrackResult};
use crate::storage::{IdentityStore, Rename};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct CompositeStore {
    path: PathBuf,
}

impl CompositeStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing document means first run: start empty. Malformed is an error,
    /// never silently replaced.
    pub fn load(&self) -> Result<CompositeLeaderboard, StoreError> {
        let doc: CompositeLeaderboard = read_json(&self.path)?.unwrap_or_default();
        info!(
            "📄 Loaded composite leaderboard: {} tracks, {} players",
            doc.tracks.len(),
            doc.players.len()
        );
        Ok(doc)
    }

    pub fn save(&self, doc: &mut CompositeLeaderboard) -> Result<(), StoreError> {
        doc.updated_at = Some(Utc::now());
        write_json_atomic(&self.path, doc)
    }
}

/// Replaces tracks by name, appends unknown ones. Other tracks are untouched.
pub fn merge_tracks(
    mut doc: CompositeLeaderboard,
    fresh: Vec<TrackResult>,
) -> CompositeLeaderboard {
    for track in fresh {
        match doc.tracks.iter_mut().find(|t| t.name == track.name) {
            Some(existing) => *existing = track,
            None => doc.tracks.push(track),
        }
    }
    doc
}

/// Merges fresh results and recomputes standings over the whole track set.
pub fn merge(
    existing: CompositeLeaderboard,
    fresh: Vec<TrackResult>,
    identities: &IdentityStore,
    policy: &PenaltyPolicy,
) -> CompositeLeaderboard {
    let mut doc = merge_tracks(existing, fresh);
    doc.players = compute_standings(&doc.tracks, identities, policy);
    doc
}

/// Builds a document from freshly processed tracks. Of the existing tracks
/// only those named in `keep` survive (tracks that could not be fetched).
pub fn rebuild(
    existing: CompositeLeaderboard,
    fresh: Vec<TrackResult>,
    keep: &[String],
    identities: &IdentityStore,
    policy: &PenaltyPolicy,
) -> CompositeLeaderboard {
    let mut base = existing;
    base.tracks.retain(|t| keep.contains(&t.name));
    merge(base, fresh, identities, policy)
}

/// Re-keys stored rows after identity renames so stale tracks keep pointing
/// at the same player. Returns the number of rows changed.
pub fn apply_renames(doc: &mut CompositeLeaderboard, renames: &[Rename]) -> usize {
    let mut changed = 0;
    for rename in renames {
        for track in &mut doc.tracks {
            for row in track.results.iter_mut().filter(|r| r.player == rename.from) {
                row.player = rename.to.clone();
                changed += 1;
            }
        }
    }
    changed
}
