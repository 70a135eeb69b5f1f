//! Track cursor
//!
//! Spreads a large roster over repeated invocations: each run processes a
//! fixed-size window starting at the persisted index, wrapping around the end.

use super::{read_json, write_json_atomic, StoreError};
use crate::models::TrackDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    pub index: usize,
}

/// Picks `window_size` tracks starting at `index`, wrapping circularly.
///
/// Returns the window and the next index. A window larger than the roster is
/// clamped so no track appears twice. An empty roster yields an empty window.
pub fn select_window(
    roster: &[TrackDescriptor],
    index: usize,
    window_size: usize,
) -> (Vec<TrackDescriptor>, usize) {
    if roster.is_empty() {
        return (Vec::new(), 0);
    }

    let len = roster.len();
    let start = index % len;
    let take = window_size.min(len);
    let window = roster
        .iter()
        .cycle()
        .skip(start)
        .take(take)
        .cloned()
        .collect();

    (window, (start + window_size) % len)
}

/// Persisted cursor bound to its file.
#[derive(Debug, Clone)]
pub struct TrackCursor {
    path: PathBuf,
    state: CursorState,
}

impl TrackCursor {
    /// Loads the cursor; a missing file starts at index 0. An index outside the
    /// roster (roster shrank since the last run) is wrapped back into range.
    pub fn load(path: &Path, roster_len: usize) -> Result<Self, StoreError> {
        let mut state: CursorState = read_json(path)?.unwrap_or_default();

        if roster_len > 0 && state.index >= roster_len {
            warn!(
                index = state.index,
                roster_len, "Cursor outside roster, wrapping"
            );
            state.index %= roster_len;
        }

        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn index(&self) -> usize {
        self.state.index
    }

    pub fn window(
        &self,
        roster: &[TrackDescriptor],
        window_size: usize,
    ) -> (Vec<TrackDescriptor>, usize) {
        select_window(roster, self.state.index, window_size)
    }

    /// Moves to `next_index` and persists.
    pub fn advance(&mut self, next_index: usize) -> Result<(), StoreError> {
        self.state.index = next_index;
        write_json_atomic(&self.path, &self.state)?;
        info!("📍 Cursor advanced to {}", next_index);
        Ok(())
    }
}
