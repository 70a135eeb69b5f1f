//! Leaderboard data model
//!
//! Wire types returned by the remote ranking service and the persisted
//! composite document consumed by the display layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One track of the configured roster. Order in the roster drives the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Opaque service-side track hash
    pub id: String,
    /// Display name written to the composite document
    pub name: String,
}

impl TrackDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Raw row from a leaderboard page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    /// Identity hash assigned by the service
    pub user_id: String,
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default)]
    pub frames: u64,
    /// Concatenated 6-hex-char color tokens
    #[serde(default)]
    pub car_colors: String,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

impl RankedEntry {
    /// Elapsed time in seconds, rounded to milliseconds.
    pub fn time_seconds(&self) -> f64 {
        round3(self.frames as f64 / 1000.0)
    }
}

/// Body of `GET /leaderboard`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardPage {
    #[serde(default)]
    pub entries: Vec<RankedEntry>,
    pub total: u64,
}

/// A tracked entry found during a scan, with its absolute 1-based position.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedEntry {
    pub entry: RankedEntry,
    pub rank: u32,
}

/// One player's row inside a track's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRow {
    pub player: String,
    pub time: Option<f64>,
    pub rank: Option<u32>,
}

impl PlacementRow {
    pub fn missing(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            time: None,
            rank: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackResult {
    pub name: String,
    pub results: Vec<PlacementRow>,
}

impl TrackResult {
    /// Worst recorded time among rows whose player passes `tracked`,
    /// ignoring rows without a record.
    pub fn max_time_where<F>(&self, tracked: F) -> Option<f64>
    where
        F: Fn(&str) -> bool,
    {
        self.results
            .iter()
            .filter(|r| tracked(r.player.as_str()))
            .filter_map(|r| r.time)
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |m| m.max(t))))
    }
}

/// Derived cross-track standing. Rebuilt on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStanding {
    pub name: String,
    pub avg_rank: f64,
    pub total_time: f64,
    #[serde(default)]
    pub total_points: f64,
    pub car_colors: Vec<String>,
    pub leaderboard_rank: u32,
}

/// The persisted composite leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeLeaderboard {
    #[serde(default)]
    pub tracks: Vec<TrackResult>,
    #[serde(default)]
    pub players: Vec<PlayerStanding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CompositeLeaderboard {
    pub fn track(&self, name: &str) -> Option<&TrackResult> {
        self.tracks.iter().find(|t| t.name == name)
    }
}

#[inline]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
