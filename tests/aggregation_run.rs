//! Integration tests for the aggregation run
//!
//! Drive `Aggregator::run` end to end against an in-memory leaderboard source
//! and temp-dir stores: windowing across invocations, identity reconciliation,
//! failure handling and full rebuilds.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use tempfile::{tempdir, TempDir};
use trackboard_backend::aggregator::{Aggregator, RunOptions, ScanSettings, StorePaths};
use trackboard_backend::models::{
    CompositeLeaderboard, LeaderboardPage, RankedEntry, TrackDescriptor,
};
use trackboard_backend::scrapers::{FetchCause, FetchFailure, LeaderboardSource, NoPacing};

/// Ranked lists per track id. Tracks in `failing` reject every request.
#[derive(Default)]
struct FakeService {
    boards: HashMap<String, Vec<RankedEntry>>,
    failing: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl FakeService {
    fn with_board(mut self, track_id: &str, rows: &[(&str, &str, u64, &str)]) -> Self {
        let entries = rows
            .iter()
            .map(|(hash, name, frames, colors)| RankedEntry {
                user_id: hash.to_string(),
                name: name.to_string(),
                frames: *frames,
                car_colors: colors.to_string(),
            })
            .collect();
        self.boards.insert(track_id.to_string(), entries);
        self
    }

    fn failing(mut self, track_id: &str) -> Self {
        self.failing.insert(track_id.to_string());
        self
    }

    fn requested_tracks(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for id in self.requests.lock().unwrap().iter() {
            if !seen.contains(id) {
                seen.push(id.clone());
            }
        }
        seen
    }
}

#[async_trait::async_trait]
impl LeaderboardSource for FakeService {
    async fn fetch_page(
        &self,
        track_id: &str,
        skip: u32,
        amount: u32,
    ) -> Result<LeaderboardPage, FetchFailure> {
        self.requests.lock().unwrap().push(track_id.to_string());
        if self.failing.contains(track_id) {
            return Err(FetchFailure::new(
                track_id,
                FetchCause::Transport("connection reset".into()),
            ));
        }
        let board = self.boards.get(track_id).cloned().unwrap_or_default();
        let total = board.len() as u64;
        let entries = board
            .into_iter()
            .skip(skip as usize)
            .take(amount as usize)
            .collect();
        Ok(LeaderboardPage { entries, total })
    }
}

fn roster() -> Vec<TrackDescriptor> {
    vec![
        TrackDescriptor::new("t1", "1"),
        TrackDescriptor::new("t2", "2"),
        TrackDescriptor::new("t3", "3"),
    ]
}

fn paths(dir: &TempDir) -> StorePaths {
    StorePaths {
        identity: dir.path().join("players.json"),
        cursor: dir.path().join("cursor.json"),
        leaderboard: dir.path().join("leaderboard.json"),
    }
}

fn options(window_size: usize) -> RunOptions {
    RunOptions {
        window_size,
        scan: ScanSettings {
            page_size: 2,
            max_depth: 100,
        },
        ..RunOptions::default()
    }
}

fn seed_players(path: &Path) {
    fs::write(
        path,
        r#"{
  "Alice": {"hash": "h1", "carColors": ["ff0000"]},
  "Bob": {"hash": "h2", "carColors": []}
}"#,
    )
    .unwrap();
}

fn read_doc(path: &Path) -> CompositeLeaderboard {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn base_service() -> FakeService {
    FakeService::default()
        .with_board(
            "t1",
            &[
                ("x1", "Zed", 9_000, ""),
                ("h1", "Alice", 10_000, "ff0000"),
                ("x2", "Yan", 11_000, ""),
                ("h2", "Bob", 12_000, ""),
            ],
        )
        .with_board("t2", &[("x1", "Zed", 18_000, ""), ("h2", "Bob", 20_000, "")])
        .with_board(
            "t3",
            &[("h2", "Bob", 30_500, ""), ("h1", "Alice", 31_250, "ff0000")],
        )
}

#[tokio::test]
async fn test_windowed_runs_preserve_untouched_tracks() {
    let dir = tempdir().unwrap();
    let paths = paths(&dir);
    seed_players(&paths.identity);

    let first = Aggregator::new(base_service(), NoPacing, options(2));
    let summary = first.run(&roster(), &paths).await.unwrap();
    assert_eq!(summary.tracks_processed, vec!["1", "2"]);
    assert_eq!(summary.next_cursor, 2);
    assert_eq!(read_json(&paths.cursor)["index"], 2);

    let doc = read_doc(&paths.leaderboard);
    let track1 = doc.track("1").unwrap();
    assert_eq!(track1.results[0].player, "Alice");
    assert_eq!(track1.results[0].time, Some(10.0));
    assert_eq!(track1.results[0].rank, Some(2));
    assert_eq!(track1.results[1].rank, Some(4));

    // A: 10 + 1.5*20 = 40, B: 12 + 20 = 32
    assert_eq!(doc.players[0].name, "Bob");
    assert_eq!(doc.players[0].total_time, 32.0);
    assert_eq!(doc.players[1].name, "Alice");
    assert_eq!(doc.players[1].total_time, 40.0);
    let track2_before = doc.track("2").unwrap().clone();

    // Second run wraps: tracks 3 then 1. Track 2 must come through unchanged.
    let service = base_service().with_board("t2", &[("h1", "Alice", 1_000, "ff0000")]);
    let second = Aggregator::new(service, NoPacing, options(2));
    let summary = second.run(&roster(), &paths).await.unwrap();
    assert_eq!(summary.tracks_processed, vec!["3", "1"]);
    assert_eq!(summary.next_cursor, 1);
    assert_eq!(second.source().requested_tracks(), vec!["t3", "t1"]);

    let doc = read_doc(&paths.leaderboard);
    assert_eq!(doc.tracks.len(), 3);
    assert_eq!(doc.track("2").unwrap(), &track2_before);
    let ranks: Vec<u32> = doc.players.iter().map(|p| p.leaderboard_rank).collect();
    assert_eq!(ranks, vec![1, 2]);
}

#[tokio::test]
async fn test_rename_is_persisted_and_propagated() {
    let dir = tempdir().unwrap();
    let paths = paths(&dir);
    seed_players(&paths.identity);

    let aggregator = Aggregator::new(base_service(), NoPacing, options(3));
    aggregator.run(&roster(), &paths).await.unwrap();

    let service = base_service().with_board("t1", &[("h1", "Alice2", 9_500, "00ff00")]);
    let aggregator = Aggregator::new(service, NoPacing, options(1));
    fs::write(&paths.cursor, r#"{"index": 0}"#).unwrap();
    let summary = aggregator.run(&roster(), &paths).await.unwrap();
    assert_eq!(summary.renames, 1);
    assert_eq!(summary.identity_updates, 1);

    let players = read_json(&paths.identity);
    assert!(players.get("Alice").is_none());
    assert_eq!(players["Alice2"]["hash"], "h1");
    assert_eq!(players["Alice2"]["carColors"][0], "00ff00");

    let doc = read_doc(&paths.leaderboard);
    for track in &doc.tracks {
        assert!(track.results.iter().all(|r| r.player != "Alice"));
        assert!(track.results.iter().any(|r| r.player == "Alice2"));
    }
    // Track 3 was not reprocessed but still credits the renamed player.
    let track3 = doc.track("3").unwrap();
    let alice = track3.results.iter().find(|r| r.player == "Alice2").unwrap();
    assert_eq!(alice.time, Some(31.25));
    let standing = doc.players.iter().find(|p| p.name == "Alice2").unwrap();
    assert_eq!(standing.car_colors, vec!["00ff00"]);
}

#[tokio::test]
async fn test_missing_identity_file_aborts_without_writes() {
    let dir = tempdir().unwrap();
    let paths = paths(&dir);

    let aggregator = Aggregator::new(base_service(), NoPacing, options(2));
    let err = aggregator.run(&roster(), &paths).await.unwrap_err();
    assert!(format!("{err:#}").contains("players.json"));

    assert!(!paths.cursor.exists());
    assert!(!paths.leaderboard.exists());
    assert!(aggregator.source().requested_tracks().is_empty());
}

#[tokio::test]
async fn test_unreachable_track_keeps_stored_results() {
    let dir = tempdir().unwrap();
    let paths = paths(&dir);
    seed_players(&paths.identity);

    Aggregator::new(base_service(), NoPacing, options(3))
        .run(&roster(), &paths)
        .await
        .unwrap();
    let before = read_doc(&paths.leaderboard);

    let service = base_service().failing("t1");
    let summary = Aggregator::new(service, NoPacing, options(2))
        .run(&roster(), &paths)
        .await
        .unwrap();
    assert_eq!(summary.tracks_unavailable, vec!["1"]);
    assert_eq!(summary.tracks_processed, vec!["2"]);
    assert_eq!(summary.next_cursor, 2);

    let after = read_doc(&paths.leaderboard);
    assert_eq!(after.track("1"), before.track("1"));
}

#[tokio::test]
async fn test_malformed_composite_document_aborts_run() {
    let dir = tempdir().unwrap();
    let paths = paths(&dir);
    seed_players(&paths.identity);
    fs::write(&paths.leaderboard, "{\"tracks\": [").unwrap();

    let result = Aggregator::new(base_service(), NoPacing, options(2))
        .run(&roster(), &paths)
        .await;
    assert!(result.is_err());
    assert!(!paths.cursor.exists());
    assert_eq!(fs::read_to_string(&paths.leaderboard).unwrap(), "{\"tracks\": [");
}

#[tokio::test]
async fn test_full_rebuild_leaves_cursor_alone() {
    let dir = tempdir().unwrap();
    let paths = paths(&dir);
    seed_players(&paths.identity);
    fs::write(&paths.cursor, r#"{"index": 1}"#).unwrap();
    fs::write(
        &paths.leaderboard,
        r#"{"tracks":[{"name":"retired","results":[]}],"players":[]}"#,
    )
    .unwrap();

    let rebuild_options = RunOptions {
        full_rebuild: true,
        ..options(1)
    };
    let summary = Aggregator::new(base_service(), NoPacing, rebuild_options)
        .run(&roster(), &paths)
        .await
        .unwrap();
    assert_eq!(summary.tracks_processed, vec!["1", "2", "3"]);
    assert_eq!(summary.next_cursor, 1);
    assert_eq!(read_json(&paths.cursor)["index"], 1);

    let doc = read_doc(&paths.leaderboard);
    let names: Vec<&str> = doc.tracks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["1", "2", "3"]);
    assert!(doc.updated_at.is_some());
}

#[tokio::test]
async fn test_stale_rows_of_removed_player_do_not_inflate_penalty() {
    let dir = tempdir().unwrap();
    let paths = paths(&dir);
    seed_players(&paths.identity);
    fs::write(
        &paths.leaderboard,
        r#"{"tracks":[{"name":"2","results":[
            {"player":"Alice","time":null,"rank":null},
            {"player":"Bob","time":20.0,"rank":1},
            {"player":"Gone","time":500.0,"rank":2}
        ]}],"players":[]}"#,
    )
    .unwrap();

    let summary = Aggregator::new(base_service(), NoPacing, options(1))
        .run(&roster(), &paths)
        .await
        .unwrap();
    assert_eq!(summary.tracks_processed, vec!["1"]);

    let doc = read_doc(&paths.leaderboard);
    assert_eq!(doc.players.len(), 2);
    let alice = doc.players.iter().find(|p| p.name == "Alice").unwrap();
    assert_eq!(alice.total_time, 40.0);
    let bob = doc.players.iter().find(|p| p.name == "Bob").unwrap();
    assert_eq!(bob.total_time, 32.0);
}

#[tokio::test]
async fn test_scan_without_pages_keeps_stored_results() {
    let dir = tempdir().unwrap();
    let paths = paths(&dir);
    seed_players(&paths.identity);
    fs::write(
        &paths.leaderboard,
        r#"{"tracks":[{"name":"1","results":[
            {"player":"Alice","time":10.0,"rank":2},
            {"player":"Bob","time":null,"rank":null}
        ]}],"players":[]}"#,
    )
    .unwrap();
    let before = read_doc(&paths.leaderboard);

    let no_depth = RunOptions {
        scan: ScanSettings {
            page_size: 2,
            max_depth: 0,
        },
        ..options(1)
    };
    let aggregator = Aggregator::new(base_service(), NoPacing, no_depth);
    let summary = aggregator.run(&roster(), &paths).await.unwrap();
    assert!(summary.tracks_processed.is_empty());
    assert_eq!(summary.tracks_unavailable, vec!["1"]);
    assert!(aggregator.source().requested_tracks().is_empty());

    let after = read_doc(&paths.leaderboard);
    assert_eq!(after.track("1"), before.track("1"));
}
