pub mod engine;
pub mod reconcile;
pub mod scoring;
pub mod search;

pub use engine::{Aggregator, RunOptions, RunSummary, StorePaths};
pub use reconcile::{decode_car_colors, reconcile_identities, ReconcileReport};
pub use scoring::{compute_standings, track_result, PenaltyPolicy};
pub use search::{locate_tracked_entries, ScanOutcome, ScanSettings, ScanStop};
