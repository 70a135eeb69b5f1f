//! Standings and penalty policy
//!
//! Total time sums a player's real times, substituting a penalty for every
//! track without a record: 1.5x the slowest recorded time on that track, or a
//! fixed fallback when nobody has a time there.

use crate::models::{
    round3, LocatedEntry, PlacementRow, PlayerStanding, TrackDescriptor, TrackResult,
};
use crate::storage::IdentityStore;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Mean rank given to players with no ranked track.
pub const NO_RANK_SENTINEL: f64 = 9999.0;
pub const DEFAULT_PENALTY_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_PENALTY_FALLBACK_SECS: f64 = 999.0;

/// Points awarded per rank (index 0 = rank 1). Ranks past the table earn 0.
pub const POINTS_TABLE: [f64; 50] = [
    40000.0, 20000.0, 13333.333333, 10000.0, 8000.0, 6666.666667, 5714.285714, 5000.0,
    4444.444444, 4000.0, 3618.181818, 3466.666667, 3338.461538, 3228.571429, 3133.333333,
    3050.0, 2976.470588, 2911.111111, 2852.631579, 2800.0, 2752.380952, 2709.090909,
    2669.565217, 2633.333333, 2600.0, 2569.230769, 2540.740741, 2514.285714, 2489.655172,
    2466.666667, 2445.16129, 2425.0, 2406.060606, 2388.235294, 2371.428571, 2355.555556,
    2340.540541, 2326.315789, 2312.820513, 2300.0, 2287.804878, 2276.190476, 2265.116279,
    2254.545455, 2244.444444, 2234.782609, 2225.531915, 2216.666667, 2208.163265, 2200.0,
];

pub fn points_for_rank(rank: u32) -> f64 {
    match rank {
        0 => 0.0,
        r => POINTS_TABLE.get(r as usize - 1).copied().unwrap_or(0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyPolicy {
    pub multiplier: f64,
    pub fallback_secs: f64,
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_PENALTY_MULTIPLIER,
            fallback_secs: DEFAULT_PENALTY_FALLBACK_SECS,
        }
    }
}

impl PenaltyPolicy {
    /// Penalty for a missing record, from the slowest time set by a tracked
    /// player. Rows left behind by players no longer tracked never count.
    pub fn penalty_for(&self, track: &TrackResult, tracked: &HashSet<&str>) -> f64 {
        match track.max_time_where(|player| tracked.contains(player)) {
            Some(worst) => worst * self.multiplier,
            None => self.fallback_secs,
        }
    }
}

/// Builds one track's rows for every tracked player, in identity-store order.
/// Players without a located entry get a null time and rank.
pub fn track_result(
    track: &TrackDescriptor,
    identities: &IdentityStore,
    located: &HashMap<String, LocatedEntry>,
) -> TrackResult {
    let results = identities
        .iter()
        .map(|(name, record)| match located.get(&record.hash) {
            Some(found) => PlacementRow {
                player: name.to_string(),
                time: Some(found.entry.time_seconds()),
                rank: Some(found.rank),
            },
            None => PlacementRow::missing(name),
        })
        .collect();

    TrackResult {
        name: track.name.clone(),
        results,
    }
}

/// Rebuilds the full standing list from every track in the document.
///
/// Players come from the identity store; rows are looked up by display name.
/// Output is sorted by total time ascending, stable on ties, ranked 1..=N.
pub fn compute_standings(
    tracks: &[TrackResult],
    identities: &IdentityStore,
    policy: &PenaltyPolicy,
) -> Vec<PlayerStanding> {
    let tracked: HashSet<&str> = identities.iter().map(|(name, _)| name).collect();
    let indexed: Vec<(HashMap<&str, &PlacementRow>, f64)> = tracks
        .iter()
        .map(|track| {
            let mut by_player = HashMap::with_capacity(track.results.len());
            for row in &track.results {
                by_player.entry(row.player.as_str()).or_insert(row);
            }
            (by_player, policy.penalty_for(track, &tracked))
        })
        .collect();

    let mut standings: Vec<PlayerStanding> = identities
        .iter()
        .map(|(name, record)| {
            let mut total_time = 0.0;
            let mut total_points = 0.0;
            let mut rank_sum = 0u64;
            let mut ranked = 0u32;

            for (by_player, penalty) in &indexed {
                let row = by_player.get(name);
                total_time += row.and_then(|r| r.time).unwrap_or(*penalty);
                if let Some(rank) = row.and_then(|r| r.rank) {
                    rank_sum += u64::from(rank);
                    ranked += 1;
                    total_points += points_for_rank(rank);
                }
            }

            let avg_rank = if ranked == 0 {
                NO_RANK_SENTINEL
            } else {
                round3(rank_sum as f64 / f64::from(ranked))
            };

            PlayerStanding {
                name: name.to_string(),
                avg_rank,
                total_time: round3(total_time),
                total_points: round3(total_points),
                car_colors: record.car_colors.clone(),
                leaderboard_rank: 0,
            }
        })
        .collect();

    standings.sort_by(|a, b| {
        a.total_time
            .partial_cmp(&b.total_time)
            .unwrap_or(Ordering::Equal)
    });
    for (i, standing) in standings.iter_mut().enumerate() {
        standing.leaderboard_rank = i as u32 + 1;
    }

    standings
}
