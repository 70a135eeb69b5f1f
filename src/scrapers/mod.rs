pub mod pacing; // Inter-request delay policy
pub mod polytrack_api; // Paginated leaderboard reads

pub use pacing::{FixedDelayPacer, NoPacing, Pacer};
pub use polytrack_api::{
    FetchCause, FetchFailure, LeaderboardSource, PolytrackClient, PolytrackClientConfig,
};
