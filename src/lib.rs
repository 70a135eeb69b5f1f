//! Trackboard Backend Library
//!
//! Incremental multi-track leaderboard aggregation: a paginated client for the
//! remote ranking service, the three persisted stores, and the run engine.

pub mod aggregator;
pub mod config;
pub mod models;
pub mod scrapers;
pub mod storage;
