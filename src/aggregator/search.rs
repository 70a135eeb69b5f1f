//! Targeted leaderboard scan
//!
//! Walks a track's ranked list page by page looking only for tracked hashes.
//! Stops as soon as every target is found, the list ends, or the depth bound
//! is reached. A failed page ends the scan; what was found so far stands.

use crate::models::{LocatedEntry, TrackDescriptor};
use crate::scrapers::polytrack_api::MAX_PAGE_AMOUNT;
use crate::scrapers::{LeaderboardSource, Pacer};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Entries requested per page
    pub page_size: u32,
    /// Never look past this absolute position
    pub max_depth: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_depth: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStop {
    AllFound,
    EmptyPage,
    EndOfList,
    DepthLimit,
    FetchFailed,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Tracked hash -> entry with absolute rank
    pub found: HashMap<String, LocatedEntry>,
    /// Pages successfully fetched
    pub pages: u32,
    pub stop: ScanStop,
}

impl ScanOutcome {
    /// False when no page was fetched, unless there was nothing to look for.
    pub fn obtained_data(&self) -> bool {
        self.pages > 0 || self.stop == ScanStop::AllFound
    }
}

pub async fn locate_tracked_entries<S, P>(
    source: &S,
    pacer: &P,
    track: &TrackDescriptor,
    targets: &HashSet<String>,
    settings: &ScanSettings,
) -> ScanOutcome
where
    S: LeaderboardSource + ?Sized,
    P: Pacer + ?Sized,
{
    let mut found: HashMap<String, LocatedEntry> = HashMap::with_capacity(targets.len());
    let mut pages = 0u32;

    if targets.is_empty() {
        return ScanOutcome {
            found,
            pages,
            stop: ScanStop::AllFound,
        };
    }

    let page_size = settings.page_size.clamp(1, MAX_PAGE_AMOUNT);
    let mut skip = 0u32;

    let stop = loop {
        if skip >= settings.max_depth {
            break ScanStop::DepthLimit;
        }
        let amount = page_size.min(settings.max_depth - skip);

        pacer.pace().await;
        let page = match source.fetch_page(&track.id, skip, amount).await {
            Ok(page) => page,
            Err(e) => {
                warn!(track = %track.name, skip, "❌ {}", e);
                break ScanStop::FetchFailed;
            }
        };
        pages += 1;

        if page.entries.is_empty() {
            break ScanStop::EmptyPage;
        }

        for (i, entry) in page.entries.into_iter().take(amount as usize).enumerate() {
            if targets.contains(&entry.user_id) && !found.contains_key(&entry.user_id) {
                let rank = skip + i as u32 + 1;
                found.insert(entry.user_id.clone(), LocatedEntry { entry, rank });
            }
        }

        debug!(
            track = %track.name,
            skip,
            total = page.total,
            found = found.len(),
            targets = targets.len(),
            "Scanned page"
        );

        if found.len() == targets.len() {
            break ScanStop::AllFound;
        }
        if u64::from(skip) + u64::from(page_size) >= page.total {
            break ScanStop::EndOfList;
        }
        skip = skip.saturating_add(page_size);
    };

    info!(
        track = %track.name,
        pages,
        found = found.len(),
        targets = targets.len(),
        stop = ?stop,
        "🔎 Scan finished"
    );

    ScanOutcome { found, pages, stop }
}
