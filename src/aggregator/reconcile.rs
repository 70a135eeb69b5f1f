//! Identity reconciliation
//!
//! The service is the source of truth for display names and car colors.
//! Every located entry is compared with the stored record for its hash and
//! any difference is written through to the identity store right away.

use crate::models::LocatedEntry;
use crate::storage::{IdentityStore, Rename, StoreError};
use std::collections::HashMap;
use tracing::info;

const COLOR_TOKEN_LEN: usize = 6;

/// Splits a concatenated color string into 6-character tokens.
///
/// Anything whose length is not a positive multiple of 6 decodes to an empty
/// sequence instead of failing.
pub fn decode_car_colors(raw: &str) -> Vec<String> {
    let chars: Vec<char> = raw.chars().collect();
    if chars.is_empty() || chars.len() % COLOR_TOKEN_LEN != 0 {
        return Vec::new();
    }
    chars
        .chunks(COLOR_TOKEN_LEN)
        .map(|token| token.iter().collect())
        .collect()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records rewritten (rename and/or color change)
    pub updated: usize,
    pub renames: Vec<Rename>,
}

/// Applies name/color changes for every located entry, in rank order.
pub fn reconcile_identities(
    store: &mut IdentityStore,
    located: &HashMap<String, LocatedEntry>,
) -> Result<ReconcileReport, StoreError> {
    let mut entries: Vec<&LocatedEntry> = located.values().collect();
    entries.sort_by_key(|e| e.rank);

    let mut report = ReconcileReport::default();
    for located in entries {
        let entry = &located.entry;
        let colors = decode_car_colors(&entry.car_colors);

        let Some((stored_name, stored)) = store.find_by_hash(&entry.user_id) else {
            continue;
        };
        if stored_name == entry.name && stored.car_colors == colors {
            continue;
        }

        info!(
            hash = %entry.user_id,
            from = stored_name,
            to = %entry.name,
            "✏️ Identity changed on service"
        );
        if let Some(rename) = store.replace(&entry.user_id, &entry.name, colors)? {
            report.renames.push(rename);
        }
        report.updated += 1;
    }

    Ok(report)
}
