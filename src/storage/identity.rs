//! Identity store
//!
//! `players.json` maps display name to `{hash, carColors}`. The hash is the
//! durable key; names change whenever a player renames on the service.
//! File order is kept because it breaks ties in the standings.

use super::{read_json, write_json_atomic, StoreError};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub hash: String,
    #[serde(default)]
    pub car_colors: Vec<String>,
}

impl IdentityRecord {
    pub fn new(hash: impl Into<String>, car_colors: Vec<String>) -> Self {
        Self {
            hash: hash.into(),
            car_colors,
        }
    }
}

/// A display-name change applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub hash: String,
    pub from: String,
    pub to: String,
}

/// Name-keyed records in file order.
#[derive(Debug, Clone, Default, PartialEq)]
struct OrderedPlayers(Vec<(String, IdentityRecord)>);

impl Serialize for OrderedPlayers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, record) in &self.0 {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OrderedPlayers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PlayersVisitor;

        impl<'de> Visitor<'de> for PlayersVisitor {
            type Value = OrderedPlayers;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of player name to identity record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut players = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, record)) = access.next_entry::<String, IdentityRecord>()? {
                    players.push((name, record));
                }
                Ok(OrderedPlayers(players))
            }
        }

        deserializer.deserialize_map(PlayersVisitor)
    }
}

#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
    players: Vec<(String, IdentityRecord)>,
    by_hash: HashMap<String, usize>,
}

impl IdentityStore {
    /// Loads the roster of tracked identities. A missing file is fatal.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let players: OrderedPlayers =
            read_json(path)?.ok_or_else(|| StoreError::Missing(path.to_path_buf()))?;
        let store = Self::new(path, players.0)?;
        info!(
            "👥 Loaded {} tracked identities from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Builds a store from records; rejects duplicate names or hashes.
    pub fn new(path: &Path, players: Vec<(String, IdentityRecord)>) -> Result<Self, StoreError> {
        let mut names = HashSet::with_capacity(players.len());
        for (name, _) in &players {
            if !names.insert(name.as_str()) {
                return Err(StoreError::invalid(path, format!("duplicate player name {name:?}")));
            }
        }

        let mut store = Self {
            path: path.to_path_buf(),
            players,
            by_hash: HashMap::new(),
        };
        store.reindex();
        if store.by_hash.len() != store.players.len() {
            return Err(StoreError::invalid(path, "duplicate identity hash"));
        }
        Ok(store)
    }

    fn reindex(&mut self) {
        self.by_hash = self
            .players
            .iter()
            .enumerate()
            .map(|(i, (_, r))| (r.hash.clone(), i))
            .collect();
    }

    pub fn save(&self) -> Result<(), StoreError> {
        write_json_atomic(&self.path, &OrderedPlayers(self.players.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players in store order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IdentityRecord)> {
        self.players.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn hashes(&self) -> HashSet<String> {
        self.by_hash.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&IdentityRecord> {
        self.players.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<(&str, &IdentityRecord)> {
        self.by_hash
            .get(hash)
            .map(|&i| (self.players[i].0.as_str(), &self.players[i].1))
    }

    /// Replaces the record keyed by `hash` with a new name and colors, then
    /// persists immediately. Unknown hashes are ignored.
    ///
    /// A rename removes the old name key and appends the new one. A rename
    /// onto a name another hash still holds is refused: the old key stays and
    /// only the colors are updated.
    pub fn replace(
        &mut self,
        hash: &str,
        name: &str,
        car_colors: Vec<String>,
    ) -> Result<Option<Rename>, StoreError> {
        let Some(&idx) = self.by_hash.get(hash) else {
            return Ok(None);
        };

        let old_name = self.players[idx].0.clone();
        let record = IdentityRecord::new(hash, car_colors);
        let claimed_by = self
            .players
            .iter()
            .find(|(n, r)| n == name && r.hash != hash)
            .map(|(_, r)| r.hash.clone());

        let rename = if old_name == name {
            self.players[idx].1 = record;
            None
        } else if let Some(holder) = claimed_by {
            warn!(
                name,
                holder = %holder,
                hash,
                kept = %old_name,
                "Display name already claimed by another identity; keeping old name"
            );
            self.players[idx].1 = record;
            None
        } else {
            self.players.remove(idx);
            self.players.push((name.to_string(), record));
            Some(Rename {
                hash: hash.to_string(),
                from: old_name,
                to: name.to_string(),
            })
        };

        self.reindex();
        self.save()?;
        Ok(rename)
    }
}
