//! Persisted JSON aggregates
//!
//! Three documents survive between runs: the identity store, the track cursor
//! and the composite leaderboard. All writes go through `write_json_atomic`
//! so an interrupted run never leaves a truncated document behind.

pub mod composite;
pub mod cursor;
pub mod identity;

pub use composite::CompositeStore;
pub use cursor::{select_window, CursorState, TrackCursor};
pub use identity::{IdentityRecord, IdentityStore, Rename};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Errors from the persisted stores.
#[derive(Debug)]
pub enum StoreError {
    Missing(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    Invalid {
        path: PathBuf,
        reason: String,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(path: &Path, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(path) => write!(f, "required file not found: {}", path.display()),
            Self::Io { path, source } => write!(f, "I/O error on {}: {}", path.display(), source),
            Self::Malformed { path, source } => {
                write!(f, "malformed JSON in {}: {}", path.display(), source)
            }
            Self::Invalid { path, reason } => write!(f, "invalid {}: {}", path.display(), reason),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Reads and decodes a JSON document. `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes pretty JSON to a sibling temp file, syncs it, then renames over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut content = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    content.push(b'\n');

    let temp_path = temp_path_for(path);
    let file = File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&content)
        .map_err(|e| StoreError::io(&temp_path, e))?;
    writer.flush().map_err(|e| StoreError::io(&temp_path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| StoreError::io(&temp_path, e))?;
    drop(writer);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::io(path, e));
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        index: usize,
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        let got: Option<Doc> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_atomic_write_replaces_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        write_json_atomic(&path, &Doc { index: 1 }).unwrap();
        write_json_atomic(&path, &Doc { index: 2 }).unwrap();

        let got: Option<Doc> = read_json(&path).unwrap();
        assert_eq!(got, Some(Doc { index: 2 }));
        assert!(!dir.path().join("nested").join("doc.json.tmp").exists());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "{\"index\": ").unwrap();

        let err = read_json::<Doc>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }
}
