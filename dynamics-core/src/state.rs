//! Replication state files.
//!
//! Writes use the atomic `.tmp` + rename pattern so a crash mid-write never
//! leaves a truncated state file behind.

use std::path::{Path, PathBuf};

use crate::error::StateError;
use crate::types::ReplicationState;

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.into(),
        source,
    }
}

/// Load state from `path`.
///
/// Returns an empty state if the file does not exist or is blank.
pub fn load_at(path: &Path) -> Result<ReplicationState, StateError> {
    if !path.exists() {
        return Ok(ReplicationState::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(ReplicationState::default());
    }
    serde_json::from_str(&contents).map_err(|e| StateError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Save state to `path` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(path: &Path, state: &ReplicationState) -> Result<(), StateError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(state)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// `<path>.tmp`, next to the target so the rename stays on one filesystem.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
