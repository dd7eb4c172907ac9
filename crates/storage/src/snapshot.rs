// SPDX-License-Identifier: MIT

//! Atomic snapshot persistence: write to a `.tmp` sibling, fsync, then
//! rename over the target. A crash mid-write leaves the old snapshot intact
//! rather than a half-written file.

use crate::error::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Write `value` to `path` atomically.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_sibling(path);
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load `path` if it exists. A corrupt file is moved to `.bak` and `None`
/// is returned so the caller can start fresh rather than fail to boot.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    match serde_json::from_reader(reader) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let bak_path = path.with_extension("bak");
            warn!(error = %e, path = %path.display(), bak = %bak_path.display(), "corrupt snapshot, moving aside");
            fs::rename(path, &bak_path)?;
            Ok(None)
        }
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
