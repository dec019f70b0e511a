//! JSON file persistence for settings and mission records
//!
//! Features:
//! - Atomic-ish writes (tmp → save, old save → backup)
//! - Corruption recovery from the backup copy

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::MissionError;

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(extension);
    PathBuf::from(name)
}

fn io_error(path: &Path, source: std::io::Error) -> MissionError {
    MissionError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, MissionError> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

/// Read a JSON file, falling back to its backup if the main copy is corrupt
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, MissionError> {
    match read_file(path) {
        Ok(value) => Ok(value),
        Err(MissionError::Json(e)) => {
            log::warn!("{} is corrupt ({}), trying backup", path.display(), e);
            let backup = sibling(path, ".bak");
            match read_file(&backup)? {
                Some(value) => Ok(Some(value)),
                None => Err(MissionError::Json(e)),
            }
        }
        Err(e) => Err(e),
    }
}

/// Write a JSON file, keeping the previous version as a backup
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MissionError> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let tmp = sibling(path, ".tmp");
    fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
    if path.exists() {
        let backup = sibling(path, ".bak");
        fs::rename(path, &backup).map_err(|e| io_error(&backup, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| io_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mission-core-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = scratch_dir("missing");
        let value: Option<BTreeMap<String, u32>> = read_json(&dir.join("nothing.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_write_then_read_keeps_backup() {
        let dir = scratch_dir("backup");
        let path = dir.join("records.json");
        let mut data = BTreeMap::new();
        data.insert("wins".to_string(), 1u32);
        write_json(&path, &data).unwrap();
        data.insert("wins".to_string(), 2u32);
        write_json(&path, &data).unwrap();

        let read: BTreeMap<String, u32> = read_json(&path).unwrap().unwrap();
        assert_eq!(read["wins"], 2);
        assert!(sibling(&path, ".bak").exists());

        // Corrupt the main copy: the backup (previous version) is used
        fs::write(&path, "{ not json").unwrap();
        let recovered: BTreeMap<String, u32> = read_json(&path).unwrap().unwrap();
        assert_eq!(recovered["wins"], 1);
        let _ = fs::remove_dir_all(&dir);
    }
}
