//! Atomic filesystem operations.
//!
//! All atomic writes follow this pattern:
//! 1. Write content to a uniquely named temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target and sync the parent directory
//!
//! `rename` replaces the destination atomically when source and destination
//! share a filesystem, which holds because the temp file is a sibling. On
//! crash a `.{filename}.{id}.tmp` file may remain; readers ignore it.

use crate::engine::{EngineError, EngineResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> EngineResult<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            EngineError::Io(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;
    replace(&temp_path, path)
}

/// Atomically write a value as pretty-printed JSON.
pub fn atomic_write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> EngineResult<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| {
        EngineError::Corrupt(format!(
            "failed to serialize '{}': {}",
            path.as_ref().display(),
            e
        ))
    })?;
    atomic_write(path, &json)
}

/// Read and decode a JSON file; `Ok(None)` if it does not exist.
pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> EngineResult<Option<T>> {
    let path = path.as_ref();
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(EngineError::Io(format!(
                "failed to read '{}': {}",
                path.display(),
                e
            )));
        }
    };
    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|e| EngineError::Corrupt(format!("failed to parse '{}': {}", path.display(), e)))
}

/// Temporary sibling path: `.{filename}.{uuid}.tmp`.
fn generate_temp_path(target: &Path) -> EngineResult<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EngineError::Validation(format!("invalid file path '{}'", target.display())))?;

    let temp_name = format!(".{}.{}.tmp", filename, uuid::Uuid::new_v4().simple());
    Ok(parent.join(temp_name))
}

fn write_and_sync(path: &Path, content: &[u8]) -> EngineResult<()> {
    let mut file = File::create(path).map_err(|e| {
        EngineError::Io(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        EngineError::Io(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        EngineError::Io(format!("failed to sync temporary file to disk: {}", e))
    })
}

fn replace(source: &Path, target: &Path) -> EngineResult<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        EngineError::Io(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    // Persist the directory entry as well (directories cannot be opened on Windows)
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
