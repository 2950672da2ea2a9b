//! Atomic JSON persistence.
//!
//! Writes go to a temp file with a PID suffix, are validated by re-parsing,
//! and land via an atomic rename; reads of missing files return `Ok(None)`
//! instead of an error.

use crate::error::{LintmendError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::process;
use tracing::debug;

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist, or an error if parsing fails.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut file =
        fs::File::open(path).map_err(|e| LintmendError::io_with_path(e, path))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| LintmendError::io_with_path(e, path))?;

    let data: T = serde_json::from_str(&contents).map_err(|e| LintmendError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Write data to a JSON file atomically (temp file + validate + rename).
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| LintmendError::io_with_path(e, parent))?;
        }
    }

    let temp_path = path.with_extension(format!("json.{}.tmp", process::id()));

    let serialized = serde_json::to_string_pretty(data).map_err(|e| LintmendError::Json {
        message: format!("Failed to serialize data: {e}"),
        source: Some(e),
    })?;

    // Validate by re-parsing before anything touches the target path
    serde_json::from_str::<serde_json::Value>(&serialized).map_err(|e| LintmendError::Json {
        message: format!("JSON validation failed: {e}"),
        source: Some(e),
    })?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| LintmendError::io_with_path(e, &temp_path))?;

        file.write_all(serialized.as_bytes())
            .map_err(|e| LintmendError::io_with_path(e, &temp_path))?;
        file.sync_all()
            .map_err(|e| LintmendError::io_with_path(e, &temp_path))?;
    }

    fs::rename(&temp_path, path).map_err(|e| LintmendError::Io {
        message: format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        ),
        path: Some(path.to_path_buf()),
        source: Some(e),
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}
