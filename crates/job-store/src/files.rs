//! Async JSON file helpers with atomic writes
//!
//! Writes go to a uniquely-named temp file in the target directory, are
//! fsynced, then renamed over the destination so readers never observe a
//! partial file.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use job_core::{Error, Result};

/// Read a JSON array of records from `path`.
///
/// A missing file yields an empty vector. A corrupt or unreadable file is
/// logged and also yields an empty vector so a damaged registry never takes
/// the service down.
pub async fn read_records<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let data = match fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(?path, error = %e, "Failed to read record file, treating as empty");
            return Vec::new();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(records) => records,
        Err(e) => {
            warn!(?path, error = %e, "Record file is corrupt, treating as empty");
            Vec::new()
        }
    }
}

/// Atomically write `value` as pretty-printed JSON to `path`.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| Error::Storage {
            message: format!("Failed to create directory {:?}: {}", parent, e),
        })?;
    }

    let data = serde_json::to_vec_pretty(value)?;

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        Uuid::new_v4()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut file = fs::File::create(&temp_path).await.map_err(|e| Error::Storage {
        message: format!("Failed to create temp file {:?}: {}", temp_path, e),
    })?;

    file.write_all(&data).await.map_err(|e| Error::Storage {
        message: format!("Failed to write data: {}", e),
    })?;

    file.sync_all().await.map_err(|e| Error::Storage {
        message: format!("Failed to sync file: {}", e),
    })?;

    fs::rename(&temp_path, path).await.map_err(|e| Error::Storage {
        message: format!("Failed to rename {:?} to {:?}: {}", temp_path, path, e),
    })?;

    debug!(?path, size = data.len(), "File written atomically");
    Ok(())
}

/// Remove a file, ignoring the case where it never existed.
pub async fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Storage {
            message: format!("Failed to delete {:?}: {}", path, e),
        }),
    }
}
