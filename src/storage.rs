//! Session Storage Module
//!
//! Persists the auth session as JSON files so it survives restarts.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info};

const APP_DIR: &str = "Invoicer";

/// Default directory for persisted client data
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// File-backed key/value storage, one JSON file per key
#[derive(Debug, Clone)]
pub struct SessionFileStore {
    storage_path: PathBuf,
}

impl SessionFileStore {
    /// Create storage rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let storage_path = dir.into();

        if let Err(e) = std::fs::create_dir_all(&storage_path) {
            error!("Failed to create storage directory: {}", e);
        }

        debug!("Session storage initialized at: {:?}", storage_path);

        Self { storage_path }
    }

    /// Create storage in the platform's local data directory
    pub fn default_location() -> Self {
        Self::new(default_storage_dir())
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Save a value under `key`
    pub fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec(data)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        write_private(&self.file_path(key), &json)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        info!("Saved data for key: {}", key);
        Ok(())
    }

    /// Load the value stored under `key`, `None` if nothing is stored
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let file_path = self.file_path(key);
        if !file_path.exists() {
            return Ok(None);
        }

        let json = std::fs::read(&file_path)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        serde_json::from_slice(&json)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Delete stored data
    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        let file_path = self.file_path(key);

        if file_path.exists() {
            std::fs::remove_file(&file_path)
                .map_err(|e| StorageError::Io(e.to_string()))?;
            info!("Deleted stored data for key: {}", key);
        }

        Ok(())
    }

    /// Check if key exists
    pub fn exists(&self, key: &str) -> bool {
        self.file_path(key).exists()
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.storage_path.join(format!("{}.json", key))
    }
}

// Session files hold bearer tokens; keep them owner-readable only.
#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, data)
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
