//! File-backed store for user-saved locations.
//!
//! The whole list is held in memory and rewritten to a JSON file on every
//! add or remove (temp file + rename, so a crash never leaves a truncated
//! file). A missing file loads as an empty list.

use std::path::{Path, PathBuf};

use fire_common::{FireError, Location};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LocationStoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt locations file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid location: {0}")]
    Invalid(String),
}

impl From<LocationStoreError> for FireError {
    fn from(err: LocationStoreError) -> Self {
        match err {
            LocationStoreError::Invalid(m) => FireError::InvalidParameter {
                param: "location".to_string(),
                message: m,
            },
            other => FireError::StorageError(other.to_string()),
        }
    }
}

/// Saved locations persisted to a JSON file.
pub struct LocationStore {
    path: PathBuf,
    locations: RwLock<Vec<Location>>,
}

impl LocationStore {
    /// Open the store, reading existing locations if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LocationStoreError> {
        let path = path.into();
        let locations = match fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                LocationStoreError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No saved locations file, starting empty");
                Vec::new()
            }
            Err(source) => return Err(LocationStoreError::Io { path, source }),
        };

        info!(path = %path.display(), count = locations.len(), "Loaded saved locations");
        Ok(Self {
            path,
            locations: RwLock::new(locations),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> Vec<Location> {
        self.locations.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Location> {
        self.locations.read().await.iter().find(|l| l.id == id).cloned()
    }

    /// Add a location and persist.
    pub async fn add(&self, location: Location) -> Result<Location, LocationStoreError> {
        if !location.is_valid() {
            return Err(LocationStoreError::Invalid(format!(
                "'{}' at ({}, {}) needs a name and coordinates within range",
                location.name, location.lat, location.lon
            )));
        }

        let mut locations = self.locations.write().await;
        locations.push(location.clone());
        if let Err(e) = self.persist(&locations).await {
            locations.pop();
            return Err(e);
        }
        Ok(location)
    }

    /// Remove a location by id and persist. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool, LocationStoreError> {
        let mut locations = self.locations.write().await;
        let Some(index) = locations.iter().position(|l| l.id == id) else {
            return Ok(false);
        };

        let removed = locations.remove(index);
        if let Err(e) = self.persist(&locations).await {
            locations.insert(index, removed);
            return Err(e);
        }
        Ok(true)
    }

    async fn persist(&self, locations: &[Location]) -> Result<(), LocationStoreError> {
        let io_err = |source: std::io::Error| LocationStoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let json = serde_json::to_vec_pretty(locations).map_err(|source| {
            LocationStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).await.map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            warn!(error = %e, "Rename of locations file failed");
            fs::remove_file(&tmp).await.ok();
            return Err(io_err(e));
        }
        Ok(())
    }
}
