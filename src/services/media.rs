//! Media storage
//!
//! Uploaded files live below the configured media root in month folders:
//! `<root>/<YYYY>/<MM>/<uuid>.<ext>`. Callers only ever see the relative
//! path with forward slashes, which is also what `/media` serves.

use chrono::{Datelike, Utc};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create media directory '{path}': {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write media file '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to remove media file '{path}': {source}")]
    Remove {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid media path: {0}")]
    InvalidPath(String),
}

/// File system store for uploaded images
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `data` under a fresh name and return its relative path
    pub async fn save(&self, data: &[u8], extension: &str) -> Result<String, StorageError> {
        let now = Utc::now();
        let dir = format!("{:04}/{:02}", now.year(), now.month());
        let relative = format!("{}/{}.{}", dir, Uuid::new_v4().simple(), extension);

        let abs_dir = self.root.join(&dir);
        fs::create_dir_all(&abs_dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: abs_dir.display().to_string(),
                source,
            })?;

        let abs_path = self.resolve(&relative)?;
        fs::write(&abs_path, data)
            .await
            .map_err(|source| StorageError::Write {
                path: abs_path.display().to_string(),
                source,
            })?;

        tracing::debug!("Stored {} bytes at {}", data.len(), relative);
        Ok(relative)
    }

    /// Remove a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, relative: &str) -> Result<(), StorageError> {
        let abs_path = self.resolve(relative)?;
        match fs::remove_file(&abs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Remove {
                path: abs_path.display().to_string(),
                source,
            }),
        }
    }

    /// Map a stored relative path onto the media root.
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(relative);
        if relative.is_empty()
            || path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }
}

/// Pick the stored file extension: the original file name's extension if it
/// looks sane, otherwise `fallback`.
pub fn file_extension(filename: Option<&str>, fallback: &str) -> String {
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() < 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| fallback.to_string())
}
