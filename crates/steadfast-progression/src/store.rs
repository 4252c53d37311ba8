//! Persistence seam for per-user progress.
//!
//! This module provides:
//! - The [`ProgressStore`] trait consumed by the service
//! - An in-memory store holding encoded snapshots
//! - A directory store writing one snapshot file per user

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use steadfast_common::UserId;
use thiserror::Error;
use tracing::debug;

use crate::snapshot::{SnapshotError, UserProgress};

/// Errors that can occur in a progress store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored snapshot could not be decoded
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// User id cannot be used as a storage key
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Loads and saves per-user progress.
pub trait ProgressStore: Send + Sync {
    /// Loads a user's progress, or `None` for a user never saved.
    fn load(&self, user: &UserId) -> StoreResult<Option<UserProgress>>;

    /// Saves a user's progress, replacing any previous version.
    fn save(&self, progress: &UserProgress) -> StoreResult<()>;

    /// Removes a user's progress. Returns false if there was none.
    fn remove(&self, user: &UserId) -> StoreResult<bool>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Store keeping encoded snapshots in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: DashMap<UserId, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self, user: &UserId) -> StoreResult<Option<UserProgress>> {
        match self.snapshots.get(user) {
            Some(bytes) => Ok(Some(UserProgress::from_bytes_for(user, bytes.value())?)),
            None => Ok(None),
        }
    }

    fn save(&self, progress: &UserProgress) -> StoreResult<()> {
        let bytes = progress.to_bytes()?;
        self.snapshots.insert(progress.user.clone(), bytes);
        Ok(())
    }

    fn remove(&self, user: &UserId) -> StoreResult<bool> {
        Ok(self.snapshots.remove(user).is_some())
    }
}

// ============================================================================
// Directory store
// ============================================================================

/// Snapshot file extension.
pub const SNAPSHOT_EXTENSION: &str = "sfpg";

/// Store writing one snapshot file per user.
#[derive(Debug)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Gets the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, user: &UserId) -> StoreResult<PathBuf> {
        let key = user.as_str();
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{SNAPSHOT_EXTENSION}")))
    }
}

impl ProgressStore for DirectoryStore {
    fn load(&self, user: &UserId) -> StoreResult<Option<UserProgress>> {
        let path = self.snapshot_path(user)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(UserProgress::from_bytes_for(user, &bytes)?))
    }

    /// Writes to a temporary file, then renames it over the snapshot.
    fn save(&self, progress: &UserProgress) -> StoreResult<()> {
        let path = self.snapshot_path(&progress.user)?;
        fs::create_dir_all(&self.dir)?;

        let bytes = progress.to_bytes()?;
        let temp_path = path.with_extension(format!("{SNAPSHOT_EXTENSION}.tmp"));

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &path)?;
        debug!("Saved progress for {} to {}", progress.user, path.display());
        Ok(())
    }

    fn remove(&self, user: &UserId) -> StoreResult<bool> {
        let path = self.snapshot_path(user)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }
}
