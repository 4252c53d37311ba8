//! Catalog file loading.
//!
//! This module provides:
//! - Loading a catalog from a `.toml`, `.ron` or `.json` file
//! - Format version checking
//! - Validation into an immutable [`Catalog`]

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use steadfast_common::SchemaVersion;
use thiserror::Error;
use tracing::{debug, info};

use crate::achievement::AchievementDefinition;
use crate::catalog::Catalog;
use crate::challenge::ChallengeTemplate;
use crate::error::EngineError;
use crate::level::Level;

/// Errors that can occur during catalog loading.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// File not found.
    #[error("Catalog file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read catalog file: {0}")]
    ReadError(#[from] std::io::Error),

    /// File extension is not a known format.
    #[error("Unsupported catalog format: {0}")]
    UnsupportedFormat(String),

    /// Failed to parse TOML.
    #[error("Failed to parse catalog TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Failed to parse RON.
    #[error("Failed to parse catalog RON: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Failed to parse JSON.
    #[error("Failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// File was written for an incompatible format version.
    #[error("Catalog version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this build reads
        expected: String,
        /// Version declared by the file
        actual: String,
    },

    /// Contents parsed but violate a catalog invariant.
    #[error("Catalog validation error: {0}")]
    Invalid(#[from] EngineError),
}

/// Result type for catalog loading operations.
pub type CatalogLoadResult<T> = Result<T, CatalogLoadError>;

/// On-disk catalog encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    /// TOML
    Toml,
    /// Rusty Object Notation
    Ron,
    /// JSON
    Json,
}

impl CatalogFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> CatalogLoadResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "ron" => Ok(Self::Ron),
            "json" => Ok(Self::Json),
            _ => Err(CatalogLoadError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

fn default_version() -> String {
    SchemaVersion::CATALOG_FILE.to_string()
}

/// Serialized catalog contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Format version
    #[serde(default = "default_version")]
    pub version: String,
    /// Level bands
    #[serde(default)]
    pub levels: Vec<Level>,
    /// Achievements in declaration order
    #[serde(default)]
    pub achievements: Vec<AchievementDefinition>,
    /// Challenge templates
    #[serde(default)]
    pub challenges: Vec<ChallengeTemplate>,
}

impl CatalogFile {
    /// Parses catalog text in the given format.
    pub fn parse(text: &str, format: CatalogFormat) -> CatalogLoadResult<Self> {
        let file = match format {
            CatalogFormat::Toml => toml::from_str(text)?,
            CatalogFormat::Ron => ron::from_str(text)?,
            CatalogFormat::Json => serde_json::from_str(text)?,
        };
        Ok(file)
    }

    /// Reads and parses a catalog file, picking the format from its extension.
    pub fn read(path: &Path) -> CatalogLoadResult<Self> {
        if !path.exists() {
            return Err(CatalogLoadError::NotFound(path.to_path_buf()));
        }
        let format = CatalogFormat::from_path(path)?;
        let text = fs::read_to_string(path)?;
        debug!("Parsing {:?} catalog from {}", format, path.display());
        Self::parse(&text, format)
    }

    /// Checks the declared version against the one this build reads.
    pub fn check_version(&self) -> CatalogLoadResult<()> {
        let expected = SchemaVersion::CATALOG_FILE;
        match SchemaVersion::parse(&self.version) {
            Some(actual) if expected.can_read(&actual) => Ok(()),
            _ => Err(CatalogLoadError::VersionMismatch {
                expected: expected.to_string(),
                actual: self.version.clone(),
            }),
        }
    }

    /// Validates the contents into a catalog.
    pub fn into_catalog(self) -> CatalogLoadResult<Catalog> {
        self.check_version()?;
        Ok(Catalog::new(self.levels, self.achievements, self.challenges)?)
    }
}

impl Catalog {
    /// Loads and validates a catalog file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> CatalogLoadResult<Self> {
        let path = path.as_ref();
        let catalog = CatalogFile::read(path)?.into_catalog()?;
        info!("Loaded catalog from {}", path.display());
        Ok(catalog)
    }
}
