//! Engine configuration.
//!
//! Provides the tunable policies of the progression engine. Configuration can
//! be loaded from and saved to a TOML file; a missing or invalid file falls
//! back to defaults.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::catalog_loader::CatalogLoadResult;
use crate::challenge::{ChallengeTracker, OutOfWindowPolicy};
use crate::points::{default_multipliers, PointsCalculator, UnknownActionPolicy};
use crate::stats::DayBoundary;

/// Configuration file name.
pub const CONFIG_FILE: &str = "steadfast.toml";

/// Default number of event ids remembered per user for deduplication.
pub const DEFAULT_DEDUP_WINDOW: usize = 256;

/// Upper bound for the per-user dedup window.
pub const MAX_DEDUP_WINDOW: usize = 65_536;

/// Progression engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Policies ===
    /// Handling of action kinds without a multiplier
    pub unknown_action: UnknownActionPolicy,
    /// Handling of challenge progress outside the challenge window
    pub out_of_window: OutOfWindowPolicy,

    // === Streaks ===
    /// Offset from UTC, in minutes, at which calendar days roll over
    pub day_offset_minutes: i32,

    // === Service ===
    /// Event ids remembered per user for deduplication (0 = disabled)
    pub dedup_window: usize,

    // === Catalog ===
    /// Catalog file to load instead of the built-in tables
    pub catalog_path: Option<PathBuf>,

    // === Points ===
    /// Points per unit, keyed by action kind
    pub multipliers: BTreeMap<String, u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unknown_action: UnknownActionPolicy::AwardDefault,
            out_of_window: OutOfWindowPolicy::Ignore,
            day_offset_minutes: 0,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            catalog_path: None,
            multipliers: default_multipliers(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        let max = DayBoundary::MAX_OFFSET_MINUTES;
        if !(-max..=max).contains(&self.day_offset_minutes) {
            warn!(
                "Day offset {} minutes out of range, clamping",
                self.day_offset_minutes
            );
            self.day_offset_minutes = self.day_offset_minutes.clamp(-max, max);
        }
        self.dedup_window = self.dedup_window.min(MAX_DEDUP_WINDOW);

        // Kinds left out of a partial table keep their defaults
        for (kind, multiplier) in default_multipliers() {
            self.multipliers.entry(kind).or_insert(multiplier);
        }
    }

    /// Day boundary for streaks and timeframes.
    #[must_use]
    pub fn day_boundary(&self) -> DayBoundary {
        let max = DayBoundary::MAX_OFFSET_MINUTES;
        DayBoundary::from_offset_minutes(self.day_offset_minutes.clamp(-max, max))
            .unwrap_or_default()
    }

    /// Points calculator for the configured multipliers.
    #[must_use]
    pub fn points_calculator(&self) -> PointsCalculator {
        PointsCalculator::new(self.multipliers.clone(), self.unknown_action)
    }

    /// Challenge tracker for the configured window policy.
    #[must_use]
    pub const fn challenge_tracker(&self) -> ChallengeTracker {
        ChallengeTracker::new(self.out_of_window)
    }

    /// Loads the configured catalog, or the built-in one.
    pub fn catalog(&self) -> CatalogLoadResult<Catalog> {
        match &self.catalog_path {
            Some(path) => Catalog::load_from(path),
            None => Ok(Catalog::builtin()?),
        }
    }
}
