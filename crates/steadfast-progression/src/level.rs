//! Level bands and point-total resolution.
//!
//! A [`LevelTable`] is validated once on construction: its bands partition the
//! non-negative integers, so every point total resolves to exactly one level.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A named tier covering an inclusive point range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Level number (1-based)
    pub level: u32,
    /// Display title
    pub title: String,
    /// Lowest point total in this band
    pub min_points: u64,
    /// Highest point total in this band; `None` for the unbounded top tier
    #[serde(default)]
    pub max_points: Option<u64>,
    /// Perks granted while at this level
    #[serde(default)]
    pub unlocked_perks: Vec<String>,
}

impl Level {
    /// Creates a bounded level band.
    #[must_use]
    pub fn new(level: u32, title: impl Into<String>, min_points: u64, max_points: u64) -> Self {
        Self {
            level,
            title: title.into(),
            min_points,
            max_points: Some(max_points),
            unlocked_perks: Vec::new(),
        }
    }

    /// Creates the unbounded top band.
    #[must_use]
    pub fn top(level: u32, title: impl Into<String>, min_points: u64) -> Self {
        Self {
            level,
            title: title.into(),
            min_points,
            max_points: None,
            unlocked_perks: Vec::new(),
        }
    }

    /// Adds a perk.
    #[must_use]
    pub fn with_perk(mut self, perk: impl Into<String>) -> Self {
        self.unlocked_perks.push(perk.into());
        self
    }

    /// Returns whether `points` falls inside this band.
    #[must_use]
    pub fn contains(&self, points: u64) -> bool {
        points >= self.min_points && self.max_points.map_or(true, |max| points <= max)
    }
}

/// Ordered, validated level bands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    levels: Vec<Level>,
}

impl LevelTable {
    /// Validates and builds a table. Bands are ordered by level number.
    ///
    /// Fails with `InvariantViolation` unless the bands start at 0, are
    /// contiguous and non-overlapping, and only the last one is unbounded.
    pub fn new(mut levels: Vec<Level>) -> EngineResult<Self> {
        if levels.is_empty() {
            return Err(EngineError::invariant("level table is empty"));
        }
        levels.sort_by_key(|l| l.level);

        let first = &levels[0];
        if first.min_points != 0 {
            return Err(EngineError::invariant(format!(
                "level {} starts at {} instead of 0",
                first.level, first.min_points
            )));
        }

        for pair in levels.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            if current.level == next.level {
                return Err(EngineError::invariant(format!(
                    "level {} declared twice",
                    current.level
                )));
            }
            let Some(max) = current.max_points else {
                return Err(EngineError::invariant(format!(
                    "level {} is unbounded but is not the top tier",
                    current.level
                )));
            };
            if max < current.min_points {
                return Err(EngineError::invariant(format!(
                    "level {} has max {} below min {}",
                    current.level, max, current.min_points
                )));
            }
            if max.checked_add(1) != Some(next.min_points) {
                return Err(EngineError::invariant(format!(
                    "levels {} and {} are not contiguous ({} then {})",
                    current.level, next.level, max, next.min_points
                )));
            }
        }

        let top = &levels[levels.len() - 1];
        if let Some(max) = top.max_points {
            return Err(EngineError::invariant(format!(
                "top level {} is capped at {}; points above it would match no level",
                top.level, max
            )));
        }

        Ok(Self { levels })
    }

    /// Returns the bands in level order.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Returns the band for a level number.
    pub fn get(&self, level: u32) -> EngineResult<&Level> {
        self.levels
            .binary_search_by_key(&level, |l| l.level)
            .map(|idx| &self.levels[idx])
            .map_err(|_| EngineError::not_found("level", level.to_string()))
    }

    /// Returns the band following `level`, if any.
    #[must_use]
    pub fn next_after(&self, level: u32) -> Option<&Level> {
        let idx = self.levels.partition_point(|l| l.level <= level);
        self.levels.get(idx)
    }

    /// Resolves a point total to its band.
    pub fn resolve(&self, points: u64) -> EngineResult<&Level> {
        let idx = self.levels.partition_point(|l| l.min_points <= points);
        idx.checked_sub(1)
            .and_then(|i| self.levels.get(i))
            .filter(|l| l.contains(points))
            .ok_or_else(|| EngineError::invariant(format!("no level covers {points} points")))
    }

    /// Percentage progress from `level` toward the next band.
    ///
    /// Saturates at 100 on the top tier and is clamped to `[0, 100]`.
    pub fn progress_to_next(&self, points: u64, level: u32) -> EngineResult<f32> {
        let current = self.get(level)?;
        let Some(next) = self.next_after(level) else {
            return Ok(100.0);
        };

        let span = next.min_points.saturating_sub(current.min_points);
        if span == 0 {
            return Ok(100.0);
        }
        let gained = points.saturating_sub(current.min_points);
        let percent = gained as f64 / span as f64 * 100.0;
        Ok(percent.clamp(0.0, 100.0) as f32)
    }

    /// Points still needed to reach the next band, or `None` on the top tier.
    pub fn points_to_next(&self, points: u64) -> EngineResult<Option<u64>> {
        let current = self.resolve(points)?;
        Ok(self
            .next_after(current.level)
            .map(|next| next.min_points.saturating_sub(points)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LevelTable {
        LevelTable::new(vec![
            Level::new(1, "Seeker", 0, 99),
            Level::new(2, "Believer", 100, 249),
            Level::top(3, "Disciple", 250).with_perk("custom_title"),
        ])
        .expect("valid table")
    }

    #[test]
    fn test_resolve_band_edges() {
        let table = table();
        assert_eq!(table.resolve(0).map(|l| l.level), Ok(1));
        assert_eq!(table.resolve(99).map(|l| l.level), Ok(1));
        assert_eq!(table.resolve(100).map(|l| l.level), Ok(2));
        assert_eq!(table.resolve(249).map(|l| l.level), Ok(2));
        assert_eq!(table.resolve(250).map(|l| l.level), Ok(3));
        assert_eq!(table.resolve(u64::MAX).map(|l| l.level), Ok(3));
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let table = LevelTable::new(vec![
            Level::top(2, "Believer", 100),
            Level::new(1, "Seeker", 0, 99),
        ])
        .expect("valid table");
        assert_eq!(table.levels()[0].level, 1);
    }

    #[test]
    fn test_rejects_gap() {
        let result = LevelTable::new(vec![
            Level::new(1, "Seeker", 0, 99),
            Level::top(2, "Believer", 101),
        ]);
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_rejects_overlap() {
        let result = LevelTable::new(vec![
            Level::new(1, "Seeker", 0, 100),
            Level::top(2, "Believer", 100),
        ]);
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_rejects_nonzero_start_and_capped_top() {
        let late_start = LevelTable::new(vec![Level::top(1, "Seeker", 10)]);
        assert!(matches!(late_start, Err(EngineError::InvariantViolation(_))));

        let capped = LevelTable::new(vec![Level::new(1, "Seeker", 0, 99)]);
        assert!(matches!(capped, Err(EngineError::InvariantViolation(_))));

        let empty = LevelTable::new(Vec::new());
        assert!(matches!(empty, Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_rejects_unbounded_middle_and_duplicates() {
        let middle = LevelTable::new(vec![
            Level::top(1, "Seeker", 0),
            Level::top(2, "Believer", 100),
        ]);
        assert!(matches!(middle, Err(EngineError::InvariantViolation(_))));

        let duplicate = LevelTable::new(vec![
            Level::new(1, "Seeker", 0, 99),
            Level::top(1, "Again", 100),
        ]);
        assert!(matches!(duplicate, Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_progress_to_next() {
        let table = table();
        assert_eq!(table.progress_to_next(0, 1), Ok(0.0));
        assert_eq!(table.progress_to_next(50, 1), Ok(50.0));
        assert_eq!(table.progress_to_next(175, 2), Ok(50.0));
        // Top tier saturates
        assert_eq!(table.progress_to_next(10_000, 3), Ok(100.0));
        // Points past the band clamp instead of overflowing
        assert_eq!(table.progress_to_next(500, 1), Ok(100.0));
        assert!(matches!(
            table.progress_to_next(0, 9),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_points_to_next() {
        let table = table();
        assert_eq!(table.points_to_next(40), Ok(Some(60)));
        assert_eq!(table.points_to_next(300), Ok(None));
    }
}
