//! Action-to-points conversion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::action::ActionKind;
use crate::error::{EngineError, EngineResult};

/// What to do with an action kind that has no configured multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownActionPolicy {
    /// Award a multiplier of 1
    #[default]
    AwardDefault,
    /// Return `InvalidArgument`
    Reject,
}

/// Multiplier applied to unknown kinds under [`UnknownActionPolicy::AwardDefault`].
pub const UNKNOWN_ACTION_MULTIPLIER: u64 = 1;

/// Default multiplier table keyed by action wire name.
#[must_use]
pub fn default_multipliers() -> BTreeMap<String, u64> {
    ActionKind::ALL
        .into_iter()
        .map(|kind| (kind.as_str().to_string(), kind.default_multiplier()))
        .collect()
}

/// Converts actions into point deltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsCalculator {
    multipliers: BTreeMap<String, u64>,
    unknown: UnknownActionPolicy,
}

impl Default for PointsCalculator {
    fn default() -> Self {
        Self::new(default_multipliers(), UnknownActionPolicy::default())
    }
}

impl PointsCalculator {
    /// Creates a calculator over a multiplier table.
    #[must_use]
    pub const fn new(multipliers: BTreeMap<String, u64>, unknown: UnknownActionPolicy) -> Self {
        Self {
            multipliers,
            unknown,
        }
    }

    /// Overrides one multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, kind: impl Into<String>, multiplier: u64) -> Self {
        self.multipliers.insert(kind.into(), multiplier);
        self
    }

    /// The unknown-kind policy.
    #[must_use]
    pub const fn unknown_policy(&self) -> UnknownActionPolicy {
        self.unknown
    }

    /// Multiplier for a kind, if configured.
    #[must_use]
    pub fn multiplier(&self, kind: &str) -> Option<u64> {
        self.multipliers.get(kind).copied()
    }

    /// Points for `magnitude` units of `kind`: `multiplier * magnitude`, saturating.
    pub fn compute_points(&self, kind: &str, magnitude: u64) -> EngineResult<u64> {
        let multiplier = match (self.multiplier(kind), self.unknown) {
            (Some(multiplier), _) => multiplier,
            (None, UnknownActionPolicy::AwardDefault) => {
                debug!("No multiplier for '{kind}', awarding default");
                UNKNOWN_ACTION_MULTIPLIER
            },
            (None, UnknownActionPolicy::Reject) => {
                warn!("Rejecting unknown action kind '{kind}'");
                return Err(EngineError::invalid(format!("unknown action kind '{kind}'")));
            },
        };
        Ok(multiplier.saturating_mul(magnitude))
    }

    /// Points for a single unit of `kind`.
    pub fn compute_points_once(&self, kind: &str) -> EngineResult<u64> {
        self.compute_points(kind, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_multipliers() {
        let calc = PointsCalculator::default();
        assert_eq!(calc.compute_points("prayer_minute", 2), Ok(4));
        assert_eq!(calc.compute_points("verse_read", 3), Ok(15));
        assert_eq!(calc.compute_points_once("community_help"), Ok(10));
        assert_eq!(calc.compute_points_once("challenge_complete"), Ok(25));
        assert_eq!(calc.compute_points_once("daily_checkin"), Ok(1));
    }

    #[test]
    fn test_unknown_kind_policies() {
        let permissive = PointsCalculator::default();
        assert_eq!(permissive.compute_points("fasting_hour", 4), Ok(4));

        let strict = PointsCalculator::new(default_multipliers(), UnknownActionPolicy::Reject);
        assert!(matches!(
            strict.compute_points("fasting_hour", 4),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(strict.compute_points("share", 1), Ok(3));
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let calc = PointsCalculator::default();
        assert_eq!(calc.compute_points("community_help", u64::MAX), Ok(u64::MAX));
    }

    #[test]
    fn test_override_multiplier() {
        let calc = PointsCalculator::default().with_multiplier("prayer_minute", 3);
        assert_eq!(calc.compute_points("prayer_minute", 10), Ok(30));
        assert_eq!(calc.multiplier("prayer_minute"), Some(3));
    }
}
