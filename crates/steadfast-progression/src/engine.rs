//! The progression engine: the two write paths and the read-side queries.
//!
//! [`ProgressionEngine`] is synchronous, performs no I/O and holds no mutable
//! state. Callers serialize updates per user; see
//! [`ProgressService`](crate::service::ProgressService) for a host that does.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::achievement::{AchievementEvaluator, AchievementStatus, UnlockedAchievement};
use crate::action::ActionEvent;
use crate::catalog::Catalog;
use crate::catalog_loader::CatalogLoadResult;
use crate::challenge::{Challenge, ChallengeTracker};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::level::Level;
use crate::points::PointsCalculator;
use crate::stats::{DayBoundary, UserStats};

/// A change of level caused by one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    /// Level before the action
    pub from: u32,
    /// Level after the action
    pub to: u32,
}

/// Result of [`ProgressionEngine::record_action`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Stats after the action
    pub updated_stats: UserStats,
    /// Achievements unlocked by the action, in catalog order
    pub unlocked_achievements: Vec<UnlockedAchievement>,
    /// Points earned by the action itself
    pub points_awarded: u64,
    /// Points credited by unlocks and their rewards
    pub bonus_points: u64,
    /// Set when the level changed
    pub level_change: Option<LevelChange>,
}

impl ActionOutcome {
    /// Total points gained.
    #[must_use]
    pub const fn total_points_gained(&self) -> u64 {
        self.points_awarded.saturating_add(self.bonus_points)
    }
}

/// Result of [`ProgressionEngine::advance_challenge`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeAdvance {
    /// Challenge after the advance
    pub challenge: Challenge,
    /// The advanced task is complete
    pub task_completed: bool,
    /// The challenge is complete
    pub challenge_completed: bool,
    /// The challenge became complete on this call
    pub newly_completed: bool,
}

/// Points, levels, achievements and challenges over one catalog.
#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    catalog: Arc<Catalog>,
    points: PointsCalculator,
    tracker: ChallengeTracker,
    day_boundary: DayBoundary,
}

impl ProgressionEngine {
    /// Creates an engine with default policies.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            points: PointsCalculator::default(),
            tracker: ChallengeTracker::default(),
            day_boundary: DayBoundary::UTC,
        }
    }

    /// Creates an engine with the policies of `config`.
    #[must_use]
    pub fn with_config(catalog: Arc<Catalog>, config: &EngineConfig) -> Self {
        Self {
            catalog,
            points: config.points_calculator(),
            tracker: config.challenge_tracker(),
            day_boundary: config.day_boundary(),
        }
    }

    /// Loads the configured catalog and creates an engine over it.
    pub fn from_config(config: &EngineConfig) -> CatalogLoadResult<Self> {
        let catalog = Arc::new(config.catalog()?);
        Ok(Self::with_config(catalog, config))
    }

    /// Replaces the points calculator.
    #[must_use]
    pub fn with_points_calculator(mut self, points: PointsCalculator) -> Self {
        self.points = points;
        self
    }

    /// Replaces the challenge tracker.
    #[must_use]
    pub const fn with_challenge_tracker(mut self, tracker: ChallengeTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Replaces the day boundary.
    #[must_use]
    pub const fn with_day_boundary(mut self, day_boundary: DayBoundary) -> Self {
        self.day_boundary = day_boundary;
        self
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The points calculator.
    #[must_use]
    pub const fn points_calculator(&self) -> &PointsCalculator {
        &self.points
    }

    /// The challenge tracker.
    #[must_use]
    pub const fn challenge_tracker(&self) -> &ChallengeTracker {
        &self.tracker
    }

    /// The day boundary.
    #[must_use]
    pub const fn day_boundary(&self) -> DayBoundary {
        self.day_boundary
    }

    fn evaluator(&self) -> AchievementEvaluator<'_> {
        AchievementEvaluator::new(&self.catalog, self.day_boundary)
    }

    /// Applies one action to a copy of `stats`.
    ///
    /// Computes the points, updates counters, streaks and windows, unlocks
    /// every achievement that now qualifies and re-derives the level. `stats`
    /// itself is never modified, so a failed call leaves nothing half-applied.
    pub fn record_action(
        &self,
        stats: &UserStats,
        action: &ActionEvent,
    ) -> EngineResult<ActionOutcome> {
        if let Err(e) = action.validate() {
            warn!("Rejected action from {}: {e}", action.actor);
            return Err(e);
        }
        let points_awarded = self.points.compute_points(&action.kind, action.magnitude)?;
        let day = self.day_boundary.day_of(action.occurred_at);

        let mut updated = stats.clone();
        updated.apply_action(&action.kind, action.magnitude, points_awarded, day);
        let level = self.resolve_level(updated.total_points())?.level;
        updated.set_level(level);

        let unlocked_achievements = self.evaluator().evaluate(&mut updated, action);
        let level = self.resolve_level(updated.total_points())?.level;
        updated.set_level(level);

        let bonus_points = updated
            .total_points()
            .saturating_sub(stats.total_points())
            .saturating_sub(points_awarded);
        let level_change = (level != stats.current_level()).then(|| LevelChange {
            from: stats.current_level(),
            to: level,
        });

        debug!(
            "{} recorded {} x{} (+{} points, {} unlocks)",
            action.actor,
            action.kind,
            action.magnitude,
            points_awarded,
            unlocked_achievements.len()
        );
        if let Some(change) = level_change {
            info!("{} moved from level {} to {}", action.actor, change.from, change.to);
        }

        Ok(ActionOutcome {
            updated_stats: updated,
            unlocked_achievements,
            points_awarded,
            bonus_points,
            level_change,
        })
    }

    /// Advances one task of a copy of `challenge`.
    ///
    /// Fails with `InvalidArgument` for a negative delta and `NotFound` for an
    /// unknown task; outside the challenge window the copy is returned
    /// unchanged.
    pub fn advance_challenge(
        &self,
        challenge: &Challenge,
        task_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<ChallengeAdvance> {
        let mut challenge = challenge.clone();
        let outcome = self.tracker.advance_task(&mut challenge, task_id, delta, now)?;
        Ok(ChallengeAdvance {
            challenge,
            task_completed: outcome.task_completed,
            challenge_completed: outcome.challenge_completed,
            newly_completed: outcome.newly_completed,
        })
    }

    /// Fresh stats holding `points`, at the level the table derives for them.
    pub fn seed_stats(&self, points: u64) -> EngineResult<UserStats> {
        let level = self.resolve_level(points)?.level;
        Ok(UserStats::new().with_points_at_level(points, level))
    }

    /// Level band for a point total.
    pub fn resolve_level(&self, points: u64) -> EngineResult<&Level> {
        self.catalog.level_table().resolve(points)
    }

    /// Percentage progress from `level` toward the next band.
    pub fn progress_to_next(&self, points: u64, level: u32) -> EngineResult<f32> {
        self.catalog.level_table().progress_to_next(points, level)
    }

    /// Points still needed for the next band, or `None` on the top tier.
    pub fn points_to_next(&self, points: u64) -> EngineResult<Option<u64>> {
        self.catalog.level_table().points_to_next(points)
    }

    /// Every achievement with the user's record, in catalog order.
    #[must_use]
    pub fn achievement_overview<'a>(&'a self, stats: &UserStats) -> Vec<AchievementStatus<'a>> {
        self.evaluator().overview(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use chrono::TimeZone;
    use steadfast_common::UserId;

    fn engine() -> ProgressionEngine {
        ProgressionEngine::new(Arc::new(Catalog::builtin().expect("builtin catalog")))
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 7, 0, 0).single().expect("valid date")
    }

    fn event(kind: &str, magnitude: u64) -> ActionEvent {
        ActionEvent::new(UserId::new("u1"), kind, at()).with_magnitude(magnitude)
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProgressionEngine>();
    }

    #[test]
    fn test_record_action_leaves_input_untouched() {
        let engine = engine();
        let stats = UserStats::new();
        let outcome = engine
            .record_action(&stats, &event("verse_read", 3))
            .expect("record should succeed");

        assert_eq!(stats, UserStats::new());
        assert_eq!(outcome.points_awarded, 15);
        assert_eq!(outcome.updated_stats.verses_read(), 3);
        // first_verse unlocks for 10 points
        assert_eq!(outcome.unlocked_achievements.len(), 1);
        assert_eq!(outcome.bonus_points, 10);
        assert_eq!(outcome.updated_stats.total_points(), 25);
    }

    #[test]
    fn test_prayer_warrior_from_98_minutes() {
        let engine = engine();
        let stats = UserStats::new().with_prayer_minutes(98);
        let outcome = engine
            .record_action(&stats, &event("prayer_minute", 2))
            .expect("record should succeed");

        assert_eq!(outcome.updated_stats.prayer_minutes(), 100);
        assert!(outcome
            .unlocked_achievements
            .iter()
            .any(|a| a.id() == "prayer_warrior"));
        assert!(outcome.updated_stats.titles().contains("Prayer Warrior"));
    }

    #[test]
    fn test_level_change_reported() {
        let engine = engine();
        let stats = UserStats::new();
        let outcome = engine
            .record_action(&stats, &event("community_help", 9))
            .expect("record should succeed");

        // 90 points plus helping_hand's 15 crosses into Believer
        assert_eq!(outcome.updated_stats.total_points(), 105);
        assert_eq!(outcome.updated_stats.current_level(), 2);
        assert_eq!(outcome.level_change, Some(LevelChange { from: 1, to: 2 }));
    }

    #[test]
    fn test_invalid_action_rejected() {
        let engine = engine();
        let result = engine.record_action(&UserStats::new(), &event("prayer_minute", 0));
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_advance_challenge_by_copy() {
        let engine = engine();
        let template = engine
            .catalog()
            .challenge_template_by_id("advent_2026")
            .expect("builtin challenge");
        let challenge = template.instantiate();
        let during = Utc.with_ymd_and_hms(2026, 12, 5, 9, 0, 0).single().expect("valid date");

        let advance = engine
            .advance_challenge(&challenge, "advent_service", 5, during)
            .expect("advance should succeed");
        assert!(advance.task_completed);
        assert!(!advance.challenge_completed);
        assert_eq!(challenge.tasks[2].progress, 0);
        assert_eq!(advance.challenge.tasks[2].progress, 5);

        let negative = engine.advance_challenge(&challenge, "advent_service", -2, during);
        assert!(matches!(negative, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_seeded_stats_carry_derived_level() {
        let engine = engine();
        let stats = engine.seed_stats(500).expect("seed should succeed");
        assert_eq!(stats.total_points(), 500);
        assert_eq!(stats.current_level(), 4);

        // rising_disciple reads the seeded level before any points are added
        let outcome = engine
            .record_action(&stats, &event("daily_checkin", 1))
            .expect("record should succeed");
        assert!(outcome
            .unlocked_achievements
            .iter()
            .any(|a| a.id() == "rising_disciple"));
        assert_eq!(outcome.level_change, None);
    }

    #[test]
    fn test_level_queries() {
        let engine = engine();
        assert_eq!(engine.resolve_level(0).map(|l| l.level), Ok(1));
        assert_eq!(engine.resolve_level(100).map(|l| l.level), Ok(2));
        assert_eq!(engine.progress_to_next(175, 2), Ok(50.0));
        assert_eq!(engine.points_to_next(4000), Ok(None));
        assert_eq!(engine.achievement_overview(&UserStats::new()).len(), 15);
    }
}
