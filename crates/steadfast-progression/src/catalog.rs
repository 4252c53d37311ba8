//! Immutable reference data: level bands, achievements and challenge templates.
//!
//! A [`Catalog`] is validated once when it is built and never mutated
//! afterwards, so it can be shared freely behind an `Arc`.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::achievement::AchievementDefinition;
use crate::challenge::ChallengeTemplate;
use crate::error::{EngineError, EngineResult};
use crate::level::{Level, LevelTable};

/// Validated progression reference data.
#[derive(Debug, Clone)]
pub struct Catalog {
    levels: LevelTable,
    achievements: Vec<AchievementDefinition>,
    achievement_index: AHashMap<String, usize>,
    challenges: Vec<ChallengeTemplate>,
    challenge_index: AHashMap<String, usize>,
}

impl Catalog {
    /// Validates and builds a catalog.
    ///
    /// Fails with `InvariantViolation` on a broken level table, duplicate
    /// achievement or challenge ids, or a malformed challenge template.
    /// Malformed achievement rules are only logged; such achievements never
    /// unlock.
    pub fn new(
        levels: Vec<Level>,
        achievements: Vec<AchievementDefinition>,
        challenges: Vec<ChallengeTemplate>,
    ) -> EngineResult<Self> {
        let levels = LevelTable::new(levels)?;

        let mut achievement_index = AHashMap::with_capacity(achievements.len());
        for (idx, definition) in achievements.iter().enumerate() {
            if achievement_index.insert(definition.id.clone(), idx).is_some() {
                return Err(EngineError::invariant(format!(
                    "achievement '{}' declared twice",
                    definition.id
                )));
            }
            if let Some(defect) = definition.defect() {
                warn!("{defect}; it will never unlock");
            }
        }

        let mut challenge_index = AHashMap::with_capacity(challenges.len());
        for (idx, template) in challenges.iter().enumerate() {
            if challenge_index.insert(template.id.clone(), idx).is_some() {
                return Err(EngineError::invariant(format!(
                    "challenge '{}' declared twice",
                    template.id
                )));
            }
            let defects = template.defects();
            if !defects.is_empty() {
                return Err(EngineError::invariant(defects.join("; ")));
            }
        }

        info!(
            "Catalog ready: {} levels, {} achievements, {} challenges",
            levels.levels().len(),
            achievements.len(),
            challenges.len()
        );

        Ok(Self {
            levels,
            achievements,
            achievement_index,
            challenges,
            challenge_index,
        })
    }

    /// The built-in tables shipped with the engine.
    pub fn builtin() -> EngineResult<Self> {
        Self::new(
            crate::builtin::levels(),
            crate::builtin::achievements(),
            crate::builtin::challenges()?,
        )
    }

    /// Level bands ordered by level number.
    #[must_use]
    pub fn levels_in_order(&self) -> &[Level] {
        self.levels.levels()
    }

    /// The validated level table.
    #[must_use]
    pub const fn level_table(&self) -> &LevelTable {
        &self.levels
    }

    /// Achievements in declaration order.
    #[must_use]
    pub fn achievements(&self) -> &[AchievementDefinition] {
        &self.achievements
    }

    /// Declaration index of an achievement.
    #[must_use]
    pub fn achievement_position(&self, id: &str) -> Option<usize> {
        self.achievement_index.get(id).copied()
    }

    /// Looks up an achievement.
    pub fn achievement_by_id(&self, id: &str) -> EngineResult<&AchievementDefinition> {
        self.achievement_index
            .get(id)
            .map(|&idx| &self.achievements[idx])
            .ok_or_else(|| EngineError::not_found("achievement", id))
    }

    /// Challenge templates in declaration order.
    #[must_use]
    pub fn challenge_templates(&self) -> &[ChallengeTemplate] {
        &self.challenges
    }

    /// Looks up a challenge template.
    pub fn challenge_template_by_id(&self, id: &str) -> EngineResult<&ChallengeTemplate> {
        self.challenge_index
            .get(id)
            .map(|&idx| &self.challenges[idx])
            .ok_or_else(|| EngineError::not_found("challenge", id))
    }

    /// Templates whose window contains `at`, in declaration order.
    pub fn active_challenge_templates(
        &self,
        at: DateTime<Utc>,
    ) -> impl Iterator<Item = &ChallengeTemplate> + '_ {
        self.challenges.iter().filter(move |t| t.is_open_at(at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::{AchievementCategory, UnlockRule};
    use crate::challenge::{ChallengeCategory, Difficulty, TaskTemplate, TaskType};
    use crate::stats::StatMetric;
    use chrono::{Duration, TimeZone};

    fn levels() -> Vec<Level> {
        vec![Level::new(1, "Seeker", 0, 99), Level::top(2, "Believer", 100)]
    }

    fn achievement(id: &str) -> AchievementDefinition {
        AchievementDefinition::new(
            id,
            id,
            AchievementCategory::Prayer,
            UnlockRule::Count {
                metric: StatMetric::PrayerMinutes,
                target: 1,
            },
        )
    }

    fn lent() -> ChallengeTemplate {
        let start = Utc.with_ymd_and_hms(2027, 2, 10, 0, 0, 0).single().expect("valid date");
        ChallengeTemplate::new(
            "lent",
            "Lent",
            ChallengeCategory::Seasonal,
            Difficulty::Hard,
            start,
            start + Duration::days(40),
        )
        .with_task(TaskTemplate::new("pray", TaskType::Prayer, 400))
    }

    #[test]
    fn test_lookups() {
        let catalog = Catalog::new(levels(), vec![achievement("first")], vec![lent()])
            .expect("valid catalog");
        assert_eq!(catalog.levels_in_order().len(), 2);
        assert!(catalog.achievement_by_id("first").is_ok());
        assert!(catalog.challenge_template_by_id("lent").is_ok());
        assert_eq!(
            catalog.achievement_by_id("nope").map(|a| a.id.clone()),
            Err(EngineError::not_found("achievement", "nope"))
        );
        assert!(matches!(
            catalog.challenge_template_by_id("advent"),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_active_templates_follow_window() {
        let catalog = Catalog::new(levels(), Vec::new(), vec![lent()]).expect("valid catalog");
        let inside = Utc.with_ymd_and_hms(2027, 3, 1, 12, 0, 0).single().expect("valid date");
        let before = Utc.with_ymd_and_hms(2027, 1, 1, 12, 0, 0).single().expect("valid date");
        assert_eq!(catalog.active_challenge_templates(inside).count(), 1);
        assert_eq!(catalog.active_challenge_templates(before).count(), 0);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = Catalog::new(levels(), vec![achievement("a"), achievement("a")], Vec::new());
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));

        let result = Catalog::new(levels(), Vec::new(), vec![lent(), lent()]);
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_rejects_malformed_challenge() {
        let mut broken = lent();
        broken.tasks.clear();
        let result = Catalog::new(levels(), Vec::new(), vec![broken]);
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_malformed_achievement_is_tolerated() {
        let mut missing = achievement("missing");
        missing.rule = None;
        let catalog = Catalog::new(levels(), vec![missing], Vec::new()).expect("tolerated");
        assert_eq!(catalog.achievements().len(), 1);
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        assert!(catalog.achievement_by_id("prayer_warrior").is_ok());
        assert!(catalog.achievements().iter().all(|a| a.defect().is_none()));
        assert_eq!(catalog.level_table().resolve(0).map(|l| l.level), Ok(1));
    }
}
