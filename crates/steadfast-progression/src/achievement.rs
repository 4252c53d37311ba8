//! Achievement definitions and unlock evaluation.
//!
//! Every achievement carries an [`UnlockRule`]: a tagged variant over
//! count / streak / time / special conditions with its own target. One
//! generic interpreter evaluates all rules, so adding an achievement is a
//! catalog change rather than a code change.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::action::ActionEvent;
use crate::catalog::Catalog;
use crate::reward::Reward;
use crate::stats::{DayBoundary, StatMetric, StreakKind, Timeframe, UserStats};

// ============================================================================
// Definitions
// ============================================================================

/// Achievement grouping for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    /// Prayer milestones
    Prayer,
    /// Scripture reading milestones
    Reading,
    /// Serving and connecting with others
    Community,
    /// Consistency over consecutive days
    Consistency,
    /// Overall progression milestones
    Milestone,
    /// Challenge milestones
    Challenge,
}

/// Broad family of an unlock rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockType {
    /// A lifetime counter reaches a target
    Count,
    /// A daily streak reaches a target
    Streak,
    /// A total within a timeframe reaches a target
    Time,
    /// Any other condition
    Special,
}

/// Conditions that do not fit the count/streak/time families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum SpecialCondition {
    /// The triggering event is of this kind
    FirstAction {
        /// Action kind wire name
        kind: String,
    },
    /// A single event of this kind reaches a magnitude
    SingleAction {
        /// Action kind wire name
        kind: String,
        /// Minimum magnitude of that one event
        magnitude: u64,
    },
    /// The user reaches a level
    ReachLevel {
        /// Level number
        level: u32,
    },
    /// The user has unlocked at least this many other achievements
    AchievementsUnlocked {
        /// Required unlock count
        count: u64,
    },
    /// Every streak is at least this long
    AllStreaks {
        /// Required days per streak
        days: u32,
    },
}

/// How an achievement is earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnlockRule {
    /// Lifetime metric reaches `target`
    Count {
        /// Metric to read
        metric: StatMetric,
        /// Required value
        target: u64,
    },
    /// Streak reaches `target` days
    Streak {
        /// Streak to read
        streak: StreakKind,
        /// Required days
        target: u32,
    },
    /// Metric total within the current `timeframe` reaches `target`.
    /// Without a timeframe this reads the lifetime value.
    Time {
        /// Metric to read
        metric: StatMetric,
        /// Required amount
        target: u64,
        /// Period the amount must fall within
        #[serde(default)]
        timeframe: Option<Timeframe>,
    },
    /// Special condition
    Special(SpecialCondition),
}

impl UnlockRule {
    /// Family this rule belongs to.
    #[must_use]
    pub const fn unlock_type(&self) -> UnlockType {
        match self {
            Self::Count { .. } => UnlockType::Count,
            Self::Streak { .. } => UnlockType::Streak,
            Self::Time { .. } => UnlockType::Time,
            Self::Special(_) => UnlockType::Special,
        }
    }

    /// Numeric comparison target, where one exists.
    #[must_use]
    pub fn target(&self) -> Option<u64> {
        match self {
            Self::Count { target, .. } | Self::Time { target, .. } => Some(*target),
            Self::Streak { target, .. } => Some(u64::from(*target)),
            Self::Special(SpecialCondition::SingleAction { magnitude, .. }) => Some(*magnitude),
            Self::Special(SpecialCondition::ReachLevel { level }) => Some(u64::from(*level)),
            Self::Special(SpecialCondition::AchievementsUnlocked { count }) => Some(*count),
            Self::Special(SpecialCondition::AllStreaks { days }) => Some(u64::from(*days)),
            Self::Special(SpecialCondition::FirstAction { .. }) => None,
        }
    }

    /// Timeframe of a time rule.
    #[must_use]
    pub const fn timeframe(&self) -> Option<Timeframe> {
        match self {
            Self::Time { timeframe, .. } => *timeframe,
            _ => None,
        }
    }

    /// Current value and target the rule compares. Total and side-effect free.
    fn measure(&self, ctx: &RuleContext<'_>) -> (u64, u64) {
        match self {
            Self::Count { metric, target } => (ctx.stats.metric(*metric), *target),
            Self::Streak { streak, target } => {
                (u64::from(ctx.stats.streaks().get(*streak)), u64::from(*target))
            },
            Self::Time {
                metric,
                target,
                timeframe,
            } => {
                let value = match timeframe {
                    Some(tf) => ctx.stats.window_total(*metric, *tf, ctx.day),
                    None => ctx.stats.metric(*metric),
                };
                (value, *target)
            },
            Self::Special(condition) => condition.measure(ctx),
        }
    }

    /// Returns whether the rule holds.
    #[must_use]
    pub fn is_satisfied(&self, ctx: &RuleContext<'_>) -> bool {
        let (value, target) = self.measure(ctx);
        value >= target
    }

    /// Progress toward the target as a percentage in `[0, 100]`.
    #[must_use]
    pub fn progress(&self, ctx: &RuleContext<'_>) -> f32 {
        let (value, target) = self.measure(ctx);
        if target == 0 {
            return 100.0;
        }
        ((value as f64 / target as f64) * 100.0).clamp(0.0, 100.0) as f32
    }
}

impl SpecialCondition {
    fn measure(&self, ctx: &RuleContext<'_>) -> (u64, u64) {
        match self {
            Self::FirstAction { kind } => (u64::from(ctx.event.kind == *kind), 1),
            Self::SingleAction { kind, magnitude } => {
                let value = if ctx.event.kind == *kind {
                    ctx.event.magnitude
                } else {
                    0
                };
                (value, (*magnitude).max(1))
            },
            Self::ReachLevel { level } => {
                (u64::from(ctx.stats.current_level()), u64::from(*level))
            },
            Self::AchievementsUnlocked { count } => {
                (ctx.stats.metric(StatMetric::AchievementsUnlocked), *count)
            },
            Self::AllStreaks { days } => {
                let shortest = StreakKind::ALL
                    .into_iter()
                    .map(|kind| ctx.stats.streaks().get(kind))
                    .min()
                    .unwrap_or(0);
                (u64::from(shortest), u64::from(*days))
            },
        }
    }
}

/// Inputs a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Latest stats snapshot
    pub stats: &'a UserStats,
    /// The triggering event
    pub event: &'a ActionEvent,
    /// Calendar day of the event
    pub day: NaiveDate,
}

/// An achievement as declared in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// How to earn it
    #[serde(default)]
    pub description: String,
    /// Display category
    pub category: AchievementCategory,
    /// Declared rule family
    pub unlock_type: UnlockType,
    /// Rule to evaluate. A definition without one never unlocks.
    #[serde(default)]
    pub rule: Option<UnlockRule>,
    /// Points credited on unlock
    #[serde(default)]
    pub points: u64,
    /// Extra rewards granted on unlock
    #[serde(default)]
    pub rewards: Vec<Reward>,
}

impl AchievementDefinition {
    /// Creates a definition whose declared type follows its rule.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: AchievementCategory,
        rule: UnlockRule,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category,
            unlock_type: rule.unlock_type(),
            rule: Some(rule),
            points: 0,
            rewards: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the unlock points.
    #[must_use]
    pub const fn with_points(mut self, points: u64) -> Self {
        self.points = points;
        self
    }

    /// Adds a reward.
    #[must_use]
    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.rewards.push(reward);
        self
    }

    /// Comparison target of the rule.
    #[must_use]
    pub fn target(&self) -> Option<u64> {
        self.rule.as_ref().and_then(UnlockRule::target)
    }

    /// Timeframe of the rule.
    #[must_use]
    pub fn timeframe(&self) -> Option<Timeframe> {
        self.rule.as_ref().and_then(UnlockRule::timeframe)
    }

    /// The rule, if the definition is well formed.
    #[must_use]
    pub fn checked_rule(&self) -> Option<&UnlockRule> {
        self.rule
            .as_ref()
            .filter(|rule| rule.unlock_type() == self.unlock_type)
    }

    /// Describes why the definition is malformed, if it is.
    #[must_use]
    pub fn defect(&self) -> Option<String> {
        match &self.rule {
            None => Some(format!("achievement '{}' has no unlock rule", self.id)),
            Some(rule) if rule.unlock_type() != self.unlock_type => Some(format!(
                "achievement '{}' declares {:?} but its rule is {:?}",
                self.id,
                self.unlock_type,
                rule.unlock_type()
            )),
            Some(_) => None,
        }
    }

    /// Total points the unlock is worth, rewards included.
    #[must_use]
    pub fn total_points(&self) -> u64 {
        self.rewards
            .iter()
            .fold(self.points, |sum, r| sum.saturating_add(r.point_value()))
    }
}

// ============================================================================
// Per-user state
// ============================================================================

/// One user's state for one achievement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AchievementRecord {
    /// Whether unlocked; never reverts
    pub unlocked: bool,
    /// When it was unlocked
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Progress percentage, monotonic while locked, 100 once unlocked
    pub progress: f32,
}

impl AchievementRecord {
    /// Raises progress; never lowers it and ignores unlocked records.
    pub fn raise_progress(&mut self, percent: f32) {
        if self.unlocked {
            return;
        }
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        if percent > self.progress {
            self.progress = percent;
        }
    }

    /// Marks unlocked. The first unlock time is kept.
    pub fn unlock(&mut self, at: DateTime<Utc>) {
        if !self.unlocked {
            self.unlocked = true;
            self.unlocked_at = Some(at);
        }
        self.progress = 100.0;
    }
}

/// An achievement that unlocked during one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    /// The catalog definition
    pub definition: AchievementDefinition,
    /// Unlock time (the triggering event's time)
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockedAchievement {
    /// Achievement id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.definition.id
    }
}

/// Catalog entry joined with one user's record, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementStatus<'a> {
    /// The catalog definition
    pub definition: &'a AchievementDefinition,
    /// The user's record (default when never touched)
    pub record: AchievementRecord,
}

// ============================================================================
// Evaluator
// ============================================================================

enum Verdict<'c> {
    Unlock(&'c AchievementDefinition),
    Progress(&'c str, f32),
}

/// Evaluates catalog achievements against a user's stats.
#[derive(Debug, Clone, Copy)]
pub struct AchievementEvaluator<'c> {
    catalog: &'c Catalog,
    day_boundary: DayBoundary,
}

impl<'c> AchievementEvaluator<'c> {
    /// Creates an evaluator over a catalog.
    #[must_use]
    pub const fn new(catalog: &'c Catalog, day_boundary: DayBoundary) -> Self {
        Self {
            catalog,
            day_boundary,
        }
    }

    /// Unlocks every achievement that now qualifies and returns them.
    ///
    /// Achievements unlocked in an earlier call are never returned again.
    /// Unlock points and rewards are credited to `stats`; since that can
    /// satisfy further rules, evaluation repeats until a pass unlocks
    /// nothing. Results follow catalog declaration order across passes.
    pub fn evaluate(&self, stats: &mut UserStats, event: &ActionEvent) -> Vec<UnlockedAchievement> {
        let day = self.day_boundary.day_of(event.occurred_at);
        let mut unlocked = Vec::new();

        loop {
            let verdicts = self.judge(stats, event, day);
            let mut unlocked_this_pass = false;

            for verdict in verdicts {
                match verdict {
                    Verdict::Progress(id, percent) => stats.raise_achievement_progress(id, percent),
                    Verdict::Unlock(definition) => {
                        if !stats.mark_unlocked(&definition.id, event.occurred_at) {
                            continue;
                        }
                        stats.credit_points(definition.points, day);
                        for reward in &definition.rewards {
                            stats.apply_reward(reward, day);
                        }
                        debug!(
                            "Achievement '{}' unlocked for {} (+{} points)",
                            definition.id,
                            event.actor,
                            definition.total_points()
                        );
                        unlocked.push(UnlockedAchievement {
                            definition: definition.clone(),
                            unlocked_at: event.occurred_at,
                        });
                        unlocked_this_pass = true;
                    },
                }
            }

            if !unlocked_this_pass {
                break;
            }
            self.refresh_level(stats);
        }

        let catalog: &'c Catalog = self.catalog;
        unlocked.sort_by_key(|a| catalog.achievement_position(a.id()).unwrap_or(usize::MAX));
        unlocked
    }

    /// Judges every locked achievement against one snapshot.
    fn judge(&self, stats: &UserStats, event: &ActionEvent, day: NaiveDate) -> Vec<Verdict<'c>> {
        let catalog: &'c Catalog = self.catalog;
        let ctx = RuleContext { stats, event, day };
        let mut verdicts = Vec::new();

        for definition in catalog.achievements() {
            if stats.has_achievement(&definition.id) {
                continue;
            }
            let Some(rule) = definition.checked_rule() else {
                debug!("Skipping malformed achievement '{}'", definition.id);
                continue;
            };
            if rule.is_satisfied(&ctx) {
                verdicts.push(Verdict::Unlock(definition));
            } else {
                verdicts.push(Verdict::Progress(&definition.id, rule.progress(&ctx)));
            }
        }

        verdicts
    }

    fn refresh_level(&self, stats: &mut UserStats) {
        match self.catalog.level_table().resolve(stats.total_points()) {
            Ok(level) => stats.set_level(level.level),
            Err(e) => warn!("Level not refreshed after unlock: {e}"),
        }
    }

    /// Lists every achievement with the user's record, in declaration order.
    #[must_use]
    pub fn overview(&self, stats: &UserStats) -> Vec<AchievementStatus<'c>> {
        let catalog: &'c Catalog = self.catalog;
        catalog
            .achievements()
            .iter()
            .map(|definition| AchievementStatus {
                definition,
                record: stats
                    .achievement_record(&definition.id)
                    .copied()
                    .unwrap_or_default(),
            })
            .collect()
    }
}
