//! Per-user cumulative statistics.
//!
//! This module provides:
//! - Lifetime counters (points, prayer minutes, verses, connections, challenges)
//! - Consecutive-day streaks with a configurable day boundary
//! - Day/week/month activity windows for time-boxed achievements
//! - Per-user achievement records, titles, badges and feature unlocks

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::achievement::AchievementRecord;
use crate::action::ActionKind;
use crate::error::{EngineError, EngineResult};
use crate::reward::{Reward, RewardKind};

// ============================================================================
// Streaks
// ============================================================================

/// Activities that keep a daily streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakKind {
    /// Daily prayer
    Prayer,
    /// Daily scripture reading
    Reading,
    /// Daily community involvement
    Community,
}

impl StreakKind {
    /// All streak kinds.
    pub const ALL: [StreakKind; 3] = [Self::Prayer, Self::Reading, Self::Community];
}

/// Current streak lengths in days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaks {
    /// Consecutive prayer days
    pub prayer: u32,
    /// Consecutive reading days
    pub reading: u32,
    /// Consecutive community days
    pub community: u32,
}

impl Streaks {
    /// Returns the streak length for a kind.
    #[must_use]
    pub const fn get(&self, kind: StreakKind) -> u32 {
        match kind {
            StreakKind::Prayer => self.prayer,
            StreakKind::Reading => self.reading,
            StreakKind::Community => self.community,
        }
    }

    fn slot(&mut self, kind: StreakKind) -> &mut u32 {
        match kind {
            StreakKind::Prayer => &mut self.prayer,
            StreakKind::Reading => &mut self.reading,
            StreakKind::Community => &mut self.community,
        }
    }
}

/// Where one calendar day ends and the next begins.
///
/// Days are computed at a fixed offset from UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DayBoundary {
    offset_minutes: i32,
}

impl DayBoundary {
    /// Largest accepted offset in minutes (±18h).
    pub const MAX_OFFSET_MINUTES: i32 = 18 * 60;

    /// Day boundary at UTC midnight.
    pub const UTC: Self = Self { offset_minutes: 0 };

    /// Creates a boundary at the given offset from UTC.
    pub fn from_offset_minutes(offset_minutes: i32) -> EngineResult<Self> {
        if offset_minutes.abs() > Self::MAX_OFFSET_MINUTES {
            return Err(EngineError::invalid(format!(
                "day boundary offset {offset_minutes} minutes is out of range"
            )));
        }
        Ok(Self { offset_minutes })
    }

    /// Offset from UTC in minutes.
    #[must_use]
    pub const fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    /// Calendar day `at` falls on.
    #[must_use]
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        match FixedOffset::east_opt(self.offset_minutes * 60) {
            Some(offset) => at.with_timezone(&offset).date_naive(),
            None => at.date_naive(),
        }
    }
}

// ============================================================================
// Timeframes and metrics
// ============================================================================

/// A recurring period that bounds a time-based achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// One calendar day
    Daily,
    /// One ISO week (Monday start)
    Weekly,
    /// One calendar month
    Monthly,
}

impl Timeframe {
    /// All timeframes.
    pub const ALL: [Timeframe; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    /// First day of the period containing `day`.
    #[must_use]
    pub fn period_start(self, day: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => day,
            Self::Weekly => day - Duration::days(i64::from(day.weekday().num_days_from_monday())),
            Self::Monthly => day.with_day(1).unwrap_or(day),
        }
    }
}

/// A numeric quantity read from [`UserStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatMetric {
    /// Cumulative points
    TotalPoints,
    /// Current level number
    Level,
    /// Minutes spent praying
    PrayerMinutes,
    /// Verses read
    VersesRead,
    /// Community members helped or connected with
    ConnectionsHelped,
    /// Challenges completed
    ChallengesCompleted,
    /// Achievements unlocked
    AchievementsUnlocked,
}

impl StatMetric {
    /// Metrics that accumulate per timeframe window.
    pub const WINDOWED: [StatMetric; 4] = [
        Self::TotalPoints,
        Self::PrayerMinutes,
        Self::VersesRead,
        Self::ConnectionsHelped,
    ];

    /// Returns whether this metric keeps timeframe windows.
    #[must_use]
    pub fn is_windowed(self) -> bool {
        Self::WINDOWED.contains(&self)
    }
}

/// Running total of one metric within the current period of a timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityWindow {
    /// Metric being accumulated
    pub metric: StatMetric,
    /// Period length
    pub timeframe: Timeframe,
    /// First day of the current period
    pub period_start: NaiveDate,
    /// Amount accumulated in the current period
    pub total: u64,
}

// ============================================================================
// UserStats
// ============================================================================

/// Cumulative progression state for one account.
///
/// Counters and `total_points` never decrease. `current_level` is derived
/// from `total_points` by the engine and is never set directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    total_points: u64,
    current_level: u32,
    prayer_minutes: u64,
    verses_read: u64,
    connections_helped: u64,
    challenges_completed: u64,
    streaks: Streaks,
    streak_days: BTreeMap<StreakKind, NaiveDate>,
    windows: Vec<ActivityWindow>,
    action_counts: BTreeMap<String, u64>,
    achievements: BTreeSet<String>,
    achievement_records: BTreeMap<String, AchievementRecord>,
    titles: BTreeSet<String>,
    current_title: Option<String>,
    badges: BTreeSet<String>,
    unlocked_features: BTreeSet<String>,
    blessings_received: u64,
}

impl Default for UserStats {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStats {
    /// Creates empty stats at level 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_points: 0,
            current_level: 1,
            prayer_minutes: 0,
            verses_read: 0,
            connections_helped: 0,
            challenges_completed: 0,
            streaks: Streaks::default(),
            streak_days: BTreeMap::new(),
            windows: Vec::new(),
            action_counts: BTreeMap::new(),
            achievements: BTreeSet::new(),
            achievement_records: BTreeMap::new(),
            titles: BTreeSet::new(),
            current_title: None,
            badges: BTreeSet::new(),
            unlocked_features: BTreeSet::new(),
            blessings_received: 0,
        }
    }

    /// Seeds the point total and its level together.
    #[must_use]
    pub(crate) const fn with_points_at_level(mut self, points: u64, level: u32) -> Self {
        self.total_points = points;
        self.current_level = level;
        self
    }

    /// Seeds the prayer-minute counter.
    #[must_use]
    pub const fn with_prayer_minutes(mut self, minutes: u64) -> Self {
        self.prayer_minutes = minutes;
        self
    }

    /// Seeds the verses-read counter.
    #[must_use]
    pub const fn with_verses_read(mut self, verses: u64) -> Self {
        self.verses_read = verses;
        self
    }

    /// Seeds the connections-helped counter.
    #[must_use]
    pub const fn with_connections_helped(mut self, connections: u64) -> Self {
        self.connections_helped = connections;
        self
    }

    /// Cumulative points.
    #[must_use]
    pub const fn total_points(&self) -> u64 {
        self.total_points
    }

    /// Current level number.
    #[must_use]
    pub const fn current_level(&self) -> u32 {
        self.current_level
    }

    /// Minutes spent praying.
    #[must_use]
    pub const fn prayer_minutes(&self) -> u64 {
        self.prayer_minutes
    }

    /// Verses read.
    #[must_use]
    pub const fn verses_read(&self) -> u64 {
        self.verses_read
    }

    /// Community members helped or connected with.
    #[must_use]
    pub const fn connections_helped(&self) -> u64 {
        self.connections_helped
    }

    /// Challenges completed.
    #[must_use]
    pub const fn challenges_completed(&self) -> u64 {
        self.challenges_completed
    }

    /// Streak lengths as of the last recorded activity.
    #[must_use]
    pub const fn streaks(&self) -> &Streaks {
        &self.streaks
    }

    /// Streak length as seen on `today`: a streak whose last activity is older
    /// than yesterday reads as 0 even before the next activity resets it.
    #[must_use]
    pub fn current_streak(&self, kind: StreakKind, today: NaiveDate) -> u32 {
        match self.streak_days.get(&kind) {
            Some(last) if *last >= today || last.succ_opt() == Some(today) => {
                self.streaks.get(kind)
            },
            _ => 0,
        }
    }

    /// Unlocked achievement ids.
    #[must_use]
    pub const fn achievements(&self) -> &BTreeSet<String> {
        &self.achievements
    }

    /// Returns whether an achievement is unlocked.
    #[must_use]
    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.contains(id)
    }

    /// Per-achievement unlock record, if one exists.
    #[must_use]
    pub fn achievement_record(&self, id: &str) -> Option<&AchievementRecord> {
        self.achievement_records.get(id)
    }

    /// Titles the user owns.
    #[must_use]
    pub const fn titles(&self) -> &BTreeSet<String> {
        &self.titles
    }

    /// Title currently displayed.
    #[must_use]
    pub fn current_title(&self) -> Option<&str> {
        self.current_title.as_deref()
    }

    /// Badges earned.
    #[must_use]
    pub const fn badges(&self) -> &BTreeSet<String> {
        &self.badges
    }

    /// Features unlocked by rewards.
    #[must_use]
    pub const fn unlocked_features(&self) -> &BTreeSet<String> {
        &self.unlocked_features
    }

    /// Blessings received.
    #[must_use]
    pub const fn blessings_received(&self) -> u64 {
        self.blessings_received
    }

    /// Number of events recorded for an action kind.
    #[must_use]
    pub fn action_count(&self, kind: &str) -> u64 {
        self.action_counts.get(kind).copied().unwrap_or(0)
    }

    /// Reads a metric.
    #[must_use]
    pub fn metric(&self, metric: StatMetric) -> u64 {
        match metric {
            StatMetric::TotalPoints => self.total_points,
            StatMetric::Level => u64::from(self.current_level),
            StatMetric::PrayerMinutes => self.prayer_minutes,
            StatMetric::VersesRead => self.verses_read,
            StatMetric::ConnectionsHelped => self.connections_helped,
            StatMetric::ChallengesCompleted => self.challenges_completed,
            StatMetric::AchievementsUnlocked => self.achievements.len() as u64,
        }
    }

    /// Amount of `metric` accumulated in the period of `timeframe` containing `day`.
    #[must_use]
    pub fn window_total(&self, metric: StatMetric, timeframe: Timeframe, day: NaiveDate) -> u64 {
        let period_start = timeframe.period_start(day);
        self.windows
            .iter()
            .find(|w| w.metric == metric && w.timeframe == timeframe)
            .filter(|w| w.period_start == period_start)
            .map_or(0, |w| w.total)
    }

    /// Switches the displayed title. Only owned titles (or none) are accepted.
    pub fn set_current_title(&mut self, title: Option<&str>) -> EngineResult<()> {
        match title {
            None => self.current_title = None,
            Some(title) if self.titles.contains(title) => {
                self.current_title = Some(title.to_string());
            },
            Some(title) => {
                return Err(EngineError::invalid(format!("title '{title}' is not owned")));
            },
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Engine-side mutation
    // ------------------------------------------------------------------------

    /// Applies one validated action: counters, tally, streaks, windows, points.
    pub(crate) fn apply_action(
        &mut self,
        kind: &str,
        magnitude: u64,
        points: u64,
        day: NaiveDate,
    ) {
        let count = self.action_counts.entry(kind.to_string()).or_insert(0);
        *count = count.saturating_add(1);

        let known = ActionKind::parse(kind);
        let counter = match known {
            Some(ActionKind::PrayerMinute) => Some(StatMetric::PrayerMinutes),
            Some(ActionKind::VerseRead) => Some(StatMetric::VersesRead),
            Some(ActionKind::CommunityHelp | ActionKind::ConnectionMade) => {
                Some(StatMetric::ConnectionsHelped)
            },
            Some(ActionKind::ChallengeComplete) => Some(StatMetric::ChallengesCompleted),
            _ => None,
        };
        if let Some(metric) = counter {
            self.add_to_counter(metric, magnitude, day);
        }

        if let Some(streak) = known.and_then(ActionKind::streak) {
            self.touch_streak(streak, day);
        }

        self.credit_points(points, day);
    }

    /// Adds points to the total and to the points windows.
    pub(crate) fn credit_points(&mut self, points: u64, day: NaiveDate) {
        if points > 0 {
            self.add_to_counter(StatMetric::TotalPoints, points, day);
        }
    }

    /// Sets the derived level.
    pub(crate) fn set_level(&mut self, level: u32) {
        self.current_level = level;
    }

    /// Marks an achievement unlocked. Returns false if it already was.
    pub(crate) fn mark_unlocked(&mut self, id: &str, at: DateTime<Utc>) -> bool {
        if !self.achievements.insert(id.to_string()) {
            return false;
        }
        self.achievement_records
            .entry(id.to_string())
            .or_default()
            .unlock(at);
        true
    }

    /// Ratchets a locked achievement's progress.
    pub(crate) fn raise_achievement_progress(&mut self, id: &str, percent: f32) {
        if self.achievements.contains(id) {
            return;
        }
        let record = self.achievement_records.entry(id.to_string()).or_default();
        record.raise_progress(percent);
    }

    /// Grants a reward.
    pub(crate) fn apply_reward(&mut self, reward: &Reward, day: NaiveDate) {
        match reward.kind {
            RewardKind::Points => self.credit_points(reward.amount, day),
            RewardKind::Badge => {
                self.badges.insert(reward.label.clone());
            },
            RewardKind::Title => {
                self.titles.insert(reward.label.clone());
            },
            RewardKind::Blessing => {
                self.blessings_received = self.blessings_received.saturating_add(1);
            },
            RewardKind::Feature => {
                self.unlocked_features.insert(reward.label.clone());
            },
        }
    }

    fn add_to_counter(&mut self, metric: StatMetric, amount: u64, day: NaiveDate) {
        let slot = match metric {
            StatMetric::TotalPoints => &mut self.total_points,
            StatMetric::PrayerMinutes => &mut self.prayer_minutes,
            StatMetric::VersesRead => &mut self.verses_read,
            StatMetric::ConnectionsHelped => &mut self.connections_helped,
            StatMetric::ChallengesCompleted => &mut self.challenges_completed,
            StatMetric::Level | StatMetric::AchievementsUnlocked => return,
        };
        *slot = slot.saturating_add(amount);

        if metric.is_windowed() {
            for timeframe in Timeframe::ALL {
                self.add_to_window(metric, timeframe, amount, day);
            }
        }
    }

    fn add_to_window(
        &mut self,
        metric: StatMetric,
        timeframe: Timeframe,
        amount: u64,
        day: NaiveDate,
    ) {
        let period_start = timeframe.period_start(day);
        match self
            .windows
            .iter_mut()
            .find(|w| w.metric == metric && w.timeframe == timeframe)
        {
            Some(window) if window.period_start == period_start => {
                window.total = window.total.saturating_add(amount);
            },
            // Late events for an older period do not roll the window back.
            Some(window) if window.period_start > period_start => {},
            Some(window) => {
                window.period_start = period_start;
                window.total = amount;
            },
            None => self.windows.push(ActivityWindow {
                metric,
                timeframe,
                period_start,
                total: amount,
            }),
        }
    }

    fn touch_streak(&mut self, kind: StreakKind, day: NaiveDate) {
        let next = match self.streak_days.get(&kind) {
            Some(last) if day <= *last => return,
            Some(last) if last.succ_opt() == Some(day) => self.streaks.get(kind).saturating_add(1),
            _ => 1,
        };
        *self.streaks.slot(kind) = next;
        self.streak_days.insert(kind, day);
    }
}
