//! Multi-user host around the progression engine.
//!
//! The engine is stateless; [`ProgressService`] owns per-user state and
//! provides what the engine leaves to its caller:
//! - One exclusive lock per user; different users proceed in parallel
//! - Deduplication of redelivered events by event id
//! - Challenge board sync and challenge rewards applied exactly once
//! - Persistence through a [`ProgressStore`]
//! - Progress events for the notification layer
//!
//! Every write runs on a copy of the user's progress, which replaces the
//! live copy only after the store accepted it.
//!
//! The event bus is bounded. Hosts must drain it (or hold a subscriber);
//! once it is full, further events are dropped with a warning while progress
//! itself is still applied and saved.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use steadfast_common::UserId;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::achievement::{AchievementStatus, UnlockedAchievement};
use crate::action::{ActionEvent, ActionKind};
use crate::catalog_loader::CatalogLoadResult;
use crate::challenge::{AdvanceOutcome, TaskAdvance};
use crate::config::{EngineConfig, DEFAULT_DEDUP_WINDOW};
use crate::engine::{LevelChange, ProgressionEngine};
use crate::error::EngineError;
use crate::events::{EventBus, ProgressEvent};
use crate::snapshot::UserProgress;
use crate::stats::UserStats;
use crate::store::{ProgressStore, StoreError};

/// Errors returned by the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The engine refused the operation
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Everything one applied action changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    /// Stats after the action
    pub stats: UserStats,
    /// Points earned by the action itself
    pub points_awarded: u64,
    /// Points from unlocks and challenge rewards
    pub bonus_points: u64,
    /// Achievements unlocked, including those triggered by completed challenges
    pub unlocked_achievements: Vec<UnlockedAchievement>,
    /// Set when the level changed
    pub level_change: Option<LevelChange>,
    /// Challenge tasks the action advanced
    pub task_advances: Vec<TaskAdvance>,
    /// Challenges the action completed
    pub completed_challenges: Vec<String>,
}

/// Result of [`ProgressService::record_action`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// The action was applied
    Applied(Box<Recorded>),
    /// The event id was already applied; nothing changed
    Duplicate,
}

impl RecordOutcome {
    /// The applied changes, unless the event was a duplicate.
    #[must_use]
    pub fn applied(&self) -> Option<&Recorded> {
        match self {
            Self::Applied(recorded) => Some(recorded),
            Self::Duplicate => None,
        }
    }
}

/// Result of [`ProgressService::advance_challenge`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeReport {
    /// Outcome of the advance
    pub outcome: AdvanceOutcome,
    /// Achievements unlocked by completing the challenge
    pub unlocked_achievements: Vec<UnlockedAchievement>,
}

/// Hosts per-user progress for many users.
pub struct ProgressService<S: ProgressStore> {
    engine: ProgressionEngine,
    store: S,
    users: DashMap<UserId, Arc<Mutex<UserProgress>>>,
    bus: EventBus,
    dedup_window: usize,
}

impl<S: ProgressStore> std::fmt::Debug for ProgressService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressService")
            .field("loaded_users", &self.users.len())
            .field("dedup_window", &self.dedup_window)
            .finish_non_exhaustive()
    }
}

impl<S: ProgressStore> ProgressService<S> {
    /// Creates a service over an engine and a store.
    #[must_use]
    pub fn new(engine: ProgressionEngine, store: S) -> Self {
        Self {
            engine,
            store,
            users: DashMap::new(),
            bus: EventBus::default(),
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }

    /// Creates a service configured by `config`.
    pub fn from_config(config: &EngineConfig, store: S) -> CatalogLoadResult<Self> {
        let engine = ProgressionEngine::from_config(config)?;
        Ok(Self::new(engine, store).with_dedup_window(config.dedup_window))
    }

    /// Sets how many event ids are remembered per user (0 disables dedup).
    #[must_use]
    pub const fn with_dedup_window(mut self, window: usize) -> Self {
        self.dedup_window = window;
        self
    }

    /// Replaces the event bus.
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    /// The engine.
    #[must_use]
    pub const fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    /// The event bus.
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// The store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn slot(&self, user: &UserId) -> ServiceResult<Arc<Mutex<UserProgress>>> {
        if let Some(slot) = self.users.get(user) {
            return Ok(Arc::clone(slot.value()));
        }

        let progress = match self.store.load(user)? {
            Some(progress) => progress,
            None => {
                debug!("Starting fresh progress for {user}");
                UserProgress::new(user.clone())
            },
        };
        let slot = self
            .users
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(progress)));
        Ok(Arc::clone(slot.value()))
    }

    /// Records one action for its actor.
    ///
    /// An event whose id was already applied returns
    /// [`RecordOutcome::Duplicate`] without changing anything.
    pub fn record_action(&self, event: &ActionEvent) -> ServiceResult<RecordOutcome> {
        let slot = self.slot(&event.actor)?;
        let mut live = slot.lock();

        if let Some(event_id) = &event.event_id {
            if live.has_seen(event_id) {
                debug!("Skipping duplicate event {event_id} for {}", event.actor);
                return Ok(RecordOutcome::Duplicate);
            }
        }

        let mut next = live.clone();
        let before = (next.stats.total_points(), next.stats.current_level());
        self.sync_board(&mut next, event.occurred_at);

        let outcome = self.engine.record_action(&next.stats, event)?;
        next.stats = outcome.updated_stats;
        let mut unlocked = outcome.unlocked_achievements;

        let task_advances = self
            .engine
            .challenge_tracker()
            .apply_action(&mut next.board, event);
        let mut completed_challenges = Vec::new();
        for advance in task_advances.iter().filter(|a| a.outcome.newly_completed) {
            let at = event.occurred_at;
            unlocked.extend(self.complete_challenge(&mut next, &advance.challenge_id, at)?);
            completed_challenges.push(advance.challenge_id.clone());
        }

        if let Some(event_id) = &event.event_id {
            next.remember(event_id.clone(), self.dedup_window);
        }

        self.store.save(&next)?;
        *live = next;

        let recorded = Recorded {
            stats: live.stats.clone(),
            points_awarded: outcome.points_awarded,
            bonus_points: live
                .stats
                .total_points()
                .saturating_sub(before.0)
                .saturating_sub(outcome.points_awarded),
            unlocked_achievements: unlocked,
            level_change: (live.stats.current_level() != before.1).then(|| LevelChange {
                from: before.1,
                to: live.stats.current_level(),
            }),
            task_advances,
            completed_challenges,
        };
        drop(live);

        self.publish_recorded(&event.actor, &event.kind, &recorded, event.occurred_at);
        Ok(RecordOutcome::Applied(Box::new(recorded)))
    }

    /// Advances one task of one of the user's challenges.
    ///
    /// Completing the challenge applies its rewards and counts it toward
    /// `challenges_completed`.
    pub fn advance_challenge(
        &self,
        user: &UserId,
        challenge_id: &str,
        task_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> ServiceResult<ChallengeReport> {
        let slot = self.slot(user)?;
        let mut live = slot.lock();

        let mut next = live.clone();
        let before_level = next.stats.current_level();
        self.sync_board(&mut next, now);

        let outcome = self
            .engine
            .challenge_tracker()
            .advance(&mut next.board, challenge_id, task_id, delta, now)?;
        let unlocked_achievements = if outcome.newly_completed {
            self.complete_challenge(&mut next, challenge_id, now)?
        } else {
            Vec::new()
        };

        self.store.save(&next)?;
        *live = next;
        let after_level = live.stats.current_level();
        let level_title = self.level_title(after_level);
        drop(live);

        if outcome.newly_completed {
            self.bus.publish(ProgressEvent::ChallengeCompleted {
                user: user.clone(),
                challenge_id: challenge_id.to_string(),
                at: now,
            });
        }
        self.publish_unlocks(user, &unlocked_achievements);
        if after_level != before_level {
            self.bus.publish(ProgressEvent::LevelUp {
                user: user.clone(),
                from: before_level,
                to: after_level,
                title: level_title,
            });
        }

        Ok(ChallengeReport {
            outcome,
            unlocked_achievements,
        })
    }

    /// Opens and archives the user's challenges as of `now`.
    pub fn sync_challenges(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> ServiceResult<UserProgress> {
        let slot = self.slot(user)?;
        let mut live = slot.lock();
        let mut next = live.clone();
        self.sync_board(&mut next, now);
        if next != *live {
            self.store.save(&next)?;
            *live = next;
        }
        Ok(live.clone())
    }

    /// Sets the displayed title. Only owned titles are accepted.
    pub fn set_current_title(&self, user: &UserId, title: Option<&str>) -> ServiceResult<()> {
        let slot = self.slot(user)?;
        let mut live = slot.lock();
        let mut next = live.clone();
        next.stats.set_current_title(title)?;
        self.store.save(&next)?;
        *live = next;
        Ok(())
    }

    /// A copy of the user's progress.
    pub fn progress(&self, user: &UserId) -> ServiceResult<UserProgress> {
        let slot = self.slot(user)?;
        let progress = slot.lock().clone();
        Ok(progress)
    }

    /// Every achievement with the user's record, in catalog order.
    pub fn achievement_overview(&self, user: &UserId) -> ServiceResult<Vec<AchievementStatus<'_>>> {
        let stats = self.progress(user)?.stats;
        Ok(self.engine.achievement_overview(&stats))
    }

    /// Drops a user's in-memory state; the next access reloads it from the store.
    pub fn evict(&self, user: &UserId) -> bool {
        self.users.remove(user).is_some()
    }

    /// Number of users held in memory.
    #[must_use]
    pub fn loaded_users(&self) -> usize {
        self.users.len()
    }

    fn sync_board(&self, progress: &mut UserProgress, now: DateTime<Utc>) {
        let report = progress.board.sync(self.engine.catalog(), now);
        if !report.opened.is_empty() || !report.archived.is_empty() {
            debug!(
                "{}: opened {:?}, archived {} challenges",
                progress.user,
                report.opened,
                report.archived.len()
            );
        }
    }

    /// Grants a completed challenge's rewards and counts the completion.
    fn complete_challenge(
        &self,
        progress: &mut UserProgress,
        challenge_id: &str,
        at: DateTime<Utc>,
    ) -> ServiceResult<Vec<UnlockedAchievement>> {
        let day = self.engine.day_boundary().day_of(at);
        match progress.board.get(challenge_id) {
            Some(challenge) => {
                for reward in &challenge.rewards {
                    progress.stats.apply_reward(reward, day);
                }
            },
            None => warn!("Completed challenge '{challenge_id}' is not on the board"),
        }

        let completion = ActionEvent::of(progress.user.clone(), ActionKind::ChallengeComplete, at);
        let outcome = self.engine.record_action(&progress.stats, &completion)?;
        progress.stats = outcome.updated_stats;
        info!("{} completed challenge '{challenge_id}'", progress.user);
        Ok(outcome.unlocked_achievements)
    }

    fn level_title(&self, level: u32) -> String {
        self.engine
            .catalog()
            .level_table()
            .get(level)
            .map(|l| l.title.clone())
            .unwrap_or_default()
    }

    fn publish_unlocks(&self, user: &UserId, unlocked: &[UnlockedAchievement]) {
        for achievement in unlocked {
            self.bus.publish(ProgressEvent::AchievementUnlocked {
                user: user.clone(),
                achievement_id: achievement.definition.id.clone(),
                name: achievement.definition.name.clone(),
                at: achievement.unlocked_at,
            });
        }
    }

    fn publish_recorded(&self, user: &UserId, kind: &str, recorded: &Recorded, at: DateTime<Utc>) {
        self.bus.publish(ProgressEvent::PointsAwarded {
            user: user.clone(),
            kind: kind.to_string(),
            points: recorded.points_awarded,
            bonus: recorded.bonus_points,
        });
        self.publish_unlocks(user, &recorded.unlocked_achievements);
        for challenge_id in &recorded.completed_challenges {
            self.bus.publish(ProgressEvent::ChallengeCompleted {
                user: user.clone(),
                challenge_id: challenge_id.clone(),
                at,
            });
        }
        if let Some(change) = recorded.level_change {
            self.bus.publish(ProgressEvent::LevelUp {
                user: user.clone(),
                from: change.from,
                to: change.to,
                title: self.level_title(change.to),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn service() -> ProgressService<MemoryStore> {
        let engine = ProgressionEngine::new(Arc::new(Catalog::builtin().expect("builtin catalog")));
        ProgressService::new(engine, MemoryStore::new())
    }

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, month, day, 8, 0, 0).single().expect("valid date")
    }

    #[test]
    fn test_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProgressService<MemoryStore>>();
    }

    #[test]
    fn test_duplicate_event_applied_once() {
        let service = service();
        let user = UserId::new("u1");
        let event = ActionEvent::new(user.clone(), "verse_read", at(6, 1))
            .with_magnitude(2)
            .with_event_id("evt-1");

        let first = service.record_action(&event).expect("record should succeed");
        assert!(first.applied().is_some());
        let second = service.record_action(&event).expect("record should succeed");
        assert_eq!(second, RecordOutcome::Duplicate);

        let progress = service.progress(&user).expect("progress");
        assert_eq!(progress.stats.verses_read(), 2);
    }

    #[test]
    fn test_state_persists_through_store() {
        let service = service();
        let user = UserId::new("u1");
        let prayer = ActionEvent::new(user.clone(), "prayer_minute", at(6, 1)).with_magnitude(5);
        service.record_action(&prayer).expect("record should succeed");

        assert!(service.evict(&user));
        assert_eq!(service.loaded_users(), 0);
        let progress = service.progress(&user).expect("progress");
        assert_eq!(progress.stats.prayer_minutes(), 5);
        assert!(progress.stats.has_achievement("first_prayer"));
    }

    #[test]
    fn test_events_published() {
        let service = service();
        let user = UserId::new("u1");
        let prayer = ActionEvent::new(user.clone(), "prayer_minute", at(6, 1)).with_magnitude(100);
        service.record_action(&prayer).expect("record should succeed");

        let events = service.event_bus().drain();
        assert!(matches!(
            events[0],
            ProgressEvent::PointsAwarded { points: 200, .. }
        ));
        let unlocked: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::AchievementUnlocked { achievement_id, .. } => {
                    Some(achievement_id.as_str())
                },
                _ => None,
            })
            .collect();
        assert!(unlocked.contains(&"prayer_warrior"));
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::LevelUp { from: 1, .. })));
    }

    #[test]
    fn test_title_must_be_owned() {
        let service = service();
        let user = UserId::new("u1");
        assert!(matches!(
            service.set_current_title(&user, Some("Prayer Warrior")),
            Err(ServiceError::Engine(EngineError::InvalidArgument(_)))
        ));

        let prayer = ActionEvent::new(user.clone(), "prayer_minute", at(6, 1)).with_magnitude(100);
        service.record_action(&prayer).expect("record should succeed");
        service
            .set_current_title(&user, Some("Prayer Warrior"))
            .expect("owned title");
        let progress = service.progress(&user).expect("progress");
        assert_eq!(progress.stats.current_title(), Some("Prayer Warrior"));
    }

    #[test]
    fn test_full_event_bus_does_not_block_progress() {
        let service = service().with_event_bus(EventBus::new(1));
        let user = UserId::new("u1");
        let prayer = ActionEvent::new(user.clone(), "prayer_minute", at(6, 1)).with_magnitude(100);

        let outcome = service.record_action(&prayer).expect("record should succeed");
        let recorded = outcome.applied().expect("applied");
        assert!(recorded.unlocked_achievements.len() > 1);
        assert_eq!(service.event_bus().pending_count(), 1);
        assert!(matches!(
            service.event_bus().drain()[0],
            ProgressEvent::PointsAwarded { points: 200, .. }
        ));

        let progress = service.progress(&user).expect("progress");
        assert_eq!(progress.stats.prayer_minutes(), 100);
        assert!(progress.stats.has_achievement("prayer_warrior"));
    }

    #[test]
    fn test_failed_action_changes_nothing() {
        let service = service();
        let user = UserId::new("u1");
        let bad = ActionEvent::new(user.clone(), "prayer_minute", at(6, 1))
            .with_magnitude(0)
            .with_event_id("evt-bad");
        assert!(service.record_action(&bad).is_err());
        let progress = service.progress(&user).expect("progress");
        assert_eq!(progress.stats, UserStats::new());
        assert_eq!(progress.remembered_events(), 0);
    }
}
