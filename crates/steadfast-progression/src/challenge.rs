//! Time-boxed challenges and task progress.
//!
//! This module provides:
//! - Challenge templates (catalog) and per-user challenge instances
//! - The Pending → Active → Completed | Expired state machine
//! - A tracker that ratchets task progress and derives completion
//! - A per-user board that opens and archives challenges by date

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::action::ActionEvent;
use crate::catalog::Catalog;
use crate::error::{EngineError, EngineResult};
use crate::reward::Reward;

/// Activity a challenge task counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Prayer minutes
    Prayer,
    /// Verses read
    Reading,
    /// Community help
    Service,
    /// New connections
    Connection,
    /// Shares
    Sharing,
}

/// Challenge grouping for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeCategory {
    /// Devotional challenges
    Devotion,
    /// Scripture challenges
    Scripture,
    /// Community challenges
    Community,
    /// Seasonal events
    Seasonal,
}

/// Challenge difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Suitable for everyone
    Easy,
    /// Requires steady effort
    Medium,
    /// Requires dedication
    Hard,
}

/// Lifecycle state of a challenge at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// Window not yet open
    Pending,
    /// Window open, tasks may progress
    Active,
    /// All tasks done (terminal)
    Completed,
    /// Window closed before all tasks were done (terminal)
    Expired,
}

impl ChallengeStatus {
    /// Returns whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }
}

/// What to do when progress arrives outside a challenge's window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfWindowPolicy {
    /// Silently ignore; late events are an expected race
    #[default]
    Ignore,
    /// Return `InvalidArgument`
    Reject,
}

// ============================================================================
// Templates
// ============================================================================

/// A task as declared in a challenge template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Task id, unique within its challenge
    pub id: String,
    /// Activity counted
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Amount required
    pub target: u64,
    /// Display text
    #[serde(default)]
    pub description: String,
}

impl TaskTemplate {
    /// Creates a task template.
    #[must_use]
    pub fn new(id: impl Into<String>, task_type: TaskType, target: u64) -> Self {
        Self {
            id: id.into(),
            task_type,
            target,
            description: String::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A challenge as declared in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTemplate {
    /// Unique identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Display description
    #[serde(default)]
    pub description: String,
    /// Display category
    pub category: ChallengeCategory,
    /// Difficulty
    pub difficulty: Difficulty,
    /// Window start (inclusive)
    pub start_date: DateTime<Utc>,
    /// Window end (inclusive)
    pub end_date: DateTime<Utc>,
    /// Tasks to complete
    pub tasks: Vec<TaskTemplate>,
    /// Rewards on completion
    #[serde(default)]
    pub rewards: Vec<Reward>,
}

impl ChallengeTemplate {
    /// Creates a template without tasks.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: ChallengeCategory,
        difficulty: Difficulty,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category,
            difficulty,
            start_date,
            end_date,
            tasks: Vec::new(),
            rewards: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a task.
    #[must_use]
    pub fn with_task(mut self, task: TaskTemplate) -> Self {
        self.tasks.push(task);
        self
    }

    /// Adds a reward.
    #[must_use]
    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.rewards.push(reward);
        self
    }

    /// Returns whether `at` falls in the window.
    #[must_use]
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }

    /// Structural problems, if any. An empty list means the template is valid.
    #[must_use]
    pub fn defects(&self) -> Vec<String> {
        let mut defects = Vec::new();
        if self.start_date > self.end_date {
            defects.push(format!("challenge '{}' ends before it starts", self.id));
        }
        if self.tasks.is_empty() {
            defects.push(format!("challenge '{}' has no tasks", self.id));
        }
        for (i, task) in self.tasks.iter().enumerate() {
            if task.target == 0 {
                defects.push(format!(
                    "challenge '{}' task '{}' has zero target",
                    self.id, task.id
                ));
            }
            if self.tasks[..i].iter().any(|t| t.id == task.id) {
                defects.push(format!(
                    "challenge '{}' declares task '{}' twice",
                    self.id, task.id
                ));
            }
        }
        defects
    }

    /// Creates a fresh per-user instance.
    #[must_use]
    pub fn instantiate(&self) -> Challenge {
        let mut challenge = Challenge {
            id: self.id.clone(),
            title: self.title.clone(),
            category: self.category,
            difficulty: self.difficulty,
            start_date: self.start_date,
            end_date: self.end_date,
            tasks: self
                .tasks
                .iter()
                .map(|t| ChallengeTask {
                    id: t.id.clone(),
                    task_type: t.task_type,
                    description: t.description.clone(),
                    target: t.target,
                    progress: 0,
                    completed: false,
                })
                .collect(),
            rewards: self.rewards.clone(),
            completed: false,
            progress: 0.0,
        };
        challenge.recompute();
        challenge
    }
}

// ============================================================================
// Instances
// ============================================================================

/// One task within a user's challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTask {
    /// Task id
    pub id: String,
    /// Activity counted
    pub task_type: TaskType,
    /// Display text
    pub description: String,
    /// Amount required
    pub target: u64,
    /// Amount done, clamped to `target`
    pub progress: u64,
    /// `progress >= target`
    pub completed: bool,
}

impl ChallengeTask {
    fn add_progress(&mut self, delta: u64) {
        self.progress = self.progress.saturating_add(delta).min(self.target);
        self.completed = self.progress >= self.target;
    }
}

/// A user's instance of a challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Template id
    pub id: String,
    /// Display title
    pub title: String,
    /// Display category
    pub category: ChallengeCategory,
    /// Difficulty
    pub difficulty: Difficulty,
    /// Window start (inclusive)
    pub start_date: DateTime<Utc>,
    /// Window end (inclusive)
    pub end_date: DateTime<Utc>,
    /// Tasks
    pub tasks: Vec<ChallengeTask>,
    /// Rewards on completion
    pub rewards: Vec<Reward>,
    /// Every task completed
    pub completed: bool,
    /// Percentage of completed tasks
    pub progress: f32,
}

impl Challenge {
    /// Returns whether `at` falls in the window.
    #[must_use]
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }

    /// Lifecycle state at `at`.
    #[must_use]
    pub fn status_at(&self, at: DateTime<Utc>) -> ChallengeStatus {
        if self.completed {
            ChallengeStatus::Completed
        } else if at < self.start_date {
            ChallengeStatus::Pending
        } else if at > self.end_date {
            ChallengeStatus::Expired
        } else {
            ChallengeStatus::Active
        }
    }

    /// Finds a task.
    #[must_use]
    pub fn task(&self, task_id: &str) -> Option<&ChallengeTask> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Number of completed tasks.
    #[must_use]
    pub fn completed_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Advances one task under the default out-of-window policy.
    ///
    /// See [`ChallengeTracker::advance_task`].
    pub fn advance(
        &mut self,
        task_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<AdvanceOutcome> {
        ChallengeTracker::default().advance_task(self, task_id, delta, now)
    }

    /// Re-derives `progress` and `completed` from the tasks.
    pub fn recompute(&mut self) {
        let total = self.tasks.len();
        let done = self.completed_task_count();
        self.completed = done == total;
        self.progress = if total == 0 {
            100.0
        } else {
            (done as f64 / total as f64 * 100.0) as f32
        };
    }
}

/// Result of one advance call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    /// The advanced task is complete
    pub task_completed: bool,
    /// The whole challenge is complete
    pub challenge_completed: bool,
    /// The challenge became complete on this call
    pub newly_completed: bool,
}

impl AdvanceOutcome {
    /// Outcome of an advance that changed nothing.
    pub const IGNORED: Self = Self {
        task_completed: false,
        challenge_completed: false,
        newly_completed: false,
    };
}

/// A task advanced by an action event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAdvance {
    /// Challenge id
    pub challenge_id: String,
    /// Task id
    pub task_id: String,
    /// Result of the advance
    pub outcome: AdvanceOutcome,
}

// ============================================================================
// Tracker
// ============================================================================

/// Advances challenge tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChallengeTracker {
    out_of_window: OutOfWindowPolicy,
}

impl ChallengeTracker {
    /// Creates a tracker with the given out-of-window policy.
    #[must_use]
    pub const fn new(out_of_window: OutOfWindowPolicy) -> Self {
        Self { out_of_window }
    }

    /// Advances one task of one challenge by `delta`.
    ///
    /// Negative deltas are rejected and leave the challenge untouched. An
    /// unknown task id fails with `NotFound`. Outside the window the call is
    /// a no-op under [`OutOfWindowPolicy::Ignore`].
    pub fn advance_task(
        &self,
        challenge: &mut Challenge,
        task_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<AdvanceOutcome> {
        let Ok(delta) = u64::try_from(delta) else {
            return Err(EngineError::invalid(format!(
                "challenge progress only moves forward (delta {delta})"
            )));
        };

        let idx = challenge
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| {
                EngineError::not_found("challenge task", format!("{}/{task_id}", challenge.id))
            })?;

        if !challenge.is_open_at(now) {
            return self.outside_window(&challenge.id, challenge.status_at(now), now);
        }

        let was_completed = challenge.completed;
        challenge.tasks[idx].add_progress(delta);
        challenge.recompute();

        let outcome = AdvanceOutcome {
            task_completed: challenge.tasks[idx].completed,
            challenge_completed: challenge.completed,
            newly_completed: challenge.completed && !was_completed,
        };
        if outcome.newly_completed {
            info!("Challenge '{}' completed", challenge.id);
        }
        Ok(outcome)
    }

    fn outside_window(
        &self,
        challenge_id: &str,
        status: ChallengeStatus,
        now: DateTime<Utc>,
    ) -> EngineResult<AdvanceOutcome> {
        match self.out_of_window {
            OutOfWindowPolicy::Ignore => {
                debug!("Ignoring progress for '{challenge_id}' outside its window ({status:?})");
                Ok(AdvanceOutcome::IGNORED)
            },
            OutOfWindowPolicy::Reject => Err(EngineError::invalid(format!(
                "challenge '{challenge_id}' is not open at {now}"
            ))),
        }
    }

    /// Advances a task on a board by challenge id.
    ///
    /// An archived challenge is treated as outside its window.
    pub fn advance(
        &self,
        board: &mut ChallengeBoard,
        challenge_id: &str,
        task_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<AdvanceOutcome> {
        if delta < 0 {
            return Err(EngineError::invalid(format!(
                "challenge progress only moves forward (delta {delta})"
            )));
        }
        if let Some(challenge) = board.get_mut(challenge_id) {
            return self.advance_task(challenge, task_id, delta, now);
        }
        match board.archived.iter().find(|a| a.id == challenge_id) {
            Some(archived) => {
                let status = archived.status;
                self.outside_window(challenge_id, status, now)
            },
            None => Err(EngineError::not_found("challenge", challenge_id)),
        }
    }

    /// Advances every open, incomplete task whose type matches the event.
    ///
    /// A failure on one task is logged and does not stop the others.
    pub fn apply_action(
        &self,
        board: &mut ChallengeBoard,
        event: &ActionEvent,
    ) -> Vec<TaskAdvance> {
        let Some(task_type) = event.known_kind().and_then(|k| k.task_type()) else {
            return Vec::new();
        };
        let delta = i64::try_from(event.magnitude).unwrap_or(i64::MAX);
        let mut advances = Vec::new();

        for challenge in &mut board.active {
            if !challenge.is_open_at(event.occurred_at) || challenge.completed {
                continue;
            }
            let matching: Vec<String> = challenge
                .tasks
                .iter()
                .filter(|t| t.task_type == task_type && !t.completed)
                .map(|t| t.id.clone())
                .collect();

            for task_id in matching {
                match self.advance_task(challenge, &task_id, delta, event.occurred_at) {
                    Ok(outcome) => advances.push(TaskAdvance {
                        challenge_id: challenge.id.clone(),
                        task_id,
                        outcome,
                    }),
                    Err(e) => warn!("Task '{}/{}' not advanced: {e}", challenge.id, task_id),
                }
            }
        }

        advances
    }
}

// ============================================================================
// Board
// ============================================================================

/// A challenge whose window has closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedChallenge {
    /// Challenge id
    pub id: String,
    /// Terminal status
    pub status: ChallengeStatus,
    /// Final progress percentage
    pub progress: f32,
    /// When it was archived
    pub archived_at: DateTime<Utc>,
}

/// Changes made by [`ChallengeBoard::sync`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Challenges opened
    pub opened: Vec<String>,
    /// Challenges archived
    pub archived: Vec<ArchivedChallenge>,
}

/// One user's challenges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChallengeBoard {
    active: Vec<Challenge>,
    archived: Vec<ArchivedChallenge>,
}

impl ChallengeBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Challenges whose window has not closed.
    #[must_use]
    pub fn active(&self) -> &[Challenge] {
        &self.active
    }

    /// Challenges whose window has closed.
    #[must_use]
    pub fn archived(&self) -> &[ArchivedChallenge] {
        &self.archived
    }

    /// Finds an active challenge.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Challenge> {
        self.active.iter().find(|c| c.id == id)
    }

    /// Finds an active challenge mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Challenge> {
        self.active.iter_mut().find(|c| c.id == id)
    }

    /// Adds a challenge instance. Fails if the id is already on the board.
    pub fn insert(&mut self, challenge: Challenge) -> EngineResult<()> {
        if self.knows(&challenge.id) {
            return Err(EngineError::invalid(format!(
                "challenge '{}' is already on the board",
                challenge.id
            )));
        }
        self.active.push(challenge);
        Ok(())
    }

    /// Advances a task by challenge id under the default out-of-window policy.
    pub fn advance(
        &mut self,
        challenge_id: &str,
        task_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<AdvanceOutcome> {
        ChallengeTracker::default().advance(self, challenge_id, task_id, delta, now)
    }

    /// Advances matching tasks under the default out-of-window policy.
    pub fn apply_action(&mut self, event: &ActionEvent) -> Vec<TaskAdvance> {
        ChallengeTracker::default().apply_action(self, event)
    }

    fn knows(&self, id: &str) -> bool {
        self.active.iter().any(|c| c.id == id) || self.archived.iter().any(|a| a.id == id)
    }

    /// Opens catalog challenges whose window contains `now` and archives
    /// challenges whose window has closed. Archived challenges never reopen.
    pub fn sync(&mut self, catalog: &Catalog, now: DateTime<Utc>) -> SyncReport {
        let mut report = SyncReport::default();

        let (closed, still_open): (Vec<Challenge>, Vec<Challenge>) =
            std::mem::take(&mut self.active)
                .into_iter()
                .partition(|c| now > c.end_date);
        self.active = still_open;

        for challenge in closed {
            let archived = ArchivedChallenge {
                id: challenge.id.clone(),
                status: challenge.status_at(now),
                progress: challenge.progress,
                archived_at: now,
            };
            debug!("Archiving challenge '{}' as {:?}", archived.id, archived.status);
            self.archived.push(archived.clone());
            report.archived.push(archived);
        }

        for template in catalog.active_challenge_templates(now) {
            if self.knows(&template.id) {
                continue;
            }
            self.active.push(template.instantiate());
            report.opened.push(template.id.clone());
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use steadfast_common::UserId;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).single().expect("valid date")
    }

    fn end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 12, 24, 23, 59, 59).single().expect("valid date")
    }

    fn two_task_template() -> ChallengeTemplate {
        ChallengeTemplate::new(
            "advent",
            "Advent Devotion",
            ChallengeCategory::Seasonal,
            Difficulty::Medium,
            start(),
            end(),
        )
        .with_task(TaskTemplate::new("pray", TaskType::Prayer, 1))
        .with_task(TaskTemplate::new("read", TaskType::Reading, 1))
    }

    fn during() -> DateTime<Utc> {
        start() + Duration::days(3)
    }

    #[test]
    fn test_two_tasks_complete_challenge() {
        let tracker = ChallengeTracker::default();
        let mut challenge = two_task_template().instantiate();

        let first = tracker
            .advance_task(&mut challenge, "pray", 1, during())
            .expect("advance should succeed");
        assert!(first.task_completed);
        assert!(!first.challenge_completed);
        assert!((challenge.progress - 50.0).abs() < f32::EPSILON);

        let second = tracker
            .advance_task(&mut challenge, "read", 1, during())
            .expect("advance should succeed");
        assert!(second.challenge_completed);
        assert!(second.newly_completed);
        assert!((challenge.progress - 100.0).abs() < f32::EPSILON);
        assert_eq!(challenge.status_at(during()), ChallengeStatus::Completed);

        // Already complete: no second transition
        let again = tracker
            .advance_task(&mut challenge, "read", 1, during())
            .expect("advance should succeed");
        assert!(again.challenge_completed);
        assert!(!again.newly_completed);
    }

    #[test]
    fn test_progress_clamps_to_target() {
        let tracker = ChallengeTracker::default();
        let template = ChallengeTemplate::new(
            "psalms",
            "Psalms",
            ChallengeCategory::Scripture,
            Difficulty::Easy,
            start(),
            end(),
        )
        .with_task(TaskTemplate::new("verses", TaskType::Reading, 10));
        let mut challenge = template.instantiate();

        let outcome = tracker
            .advance_task(&mut challenge, "verses", 25, during())
            .expect("advance should succeed");
        assert!(outcome.task_completed);
        assert_eq!(challenge.tasks[0].progress, 10);
    }

    #[test]
    fn test_negative_delta_rejected_without_mutation() {
        let tracker = ChallengeTracker::default();
        let mut challenge = two_task_template().instantiate();
        let before = challenge.clone();

        let result = tracker.advance_task(&mut challenge, "pray", -1, during());
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
        assert_eq!(challenge, before);
    }

    #[test]
    fn test_unknown_task_not_found() {
        let tracker = ChallengeTracker::default();
        let mut challenge = two_task_template().instantiate();
        let result = tracker.advance_task(&mut challenge, "fast", 1, during());
        assert!(matches!(result, Err(EngineError::NotFound { .. })));
    }

    #[test]
    fn test_out_of_window_is_noop() {
        let tracker = ChallengeTracker::default();
        let mut challenge = two_task_template().instantiate();
        let before = challenge.clone();

        let late = end() + Duration::seconds(1);
        let outcome = tracker
            .advance_task(&mut challenge, "pray", 1, late)
            .expect("late progress is not an error");
        assert_eq!(outcome, AdvanceOutcome::IGNORED);
        assert_eq!(challenge, before);
        assert_eq!(challenge.status_at(late), ChallengeStatus::Expired);

        let early = start() - Duration::seconds(1);
        assert_eq!(challenge.status_at(early), ChallengeStatus::Pending);
        let outcome = tracker
            .advance_task(&mut challenge, "pray", 1, early)
            .expect("early progress is not an error");
        assert_eq!(outcome, AdvanceOutcome::IGNORED);
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        let tracker = ChallengeTracker::default();
        let mut challenge = two_task_template().instantiate();
        let outcome = tracker
            .advance_task(&mut challenge, "pray", 1, start())
            .expect("advance should succeed");
        assert!(outcome.task_completed);
        let outcome = tracker
            .advance_task(&mut challenge, "read", 1, end())
            .expect("advance should succeed");
        assert!(outcome.challenge_completed);
    }

    #[test]
    fn test_reject_policy() {
        let tracker = ChallengeTracker::new(OutOfWindowPolicy::Reject);
        let mut challenge = two_task_template().instantiate();
        let result = tracker.advance_task(&mut challenge, "pray", 1, end() + Duration::days(1));
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_template_defects() {
        assert!(two_task_template().defects().is_empty());

        let empty = ChallengeTemplate::new(
            "empty",
            "Empty",
            ChallengeCategory::Devotion,
            Difficulty::Easy,
            end(),
            start(),
        );
        assert_eq!(empty.defects().len(), 2);

        let dup = two_task_template().with_task(TaskTemplate::new("pray", TaskType::Prayer, 0));
        assert_eq!(dup.defects().len(), 2);
    }

    #[test]
    fn test_apply_action_advances_matching_tasks() {
        let tracker = ChallengeTracker::default();
        let mut board = ChallengeBoard::new();
        board
            .insert(two_task_template().instantiate())
            .expect("insert should succeed");

        let event = ActionEvent::new(UserId::new("u1"), "prayer_minute", during()).with_magnitude(5);
        let advances = tracker.apply_action(&mut board, &event);
        assert_eq!(advances.len(), 1);
        assert_eq!(advances[0].task_id, "pray");
        assert!(advances[0].outcome.task_completed);

        // Completed tasks are not advanced again
        assert!(tracker.apply_action(&mut board, &event).is_empty());

        let unrelated = ActionEvent::new(UserId::new("u1"), "daily_checkin", during());
        assert!(tracker.apply_action(&mut board, &unrelated).is_empty());
    }

    #[test]
    fn test_board_advance_unknown_challenge() {
        let tracker = ChallengeTracker::default();
        let mut board = ChallengeBoard::new();
        let result = tracker.advance(&mut board, "lent", "pray", 1, during());
        assert!(matches!(result, Err(EngineError::NotFound { kind: "challenge", .. })));
    }

    #[test]
    fn test_archived_challenge_is_outside_window() {
        let catalog = Catalog::new(
            vec![crate::level::Level::top(1, "Seeker", 0)],
            Vec::new(),
            vec![two_task_template()],
        )
        .expect("valid catalog");
        let mut board = ChallengeBoard::new();

        let report = board.sync(&catalog, during());
        assert_eq!(report.opened, vec!["advent".to_string()]);
        // Syncing again opens nothing new
        assert!(board.sync(&catalog, during()).opened.is_empty());

        let after = end() + Duration::days(1);
        let report = board.sync(&catalog, after);
        assert_eq!(report.archived.len(), 1);
        assert_eq!(report.archived[0].status, ChallengeStatus::Expired);
        assert!(board.active().is_empty());

        let outcome = board
            .advance("advent", "pray", 1, after)
            .expect("archived progress is ignored");
        assert_eq!(outcome, AdvanceOutcome::IGNORED);

        let strict = ChallengeTracker::new(OutOfWindowPolicy::Reject);
        assert!(strict.advance(&mut board, "advent", "pray", 1, after).is_err());
        assert!(matches!(
            board.advance("advent", "pray", -1, after),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_board_rejects_duplicate_insert() {
        let mut board = ChallengeBoard::new();
        board
            .insert(two_task_template().instantiate())
            .expect("insert should succeed");
        assert!(board.insert(two_task_template().instantiate()).is_err());
    }
}
