//! Per-user progress records and their binary snapshots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use steadfast_common::{
    decode_framed, encode_framed, EventId, FrameError, MagicBytes, SchemaVersion, UserId,
};
use thiserror::Error;

use crate::challenge::ChallengeBoard;
use crate::stats::UserStats;

/// Errors that can occur while encoding or decoding a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Frame header or payload was rejected
    #[error("Snapshot frame error: {0}")]
    Frame(#[from] FrameError),

    /// Snapshot belongs to another user
    #[error("Snapshot belongs to {actual}, expected {expected}")]
    WrongUser {
        /// User requested
        expected: UserId,
        /// User found in the snapshot
        actual: UserId,
    },
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Everything the service keeps for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    /// Account
    pub user: UserId,
    /// Cumulative stats
    pub stats: UserStats,
    /// Active and archived challenges
    pub board: ChallengeBoard,
    /// Most recent event ids, oldest first
    recent_events: VecDeque<EventId>,
}

impl UserProgress {
    /// Creates empty progress for a user.
    #[must_use]
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            stats: UserStats::new(),
            board: ChallengeBoard::new(),
            recent_events: VecDeque::new(),
        }
    }

    /// Replaces the stats.
    #[must_use]
    pub fn with_stats(mut self, stats: UserStats) -> Self {
        self.stats = stats;
        self
    }

    /// Returns whether an event id is among the remembered ones.
    #[must_use]
    pub fn has_seen(&self, event_id: &EventId) -> bool {
        self.recent_events.contains(event_id)
    }

    /// Remembers an event id, forgetting the oldest beyond `window`.
    pub fn remember(&mut self, event_id: EventId, window: usize) {
        if window == 0 {
            return;
        }
        self.recent_events.push_back(event_id);
        while self.recent_events.len() > window {
            self.recent_events.pop_front();
        }
    }

    /// Number of remembered event ids.
    #[must_use]
    pub fn remembered_events(&self) -> usize {
        self.recent_events.len()
    }

    /// Encodes a snapshot.
    pub fn to_bytes(&self) -> SnapshotResult<Vec<u8>> {
        Ok(encode_framed(MagicBytes::PROGRESS, SchemaVersion::PROGRESS_SNAPSHOT, self)?)
    }

    /// Decodes a snapshot written by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> SnapshotResult<Self> {
        let (progress, _version) =
            decode_framed(MagicBytes::PROGRESS, SchemaVersion::PROGRESS_SNAPSHOT, bytes)?;
        Ok(progress)
    }

    /// Decodes a snapshot and checks it belongs to `user`.
    pub fn from_bytes_for(user: &UserId, bytes: &[u8]) -> SnapshotResult<Self> {
        let progress = Self::from_bytes(bytes)?;
        if progress.user != *user {
            return Err(SnapshotError::WrongUser {
                expected: user.clone(),
                actual: progress.user,
            });
        }
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::{AchievementCategory, AchievementDefinition, UnlockRule};
    use crate::action::ActionEvent;
    use crate::catalog::Catalog;
    use crate::engine::ProgressionEngine;
    use crate::level::Level;
    use crate::stats::StatMetric;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn lived_in_progress() -> UserProgress {
        let catalog = Catalog::new(
            vec![Level::new(1, "Seeker", 0, 99), Level::top(2, "Believer", 100)],
            vec![AchievementDefinition::new(
                "first",
                "First",
                AchievementCategory::Prayer,
                UnlockRule::Count {
                    metric: StatMetric::PrayerMinutes,
                    target: 1,
                },
            )],
            Vec::new(),
        )
        .expect("valid catalog");
        let engine = ProgressionEngine::new(Arc::new(catalog));
        let at = Utc.with_ymd_and_hms(2026, 5, 3, 6, 30, 0).single().expect("valid date");
        let event = ActionEvent::new(UserId::new("u1"), "prayer_minute", at).with_magnitude(12);
        let outcome = engine
            .record_action(&UserStats::new(), &event)
            .expect("record should succeed");

        let mut progress = UserProgress::new(UserId::new("u1")).with_stats(outcome.updated_stats);
        progress.remember(EventId::new("evt-1"), 8);
        progress
    }

    #[test]
    fn test_snapshot_preserves_progress() {
        let progress = lived_in_progress();
        let bytes = progress.to_bytes().expect("encode should succeed");
        assert_eq!(&bytes[0..4], b"SFPG");

        let restored = UserProgress::from_bytes(&bytes).expect("decode should succeed");
        assert_eq!(restored, progress);
        assert!(restored.stats.has_achievement("first"));
        assert!(restored.has_seen(&EventId::new("evt-1")));
    }

    #[test]
    fn test_snapshot_for_other_user_rejected() {
        let bytes = lived_in_progress().to_bytes().expect("encode should succeed");
        let result = UserProgress::from_bytes_for(&UserId::new("u2"), &bytes);
        assert!(matches!(result, Err(SnapshotError::WrongUser { .. })));
    }

    #[test]
    fn test_garbage_rejected() {
        let result = UserProgress::from_bytes(b"not a snapshot at all");
        assert!(matches!(
            result,
            Err(SnapshotError::Frame(FrameError::InvalidFormat { .. }))
        ));
    }

    #[test]
    fn test_event_window_is_bounded() {
        let mut progress = UserProgress::new(UserId::new("u1"));
        for i in 0..5 {
            progress.remember(EventId::new(format!("evt-{i}")), 3);
        }
        assert_eq!(progress.remembered_events(), 3);
        assert!(!progress.has_seen(&EventId::new("evt-0")));
        assert!(progress.has_seen(&EventId::new("evt-4")));

        progress.remember(EventId::new("evt-5"), 0);
        assert!(!progress.has_seen(&EventId::new("evt-5")));
    }
}
