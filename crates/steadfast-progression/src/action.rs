//! Action events: the unit of input to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use steadfast_common::{EventId, UserId};

use crate::challenge::TaskType;
use crate::error::{EngineError, EngineResult};
use crate::stats::StreakKind;

/// Action kinds the engine has built-in behavior for.
///
/// Events carry their kind as a string so hosts can send kinds the engine does
/// not know; those still flow through the points table and the action tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// One minute spent in prayer
    PrayerMinute,
    /// One verse read
    VerseRead,
    /// Helped a community member
    CommunityHelp,
    /// Made a new connection
    ConnectionMade,
    /// Shared content with others
    Share,
    /// Completed a standalone task
    TaskComplete,
    /// Completed a whole challenge
    ChallengeComplete,
    /// Opened the app on a new day
    DailyCheckin,
}

impl ActionKind {
    /// Every known kind, in declaration order.
    pub const ALL: [ActionKind; 8] = [
        Self::PrayerMinute,
        Self::VerseRead,
        Self::CommunityHelp,
        Self::ConnectionMade,
        Self::Share,
        Self::TaskComplete,
        Self::ChallengeComplete,
        Self::DailyCheckin,
    ];

    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PrayerMinute => "prayer_minute",
            Self::VerseRead => "verse_read",
            Self::CommunityHelp => "community_help",
            Self::ConnectionMade => "connection_made",
            Self::Share => "share",
            Self::TaskComplete => "task_complete",
            Self::ChallengeComplete => "challenge_complete",
            Self::DailyCheckin => "daily_checkin",
        }
    }

    /// Parses a wire name. Unknown names return `None`.
    #[must_use]
    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }

    /// Default points multiplier for this kind.
    #[must_use]
    pub const fn default_multiplier(self) -> u64 {
        match self {
            Self::PrayerMinute => 2,
            Self::VerseRead => 5,
            Self::CommunityHelp | Self::ConnectionMade | Self::TaskComplete => 10,
            Self::Share => 3,
            Self::ChallengeComplete => 25,
            Self::DailyCheckin => 1,
        }
    }

    /// Streak this kind keeps alive, if any.
    #[must_use]
    pub const fn streak(self) -> Option<StreakKind> {
        match self {
            Self::PrayerMinute => Some(StreakKind::Prayer),
            Self::VerseRead => Some(StreakKind::Reading),
            Self::CommunityHelp | Self::ConnectionMade | Self::Share => {
                Some(StreakKind::Community)
            },
            Self::TaskComplete | Self::ChallengeComplete | Self::DailyCheckin => None,
        }
    }

    /// Challenge task type this kind advances, if any.
    #[must_use]
    pub const fn task_type(self) -> Option<TaskType> {
        match self {
            Self::PrayerMinute => Some(TaskType::Prayer),
            Self::VerseRead => Some(TaskType::Reading),
            Self::CommunityHelp => Some(TaskType::Service),
            Self::ConnectionMade => Some(TaskType::Connection),
            Self::Share => Some(TaskType::Sharing),
            Self::TaskComplete | Self::ChallengeComplete | Self::DailyCheckin => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded user activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Account that performed the action
    pub actor: UserId,
    /// Action kind wire name
    pub kind: String,
    /// How much of the action happened (minutes, verses, ...)
    #[serde(default = "default_magnitude")]
    pub magnitude: u64,
    /// When the action happened
    pub occurred_at: DateTime<Utc>,
    /// Host-assigned delivery id, used only for deduplication
    #[serde(default)]
    pub event_id: Option<EventId>,
}

const fn default_magnitude() -> u64 {
    1
}

impl ActionEvent {
    /// Creates an event with magnitude 1.
    #[must_use]
    pub fn new(actor: UserId, kind: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            actor,
            kind: kind.into(),
            magnitude: default_magnitude(),
            occurred_at,
            event_id: None,
        }
    }

    /// Creates an event for a known kind.
    #[must_use]
    pub fn of(actor: UserId, kind: ActionKind, occurred_at: DateTime<Utc>) -> Self {
        Self::new(actor, kind.as_str(), occurred_at)
    }

    /// Sets the magnitude.
    #[must_use]
    pub const fn with_magnitude(mut self, magnitude: u64) -> Self {
        self.magnitude = magnitude;
        self
    }

    /// Sets the delivery id.
    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<EventId>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Returns the known kind, if the engine recognizes it.
    #[must_use]
    pub fn known_kind(&self) -> Option<ActionKind> {
        ActionKind::parse(&self.kind)
    }

    /// Rejects malformed events: blank kind or zero magnitude.
    pub fn validate(&self) -> EngineResult<()> {
        if self.kind.trim().is_empty() {
            return Err(EngineError::invalid("action kind is empty"));
        }
        if self.magnitude == 0 {
            return Err(EngineError::invalid(format!(
                "action '{}' has zero magnitude",
                self.kind
            )));
        }
        Ok(())
    }
}
