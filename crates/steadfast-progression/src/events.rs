//! Progress event bus for the notification layer.

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use steadfast_common::UserId;
use tracing::warn;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Progress milestones published by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// An action earned points
    PointsAwarded {
        /// Account credited
        user: UserId,
        /// Action kind
        kind: String,
        /// Points from the action itself
        points: u64,
        /// Points from unlocks and rewards
        bonus: u64,
    },
    /// The user moved to another level
    LevelUp {
        /// Account
        user: UserId,
        /// Previous level
        from: u32,
        /// New level
        to: u32,
        /// Title of the new level
        title: String,
    },
    /// An achievement was unlocked
    AchievementUnlocked {
        /// Account
        user: UserId,
        /// Achievement id
        achievement_id: String,
        /// Achievement name
        name: String,
        /// Unlock time
        at: DateTime<Utc>,
    },
    /// A challenge was completed
    ChallengeCompleted {
        /// Account
        user: UserId,
        /// Challenge id
        challenge_id: String,
        /// Completion time
        at: DateTime<Utc>,
    },
}

impl ProgressEvent {
    /// Account the event concerns.
    #[must_use]
    pub const fn user(&self) -> &UserId {
        match self {
            Self::PointsAwarded { user, .. }
            | Self::LevelUp { user, .. }
            | Self::AchievementUnlocked { user, .. }
            | Self::ChallengeCompleted { user, .. } => user,
        }
    }
}

/// Event bus for broadcasting progress events to subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Sender<ProgressEvent>,
    receiver: Receiver<ProgressEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Returns false if it was dropped.
    ///
    /// Never blocks: when the channel is full the event is dropped.
    pub fn publish(&self, event: ProgressEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Event bus full ({} pending), dropping progress event for {}",
                    self.pending_count(),
                    event.user()
                );
                false
            },
            Err(TrySendError::Disconnected(event)) => {
                warn!("Event bus disconnected, dropping progress event for {}", event.user());
                false
            },
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<ProgressEvent> {
        self.receiver.try_iter().collect()
    }

    /// Drains pending events into a handler.
    pub fn dispatch(&self, handler: &dyn ProgressEventHandler) -> usize {
        let mut handled = 0;
        for event in self.receiver.try_iter() {
            handler.handle(&event);
            handled += 1;
        }
        handled
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a receiver handle for a consumer thread.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ProgressEvent> {
        self.receiver.clone()
    }
}

/// Consumer of progress events (push notifications, activity feeds).
pub trait ProgressEventHandler: Send + Sync {
    /// Handles an event.
    fn handle(&self, event: &ProgressEvent);
}
