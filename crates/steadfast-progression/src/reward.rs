//! Rewards attached to achievements and challenges.

use serde::{Deserialize, Serialize};

/// What a reward grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Bonus points added to the total
    Points,
    /// A collectible badge
    Badge,
    /// A display title the user may wear
    Title,
    /// A blessing message
    Blessing,
    /// An app feature unlock
    Feature,
}

/// A reward granted on completion.
///
/// `amount` is meaningful for [`RewardKind::Points`]; `label` names the
/// badge, title, blessing or feature for the other kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Reward kind
    #[serde(rename = "type")]
    pub kind: RewardKind,
    /// Point amount
    #[serde(default)]
    pub amount: u64,
    /// Badge/title/feature name
    #[serde(default)]
    pub label: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl Reward {
    /// Creates a points reward.
    #[must_use]
    pub fn points(amount: u64, description: impl Into<String>) -> Self {
        Self {
            kind: RewardKind::Points,
            amount,
            label: String::new(),
            description: description.into(),
        }
    }

    /// Creates a labelled reward (badge, title, blessing, feature).
    #[must_use]
    pub fn labelled(
        kind: RewardKind,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            amount: 0,
            label: label.into(),
            description: description.into(),
        }
    }

    /// Creates a title reward.
    #[must_use]
    pub fn title(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self::labelled(RewardKind::Title, label, description)
    }

    /// Creates a badge reward.
    #[must_use]
    pub fn badge(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self::labelled(RewardKind::Badge, label, description)
    }

    /// Points this reward contributes to the total.
    #[must_use]
    pub const fn point_value(&self) -> u64 {
        match self.kind {
            RewardKind::Points => self.amount,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_reward() {
        let reward = Reward::points(50, "Bonus");
        assert_eq!(reward.kind, RewardKind::Points);
        assert_eq!(reward.point_value(), 50);
    }

    #[test]
    fn test_labelled_rewards_carry_no_points() {
        let title = Reward::title("Prayer Warrior", "Wear it proudly");
        assert_eq!(title.kind, RewardKind::Title);
        assert_eq!(title.label, "Prayer Warrior");
        assert_eq!(title.point_value(), 0);

        let mut odd = Reward::badge("Lamp", "");
        odd.amount = 99;
        assert_eq!(odd.point_value(), 0);
    }

    #[test]
    fn test_reward_deserializes_type_field() {
        let reward: Reward =
            serde_json::from_str(r#"{"type":"title","label":"Shepherd"}"#).expect("valid json");
        assert_eq!(reward, Reward::title("Shepherd", ""));
    }
}
