//! Achievement catalog and grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::UserId;

/// Fish a user must hold for `fish_collector`.
pub const FISH_COLLECTOR_THRESHOLD: u64 = 100;

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Granted by the server on its own rather than by an admin.
    pub automatic: bool,
}

pub const ACHIEVEMENTS: [AchievementDefinition; 3] = [
    AchievementDefinition {
        id: "fox_location",
        name: "Do You Know Where the Fox Lives?",
        description: "Played in the fox story chat room",
        automatic: false,
    },
    AchievementDefinition {
        id: "fox_gamble",
        name: "The Fox Loves a Gamble",
        description: "Reached one million affection points",
        automatic: false,
    },
    AchievementDefinition {
        id: "fish_collector",
        name: "Ready Just for You",
        description: "Held 100 or more fish",
        automatic: true,
    },
];

pub const FISH_COLLECTOR: &str = "fish_collector";

/// Look up a catalog entry.
///
/// # Errors
///
/// `DomainError::NotFound` for an id outside the catalog.
pub fn definition(id: &str) -> Result<&'static AchievementDefinition, DomainError> {
    ACHIEVEMENTS
        .iter()
        .find(|a| a.id == id)
        .ok_or_else(|| DomainError::not_found("Achievement", id))
}

/// A user's earned achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedAchievement {
    pub user_id: UserId,
    pub achievement_id: String,
    pub granted_at: DateTime<Utc>,
    /// Set for admin grants; `None` for automatic ones.
    pub granted_by: Option<UserId>,
}
