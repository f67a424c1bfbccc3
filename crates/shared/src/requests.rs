//! HTTP request bodies and query strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of leaderboard rows.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Upper bound on leaderboard rows.
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// `GET /api/leaderboard?kind=&limit=`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    /// Holding kind to rank by (`gold`, `amber`, `fish:<name>`, ...).
    #[serde(default = "default_leaderboard_kind")]
    pub kind: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

fn default_leaderboard_kind() -> String {
    "gold".to_string()
}

impl LeaderboardQuery {
    /// Requested limit clamped into `1..=MAX_LEADERBOARD_LIMIT`.
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT)
    }
}

/// Body of the admin grant / revoke endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementChangeRequest {
    pub user_id: Uuid,
    pub achievement_id: String,
}
