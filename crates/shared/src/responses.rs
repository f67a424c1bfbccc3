//! HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messages::{CooldownView, RankingView, TargetView};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub display_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub kind: String,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingView {
    pub kind: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryResponse {
    pub user_id: Uuid,
    pub holdings: Vec<HoldingView>,
    pub total_fish: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementsResponse {
    pub achievements: Vec<AchievementView>,
}

/// Result of an admin grant or revoke. `changed` is false when the call was
/// a no-op (already granted, or nothing to revoke).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementChangeResponse {
    pub user_id: Uuid,
    pub achievement_id: String,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownsResponse {
    pub cooldowns: Vec<CooldownView>,
}

/// One raid tier's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaidStatusView {
    pub tier: String,
    pub room_id: String,
    pub boss_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<ActiveSessionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSessionView {
    pub session_id: Uuid,
    pub phase: String,
    pub targets: Vec<TargetView>,
    pub health: u64,
    pub max_health: u64,
    pub rankings: Vec<RankingView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaidsResponse {
    pub raids: Vec<RaidStatusView>,
}

/// Result of an admin-triggered challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTriggerResponse {
    pub user_id: Uuid,
    /// Live connections that received a new challenge.
    pub issued: usize,
}

/// Error body for every non-2xx HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
