//! Repository port traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tidewatch_domain::{
    ActionKind, Admission, CombatSession, CombatSessionId, CombatSummary, CooldownRecord,
    GrantedAchievement, InventoryEntry, ItemKind, RewardShare, UserId, UserIdentity,
};

use super::error::RepoError;

// =============================================================================
// Users
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<UserIdentity>, RepoError>;

    /// Insert the identity if it is new. An existing record is left as it
    /// is; display name and role only change through the store. Returns the
    /// stored record.
    async fn ensure(&self, identity: &UserIdentity) -> Result<UserIdentity, RepoError>;
}

// =============================================================================
// Cooldowns
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CooldownRepo: Send + Sync {
    /// Atomic check-and-set: admit and record `now + duration` if no window
    /// is active for `(user, kind)`, otherwise report the time remaining.
    /// Concurrent calls for the same pair admit at most one.
    async fn try_start(
        &self,
        user_id: UserId,
        kind: ActionKind,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Admission, RepoError>;

    /// Give back the window that ends at `ends_at`. A record with any other
    /// end is left alone. Returns whether a record was removed.
    async fn release(
        &self,
        user_id: UserId,
        kind: ActionKind,
        ends_at: DateTime<Utc>,
    ) -> Result<bool, RepoError>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CooldownRecord>, RepoError>;

    /// Drop records that ended before `now`. Returns the number removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}

// =============================================================================
// Holdings
// =============================================================================

/// One row of a holdings leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub user_id: UserId,
    pub display_name: String,
    pub count: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HoldingsRepo: Send + Sync {
    async fn get(&self, user_id: UserId, kind: &ItemKind) -> Result<u64, RepoError>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<InventoryEntry>, RepoError>;

    /// Atomically apply a signed delta. Returns the new count, or `None` when
    /// a negative delta would take the count below zero (nothing changes).
    async fn adjust(
        &self,
        user_id: UserId,
        kind: &ItemKind,
        delta: i64,
    ) -> Result<Option<u64>, RepoError>;

    async fn total_fish(&self, user_id: UserId) -> Result<u64, RepoError>;

    async fn leaderboard(
        &self,
        kind: &ItemKind,
        limit: u32,
    ) -> Result<Vec<LeaderboardRow>, RepoError>;
}

// =============================================================================
// Combat sessions
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CombatRepo: Send + Sync {
    async fn create(&self, session: &CombatSession) -> Result<(), RepoError>;

    /// Persist `session` only if the stored version equals `expected_version`.
    ///
    /// # Errors
    ///
    /// `RepoError::Conflict` when another writer got there first.
    async fn save(&self, session: &CombatSession, expected_version: u64)
        -> Result<(), RepoError>;

    async fn get(&self, id: CombatSessionId) -> Result<Option<CombatSession>, RepoError>;

    /// Sessions that have not been retired yet.
    async fn list_active(&self) -> Result<Vec<CombatSession>, RepoError>;

    /// Credit reward shares keyed by session in one transaction. Returns
    /// `false` if rewards for this session were already credited.
    async fn credit_rewards(
        &self,
        session_id: CombatSessionId,
        shares: &[RewardShare],
    ) -> Result<bool, RepoError>;

    /// Store the summary and drop the live session row together.
    async fn retire(&self, summary: &CombatSummary) -> Result<(), RepoError>;

    async fn get_summary(&self, id: CombatSessionId) -> Result<Option<CombatSummary>, RepoError>;
}

// =============================================================================
// Achievements
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementRepo: Send + Sync {
    /// Returns `false` if the user already held it.
    async fn grant(&self, grant: &GrantedAchievement) -> Result<bool, RepoError>;

    /// Returns `false` if the user did not hold it.
    async fn revoke(&self, user_id: UserId, achievement_id: &str) -> Result<bool, RepoError>;

    async fn list_for_user(&self, user_id: UserId)
        -> Result<Vec<GrantedAchievement>, RepoError>;
}
