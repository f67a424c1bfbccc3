//! Action validator.
//!
//! Checks a proposed action against authoritative state, re-read at the
//! moment of validation, before anything is mutated. Client-supplied
//! quantities are never trusted. A rejection here means no partial change.

use std::sync::Arc;

use tidewatch_domain::{CombatSession, CombatSessionId, ItemKind, RoomId, TargetId, UserId};

use super::error::{ActionError, Rejection};
use crate::infrastructure::cache::{NonceCheck, ReplayGuard};
use crate::infrastructure::ports::{HoldingsRepo, RepoError};

/// Longest chat message accepted, in characters.
pub const MAX_CHAT_LENGTH: usize = 500;

/// An approved fishing cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastPlan {
    pub skill: u64,
    pub held_fish: u64,
}

/// An approved spend of a counted holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendPlan {
    pub kind: ItemKind,
    pub amount: u64,
}

/// An approved attack against a session snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackPlan {
    pub session_id: CombatSessionId,
    pub target_id: TargetId,
    pub skill: u64,
}

pub struct ActionValidator {
    holdings: Arc<dyn HoldingsRepo>,
    replay: Arc<ReplayGuard>,
    fish_storage_limit: u64,
}

impl ActionValidator {
    pub fn new(
        holdings: Arc<dyn HoldingsRepo>,
        replay: Arc<ReplayGuard>,
        fish_storage_limit: u64,
    ) -> Self {
        Self {
            holdings,
            replay,
            fish_storage_limit,
        }
    }

    /// Refuse a nonce this user already sent inside the replay window.
    pub async fn check_nonce(&self, user_id: UserId, nonce: Option<&str>) -> Result<(), Rejection> {
        match self.replay.check(user_id, nonce).await {
            NonceCheck::Fresh => Ok(()),
            NonceCheck::Replayed => Err(Rejection::replayed()),
            NonceCheck::Malformed => Err(Rejection::malformed("Invalid nonce")),
        }
    }

    /// Fishing skill is the user's `fishing_rod` holding, never below 1.
    pub async fn skill(&self, user_id: UserId) -> Result<u64, RepoError> {
        let rods = self.holdings.get(user_id, &ItemKind::fishing_rod()).await?;
        Ok(rods.max(1))
    }

    pub async fn validate_cast(&self, user_id: UserId) -> Result<CastPlan, ActionError> {
        let held_fish = self.holdings.total_fish(user_id).await?;
        if held_fish >= self.fish_storage_limit {
            return Err(Rejection::inventory_full(self.fish_storage_limit).into());
        }
        let skill = self.skill(user_id).await?;
        Ok(CastPlan { skill, held_fish })
    }

    pub async fn validate_spend(
        &self,
        user_id: UserId,
        kind: &ItemKind,
        amount: u64,
    ) -> Result<SpendPlan, ActionError> {
        if amount > 0 {
            let available = self.holdings.get(user_id, kind).await?;
            if available < amount {
                return Err(Rejection::insufficient(kind.as_str(), available, amount).into());
            }
        }
        Ok(SpendPlan {
            kind: kind.clone(),
            amount,
        })
    }

    /// Dry-run the attack on a copy of the session so the same rules that
    /// guard the real mutation decide here.
    pub async fn validate_attack(
        &self,
        snapshot: &CombatSession,
        user_id: UserId,
        target: Option<TargetId>,
    ) -> Result<AttackPlan, ActionError> {
        let mut probe = snapshot.clone();
        let outcome = probe.apply_attack(user_id, "", target, 0)?;
        let skill = self.skill(user_id).await?;
        Ok(AttackPlan {
            session_id: snapshot.id(),
            target_id: outcome.target_id,
            skill,
        })
    }

    pub fn fish_storage_limit(&self) -> u64 {
        self.fish_storage_limit
    }
}

/// Trim and bound a chat message.
pub fn validate_chat(content: &str) -> Result<String, Rejection> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Rejection::malformed("Message cannot be empty"));
    }
    if trimmed.chars().count() > MAX_CHAT_LENGTH {
        return Err(Rejection::malformed(format!(
            "Message exceeds maximum length of {MAX_CHAT_LENGTH}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Parse a client-supplied room key.
pub fn parse_room(raw: &str) -> Result<RoomId, Rejection> {
    RoomId::new(raw).map_err(|e| Rejection::malformed(e.to_string()))
}
