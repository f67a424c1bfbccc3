//! Tidewatch domain types.
//!
//! Pure types and invariants with no I/O: identities, cooldowns, counted
//! holdings, the combat session aggregate, reward policies, challenge
//! records and the static catalogs.

pub mod achievement;
pub mod catalog;
pub mod challenge;
pub mod combat;
pub mod cooldown;
pub mod encounter;
pub mod error;
pub mod holdings;
pub mod identity;
pub mod ids;
pub mod reward;

pub use achievement::{AchievementDefinition, GrantedAchievement, ACHIEVEMENTS};
pub use catalog::FishSpecies;
pub use challenge::{ChallengeOutcome, ChallengeRecord};
pub use combat::{
    AttackOutcome, AttackRejection, CombatSession, CombatSummary, CombatTarget, Contribution,
    EncounterKind, Participant, RewardClaim, SessionPhase,
};
pub use cooldown::{ActionKind, Admission, CooldownRecord};
pub use encounter::{ExpeditionArea, RaidTier};
pub use error::DomainError;
pub use holdings::{InventoryEntry, ItemKind};
pub use identity::{DisplayName, Role, UserIdentity};
pub use ids::{CombatSessionId, ConnectionId, RoomId, TargetId, UserId};
pub use reward::{RewardPolicy, RewardShare};
