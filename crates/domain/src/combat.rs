//! Combat session aggregate - one shared raid boss or expedition encounter.
//!
//! # Rustic DDD Design
//!
//! - **Private fields**: every mutation goes through a method that checks the phase
//! - **State enum**: `SessionPhase` replaces `is_terminal` / `rewards_given` booleans
//! - **Outcome values**: `apply_attack` returns an `AttackOutcome` or an `AttackRejection`
//!
//! # Invariants
//!
//! - Target health never goes below zero; damage is clamped to the remaining health.
//! - The sum of participant contributions always equals the health removed.
//! - Attacks are only accepted in `Active`; `Resolving` and `Retired` reject them.
//! - The reward claim is handed out at most once per session.
//!
//! The aggregate is not internally synchronized. Callers serialize mutations on
//! one session (see the engine's combat session manager).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::encounter::RaidTier;
use crate::error::DomainError;
use crate::ids::{CombatSessionId, RoomId, TargetId, UserId};

/// Lifecycle of a combat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Created, not yet accepting attacks.
    Spawning,
    /// Accepting attacks.
    Active,
    /// Every target is down; rewards are being computed.
    Resolving,
    /// Removed from the active registry; only a summary remains.
    Retired,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Spawning => "spawning",
            SessionPhase::Active => "active",
            SessionPhase::Resolving => "resolving",
            SessionPhase::Retired => "retired",
        }
    }

    /// `Resolving` or `Retired`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Resolving | SessionPhase::Retired)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of encounter a session represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncounterKind {
    Raid { tier: RaidTier },
    Expedition { area: String },
}

impl EncounterKind {
    pub fn is_raid(&self) -> bool {
        matches!(self, EncounterKind::Raid { .. })
    }
}

/// One damageable entity inside a session (the boss, or one expedition monster).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTarget {
    id: TargetId,
    name: String,
    health: u64,
    max_health: u64,
}

impl CombatTarget {
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `max_health` is zero or the name is blank.
    pub fn new(name: impl Into<String>, max_health: u64) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("Combat target name cannot be empty"));
        }
        if max_health == 0 {
            return Err(DomainError::validation("Combat target must have health"));
        }
        Ok(Self {
            id: TargetId::new(),
            name,
            health: max_health,
            max_health,
        })
    }

    #[inline]
    pub fn id(&self) -> TargetId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn health(&self) -> u64 {
        self.health
    }

    #[inline]
    pub fn max_health(&self) -> u64 {
        self.max_health
    }

    pub fn is_defeated(&self) -> bool {
        self.health == 0
    }
}

/// A user registered with a session and their cumulative damage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    user_id: UserId,
    display_name: String,
    damage: u64,
    /// Attack ordinal at which `damage` last grew; lower reached the total first.
    reached_at: u64,
}

impl Participant {
    #[inline]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[inline]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[inline]
    pub fn damage(&self) -> u64 {
        self.damage
    }
}

/// Why an attack was refused. No state changes when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackRejection {
    /// The session is still in its spawn window.
    NotYetActive,
    /// The session is `Resolving` or `Retired`.
    AlreadyDefeated,
    /// The named target does not exist, is already down, or is ambiguous.
    InvalidTarget,
}

impl fmt::Display for AttackRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackRejection::NotYetActive => f.write_str("target is not yet attackable"),
            AttackRejection::AlreadyDefeated => f.write_str("target already defeated"),
            AttackRejection::InvalidTarget => f.write_str("invalid target"),
        }
    }
}

/// Result of an accepted attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub target_id: TargetId,
    /// Damage actually applied after clamping.
    pub damage_dealt: u64,
    pub target_health: u64,
    pub target_defeated: bool,
    /// True when this attack moved the whole session into `Resolving`.
    pub session_defeated: bool,
    /// The attacker's cumulative damage after this attack.
    pub attacker_total: u64,
}

/// One ranked contribution handed to a reward policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub user_id: UserId,
    pub display_name: String,
    pub damage: u64,
    /// 1-based rank by damage.
    pub rank: u32,
}

/// Everything reward distribution needs, taken from the session exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardClaim {
    pub session_id: CombatSessionId,
    pub kind: EncounterKind,
    /// Participants with non-zero damage, best first.
    pub contributions: Vec<Contribution>,
    pub finisher: Option<UserId>,
}

/// The durable trace of a retired session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSummary {
    pub session_id: CombatSessionId,
    pub room_id: RoomId,
    pub kind: EncounterKind,
    pub max_health: u64,
    pub contributions: Vec<Contribution>,
    pub finisher: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub retired_at: DateTime<Utc>,
}

/// A shared combat encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSession {
    id: CombatSessionId,
    room_id: RoomId,
    kind: EncounterKind,
    targets: Vec<CombatTarget>,
    participants: Vec<Participant>,
    phase: SessionPhase,
    finisher: Option<UserId>,
    rewards_claimed: bool,
    attack_count: u64,
    created_at: DateTime<Utc>,
    activates_at: DateTime<Utc>,
    version: u64,
}

impl CombatSession {
    // =========================================================================
    // Constructor
    // =========================================================================

    /// Spawn a new session in `Spawning`. It becomes attackable once
    /// [`activate`](Self::activate) is called at or after `activates_at`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `targets` is empty.
    pub fn spawn(
        room_id: RoomId,
        kind: EncounterKind,
        targets: Vec<CombatTarget>,
        now: DateTime<Utc>,
        activates_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if targets.is_empty() {
            return Err(DomainError::validation("Combat session needs at least one target"));
        }
        Ok(Self {
            id: CombatSessionId::new(),
            room_id,
            kind,
            targets,
            participants: Vec::new(),
            phase: SessionPhase::Spawning,
            finisher: None,
            rewards_claimed: false,
            attack_count: 0,
            created_at: now,
            activates_at: activates_at.max(now),
            version: 0,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> CombatSessionId {
        self.id
    }

    #[inline]
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    #[inline]
    pub fn kind(&self) -> &EncounterKind {
        &self.kind
    }

    #[inline]
    pub fn targets(&self) -> &[CombatTarget] {
        &self.targets
    }

    #[inline]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    #[inline]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[inline]
    pub fn finisher(&self) -> Option<UserId> {
        self.finisher
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn activates_at(&self) -> DateTime<Utc> {
        self.activates_at
    }

    /// Store version for compare-and-swap persistence.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn rewards_claimed(&self) -> bool {
        self.rewards_claimed
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn health(&self) -> u64 {
        self.targets.iter().map(|t| t.health).sum()
    }

    pub fn max_health(&self) -> u64 {
        self.targets.iter().map(|t| t.max_health).sum()
    }

    /// Sum of all participants' recorded damage.
    pub fn total_contribution(&self) -> u64 {
        self.participants.iter().map(|p| p.damage).sum()
    }

    pub fn target(&self, id: TargetId) -> Option<&CombatTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn participant(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Participants with non-zero damage ranked by damage, ties going to whoever
    /// reached their total first.
    pub fn ranked_contributions(&self) -> Vec<Contribution> {
        let mut ranked: Vec<&Participant> =
            self.participants.iter().filter(|p| p.damage > 0).collect();
        ranked.sort_by(|a, b| b.damage.cmp(&a.damage).then(a.reached_at.cmp(&b.reached_at)));
        ranked
            .into_iter()
            .enumerate()
            .map(|(index, p)| Contribution {
                user_id: p.user_id,
                display_name: p.display_name.clone(),
                damage: p.damage,
                rank: u32::try_from(index + 1).unwrap_or(u32::MAX),
            })
            .collect()
    }

    // =========================================================================
    // Version
    // =========================================================================

    /// Bump the version before a write and return the version the store is
    /// expected to hold.
    pub fn advance_version(&mut self) -> u64 {
        let expected = self.version;
        self.version = self.version.saturating_add(1);
        expected
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// `Spawning -> Active`.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` if the session is not spawning or the spawn
    /// window has not elapsed.
    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.phase != SessionPhase::Spawning {
            return Err(DomainError::invalid_state_transition(format!(
                "cannot activate a {} session",
                self.phase
            )));
        }
        if now < self.activates_at {
            return Err(DomainError::invalid_state_transition(
                "spawn window has not elapsed",
            ));
        }
        self.phase = SessionPhase::Active;
        Ok(())
    }

    /// Register interest without dealing damage. Returns `true` if the user
    /// was not already a participant.
    ///
    /// # Errors
    ///
    /// `AlreadyDefeated` once the session is terminal.
    pub fn join(
        &mut self,
        user_id: UserId,
        display_name: &str,
    ) -> Result<bool, AttackRejection> {
        if self.phase.is_terminal() {
            return Err(AttackRejection::AlreadyDefeated);
        }
        if self.participant(user_id).is_some() {
            return Ok(false);
        }
        self.participants.push(Participant {
            user_id,
            display_name: display_name.to_string(),
            damage: 0,
            reached_at: 0,
        });
        Ok(true)
    }

    /// Apply one attack.
    ///
    /// `target` may be omitted when the session has exactly one living target
    /// (the raid boss). Damage is clamped to the target's remaining health.
    /// When the last living target reaches zero the attacker becomes the
    /// finisher and the session moves to `Resolving`.
    pub fn apply_attack(
        &mut self,
        user_id: UserId,
        display_name: &str,
        target: Option<TargetId>,
        amount: u64,
    ) -> Result<AttackOutcome, AttackRejection> {
        match self.phase {
            SessionPhase::Spawning => return Err(AttackRejection::NotYetActive),
            SessionPhase::Resolving | SessionPhase::Retired => {
                return Err(AttackRejection::AlreadyDefeated)
            }
            SessionPhase::Active => {}
        }

        let index = self.resolve_target(target)?;

        let target = &mut self.targets[index];
        let damage = amount.min(target.health);
        target.health -= damage;
        let target_id = target.id;
        let target_health = target.health;
        let target_defeated = target.health == 0;

        self.attack_count = self.attack_count.saturating_add(1);
        let ordinal = self.attack_count;
        let attacker_total = match self.participants.iter_mut().find(|p| p.user_id == user_id) {
            Some(participant) => {
                if damage > 0 {
                    participant.damage += damage;
                    participant.reached_at = ordinal;
                }
                participant.damage
            }
            None => {
                self.participants.push(Participant {
                    user_id,
                    display_name: display_name.to_string(),
                    damage,
                    reached_at: ordinal,
                });
                damage
            }
        };

        let session_defeated = self.targets.iter().all(CombatTarget::is_defeated);
        if session_defeated {
            self.phase = SessionPhase::Resolving;
            self.finisher = Some(user_id);
        }

        Ok(AttackOutcome {
            target_id,
            damage_dealt: damage,
            target_health,
            target_defeated,
            session_defeated,
            attacker_total,
        })
    }

    /// Hand out the reward claim. Returns `None` unless the session is
    /// `Resolving` and the claim has not been taken before.
    pub fn take_reward_claim(&mut self) -> Option<RewardClaim> {
        if self.phase != SessionPhase::Resolving || self.rewards_claimed {
            return None;
        }
        self.rewards_claimed = true;
        Some(RewardClaim {
            session_id: self.id,
            kind: self.kind.clone(),
            contributions: self.ranked_contributions(),
            finisher: self.finisher,
        })
    }

    /// `Resolving -> Retired`, producing the durable summary.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless the session is resolving and its
    /// rewards have been claimed.
    pub fn retire(&mut self, now: DateTime<Utc>) -> Result<CombatSummary, DomainError> {
        if self.phase != SessionPhase::Resolving || !self.rewards_claimed {
            return Err(DomainError::invalid_state_transition(format!(
                "cannot retire a {} session (rewards claimed: {})",
                self.phase, self.rewards_claimed
            )));
        }
        self.phase = SessionPhase::Retired;
        Ok(self.summary(now))
    }

    /// Snapshot of the session as a summary record.
    pub fn summary(&self, now: DateTime<Utc>) -> CombatSummary {
        CombatSummary {
            session_id: self.id,
            room_id: self.room_id.clone(),
            kind: self.kind.clone(),
            max_health: self.max_health(),
            contributions: self.ranked_contributions(),
            finisher: self.finisher,
            created_at: self.created_at,
            retired_at: now,
        }
    }

    fn resolve_target(&self, target: Option<TargetId>) -> Result<usize, AttackRejection> {
        match target {
            Some(id) => {
                let index = self
                    .targets
                    .iter()
                    .position(|t| t.id == id)
                    .ok_or(AttackRejection::InvalidTarget)?;
                if self.targets[index].is_defeated() {
                    return Err(AttackRejection::InvalidTarget);
                }
                Ok(index)
            }
            None => {
                let mut living = self
                    .targets
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| !t.is_defeated())
                    .map(|(index, _)| index);
                match (living.next(), living.next()) {
                    (Some(index), None) => Ok(index),
                    _ => Err(AttackRejection::InvalidTarget),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn raid_session(health: u64) -> CombatSession {
        let now = Utc::now();
        let mut session = CombatSession::spawn(
            RoomId::new("raid:beginner").unwrap(),
            EncounterKind::Raid {
                tier: RaidTier::Beginner,
            },
            vec![CombatTarget::new("Boss", health).unwrap()],
            now,
            now,
        )
        .unwrap();
        session.activate(now).unwrap();
        session
    }

    fn expedition_session(healths: &[u64]) -> CombatSession {
        let now = Utc::now();
        let targets = healths
            .iter()
            .map(|h| CombatTarget::new("Monster", *h).unwrap())
            .collect();
        let mut session = CombatSession::spawn(
            RoomId::new("expedition:test").unwrap(),
            EncounterKind::Expedition {
                area: "quiet_pier".into(),
            },
            targets,
            now,
            now,
        )
        .unwrap();
        session.activate(now).unwrap();
        session
    }

    mod constructor {
        use super::*;

        #[test]
        fn spawn_requires_targets() {
            let now = Utc::now();
            let result = CombatSession::spawn(
                RoomId::lobby(),
                EncounterKind::Expedition { area: "x".into() },
                vec![],
                now,
                now,
            );
            assert!(result.is_err());
        }

        #[test]
        fn target_requires_health() {
            assert!(CombatTarget::new("Boss", 0).is_err());
            assert!(CombatTarget::new("  ", 10).is_err());
        }

        #[test]
        fn spawn_starts_in_spawning_with_full_health() {
            let now = Utc::now();
            let session = CombatSession::spawn(
                RoomId::lobby(),
                EncounterKind::Raid {
                    tier: RaidTier::Advanced,
                },
                vec![CombatTarget::new("Boss", 500).unwrap()],
                now,
                now + TimeDelta::seconds(2),
            )
            .unwrap();
            assert_eq!(session.phase(), SessionPhase::Spawning);
            assert_eq!(session.health(), 500);
            assert_eq!(session.max_health(), 500);
            assert_eq!(session.version(), 0);
        }
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn attacks_rejected_while_spawning() {
            let now = Utc::now();
            let mut session = CombatSession::spawn(
                RoomId::lobby(),
                EncounterKind::Raid {
                    tier: RaidTier::Beginner,
                },
                vec![CombatTarget::new("Boss", 100).unwrap()],
                now,
                now + TimeDelta::seconds(2),
            )
            .unwrap();
            assert_eq!(
                session.apply_attack(UserId::new(), "a", None, 10),
                Err(AttackRejection::NotYetActive)
            );
            assert!(session.activate(now).is_err());
            session.activate(now + TimeDelta::seconds(2)).unwrap();
            assert!(session.apply_attack(UserId::new(), "a", None, 10).is_ok());
        }

        #[test]
        fn activate_twice_fails() {
            let mut session = raid_session(10);
            assert!(session.activate(Utc::now()).is_err());
        }

        #[test]
        fn retire_requires_claimed_rewards() {
            let mut session = raid_session(10);
            session.apply_attack(UserId::new(), "a", None, 10).unwrap();
            assert!(session.retire(Utc::now()).is_err());
            session.take_reward_claim().unwrap();
            let summary = session.retire(Utc::now()).unwrap();
            assert_eq!(session.phase(), SessionPhase::Retired);
            assert_eq!(summary.max_health, 10);
            assert_eq!(summary.contributions.len(), 1);
        }

        #[test]
        fn join_after_terminal_is_rejected() {
            let mut session = raid_session(10);
            session.apply_attack(UserId::new(), "a", None, 10).unwrap();
            assert_eq!(
                session.join(UserId::new(), "late"),
                Err(AttackRejection::AlreadyDefeated)
            );
        }
    }

    mod attacks {
        use super::*;

        #[test]
        fn overkill_is_clamped_and_finisher_recorded() {
            let mut session = raid_session(1000);
            let a = UserId::new();
            let b = UserId::new();

            let first = session.apply_attack(a, "A", None, 600).unwrap();
            assert_eq!(first.damage_dealt, 600);
            assert_eq!(first.target_health, 400);
            assert!(!first.session_defeated);

            let second = session.apply_attack(b, "B", None, 500).unwrap();
            assert_eq!(second.damage_dealt, 400);
            assert_eq!(second.target_health, 0);
            assert!(second.session_defeated);

            assert_eq!(session.health(), 0);
            assert_eq!(session.total_contribution(), 1000);
            assert_eq!(session.finisher(), Some(b));
            assert_eq!(session.phase(), SessionPhase::Resolving);
        }

        #[test]
        fn attack_after_terminal_is_rejected_without_mutation() {
            let mut session = raid_session(50);
            let a = UserId::new();
            session.apply_attack(a, "A", None, 50).unwrap();
            let before = session.clone();
            assert_eq!(
                session.apply_attack(UserId::new(), "B", None, 5),
                Err(AttackRejection::AlreadyDefeated)
            );
            assert_eq!(session, before);
        }

        #[test]
        fn health_is_conserved_across_many_attacks() {
            let mut session = raid_session(997);
            let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
            let mut applied = 0;
            for round in 0..100u64 {
                let user = users[(round % 4) as usize];
                match session.apply_attack(user, "p", None, 7 + round % 13) {
                    Ok(outcome) => applied += outcome.damage_dealt,
                    Err(rejection) => assert_eq!(rejection, AttackRejection::AlreadyDefeated),
                }
            }
            assert_eq!(applied, 997);
            assert_eq!(session.total_contribution(), 997);
            assert_eq!(session.health(), 0);
        }

        #[test]
        fn zero_damage_participants_are_tracked_but_not_ranked() {
            let mut session = raid_session(100);
            let watcher = UserId::new();
            let hitter = UserId::new();
            assert!(session.join(watcher, "watcher").unwrap());
            assert!(!session.join(watcher, "watcher").unwrap());
            session.apply_attack(hitter, "hitter", None, 30).unwrap();

            assert_eq!(session.participants().len(), 2);
            let ranked = session.ranked_contributions();
            assert_eq!(ranked.len(), 1);
            assert_eq!(ranked[0].user_id, hitter);
        }

        #[test]
        fn ties_go_to_whoever_reached_the_total_first() {
            let mut session = raid_session(1000);
            let a = UserId::new();
            let b = UserId::new();
            session.apply_attack(b, "B", None, 100).unwrap();
            session.apply_attack(a, "A", None, 100).unwrap();

            let ranked = session.ranked_contributions();
            assert_eq!(ranked[0].user_id, b);
            assert_eq!(ranked[0].rank, 1);
            assert_eq!(ranked[1].user_id, a);
            assert_eq!(ranked[1].rank, 2);
        }
    }

    mod expedition {
        use super::*;

        #[test]
        fn omitted_target_is_ambiguous_with_several_alive() {
            let mut session = expedition_session(&[10, 20]);
            assert_eq!(
                session.apply_attack(UserId::new(), "a", None, 1),
                Err(AttackRejection::InvalidTarget)
            );
        }

        #[test]
        fn defeated_and_unknown_targets_are_invalid() {
            let mut session = expedition_session(&[10, 20]);
            let first = session.targets()[0].id();
            let user = UserId::new();
            let outcome = session.apply_attack(user, "a", Some(first), 50).unwrap();
            assert!(outcome.target_defeated);
            assert!(!outcome.session_defeated);
            assert_eq!(
                session.apply_attack(user, "a", Some(first), 1),
                Err(AttackRejection::InvalidTarget)
            );
            assert_eq!(
                session.apply_attack(user, "a", Some(TargetId::new()), 1),
                Err(AttackRejection::InvalidTarget)
            );
        }

        #[test]
        fn finisher_is_whoever_defeats_the_last_target() {
            let mut session = expedition_session(&[10, 20]);
            let a = UserId::new();
            let b = UserId::new();
            let first = session.targets()[0].id();
            let second = session.targets()[1].id();
            session.apply_attack(a, "A", Some(second), 20).unwrap();
            let last = session.apply_attack(b, "B", Some(first), 10).unwrap();
            assert!(last.session_defeated);
            assert_eq!(session.finisher(), Some(b));
            assert_eq!(session.total_contribution(), 30);
        }
    }

    mod rewards {
        use super::*;

        #[test]
        fn claim_is_taken_once() {
            let mut session = raid_session(10);
            assert!(session.take_reward_claim().is_none());
            let user = UserId::new();
            session.apply_attack(user, "A", None, 10).unwrap();

            let claim = session.take_reward_claim().unwrap();
            assert_eq!(claim.finisher, Some(user));
            assert_eq!(claim.contributions.len(), 1);
            assert!(session.take_reward_claim().is_none());
            assert!(session.rewards_claimed());
        }

        #[test]
        fn advance_version_returns_expected() {
            let mut session = raid_session(10);
            assert_eq!(session.advance_version(), 0);
            assert_eq!(session.version(), 1);
        }

        #[test]
        fn session_survives_json_round_trip() {
            let mut session = raid_session(10);
            session.apply_attack(UserId::new(), "A", None, 3).unwrap();
            let json = serde_json::to_string(&session).unwrap();
            let restored: CombatSession = serde_json::from_str(&json).unwrap();
            assert_eq!(restored, session);
        }
    }
}
