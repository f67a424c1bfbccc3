//! Raid bosses: summoning, attacking and the twice-daily schedule.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tidewatch_domain::encounter::attack_damage;
use tidewatch_domain::{
    ActionKind, AttackOutcome, CombatSession, CombatSessionId, CombatTarget, EncounterKind,
    ItemKind, RaidTier, RoomId,
};
use tidewatch_shared::RoomPayload;

use super::combat::CombatSessionManager;
use super::cooldown::CooldownGate;
use super::error::{ActionError, Rejection};
use super::validation::ActionValidator;
use super::Actor;
use crate::infrastructure::ports::{Broadcaster, HoldingsRepo, RandomPort, RoomEvent};

/// Scheduled summons happen at 12:00 and 18:00 Korea Standard Time (UTC+9),
/// which is 03:00 and 09:00 UTC.
pub const SUMMON_HOURS_UTC: [u32; 2] = [3, 9];

/// The next scheduled summon strictly after `now`.
pub fn next_summon_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    [Some(today), today.succ_opt()]
        .into_iter()
        .flatten()
        .flat_map(|day| SUMMON_HOURS_UTC.map(|hour| day.and_hms_opt(hour, 0, 0)))
        .flatten()
        .map(|naive| Utc.from_utc_datetime(&naive))
        .find(|at| *at > now)
        .unwrap_or(now + chrono::TimeDelta::hours(24))
}

/// Damage factor in thousandths, inclusive.
const FACTOR_PER_MILLE: (i32, i32) = (800, 1200);

pub struct RaidService {
    combat: Arc<CombatSessionManager>,
    validator: Arc<ActionValidator>,
    cooldowns: Arc<CooldownGate>,
    holdings: Arc<dyn HoldingsRepo>,
    broadcaster: Arc<dyn Broadcaster>,
    random: Arc<dyn RandomPort>,
    /// Amber a player pays to summon.
    summon_cost: u64,
}

impl RaidService {
    pub fn new(
        combat: Arc<CombatSessionManager>,
        validator: Arc<ActionValidator>,
        cooldowns: Arc<CooldownGate>,
        holdings: Arc<dyn HoldingsRepo>,
        broadcaster: Arc<dyn Broadcaster>,
        random: Arc<dyn RandomPort>,
        summon_cost: u64,
    ) -> Self {
        Self {
            combat,
            validator,
            cooldowns,
            holdings,
            broadcaster,
            random,
            summon_cost,
        }
    }

    /// Player summon into a raid room. The summoner pays the summon cost,
    /// refunded if the boss cannot be spawned, and joins the fight.
    pub async fn summon(&self, actor: &Actor, room_id: &RoomId) -> Result<CombatSession, ActionError> {
        let tier = RaidTier::from_room(room_id)
            .ok_or_else(|| Rejection::invalid_target(format!("{room_id} is not a raid room")))?;
        if self.combat.is_room_busy(room_id) {
            return Err(Rejection::already_active(room_id.as_str()).into());
        }

        let spend = self
            .validator
            .validate_spend(actor.user_id, &ItemKind::amber(), self.summon_cost)
            .await?;
        let cost = i64::try_from(spend.amount).unwrap_or(i64::MAX);
        if cost > 0 {
            // Someone else spent it between validation and here.
            if self.holdings.adjust(actor.user_id, &spend.kind, -cost).await?.is_none() {
                let available = self.holdings.get(actor.user_id, &spend.kind).await?;
                return Err(Rejection::insufficient(spend.kind.as_str(), available, spend.amount).into());
            }
        }

        let session = match self.spawn(tier, Some(actor.name())).await {
            Ok(session) => session,
            Err(e) => {
                if cost > 0 {
                    if let Err(refund) = self.holdings.adjust(actor.user_id, &spend.kind, cost).await {
                        tracing::error!(user_id = %actor.user_id, error = %refund, "Summon refund failed");
                    }
                }
                return Err(e);
            }
        };

        self.broadcaster.subscribe(actor.connection_id, room_id);
        self.combat
            .join(session.id(), actor.user_id, actor.name())
            .await?;
        Ok(session)
    }

    /// Summon every idle tier. Tiers that already have a boss are skipped.
    pub async fn summon_scheduled(&self) -> Vec<CombatSession> {
        let mut summoned = Vec::new();
        for tier in RaidTier::ALL {
            if self.combat.is_room_busy(&tier.room_id()) {
                continue;
            }
            match self.spawn(tier, None).await {
                Ok(session) => summoned.push(session),
                Err(ActionError::Rejected(rejection)) => {
                    tracing::debug!(tier = tier.as_str(), reason = %rejection, "Scheduled summon skipped");
                }
                Err(e) => {
                    tracing::error!(tier = tier.as_str(), error = %e, "Scheduled summon failed");
                }
            }
        }
        if !summoned.is_empty() {
            self.broadcaster.publish(
                &RoomId::lobby(),
                RoomEvent::State(RoomPayload::Announcement {
                    message: "The raid bosses have surfaced!".to_string(),
                }),
            );
        }
        summoned
    }

    /// Attack the boss with server-computed damage.
    pub async fn attack(
        &self,
        actor: &Actor,
        session_id: CombatSessionId,
    ) -> Result<AttackOutcome, ActionError> {
        let snapshot = self.combat.require(session_id).await?;
        if !snapshot.kind().is_raid() {
            return Err(Rejection::invalid_target("Not a raid session").into());
        }
        let plan = self
            .validator
            .validate_attack(&snapshot, actor.user_id, None)
            .await?;
        let window_ends = self
            .cooldowns
            .admit(actor.user_id, ActionKind::Raid, plan.skill)
            .await?;

        let factor = f64::from(self.random.gen_range(FACTOR_PER_MILLE.0, FACTOR_PER_MILLE.1)) / 1000.0;
        let damage = attack_damage(plan.skill, factor);

        self.broadcaster
            .subscribe(actor.connection_id, snapshot.room_id());
        let result = self
            .combat
            .apply_attack(session_id, actor.user_id, actor.name(), Some(plan.target_id), damage)
            .await;
        // Lost the race to the killing blow, or to contention.
        if matches!(result, Err(ActionError::Rejected(_) | ActionError::Busy(_))) {
            self.cooldowns
                .refund(actor.user_id, ActionKind::Raid, window_ends)
                .await;
        }
        result
    }

    async fn spawn(
        &self,
        tier: RaidTier,
        summoned_by: Option<&str>,
    ) -> Result<CombatSession, ActionError> {
        let boss = CombatTarget::new(tier.boss_name(), tier.max_health())?;
        let session = self
            .combat
            .spawn(tier.room_id(), EncounterKind::Raid { tier }, vec![boss])
            .await?;

        self.broadcaster.publish(
            &RoomId::lobby(),
            RoomEvent::State(RoomPayload::RaidSummoned {
                session_id: session.id().to_uuid(),
                tier: tier.as_str().to_string(),
                boss_name: tier.boss_name().to_string(),
                max_health: session.max_health(),
                activates_at: session.activates_at(),
                summoned_by: summoned_by.map(str::to_string),
            }),
        );
        tracing::info!(
            session_id = %session.id(),
            tier = tier.as_str(),
            summoned_by = summoned_by.unwrap_or("schedule"),
            "Raid boss summoned"
        );
        Ok(session)
    }
}
