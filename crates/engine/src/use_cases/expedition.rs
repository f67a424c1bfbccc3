//! Expeditions: multi-monster encounters spawned from an area template.

use std::sync::Arc;

use tidewatch_domain::encounter::{attack_damage, find_area};
use tidewatch_domain::{
    ActionKind, AttackOutcome, CombatSession, CombatSessionId, CombatTarget, EncounterKind,
    RoomId, TargetId,
};

use super::combat::CombatSessionManager;
use super::cooldown::CooldownGate;
use super::error::{ActionError, Rejection};
use super::validation::ActionValidator;
use super::Actor;
use crate::infrastructure::ports::{Broadcaster, RandomPort};

pub const EXPEDITION_ROOM_PREFIX: &str = "expedition:";

pub struct ExpeditionService {
    combat: Arc<CombatSessionManager>,
    validator: Arc<ActionValidator>,
    cooldowns: Arc<CooldownGate>,
    broadcaster: Arc<dyn Broadcaster>,
    random: Arc<dyn RandomPort>,
}

impl ExpeditionService {
    pub fn new(
        combat: Arc<CombatSessionManager>,
        validator: Arc<ActionValidator>,
        cooldowns: Arc<CooldownGate>,
        broadcaster: Arc<dyn Broadcaster>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            combat,
            validator,
            cooldowns,
            broadcaster,
            random,
        }
    }

    /// Spawn an expedition in `room_id` and subscribe the starter to it.
    pub async fn start(
        &self,
        actor: &Actor,
        room_id: RoomId,
        area_key: &str,
    ) -> Result<CombatSession, ActionError> {
        if !room_id.as_str().starts_with(EXPEDITION_ROOM_PREFIX) {
            return Err(Rejection::malformed(format!(
                "Expedition rooms start with {EXPEDITION_ROOM_PREFIX}"
            ))
            .into());
        }
        let area = find_area(area_key)
            .ok_or_else(|| Rejection::invalid_target(format!("Unknown area: {area_key}")))?;

        let pool = area.monster_pool();
        if pool.is_empty() {
            return Err(Rejection::invalid_target(format!("{} has no monsters", area.name)).into());
        }
        let count = self
            .random
            .gen_range(to_i32(area.min_monsters), to_i32(area.max_monsters))
            .max(1);
        let last = to_i32(u32::try_from(pool.len() - 1).unwrap_or(0));
        let mut targets = Vec::new();
        for _ in 0..count {
            let index = usize::try_from(self.random.gen_range(0, last)).unwrap_or(0);
            let species = pool[index.min(pool.len() - 1)];
            targets.push(CombatTarget::new(species.name, species.health)?);
        }

        let session = self
            .combat
            .spawn(
                room_id.clone(),
                EncounterKind::Expedition {
                    area: area.key.to_string(),
                },
                targets,
            )
            .await?;

        self.broadcaster.subscribe(actor.connection_id, &room_id);
        self.combat
            .join(session.id(), actor.user_id, actor.name())
            .await?;

        tracing::info!(
            session_id = %session.id(),
            room_id = %room_id,
            area = area.key,
            monsters = session.targets().len(),
            "Expedition started"
        );
        Ok(session)
    }

    /// Attack one living monster.
    pub async fn attack(
        &self,
        actor: &Actor,
        session_id: CombatSessionId,
        target_id: TargetId,
    ) -> Result<AttackOutcome, ActionError> {
        let snapshot = self.combat.require(session_id).await?;
        if snapshot.kind().is_raid() {
            return Err(Rejection::invalid_target("Not an expedition session").into());
        }
        let plan = self
            .validator
            .validate_attack(&snapshot, actor.user_id, Some(target_id))
            .await?;
        let window_ends = self
            .cooldowns
            .admit(actor.user_id, ActionKind::Exploration, plan.skill)
            .await?;

        let factor = f64::from(self.random.gen_range(800, 1200)) / 1000.0;
        let damage = attack_damage(plan.skill, factor);
        let result = self
            .combat
            .apply_attack(session_id, actor.user_id, actor.name(), Some(target_id), damage)
            .await;
        if matches!(result, Err(ActionError::Rejected(_) | ActionError::Busy(_))) {
            self.cooldowns
                .refund(actor.user_id, ActionKind::Exploration, window_ends)
                .await;
        }
        result
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
