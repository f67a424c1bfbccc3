//! Fishing.
//!
//! validate storage -> admit cooldown -> roll the catch -> credit the fish.
//! Notable catches are announced to the lobby.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tidewatch_domain::catalog::{catch_table, pick_weighted, total_weight};
use tidewatch_domain::{ActionKind, FishSpecies, ItemKind, RoomId};
use tidewatch_shared::{RoomPayload, ServerMessage};

use super::achievements::AchievementService;
use super::challenge::ChallengeController;
use super::cooldown::CooldownGate;
use super::error::{ActionError, Rejection};
use super::validation::ActionValidator;
use super::Actor;
use crate::infrastructure::ports::{Broadcaster, HoldingsRepo, RandomPort, RoomEvent};

/// Catches at or above this rank are announced in the lobby.
pub const ANNOUNCE_RANK: u32 = 5;

/// A successful cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catch {
    pub species: FishSpecies,
    pub total_fish: u64,
    pub next_cast_at: DateTime<Utc>,
}

impl Catch {
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::FishingResult {
            fish: self.species.name.to_string(),
            rank: self.species.rank,
            price: self.species.price,
            total_fish: self.total_fish,
            next_cast_at: self.next_cast_at,
        }
    }
}

pub struct FishingService {
    validator: Arc<ActionValidator>,
    cooldowns: Arc<CooldownGate>,
    holdings: Arc<dyn HoldingsRepo>,
    achievements: Arc<AchievementService>,
    challenges: Arc<ChallengeController>,
    broadcaster: Arc<dyn Broadcaster>,
    random: Arc<dyn RandomPort>,
}

impl FishingService {
    pub fn new(
        validator: Arc<ActionValidator>,
        cooldowns: Arc<CooldownGate>,
        holdings: Arc<dyn HoldingsRepo>,
        achievements: Arc<AchievementService>,
        challenges: Arc<ChallengeController>,
        broadcaster: Arc<dyn Broadcaster>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            validator,
            cooldowns,
            holdings,
            achievements,
            challenges,
            broadcaster,
            random,
        }
    }

    pub async fn cast(&self, actor: &Actor) -> Result<Catch, ActionError> {
        let plan = self.validator.validate_cast(actor.user_id).await?;
        let next_cast_at = self
            .cooldowns
            .admit(actor.user_id, ActionKind::Fishing, plan.skill)
            .await?;

        let table = catch_table(plan.skill);
        let last = i32::try_from(total_weight(&table).saturating_sub(1)).unwrap_or(0);
        let roll = u32::try_from(self.random.gen_range(0, last)).unwrap_or(0);
        let species = pick_weighted(&table, roll)
            .ok_or_else(|| Rejection::malformed("Nothing to catch"))?;

        self.holdings
            .adjust(actor.user_id, &ItemKind::fish(species.name), 1)
            .await?;
        let total_fish = self.holdings.total_fish(actor.user_id).await?;

        tracing::debug!(
            user_id = %actor.user_id,
            fish = species.name,
            rank = species.rank,
            total_fish,
            "Fish caught"
        );

        if species.rank >= ANNOUNCE_RANK {
            self.broadcaster.publish(
                &RoomId::lobby(),
                RoomEvent::State(RoomPayload::FishCaught {
                    user_id: actor.user_id.to_uuid(),
                    display_name: actor.name().to_string(),
                    fish: species.name.to_string(),
                    rank: species.rank,
                }),
            );
        }

        if let Err(e) = self
            .achievements
            .check_fish_collector(actor.user_id, total_fish)
            .await
        {
            tracing::error!(user_id = %actor.user_id, error = %e, "Achievement check failed");
        }

        self.challenges
            .maybe_issue(actor.connection_id, actor.user_id)
            .await;

        Ok(Catch {
            species,
            total_fish,
            next_cast_at,
        })
    }
}
