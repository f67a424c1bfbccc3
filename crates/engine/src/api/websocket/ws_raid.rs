use super::*;

use tidewatch_domain::CombatSessionId;
use uuid::Uuid;

use crate::api::websocket::error_sanitizer::action_error_message;
use crate::use_cases::validation::parse_room;

/// Summon a boss. Success is announced to the lobby, so there is no direct
/// reply.
pub(super) async fn handle_raid_summon(
    state: &WsState,
    actor: &Actor,
    room_id: &str,
) -> Option<ServerMessage> {
    let room_id = match parse_room(room_id) {
        Ok(room_id) => room_id,
        Err(rejection) => return Some(rejection.into_message("raid_summon")),
    };
    match state.app.use_cases.raid.summon(actor, &room_id).await {
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(user_id = %actor.user_id, room_id = %room_id, error = %e, "Raid summon refused");
            Some(action_error_message(e, "raid_summon"))
        }
    }
}

/// Attack the boss. The outcome reaches the attacker as a `combat_result`
/// in the raid room.
pub(super) async fn handle_raid_attack(
    state: &WsState,
    actor: &Actor,
    session_id: Uuid,
) -> Option<ServerMessage> {
    let session_id = CombatSessionId::from_uuid(session_id);
    match state.app.use_cases.raid.attack(actor, session_id).await {
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(user_id = %actor.user_id, session_id = %session_id, error = %e, "Raid attack refused");
            Some(action_error_message(e, "raid_attack"))
        }
    }
}
