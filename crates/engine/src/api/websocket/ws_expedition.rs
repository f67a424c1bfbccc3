use super::*;

use tidewatch_domain::{CombatSessionId, TargetId};
use uuid::Uuid;

use crate::api::websocket::error_sanitizer::action_error_message;
use crate::use_cases::combat::target_views;
use crate::use_cases::validation::parse_room;

pub(super) async fn handle_expedition_start(
    state: &WsState,
    actor: &Actor,
    room_id: &str,
    area: &str,
) -> Option<ServerMessage> {
    let room_id = match parse_room(room_id) {
        Ok(room_id) => room_id,
        Err(rejection) => return Some(rejection.into_message("expedition_start")),
    };
    match state
        .app
        .use_cases
        .expedition
        .start(actor, room_id.clone(), area)
        .await
    {
        Ok(session) => Some(ServerMessage::ExpeditionStarted {
            session_id: session.id().to_uuid(),
            room_id: room_id.to_string(),
            area: area.to_string(),
            targets: target_views(&session),
            activates_at: session.activates_at(),
        }),
        Err(e) => {
            tracing::debug!(user_id = %actor.user_id, room_id = %room_id, error = %e, "Expedition start refused");
            Some(action_error_message(e, "expedition_start"))
        }
    }
}

pub(super) async fn handle_expedition_attack(
    state: &WsState,
    actor: &Actor,
    session_id: Uuid,
    target_id: Uuid,
) -> Option<ServerMessage> {
    let session_id = CombatSessionId::from_uuid(session_id);
    let target_id = TargetId::from_uuid(target_id);
    match state
        .app
        .use_cases
        .expedition
        .attack(actor, session_id, target_id)
        .await
    {
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(user_id = %actor.user_id, session_id = %session_id, error = %e, "Expedition attack refused");
            Some(action_error_message(e, "expedition_attack"))
        }
    }
}
