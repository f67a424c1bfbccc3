use super::*;

use crate::api::websocket::error_sanitizer::action_error_message;
use crate::use_cases::validation::parse_room;
use crate::use_cases::ActionError;

/// Subscribe to a room. Entering a room with a live encounter also joins
/// that encounter as a participant.
pub(super) async fn handle_subscribe_room(
    state: &WsState,
    actor: &Actor,
    room_id: &str,
) -> Option<ServerMessage> {
    let room_id = match parse_room(room_id) {
        Ok(room_id) => room_id,
        Err(rejection) => return Some(rejection.into_message("subscribe_room")),
    };

    state.connections.subscribe(actor.connection_id, &room_id);

    let combat = &state.app.use_cases.combat;
    if let Some(session) = combat.in_room(&room_id).await {
        match combat.join(session.id(), actor.user_id, actor.name()).await {
            // A finished encounter is still worth watching until it retires.
            Ok(_) | Err(ActionError::Rejected(_)) => {}
            Err(e) => return Some(action_error_message(e, "subscribe_room")),
        }
    }

    Some(ServerMessage::Subscribed {
        room_id: room_id.to_string(),
    })
}

pub(super) fn handle_unsubscribe_room(
    state: &WsState,
    actor: &Actor,
    room_id: &str,
) -> Option<ServerMessage> {
    let room_id = match parse_room(room_id) {
        Ok(room_id) => room_id,
        Err(rejection) => return Some(rejection.into_message("unsubscribe_room")),
    };
    state.connections.unsubscribe(actor.connection_id, &room_id);
    Some(ServerMessage::Unsubscribed {
        room_id: room_id.to_string(),
    })
}
