use super::*;

use crate::api::websocket::error_sanitizer::action_error_message;

pub(super) async fn handle_fishing_attempt(
    state: &WsState,
    actor: &Actor,
) -> Option<ServerMessage> {
    match state.app.use_cases.fishing.cast(actor).await {
        Ok(catch) => Some(catch.to_message()),
        Err(e) => {
            tracing::debug!(user_id = %actor.user_id, error = %e, "Fishing attempt refused");
            Some(action_error_message(e, "fishing_attempt"))
        }
    }
}
