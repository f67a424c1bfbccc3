use super::*;

pub(super) fn handle_chat_message(
    state: &WsState,
    actor: &Actor,
    content: &str,
) -> Option<ServerMessage> {
    match state.app.use_cases.chat.send(actor, content) {
        // The sender is in the lobby and sees its own message there.
        Ok(_) => None,
        Err(rejection) => {
            tracing::debug!(user_id = %actor.user_id, reason = %rejection, "Chat rejected");
            Some(rejection.into_message("chat_message"))
        }
    }
}
