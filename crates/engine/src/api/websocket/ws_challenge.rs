use super::*;

/// Answer the pending challenge. A pass is acknowledged by the controller;
/// a wrong or late answer closes the connection.
pub(super) fn handle_challenge_response(
    state: &WsState,
    actor: &Actor,
    text: &str,
) -> Option<ServerMessage> {
    match state
        .app
        .use_cases
        .challenge
        .respond(actor.connection_id, text)
    {
        Ok(outcome) => {
            tracing::debug!(connection_id = %actor.connection_id, outcome = %outcome, "Challenge answered");
            None
        }
        Err(rejection) => Some(rejection.into_message("challenge_response")),
    }
}
