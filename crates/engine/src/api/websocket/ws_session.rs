use super::*;

use crate::api::websocket::error_sanitizer::sanitize_repo_error;
use crate::use_cases::SessionError;

/// Complete the join handshake.
///
/// On success the connection is bound to the user and the `joined` reply is
/// returned. An identity failure terminates the connection and yields no
/// reply; a storage failure yields an error and leaves the connection
/// unjoined so the client may retry.
pub(super) async fn handle_join(
    state: &WsState,
    connection_id: ConnectionId,
    token: &str,
) -> Result<(Actor, ServerMessage), Option<ServerMessage>> {
    let actor = match state.app.use_cases.session.join(connection_id, token).await {
        Ok(actor) => actor,
        Err(SessionError::Identity(e)) => {
            tracing::info!(connection_id = %connection_id, error = %e, "Join refused");
            state
                .connections
                .terminate(connection_id, TerminationReason::IdentityRejected);
            return Err(None);
        }
        Err(SessionError::Repo(e)) => {
            return Err(Some(ServerMessage::error(
                "JOIN_FAILED",
                sanitize_repo_error(&e, "join"),
            )));
        }
    };

    if let Err(e) = state
        .connections
        .bind_user(connection_id, actor.user_id, actor.role)
    {
        tracing::warn!(connection_id = %connection_id, error = %e, "Connection gone during join");
        return Err(None);
    }

    let reply = ServerMessage::Joined {
        user_id: actor.user_id.to_uuid(),
        display_name: actor.name().to_string(),
        role: actor.role,
    };
    Ok((actor, reply))
}
