//! WebSocket handling for game clients.
//!
//! Every connection starts with a `join` handshake carrying an identity
//! token. After that, frames are parsed into `ClientMessage`s, gated by the
//! anti-automation challenge and the replay guard, and dispatched to the
//! `ws_*` handlers. Outbound traffic goes through the connection's channel
//! in the [`ConnectionManager`] so room broadcasts and direct replies share
//! one ordered stream.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header::ORIGIN, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

mod ws_challenge;
mod ws_chat;
mod ws_expedition;
mod ws_fishing;
mod ws_raid;
mod ws_rooms;
mod ws_session;

pub mod error_sanitizer;

#[cfg(test)]
pub(crate) mod test_support;


use tidewatch_domain::ConnectionId;
use tidewatch_shared::{ClientMessage, ServerMessage, TerminationReason, PARSE_ERROR};

use super::connections::{ConnectionManager, Outbound};
use crate::app::App;
use crate::infrastructure::ports::Broadcaster;
use crate::use_cases::{Actor, Rejection};

/// Buffer size for per-connection message channel.
const CONNECTION_CHANNEL_BUFFER: usize = 256;

/// How long the writer may keep flushing after the reader has stopped.
const SEND_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Combined state for WebSocket handlers.
pub struct WsState {
    pub app: Arc<App>,
    pub connections: Arc<ConnectionManager>,
    /// Browser origins allowed to upgrade. Empty allows any.
    pub allowed_origins: Vec<String>,
}

impl WsState {
    /// Clients that send no `Origin` header are not browsers and are let
    /// through; the identity token still has to verify.
    fn origin_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            _ if self.allowed_origins.is_empty() => true,
            None => true,
            Some(origin) => self.allowed_origins.iter().any(|allowed| allowed == origin),
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<WsState>>,
) -> Response {
    let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());
    if !state.origin_allowed(origin) {
        tracing::warn!(origin = ?origin, "WebSocket upgrade refused for origin");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let connection_id = ConnectionId::new();

    // Create a bounded channel for sending messages to this client
    let (tx, mut rx) = mpsc::channel::<Outbound>(CONNECTION_CHANNEL_BUFFER);
    let cancel = state.connections.register(connection_id, tx.clone());

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    // Spawn a task to forward messages from the channel to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Message(msg) => {
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Outbound::Close(reason) => {
                    let notice = ServerMessage::ConnectionTerminated { reason };
                    if let Ok(json) = serde_json::to_string(&notice) {
                        let _ = ws_sender.send(Message::Text(json.into())).await;
                    }
                    let frame = CloseFrame {
                        code: reason.close_code(),
                        reason: reason.as_str().into(),
                    };
                    let _ = ws_sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    let mut actor: Option<Actor> = None;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            next = ws_receiver.next() => match next {
                Some(result) => result,
                None => break,
            },
        };

        match result {
            Ok(Message::Text(text)) => {
                let parsed = serde_json::from_str::<ClientMessage>(text.as_str());
                let response = match actor.as_ref() {
                    None => handle_handshake(parsed, &state, connection_id, &mut actor).await,
                    Some(joined) => match parsed {
                        Ok(msg) => handle_message(msg, &state, joined).await,
                        Err(e) => {
                            tracing::warn!(connection_id = %connection_id, error = %e, "Failed to parse message");
                            Some(ServerMessage::error(
                                PARSE_ERROR,
                                format!("Invalid message format: {}", e),
                            ))
                        }
                    },
                };
                if let Some(response) = response {
                    if tx.try_send(Outbound::Message(response)).is_err() {
                        tracing::warn!(
                            connection_id = %connection_id,
                            "Failed to send response, channel full or closed"
                        );
                    }
                }
            }
            Ok(Message::Binary(_)) if actor.is_none() => {
                state
                    .connections
                    .terminate(connection_id, TerminationReason::MalformedHandshake);
            }
            Ok(Message::Close(_)) => {
                tracing::info!(connection_id = %connection_id, "WebSocket closed by client");
                break;
            }
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    // Clean up
    state.app.use_cases.challenge.clear(connection_id);
    state.connections.unregister(connection_id);
    drop(tx);
    if tokio::time::timeout(SEND_DRAIN_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        send_task.abort();
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// The first frame must be a `join`. Anything else ends the connection.
async fn handle_handshake(
    parsed: Result<ClientMessage, serde_json::Error>,
    state: &WsState,
    connection_id: ConnectionId,
    actor: &mut Option<Actor>,
) -> Option<ServerMessage> {
    let token = match parsed {
        Ok(ClientMessage::Join { token }) => token,
        Ok(other) => {
            tracing::warn!(
                connection_id = %connection_id,
                action = other.action_name(),
                "First message was not a join"
            );
            state
                .connections
                .terminate(connection_id, TerminationReason::MalformedHandshake);
            return None;
        }
        Err(e) => {
            tracing::warn!(connection_id = %connection_id, error = %e, "Unparseable handshake");
            state
                .connections
                .terminate(connection_id, TerminationReason::MalformedHandshake);
            return None;
        }
    };

    match ws_session::handle_join(state, connection_id, &token).await {
        Ok((joined, reply)) => {
            *actor = Some(joined);
            Some(reply)
        }
        Err(reply) => reply,
    }
}

/// Dispatch a parsed client message from a joined connection.
async fn handle_message(
    msg: ClientMessage,
    state: &WsState,
    actor: &Actor,
) -> Option<ServerMessage> {
    let action = msg.action_name();

    if msg.is_gameplay() {
        if state.app.use_cases.challenge.is_pending(actor.connection_id) {
            tracing::debug!(connection_id = %actor.connection_id, action, "Blocked by pending challenge");
            return Some(Rejection::challenge_pending().into_message(action));
        }
        if let Err(rejection) = state
            .app
            .use_cases
            .validator
            .check_nonce(actor.user_id, msg.nonce())
            .await
        {
            tracing::debug!(user_id = %actor.user_id, action, "Nonce refused");
            return Some(rejection.into_message(action));
        }
    }

    match msg {
        ClientMessage::Heartbeat => Some(ServerMessage::Pong),
        ClientMessage::Join { .. } => {
            Some(Rejection::malformed("Connection has already joined").into_message(action))
        }
        ClientMessage::ChatMessage { content, .. } => {
            ws_chat::handle_chat_message(state, actor, &content)
        }
        ClientMessage::FishingAttempt { .. } => {
            ws_fishing::handle_fishing_attempt(state, actor).await
        }
        ClientMessage::RaidSummon { room_id, .. } => {
            ws_raid::handle_raid_summon(state, actor, &room_id).await
        }
        ClientMessage::RaidAttack { session_id, .. } => {
            ws_raid::handle_raid_attack(state, actor, session_id).await
        }
        ClientMessage::ExpeditionStart { room_id, area, .. } => {
            ws_expedition::handle_expedition_start(state, actor, &room_id, &area).await
        }
        ClientMessage::ExpeditionAttack {
            session_id,
            target_id,
            ..
        } => ws_expedition::handle_expedition_attack(state, actor, session_id, target_id).await,
        ClientMessage::ChallengeResponse { text } => {
            ws_challenge::handle_challenge_response(state, actor, &text)
        }
        ClientMessage::SubscribeRoom { room_id } => {
            ws_rooms::handle_subscribe_room(state, actor, &room_id).await
        }
        ClientMessage::UnsubscribeRoom { room_id } => {
            ws_rooms::handle_unsubscribe_room(state, actor, &room_id)
        }
    }
}
