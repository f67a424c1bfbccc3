//! Connection management for WebSocket clients.
//!
//! Tracks connected clients, the user behind each one and the rooms they
//! subscribe to. This is the engine's [`Broadcaster`]: every outbound message
//! goes through a connection's bounded channel, so a slow client only ever
//! loses its own messages.

use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tidewatch_domain::{ConnectionId, Role, RoomId, UserId};
use tidewatch_shared::{ServerMessage, TerminationReason};

use crate::infrastructure::ports::{Broadcaster, RoomEvent};

/// What the socket writer task is asked to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMessage),
    /// Send `connection_terminated`, then a close frame, then stop.
    Close(TerminationReason),
}

/// Information about a connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub connection_id: ConnectionId,
    /// Set once the join handshake succeeds.
    pub user_id: Option<UserId>,
    pub role: Option<Role>,
}

struct Connection {
    info: ConnectionInfo,
    sender: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
    rooms: HashSet<RoomId>,
}

#[derive(Default)]
struct Room {
    seq: u64,
    subscribers: HashSet<ConnectionId>,
}

/// Manages all active WebSocket connections.
///
/// Lock order: a room entry may be held while a connection entry is read,
/// never the other way round.
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Connection>,
    rooms: DashMap<RoomId, Room>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    /// Register a new connection. The returned token is cancelled when the
    /// engine terminates the connection.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::Sender<Outbound>,
    ) -> CancellationToken {
        let cancel = CancellationToken::new();
        self.connections.insert(
            connection_id,
            Connection {
                info: ConnectionInfo {
                    connection_id,
                    user_id: None,
                    role: None,
                },
                sender,
                cancel: cancel.clone(),
                rooms: HashSet::new(),
            },
        );
        tracing::debug!(connection_id = %connection_id, "Connection registered");
        cancel
    }

    /// Record who is behind a connection after a successful join.
    pub fn bind_user(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        role: Role,
    ) -> Result<(), ConnectionError> {
        let mut connection = self
            .connections
            .get_mut(&connection_id)
            .ok_or(ConnectionError::NotFound)?;
        connection.info.user_id = Some(user_id);
        connection.info.role = Some(role);
        tracing::info!(connection_id = %connection_id, user_id = %user_id, "Connection joined");
        Ok(())
    }

    /// Unregister a connection and drop all of its subscriptions.
    pub fn unregister(&self, connection_id: ConnectionId) {
        let Some((_, connection)) = self.connections.remove(&connection_id) else {
            return;
        };
        for room_id in &connection.rooms {
            self.leave_room(connection_id, room_id);
        }
        tracing::debug!(connection_id = %connection_id, "Connection unregistered");
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections
            .get(&connection_id)
            .map(|connection| connection.info.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of connections subscribed to a room.
    pub fn room_size(&self, room_id: &RoomId) -> usize {
        self.rooms
            .get(room_id)
            .map(|room| room.subscribers.len())
            .unwrap_or(0)
    }

    /// Number of rooms with at least one subscriber.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// A room is dropped with its last subscriber, so its `seq` starts over
    /// if anyone subscribes again.
    fn leave_room(&self, connection_id: ConnectionId, room_id: &RoomId) -> bool {
        let removed = match self.rooms.get_mut(room_id) {
            Some(mut room) => room.subscribers.remove(&connection_id),
            None => return false,
        };
        self.rooms
            .remove_if(room_id, |_, room| room.subscribers.is_empty());
        removed
    }

    fn deliver(&self, connection_id: ConnectionId, outbound: Outbound) -> bool {
        let Some(connection) = self.connections.get(&connection_id) else {
            return false;
        };
        match connection.sender.try_send(outbound) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to queue message for connection"
                );
                false
            }
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for ConnectionManager {
    fn publish(&self, room_id: &RoomId, event: RoomEvent) -> u64 {
        // The entry guard is held until every subscriber's channel has the
        // event, so two publishes to one room cannot interleave.
        let Some(mut room) = self.rooms.get_mut(room_id) else {
            tracing::trace!(room_id = %room_id, "No subscribers, event dropped");
            return 0;
        };
        room.seq += 1;
        let seq = room.seq;

        let message = match event {
            RoomEvent::State(payload) => ServerMessage::StateUpdate {
                room_id: room_id.to_string(),
                seq,
                payload,
            },
            RoomEvent::Combat {
                session_id,
                payload,
            } => ServerMessage::CombatResult {
                room_id: room_id.to_string(),
                session_id: *session_id.as_uuid(),
                seq,
                payload,
            },
        };

        for connection_id in room.subscribers.iter() {
            self.deliver(*connection_id, Outbound::Message(message.clone()));
        }
        tracing::trace!(room_id = %room_id, seq, "Published room event");
        seq
    }

    fn send(&self, connection_id: ConnectionId, message: ServerMessage) -> bool {
        self.deliver(connection_id, Outbound::Message(message))
    }

    fn send_to_user(&self, user_id: UserId, message: ServerMessage) -> usize {
        self.connections_of(user_id)
            .into_iter()
            .filter(|connection_id| self.send(*connection_id, message.clone()))
            .count()
    }

    fn connections_of(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|entry| entry.info.user_id == Some(user_id))
            .map(|entry| *entry.key())
            .collect()
    }

    fn subscribe(&self, connection_id: ConnectionId, room_id: &RoomId) -> bool {
        {
            let Some(mut connection) = self.connections.get_mut(&connection_id) else {
                return false;
            };
            if !connection.rooms.insert(room_id.clone()) {
                return false;
            }
        }
        self.rooms
            .entry(room_id.clone())
            .or_default()
            .subscribers
            .insert(connection_id)
    }

    fn unsubscribe(&self, connection_id: ConnectionId, room_id: &RoomId) -> bool {
        if let Some(mut connection) = self.connections.get_mut(&connection_id) {
            connection.rooms.remove(room_id);
        }
        self.leave_room(connection_id, room_id)
    }

    fn terminate(&self, connection_id: ConnectionId, reason: TerminationReason) {
        let Some((_, connection)) = self.connections.remove(&connection_id) else {
            return;
        };
        for room_id in &connection.rooms {
            self.leave_room(connection_id, room_id);
        }
        if let Err(e) = connection.sender.try_send(Outbound::Close(reason)) {
            tracing::warn!(
                connection_id = %connection_id,
                error = %e,
                "Failed to queue close for terminated connection"
            );
        }
        connection.cancel.cancel();
        tracing::info!(
            connection_id = %connection_id,
            reason = reason.as_str(),
            "Connection terminated"
        );
    }
}

/// Errors that can occur in connection management.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection not found")]
    NotFound,
}
