//! Ports for identity verification and outbound delivery.

use tidewatch_domain::{
    CombatSessionId, ConnectionId, DisplayName, Role, RoomId, UserId,
};
use tidewatch_shared::{CombatPayload, RoomPayload, ServerMessage, TerminationReason};

use super::error::IdentityError;

// =============================================================================
// Identity
// =============================================================================

/// A caller identity established from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub role: Role,
}

/// Verifies the opaque token a client presents when joining.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityPort: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

// =============================================================================
// Broadcast
// =============================================================================

/// An event published to a room. The broadcaster stamps it with the room's
/// next sequence number when it goes out.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    State(RoomPayload),
    Combat {
        session_id: CombatSessionId,
        payload: CombatPayload,
    },
}

/// Fan-out of server messages to live connections.
///
/// Delivery is best-effort: a slow or gone connection never blocks the
/// publisher. Events published to one room reach every subscriber in
/// publish order.
#[cfg_attr(test, mockall::automock)]
pub trait Broadcaster: Send + Sync {
    /// Publish to every subscriber of `room_id`. Returns the sequence number
    /// assigned to the event, or 0 when the room has no subscribers.
    fn publish(&self, room_id: &RoomId, event: RoomEvent) -> u64;

    /// Send to one connection. Returns `false` if it could not be queued.
    fn send(&self, connection_id: ConnectionId, message: ServerMessage) -> bool;

    /// Send to every connection of a user. Returns how many were reached.
    fn send_to_user(&self, user_id: UserId, message: ServerMessage) -> usize;

    fn connections_of(&self, user_id: UserId) -> Vec<ConnectionId>;

    /// Returns `true` if the connection was not already subscribed.
    fn subscribe(&self, connection_id: ConnectionId, room_id: &RoomId) -> bool;

    /// Returns `true` if the connection had been subscribed.
    fn unsubscribe(&self, connection_id: ConnectionId, room_id: &RoomId) -> bool;

    /// Tell the client why, close the socket and forget the connection.
    fn terminate(&self, connection_id: ConnectionId, reason: TerminationReason);
}
