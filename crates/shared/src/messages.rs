//! WebSocket message types for engine-client communication
//!
//! This module contains every message exchanged over the WebSocket connection.
//! The engine receives `ClientMessage` and sends `ServerMessage`.
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Removing variants requires major version bump
//! - Renaming variants is a breaking change
//! - Unknown server message variants deserialize to `Unknown` on the client
//! - Unknown client message variants are rejected by the engine with `PARSE_ERROR`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tidewatch_domain::{ActionKind, Role};

/// Error code sent when an inbound frame does not parse.
pub const PARSE_ERROR: &str = "PARSE_ERROR";

// =============================================================================
// Client Messages (client → engine)
// =============================================================================

/// Messages from a client to the engine.
///
/// Gameplay messages may carry a client-chosen `nonce`. A nonce seen twice for
/// the same user within the replay window is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message on every connection.
    Join { token: String },
    ChatMessage {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
    },
    FishingAttempt {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
    },
    RaidSummon {
        room_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
    },
    RaidAttack {
        session_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
    },
    ExpeditionStart {
        room_id: String,
        area: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
    },
    ExpeditionAttack {
        session_id: Uuid,
        target_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<String>,
    },
    ChallengeResponse { text: String },
    SubscribeRoom { room_id: String },
    UnsubscribeRoom { room_id: String },
    Heartbeat,
}

impl ClientMessage {
    /// Wire name of the message, used in `Rejected::action`.
    pub fn action_name(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::ChatMessage { .. } => "chat_message",
            ClientMessage::FishingAttempt { .. } => "fishing_attempt",
            ClientMessage::RaidSummon { .. } => "raid_summon",
            ClientMessage::RaidAttack { .. } => "raid_attack",
            ClientMessage::ExpeditionStart { .. } => "expedition_start",
            ClientMessage::ExpeditionAttack { .. } => "expedition_attack",
            ClientMessage::ChallengeResponse { .. } => "challenge_response",
            ClientMessage::SubscribeRoom { .. } => "subscribe_room",
            ClientMessage::UnsubscribeRoom { .. } => "unsubscribe_room",
            ClientMessage::Heartbeat => "heartbeat",
        }
    }

    pub fn nonce(&self) -> Option<&str> {
        match self {
            ClientMessage::ChatMessage { nonce, .. }
            | ClientMessage::FishingAttempt { nonce }
            | ClientMessage::RaidSummon { nonce, .. }
            | ClientMessage::RaidAttack { nonce, .. }
            | ClientMessage::ExpeditionStart { nonce, .. }
            | ClientMessage::ExpeditionAttack { nonce, .. } => nonce.as_deref(),
            _ => None,
        }
    }

    /// Messages blocked while an anti-automation challenge is outstanding.
    pub fn is_gameplay(&self) -> bool {
        !matches!(
            self,
            ClientMessage::Join { .. }
                | ClientMessage::ChallengeResponse { .. }
                | ClientMessage::Heartbeat
        )
    }
}

// =============================================================================
// Server Messages (engine → client)
// =============================================================================

/// Messages from the engine to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Joined {
        user_id: Uuid,
        display_name: String,
        role: Role,
    },
    /// A change to room-wide state. `seq` increases by one per room publish.
    StateUpdate {
        room_id: String,
        seq: u64,
        payload: RoomPayload,
    },
    /// A change to one combat session, published to its room.
    CombatResult {
        room_id: String,
        session_id: Uuid,
        seq: u64,
        payload: CombatPayload,
    },
    /// Answer with `challenge_response` before `deadline` or the connection ends.
    ChallengeIssued {
        word: String,
        deadline: DateTime<Utc>,
    },
    ChallengePassed,
    /// Sent immediately before the engine closes the socket.
    ConnectionTerminated { reason: TerminationReason },
    /// An action was refused. Nothing changed.
    Rejected {
        action: String,
        reason: RejectionCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_ms: Option<u64>,
    },
    FishingResult {
        fish: String,
        rank: u32,
        price: u64,
        total_fish: u64,
        next_cast_at: DateTime<Utc>,
    },
    ExpeditionStarted {
        session_id: Uuid,
        room_id: String,
        area: String,
        targets: Vec<TargetView>,
        activates_at: DateTime<Utc>,
    },
    Subscribed { room_id: String },
    Unsubscribed { room_id: String },
    Pong,
    Error { code: String, message: String },
    /// Unknown message type for forward compatibility
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn rejected(
        action: impl Into<String>,
        reason: RejectionCode,
        message: impl Into<String>,
    ) -> Self {
        ServerMessage::Rejected {
            action: action.into(),
            reason,
            message: message.into(),
            retry_after_ms: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Room-wide event bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomPayload {
    Chat {
        user_id: Uuid,
        display_name: String,
        content: String,
        sent_at: DateTime<Utc>,
    },
    FishCaught {
        user_id: Uuid,
        display_name: String,
        fish: String,
        rank: u32,
    },
    RaidSummoned {
        session_id: Uuid,
        tier: String,
        boss_name: String,
        max_health: u64,
        activates_at: DateTime<Utc>,
        /// `None` for scheduled summons.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summoned_by: Option<String>,
    },
    Announcement { message: String },
}

/// Combat session event bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatPayload {
    Activated {
        targets: Vec<TargetView>,
    },
    Attack {
        user_id: Uuid,
        display_name: String,
        target_id: Uuid,
        damage: u64,
        target_health: u64,
        session_health: u64,
        max_health: u64,
    },
    Defeated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finisher: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finisher_name: Option<String>,
        rankings: Vec<RankingView>,
    },
    RewardsDistributed {
        rewards: Vec<RewardView>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetView {
    pub target_id: Uuid,
    pub name: String,
    pub health: u64,
    pub max_health: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingView {
    pub rank: u32,
    pub user_id: Uuid,
    pub display_name: String,
    pub damage: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardView {
    pub user_id: Uuid,
    pub kind: String,
    pub amount: u64,
}

// =============================================================================
// Rejection and termination codes
// =============================================================================

/// Fixed taxonomy of refusals. The first group are ordinary rejections; `Busy`
/// and `Unavailable` are transient and safe to resubmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    CooldownActive,
    InsufficientResource,
    InventoryFull,
    InvalidTarget,
    TargetDefeated,
    NotYetActive,
    AlreadyActive,
    Replayed,
    Malformed,
    ChallengePending,
    NotJoined,
    Busy,
    Unavailable,
}

impl RejectionCode {
    pub fn is_transient(self) -> bool {
        matches!(self, RejectionCode::Busy | RejectionCode::Unavailable)
    }
}

/// Why the engine closed a connection. Each maps to a distinct close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    ChallengeFailed,
    ChallengeTimeout,
    IdentityRejected,
    MalformedHandshake,
}

impl TerminationReason {
    /// Application close code (4000-4999 range).
    pub fn close_code(self) -> u16 {
        match self {
            TerminationReason::ChallengeFailed => 4001,
            TerminationReason::ChallengeTimeout => 4002,
            TerminationReason::IdentityRejected => 4003,
            TerminationReason::MalformedHandshake => 4004,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TerminationReason::ChallengeFailed => "challenge_failed",
            TerminationReason::ChallengeTimeout => "challenge_timeout",
            TerminationReason::IdentityRejected => "identity_rejected",
            TerminationReason::MalformedHandshake => "malformed_handshake",
        }
    }
}

/// Cooldown remaining for one action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownView {
    pub kind: ActionKind,
    pub remaining_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"raid_summon","room_id":"raid:beginner"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::RaidSummon {
                room_id: "raid:beginner".into(),
                nonce: None
            }
        );
        assert_eq!(msg.action_name(), "raid_summon");

        let heartbeat: ClientMessage = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(heartbeat, ClientMessage::Heartbeat);
    }

    #[test]
    fn unknown_or_incomplete_client_messages_fail() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"raid_attack"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(
            r#"{"type":"raid_attack","session_id":"nope"}"#
        )
        .is_err());
    }

    #[test]
    fn nonce_is_exposed_for_gameplay_messages() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"fishing_attempt","nonce":"n-1"}"#).unwrap();
        assert_eq!(msg.nonce(), Some("n-1"));
        assert!(msg.is_gameplay());
        assert!(!ClientMessage::ChallengeResponse { text: "x".into() }.is_gameplay());
    }

    #[test]
    fn termination_serializes_reason_in_snake_case() {
        let json = serde_json::to_value(ServerMessage::ConnectionTerminated {
            reason: TerminationReason::ChallengeTimeout,
        })
        .unwrap();
        assert_eq!(json["type"], "connection_terminated");
        assert_eq!(json["reason"], "challenge_timeout");
        assert_eq!(TerminationReason::ChallengeTimeout.close_code(), 4002);
    }

    #[test]
    fn rejection_omits_missing_retry_hint() {
        let json = serde_json::to_value(ServerMessage::rejected(
            "raid_attack",
            RejectionCode::TargetDefeated,
            "target already defeated",
        ))
        .unwrap();
        assert_eq!(json["reason"], "target_defeated");
        assert!(json.get("retry_after_ms").is_none());
    }

    #[test]
    fn unknown_server_messages_deserialize_to_unknown() {
        let msg: ServerMessage = serde_json::from_str(r#"{"type":"weather_changed"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }
}
