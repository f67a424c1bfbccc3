//! Errors shared by the gameplay use cases.

use std::time::Duration;

use tidewatch_domain::{AttackRejection, CombatSessionId, DomainError};
use tidewatch_shared::{RejectionCode, ServerMessage};

use crate::infrastructure::ports::RepoError;

/// An expected, non-exceptional refusal. Nothing was mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    pub code: RejectionCode,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl Rejection {
    pub fn new(code: RejectionCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn cooldown(remaining: Duration) -> Self {
        let millis = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
        let seconds = millis.div_ceil(1000);
        Self {
            code: RejectionCode::CooldownActive,
            message: format!("Cooldown active, {seconds} seconds remaining"),
            retry_after: Some(remaining),
        }
    }

    pub fn insufficient(kind: &str, available: u64, required: u64) -> Self {
        Self::new(
            RejectionCode::InsufficientResource,
            format!("Not enough {kind}: have {available}, need {required}"),
        )
    }

    pub fn inventory_full(limit: u64) -> Self {
        Self::new(
            RejectionCode::InventoryFull,
            format!("Fish storage is full ({limit} fish)"),
        )
    }

    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::new(RejectionCode::InvalidTarget, message)
    }

    pub fn target_defeated() -> Self {
        Self::new(RejectionCode::TargetDefeated, "target already defeated")
    }

    pub fn not_yet_active() -> Self {
        Self::new(RejectionCode::NotYetActive, "target is not yet attackable")
    }

    pub fn already_active(room: &str) -> Self {
        Self::new(
            RejectionCode::AlreadyActive,
            format!("An encounter is already active in {room}"),
        )
    }

    pub fn replayed() -> Self {
        Self::new(RejectionCode::Replayed, "Request was already processed")
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(RejectionCode::Malformed, message)
    }

    pub fn challenge_pending() -> Self {
        Self::new(
            RejectionCode::ChallengePending,
            "Answer the pending challenge first",
        )
    }

    /// The wire form of this rejection for `action`.
    pub fn into_message(self, action: &str) -> ServerMessage {
        ServerMessage::Rejected {
            action: action.to_string(),
            reason: self.code,
            message: self.message,
            retry_after_ms: self
                .retry_after
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

impl From<AttackRejection> for Rejection {
    fn from(rejection: AttackRejection) -> Self {
        match rejection {
            AttackRejection::NotYetActive => Rejection::not_yet_active(),
            AttackRejection::AlreadyDefeated => Rejection::target_defeated(),
            AttackRejection::InvalidTarget => Rejection::invalid_target(rejection.to_string()),
        }
    }
}

/// Failure of a gameplay action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    /// Contention on a combat session outlasted the retry budget. Safe to resubmit.
    #[error("Combat session {0} is busy")]
    Busy(CombatSessionId),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl From<AttackRejection> for ActionError {
    fn from(rejection: AttackRejection) -> Self {
        ActionError::Rejected(rejection.into())
    }
}

impl From<DomainError> for ActionError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InsufficientResource {
                kind,
                available,
                required,
            } => ActionError::Rejected(Rejection::insufficient(&kind, available, required)),
            other => ActionError::Rejected(Rejection::malformed(other.to_string())),
        }
    }
}
