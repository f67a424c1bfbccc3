//! Error sanitization for client-facing messages.
//!
//! Prevents leaking internal details (paths, DB errors, stack traces) to clients.

use tidewatch_shared::{RejectionCode, ServerMessage};

use crate::use_cases::ActionError;

/// Sanitize a repository error.
///
/// Logs the full error server-side, returns a generic message for the client.
pub fn sanitize_repo_error<E: std::fmt::Display>(error: &E, operation: &str) -> String {
    tracing::error!(
        error = %error,
        operation = operation,
        "Repository error"
    );

    format!("Failed to {} - please try again", operation)
}

/// The reply for a failed gameplay action.
///
/// Rejections pass through as they are. Contention and storage failures are
/// reported as transient so the client knows it may resubmit.
pub fn action_error_message(error: ActionError, action: &str) -> ServerMessage {
    match error {
        ActionError::Rejected(rejection) => rejection.into_message(action),
        ActionError::Busy(session_id) => {
            tracing::debug!(session_id = %session_id, action, "Combat session busy");
            ServerMessage::rejected(
                action,
                RejectionCode::Busy,
                "The encounter is busy - please try again",
            )
        }
        ActionError::Repo(e) => ServerMessage::rejected(
            action,
            RejectionCode::Unavailable,
            sanitize_repo_error(&e, action),
        ),
    }
}
