//! Lobby chat.

use std::sync::Arc;

use tidewatch_domain::RoomId;
use tidewatch_shared::RoomPayload;

use super::error::Rejection;
use super::validation::validate_chat;
use super::Actor;
use crate::infrastructure::ports::{Broadcaster, ClockPort, RoomEvent};

pub struct ChatService {
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn ClockPort>,
}

impl ChatService {
    pub fn new(broadcaster: Arc<dyn Broadcaster>, clock: Arc<dyn ClockPort>) -> Self {
        Self { broadcaster, clock }
    }

    /// Broadcast a message to the lobby. Returns the room sequence number.
    pub fn send(&self, actor: &Actor, content: &str) -> Result<u64, Rejection> {
        let content = validate_chat(content)?;
        let seq = self.broadcaster.publish(
            &RoomId::lobby(),
            RoomEvent::State(RoomPayload::Chat {
                user_id: actor.user_id.to_uuid(),
                display_name: actor.name().to_string(),
                content,
                sent_at: self.clock.now(),
            }),
        );
        tracing::debug!(user_id = %actor.user_id, seq, "Chat message published");
        Ok(seq)
    }
}
