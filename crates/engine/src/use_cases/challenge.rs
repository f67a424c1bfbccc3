//! Anti-automation challenge controller.
//!
//! Per connection: `Idle -> Issued -> {Passed | Failed | Expired}`. At most one
//! challenge is outstanding per connection, and failing or missing it ends
//! the connection.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tidewatch_domain::challenge::{challenge_word, CHALLENGE_WORDS};
use tidewatch_domain::{ChallengeOutcome, ChallengeRecord, ConnectionId, UserId};
use tidewatch_shared::{ServerMessage, TerminationReason};

use super::error::Rejection;
use crate::infrastructure::ports::{Broadcaster, ClockPort, RandomPort};
use crate::infrastructure::scheduler::{Deadline, DeadlineScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeSettings {
    pub timeout: Duration,
    /// Chance in percent that [`ChallengeController::maybe_issue`] fires.
    pub probability_percent: u32,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            probability_percent: 2,
        }
    }
}

pub struct ChallengeController {
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    scheduler: Arc<DeadlineScheduler>,
    settings: ChallengeSettings,
    pending: DashMap<ConnectionId, ChallengeRecord>,
}

impl ChallengeController {
    pub fn new(
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        scheduler: Arc<DeadlineScheduler>,
        settings: ChallengeSettings,
    ) -> Self {
        Self {
            broadcaster,
            clock,
            random,
            scheduler,
            settings,
            pending: DashMap::new(),
        }
    }

    /// Issue a challenge. Returns `None` when one is already outstanding for
    /// the connection; that challenge and its deadline stay as they are.
    pub async fn issue(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
    ) -> Option<ChallengeRecord> {
        let record = match self.pending.entry(connection_id) {
            Entry::Occupied(_) => {
                tracing::debug!(connection_id = %connection_id, "Challenge already pending");
                return None;
            }
            Entry::Vacant(slot) => {
                let last = i32::try_from(CHALLENGE_WORDS.len() - 1).unwrap_or(0);
                let roll = usize::try_from(self.random.gen_range(0, last)).unwrap_or(0);
                let now = self.clock.now();
                let timeout = chrono::TimeDelta::from_std(self.settings.timeout)
                    .unwrap_or(chrono::TimeDelta::seconds(60));
                let record = ChallengeRecord::new(
                    connection_id,
                    user_id,
                    challenge_word(roll),
                    now,
                    now + timeout,
                );
                slot.insert(record.clone());
                record
            }
        };

        self.scheduler
            .schedule_after(self.settings.timeout, Deadline::ChallengeExpiry(connection_id))
            .await;
        self.broadcaster.send(
            connection_id,
            ServerMessage::ChallengeIssued {
                word: record.word().to_string(),
                deadline: record.deadline(),
            },
        );

        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            deadline = %record.deadline(),
            "Challenge issued"
        );
        Some(record)
    }

    /// Roll against the configured probability and issue on a hit.
    pub async fn maybe_issue(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
    ) -> Option<ChallengeRecord> {
        let roll = self.random.gen_range(1, 100);
        if i64::from(roll) > i64::from(self.settings.probability_percent) {
            return None;
        }
        self.issue(connection_id, user_id).await
    }

    /// Challenge every live connection of a user. Returns how many were
    /// newly issued.
    pub async fn issue_for_user(&self, user_id: UserId) -> usize {
        let mut issued = 0;
        for connection_id in self.broadcaster.connections_of(user_id) {
            if self.issue(connection_id, user_id).await.is_some() {
                issued += 1;
            }
        }
        issued
    }

    /// Judge a response. Anything but an exact match before the deadline
    /// terminates the connection.
    pub fn respond(
        &self,
        connection_id: ConnectionId,
        response: &str,
    ) -> Result<ChallengeOutcome, Rejection> {
        let Some((_, record)) = self.pending.remove(&connection_id) else {
            return Err(Rejection::malformed("No challenge is pending"));
        };

        let outcome = record.judge(response, self.clock.now());
        match outcome {
            ChallengeOutcome::Passed => {
                self.broadcaster
                    .send(connection_id, ServerMessage::ChallengePassed);
                tracing::info!(connection_id = %connection_id, "Challenge passed");
            }
            ChallengeOutcome::Failed => {
                self.terminate(&record, TerminationReason::ChallengeFailed);
            }
            ChallengeOutcome::Expired => {
                self.terminate(&record, TerminationReason::ChallengeTimeout);
            }
        }
        Ok(outcome)
    }

    /// Deadline callback. Terminates the connection if its challenge is still
    /// unanswered and past due.
    pub async fn expire(&self, connection_id: ConnectionId) -> Option<ChallengeOutcome> {
        let now = self.clock.now();
        let record = self
            .pending
            .remove_if(&connection_id, |_, record| record.is_expired(now))
            .map(|(_, record)| record);

        let Some(record) = record else {
            // Answered already, or a newer challenge with a later deadline.
            if let Some(pending) = self.pending.get(&connection_id) {
                let remaining = (pending.deadline() - now).to_std().unwrap_or(Duration::ZERO);
                drop(pending);
                self.scheduler
                    .schedule_after(remaining, Deadline::ChallengeExpiry(connection_id))
                    .await;
            }
            return None;
        };

        self.terminate(&record, TerminationReason::ChallengeTimeout);
        Some(ChallengeOutcome::Expired)
    }

    pub fn is_pending(&self, connection_id: ConnectionId) -> bool {
        self.pending.contains_key(&connection_id)
    }

    /// Forget a connection's challenge when it disconnects.
    pub fn clear(&self, connection_id: ConnectionId) {
        self.pending.remove(&connection_id);
    }

    fn terminate(&self, record: &ChallengeRecord, reason: TerminationReason) {
        tracing::warn!(
            connection_id = %record.connection_id(),
            user_id = %record.user_id(),
            reason = reason.as_str(),
            "Challenge not passed, terminating connection"
        );
        self.broadcaster.terminate(record.connection_id(), reason);
    }
}
