//! Cooldown gate.
//!
//! Per-user, per-action throttling. Admission and the start of the next
//! window are one atomic store operation, and windows are keyed by user so
//! they survive reconnects.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tidewatch_domain::cooldown::fishing_cooldown;
use tidewatch_domain::{ActionKind, Admission, CooldownRecord, UserId};

use super::error::{ActionError, Rejection};
use crate::infrastructure::ports::{ClockPort, CooldownRepo, RepoError};

/// Cooldown lengths per action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownDurations {
    pub fishing_base: Duration,
    /// Subtracted from `fishing_base` per point of fishing skill.
    pub fishing_reduction: Duration,
    pub exploration: Duration,
    pub raid: Duration,
}

impl Default for CooldownDurations {
    fn default() -> Self {
        Self {
            fishing_base: Duration::from_millis(300_000),
            fishing_reduction: Duration::from_millis(15_000),
            exploration: Duration::from_millis(2_000),
            raid: Duration::from_millis(3_000),
        }
    }
}

impl CooldownDurations {
    pub fn for_action(&self, kind: ActionKind, skill: u64) -> Duration {
        match kind {
            ActionKind::Fishing => {
                fishing_cooldown(self.fishing_base, self.fishing_reduction, skill)
            }
            ActionKind::Exploration => self.exploration,
            ActionKind::Raid => self.raid,
        }
    }
}

pub struct CooldownGate {
    repo: Arc<dyn CooldownRepo>,
    clock: Arc<dyn ClockPort>,
    durations: CooldownDurations,
}

impl CooldownGate {
    pub fn new(
        repo: Arc<dyn CooldownRepo>,
        clock: Arc<dyn ClockPort>,
        durations: CooldownDurations,
    ) -> Self {
        Self {
            repo,
            clock,
            durations,
        }
    }

    /// Raw check-and-set with an explicit duration.
    pub async fn try_start(
        &self,
        user_id: UserId,
        kind: ActionKind,
        duration: Duration,
    ) -> Result<Admission, RepoError> {
        self.repo
            .try_start(user_id, kind, self.clock.now(), duration)
            .await
    }

    /// Admit `kind` for `user_id`, using the configured duration for the
    /// user's skill. Returns when the new window ends.
    pub async fn admit(
        &self,
        user_id: UserId,
        kind: ActionKind,
        skill: u64,
    ) -> Result<DateTime<Utc>, ActionError> {
        let duration = self.durations.for_action(kind, skill);
        match self.try_start(user_id, kind, duration).await? {
            Admission::Admitted { ends_at } => Ok(ends_at),
            Admission::Rejected { remaining } => {
                tracing::debug!(
                    user_id = %user_id,
                    kind = %kind,
                    remaining_ms = remaining.as_millis() as u64,
                    "Cooldown active"
                );
                Err(Rejection::cooldown(remaining).into())
            }
        }
    }

    /// Hand back a window opened by [`admit`](Self::admit) for an action
    /// that was then rejected. Failure is logged; the window then simply
    /// runs out.
    pub async fn refund(&self, user_id: UserId, kind: ActionKind, ends_at: DateTime<Utc>) {
        match self.repo.release(user_id, kind, ends_at).await {
            Ok(released) => {
                tracing::debug!(user_id = %user_id, kind = %kind, released, "Cooldown refunded");
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, kind = %kind, error = %e, "Cooldown refund failed");
            }
        }
    }

    /// Windows still running for a user.
    pub async fn active(&self, user_id: UserId) -> Result<Vec<CooldownRecord>, RepoError> {
        let now = self.clock.now();
        let records = self.repo.list_for_user(user_id).await?;
        Ok(records.into_iter().filter(|r| r.is_active(now)).collect())
    }

    /// Drop elapsed windows. Purely housekeeping; an elapsed record already
    /// admits the next action.
    pub async fn sweep(&self) -> Result<u64, RepoError> {
        self.repo.sweep_expired(self.clock.now()).await
    }

    pub fn durations(&self) -> &CooldownDurations {
        &self.durations
    }
}
