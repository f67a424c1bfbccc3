//! Shared combat session manager.
//!
//! Owns every live encounter. Mutations on one session run one at a time
//! under that session's lock, and each one is committed to the store with a
//! versioned compare-and-swap before it becomes visible. Independent
//! sessions never share a lock.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tidewatch_domain::encounter::find_area;
use tidewatch_domain::{
    AttackOutcome, CombatSession, CombatSessionId, CombatTarget, Contribution, EncounterKind,
    ItemKind, RewardPolicy, RewardShare, RoomId, SessionPhase, TargetId, UserId,
};
use tidewatch_shared::{CombatPayload, RankingView, RewardView, TargetView};
use tokio::sync::Mutex;

use super::error::{ActionError, Rejection};
use crate::infrastructure::ports::{Broadcaster, ClockPort, CombatRepo, RepoError, RoomEvent};
use crate::infrastructure::scheduler::{Deadline, DeadlineScheduler};

/// Attempts at a versioned save before the caller is told to retry.
pub const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Delay before the first retry of a failed activation or resolution.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
/// Upper bound on the delay between retries.
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff for the `attempt`th retry, starting at 1.
pub fn retry_delay(attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    RETRY_BASE_DELAY.saturating_mul(factor).min(RETRY_MAX_DELAY)
}

/// Reward curve for an encounter kind.
pub fn reward_policy(kind: &EncounterKind) -> RewardPolicy {
    match kind {
        EncounterKind::Raid { tier } => tier.reward_policy(),
        EncounterKind::Expedition { area } => match find_area(area) {
            Some(area) => area.reward_policy(),
            None => RewardPolicy::Proportional {
                currency: ItemKind::gold(),
                pool: 0,
                finisher_bonus: None,
            },
        },
    }
}

pub fn target_views(session: &CombatSession) -> Vec<TargetView> {
    session
        .targets()
        .iter()
        .map(|t| TargetView {
            target_id: t.id().to_uuid(),
            name: t.name().to_string(),
            health: t.health(),
            max_health: t.max_health(),
        })
        .collect()
}

pub fn ranking_views(contributions: &[Contribution]) -> Vec<RankingView> {
    contributions
        .iter()
        .map(|c| RankingView {
            rank: c.rank,
            user_id: c.user_id.to_uuid(),
            display_name: c.display_name.clone(),
            damage: c.damage,
        })
        .collect()
}

pub struct CombatSessionManager {
    repo: Arc<dyn CombatRepo>,
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn ClockPort>,
    scheduler: Arc<DeadlineScheduler>,
    spawn_window: Duration,
    sessions: DashMap<CombatSessionId, Arc<Mutex<CombatSession>>>,
    /// One live session per room.
    rooms: DashMap<RoomId, CombatSessionId>,
    /// Failed attempts per deadline that is being retried.
    retries: DashMap<Deadline, u32>,
}

impl CombatSessionManager {
    pub fn new(
        repo: Arc<dyn CombatRepo>,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn ClockPort>,
        scheduler: Arc<DeadlineScheduler>,
        spawn_window: Duration,
    ) -> Self {
        Self {
            repo,
            broadcaster,
            clock,
            scheduler,
            spawn_window,
            sessions: DashMap::new(),
            rooms: DashMap::new(),
            retries: DashMap::new(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Spawn a session in `room_id`. It accepts attacks once the spawn
    /// window has passed.
    pub async fn spawn(
        &self,
        room_id: RoomId,
        kind: EncounterKind,
        targets: Vec<CombatTarget>,
    ) -> Result<CombatSession, ActionError> {
        let now = self.clock.now();
        let window = chrono::TimeDelta::from_std(self.spawn_window)
            .unwrap_or(chrono::TimeDelta::zero());
        let session = CombatSession::spawn(room_id.clone(), kind, targets, now, now + window)?;
        let session_id = session.id();

        match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(_) => return Err(Rejection::already_active(room_id.as_str()).into()),
            Entry::Vacant(slot) => {
                slot.insert(session_id);
            }
        }

        if let Err(e) = self.repo.create(&session).await {
            self.rooms.remove_if(&room_id, |_, id| *id == session_id);
            return Err(e.into());
        }

        self.sessions
            .insert(session_id, Arc::new(Mutex::new(session.clone())));
        self.scheduler
            .schedule_after(self.spawn_window, Deadline::SessionActivation(session_id))
            .await;

        tracing::info!(
            session_id = %session_id,
            room_id = %room_id,
            max_health = session.max_health(),
            "Combat session spawned"
        );
        Ok(session)
    }

    /// `Spawning -> Active`. Called when the spawn window deadline fires;
    /// a no-op for sessions that are already active or gone. A store failure
    /// leaves the session spawning and schedules another attempt.
    pub async fn activate(&self, session_id: CombatSessionId) -> Result<(), ActionError> {
        let result = self.try_activate(session_id).await;
        self.settle(Deadline::SessionActivation(session_id), result.as_ref().map(|_| ()))
            .await;
        result
    }

    async fn try_activate(&self, session_id: CombatSessionId) -> Result<(), ActionError> {
        let Some(handle) = self.handle(session_id) else {
            return Ok(());
        };
        let mut guard = handle.lock().await;
        if guard.phase() != SessionPhase::Spawning {
            return Ok(());
        }

        let now = self.clock.now();
        if now < guard.activates_at() {
            let remaining = (guard.activates_at() - now).to_std().unwrap_or(Duration::ZERO);
            self.scheduler
                .schedule_after(remaining, Deadline::SessionActivation(session_id))
                .await;
            return Ok(());
        }

        let mut next = guard.clone();
        next.activate(now)?;
        let expected = next.advance_version();
        self.repo.save(&next, expected).await?;
        *guard = next;

        self.publish(
            &guard,
            CombatPayload::Activated {
                targets: target_views(&guard),
            },
        );
        tracing::info!(session_id = %session_id, "Combat session active");
        Ok(())
    }

    /// Register interest without dealing damage.
    pub async fn join(
        &self,
        session_id: CombatSessionId,
        user_id: UserId,
        display_name: &str,
    ) -> Result<bool, ActionError> {
        let Some(handle) = self.handle(session_id) else {
            return Err(self.missing_session(session_id).await?.into());
        };
        let mut guard = handle.lock().await;
        let mut next = guard.clone();
        if !next.join(user_id, display_name)? {
            return Ok(false);
        }
        let expected = next.advance_version();
        self.repo.save(&next, expected).await?;
        *guard = next;
        Ok(true)
    }

    /// Apply one attack. Damage is clamped to the target's remaining health.
    /// The attack that defeats the last target makes its author the
    /// finisher and triggers reward distribution before this returns.
    pub async fn apply_attack(
        &self,
        session_id: CombatSessionId,
        user_id: UserId,
        display_name: &str,
        target: Option<TargetId>,
        amount: u64,
    ) -> Result<AttackOutcome, ActionError> {
        let Some(handle) = self.handle(session_id) else {
            return Err(self.missing_session(session_id).await?.into());
        };

        let outcome = {
            let mut guard = handle.lock().await;
            let outcome = self
                .commit_attack(&mut guard, user_id, display_name, target, amount)
                .await?;

            self.publish(
                &guard,
                CombatPayload::Attack {
                    user_id: user_id.to_uuid(),
                    display_name: display_name.to_string(),
                    target_id: outcome.target_id.to_uuid(),
                    damage: outcome.damage_dealt,
                    target_health: outcome.target_health,
                    session_health: guard.health(),
                    max_health: guard.max_health(),
                },
            );

            if outcome.session_defeated {
                let finisher_name = guard
                    .finisher()
                    .and_then(|id| guard.participant(id))
                    .map(|p| p.display_name().to_string());
                self.publish(
                    &guard,
                    CombatPayload::Defeated {
                        finisher: guard.finisher().map(|id| id.to_uuid()),
                        finisher_name,
                        rankings: ranking_views(&guard.ranked_contributions()),
                    },
                );
                tracing::info!(
                    session_id = %session_id,
                    finisher = %user_id,
                    "Combat session defeated"
                );
            }
            outcome
        };

        if outcome.session_defeated {
            if let Err(e) = self.resolve(session_id).await {
                // Left in Resolving with a retry scheduled; the store refuses
                // a second credit.
                tracing::error!(session_id = %session_id, error = %e, "Reward distribution failed");
            }
        }

        Ok(outcome)
    }

    /// Read-modify-write with bounded retry on version conflicts. Every
    /// retry starts from the latest stored state.
    async fn commit_attack(
        &self,
        current: &mut CombatSession,
        user_id: UserId,
        display_name: &str,
        target: Option<TargetId>,
        amount: u64,
    ) -> Result<AttackOutcome, ActionError> {
        let session_id = current.id();
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let mut next = current.clone();
            let outcome = next.apply_attack(user_id, display_name, target, amount)?;
            let expected = next.advance_version();

            match self.repo.save(&next, expected).await {
                Ok(()) => {
                    *current = next;
                    return Ok(outcome);
                }
                Err(RepoError::Conflict { .. }) => {
                    tracing::warn!(
                        session_id = %session_id,
                        attempt,
                        "Combat session version conflict, re-reading"
                    );
                    match self.repo.get(session_id).await? {
                        Some(latest) => *current = latest,
                        None => return Err(Rejection::target_defeated().into()),
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ActionError::Busy(session_id))
    }

    /// Distribute rewards and retire a defeated session. Returns the shares
    /// paid, or `None` if there was nothing to resolve (not defeated, or
    /// already resolved). On failure the session stays in `Resolving` and a
    /// [`Deadline::SessionResolution`] retry is scheduled.
    pub async fn resolve(
        &self,
        session_id: CombatSessionId,
    ) -> Result<Option<Vec<RewardShare>>, ActionError> {
        let result = self.try_resolve(session_id).await;
        self.settle(Deadline::SessionResolution(session_id), result.as_ref().map(|_| ()))
            .await;
        result
    }

    async fn try_resolve(
        &self,
        session_id: CombatSessionId,
    ) -> Result<Option<Vec<RewardShare>>, ActionError> {
        let Some(handle) = self.handle(session_id) else {
            return Ok(None);
        };
        let mut guard = handle.lock().await;

        let mut next = guard.clone();
        let Some(claim) = next.take_reward_claim() else {
            return Ok(None);
        };
        let shares = reward_policy(&claim.kind).distribute(&claim);

        if !self.repo.credit_rewards(session_id, &shares).await? {
            tracing::warn!(session_id = %session_id, "Rewards were already credited");
        }

        let summary = next.retire(self.clock.now())?;
        self.repo.retire(&summary).await?;
        *guard = next;

        self.sessions.remove(&session_id);
        self.rooms
            .remove_if(guard.room_id(), |_, id| *id == session_id);

        self.publish(
            &guard,
            CombatPayload::RewardsDistributed {
                rewards: shares
                    .iter()
                    .map(|s| RewardView {
                        user_id: s.user_id.to_uuid(),
                        kind: s.kind.to_string(),
                        amount: s.amount,
                    })
                    .collect(),
            },
        );
        tracing::info!(
            session_id = %session_id,
            recipients = shares.len(),
            "Combat session retired"
        );
        Ok(Some(shares))
    }

    /// Reload sessions that were live when the process stopped.
    pub async fn restore(&self) -> Result<usize, RepoError> {
        let sessions = self.repo.list_active().await?;
        let count = sessions.len();
        let now = self.clock.now();

        for session in sessions {
            let session_id = session.id();
            let phase = session.phase();
            let activates_in = (session.activates_at() - now)
                .to_std()
                .unwrap_or(Duration::ZERO);

            self.rooms.insert(session.room_id().clone(), session_id);
            self.sessions
                .insert(session_id, Arc::new(Mutex::new(session)));

            match phase {
                SessionPhase::Spawning => {
                    self.scheduler
                        .schedule_after(activates_in, Deadline::SessionActivation(session_id))
                        .await;
                }
                SessionPhase::Resolving => {
                    if let Err(e) = self.resolve(session_id).await {
                        tracing::error!(session_id = %session_id, error = %e, "Failed to resolve restored session");
                    }
                }
                SessionPhase::Active | SessionPhase::Retired => {}
            }
        }

        if count > 0 {
            tracing::info!(count, "Restored live combat sessions");
        }
        Ok(count)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn snapshot(&self, session_id: CombatSessionId) -> Option<CombatSession> {
        let handle = self.handle(session_id)?;
        let guard = handle.lock().await;
        Some(guard.clone())
    }

    pub async fn in_room(&self, room_id: &RoomId) -> Option<CombatSession> {
        let session_id = *self.rooms.get(room_id)?;
        self.snapshot(session_id).await
    }

    pub fn is_room_busy(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Snapshot, or the rejection a caller should see for an id that is not
    /// live.
    pub async fn require(&self, session_id: CombatSessionId) -> Result<CombatSession, ActionError> {
        match self.snapshot(session_id).await {
            Some(session) => Ok(session),
            None => Err(self.missing_session(session_id).await?.into()),
        }
    }

    pub fn live_count(&self) -> usize {
        self.sessions.len()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn handle(&self, session_id: CombatSessionId) -> Option<Arc<Mutex<CombatSession>>> {
        self.sessions.get(&session_id).map(|entry| entry.value().clone())
    }

    /// A retired session is "already defeated"; anything else never existed.
    async fn missing_session(&self, session_id: CombatSessionId) -> Result<Rejection, RepoError> {
        Ok(match self.repo.get_summary(session_id).await? {
            Some(_) => Rejection::target_defeated(),
            None => Rejection::invalid_target("Unknown combat session"),
        })
    }

    /// Forget the retry count once `deadline` succeeds, or schedule it again
    /// with backoff when the failure is transient.
    async fn settle(&self, deadline: Deadline, result: Result<(), &ActionError>) {
        match result {
            Err(ActionError::Repo(_) | ActionError::Busy(_)) => {
                let attempt = {
                    let mut attempts = self.retries.entry(deadline).or_insert(0);
                    *attempts += 1;
                    *attempts
                };
                let delay = retry_delay(attempt);
                tracing::warn!(
                    ?deadline,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Combat session step failed, retrying"
                );
                self.scheduler.schedule_after(delay, deadline).await;
            }
            Ok(()) | Err(ActionError::Rejected(_)) => {
                self.retries.remove(&deadline);
            }
        }
    }

    fn publish(&self, session: &CombatSession, payload: CombatPayload) {
        self.broadcaster.publish(
            session.room_id(),
            RoomEvent::Combat {
                session_id: session.id(),
                payload,
            },
        );
    }
}
