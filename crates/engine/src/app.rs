//! Application state and composition.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::infrastructure::{
    cache::ReplayGuard,
    clock::{SystemClock, SystemRandom},
    ports::{
        AchievementRepo, Broadcaster, ClockPort, CombatRepo, CooldownRepo, HoldingsRepo,
        IdentityPort, RandomPort, UserRepo,
    },
    scheduler::{Deadline, DeadlineHandler, DeadlineScheduler},
    sqlite::SqliteRepositories,
};
use crate::use_cases::{
    AchievementService, ActionValidator, ChallengeController, ChatService, CombatSessionManager,
    CooldownGate, ExpeditionService, FishingService, QueryService, RaidService, SessionService,
};

/// Main application state.
///
/// Holds all repositories and use cases.
/// Passed to HTTP/WebSocket handlers via Axum state.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
    pub scheduler: Arc<DeadlineScheduler>,
    pub replay: Arc<ReplayGuard>,
}

/// Container for all repository ports.
pub struct Repositories {
    pub users: Arc<dyn UserRepo>,
    pub cooldowns: Arc<dyn CooldownRepo>,
    pub holdings: Arc<dyn HoldingsRepo>,
    pub combat: Arc<dyn CombatRepo>,
    pub achievements: Arc<dyn AchievementRepo>,
}

/// Container for all use cases.
pub struct UseCases {
    pub session: Arc<SessionService>,
    pub validator: Arc<ActionValidator>,
    pub cooldowns: Arc<CooldownGate>,
    pub combat: Arc<CombatSessionManager>,
    pub challenge: Arc<ChallengeController>,
    pub achievements: Arc<AchievementService>,
    pub chat: Arc<ChatService>,
    pub fishing: Arc<FishingService>,
    pub raid: Arc<RaidService>,
    pub expedition: Arc<ExpeditionService>,
    pub queries: Arc<QueryService>,
}

impl App {
    /// Create a new App on the system clock and random source.
    pub fn new(
        repos: SqliteRepositories,
        identity: Arc<dyn IdentityPort>,
        broadcaster: Arc<dyn Broadcaster>,
        config: &EngineConfig,
    ) -> Self {
        Self::with_ports(
            repos,
            identity,
            broadcaster,
            Arc::new(SystemClock::new()),
            Arc::new(SystemRandom::new()),
            config,
        )
    }

    /// Create an App with explicit clock and random ports.
    pub fn with_ports(
        repos: SqliteRepositories,
        identity: Arc<dyn IdentityPort>,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        config: &EngineConfig,
    ) -> Self {
        let repositories = Repositories {
            users: repos.users,
            cooldowns: repos.cooldowns,
            holdings: repos.holdings,
            combat: repos.combat,
            achievements: repos.achievements,
        };

        let scheduler = Arc::new(DeadlineScheduler::new());
        let replay = Arc::new(ReplayGuard::default());

        let validator = Arc::new(ActionValidator::new(
            repositories.holdings.clone(),
            replay.clone(),
            config.fish_storage_limit,
        ));
        let cooldowns = Arc::new(CooldownGate::new(
            repositories.cooldowns.clone(),
            clock.clone(),
            config.cooldowns,
        ));
        let combat = Arc::new(CombatSessionManager::new(
            repositories.combat.clone(),
            broadcaster.clone(),
            clock.clone(),
            scheduler.clone(),
            config.spawn_window,
        ));
        let challenge = Arc::new(ChallengeController::new(
            broadcaster.clone(),
            clock.clone(),
            random.clone(),
            scheduler.clone(),
            config.challenge,
        ));
        let achievements = Arc::new(AchievementService::new(
            repositories.achievements.clone(),
            repositories.users.clone(),
            clock.clone(),
        ));

        let use_cases = UseCases {
            session: Arc::new(SessionService::new(
                identity,
                repositories.users.clone(),
                broadcaster.clone(),
                clock.clone(),
            )),
            chat: Arc::new(ChatService::new(broadcaster.clone(), clock.clone())),
            fishing: Arc::new(FishingService::new(
                validator.clone(),
                cooldowns.clone(),
                repositories.holdings.clone(),
                achievements.clone(),
                challenge.clone(),
                broadcaster.clone(),
                random.clone(),
            )),
            raid: Arc::new(RaidService::new(
                combat.clone(),
                validator.clone(),
                cooldowns.clone(),
                repositories.holdings.clone(),
                broadcaster.clone(),
                random.clone(),
                config.raid_summon_cost,
            )),
            expedition: Arc::new(ExpeditionService::new(
                combat.clone(),
                validator.clone(),
                cooldowns.clone(),
                broadcaster,
                random,
            )),
            queries: Arc::new(QueryService::new(
                repositories.holdings.clone(),
                achievements.clone(),
                cooldowns.clone(),
                combat.clone(),
                clock,
            )),
            validator,
            cooldowns,
            combat,
            challenge,
            achievements,
        };

        Self {
            repositories,
            use_cases,
            scheduler,
            replay,
        }
    }

    /// The handler the deadline scheduler fires into.
    pub fn deadline_router(&self) -> Arc<dyn DeadlineHandler> {
        Arc::new(DeadlineRouter {
            challenge: self.use_cases.challenge.clone(),
            combat: self.use_cases.combat.clone(),
        })
    }
}

/// Routes fired deadlines to the use case that owns them.
struct DeadlineRouter {
    challenge: Arc<ChallengeController>,
    combat: Arc<CombatSessionManager>,
}

#[async_trait]
impl DeadlineHandler for DeadlineRouter {
    async fn on_deadline(&self, deadline: Deadline) {
        match deadline {
            Deadline::ChallengeExpiry(connection_id) => {
                self.challenge.expire(connection_id).await;
            }
            Deadline::SessionActivation(session_id) => {
                if let Err(e) = self.combat.activate(session_id).await {
                    tracing::error!(session_id = %session_id, error = %e, "Failed to activate combat session");
                }
            }
            Deadline::SessionResolution(session_id) => {
                if let Err(e) = self.combat.resolve(session_id).await {
                    tracing::error!(session_id = %session_id, error = %e, "Failed to resolve combat session");
                }
            }
        }
    }
}
