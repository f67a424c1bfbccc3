//! Use cases - gameplay orchestration.
//!
//! Each module owns one concern. Use cases talk to storage and delivery only
//! through the port traits in `infrastructure::ports`.

pub mod achievements;
pub mod challenge;
pub mod chat;
pub mod combat;
pub mod cooldown;
pub mod error;
pub mod expedition;
pub mod fishing;
pub mod queries;
pub mod raid;
pub mod session;
pub mod validation;

use tidewatch_domain::{ConnectionId, DisplayName, Role, UserId};

pub use achievements::{AchievementError, AchievementService};
pub use challenge::{ChallengeController, ChallengeSettings};
pub use chat::ChatService;
pub use combat::CombatSessionManager;
pub use cooldown::{CooldownDurations, CooldownGate};
pub use error::{ActionError, Rejection};
pub use expedition::ExpeditionService;
pub use fishing::FishingService;
pub use queries::{QueryError, QueryService};
pub use raid::RaidService;
pub use session::{SessionError, SessionService};
pub use validation::ActionValidator;

/// The identity behind one joined connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub role: Role,
}

impl Actor {
    pub fn name(&self) -> &str {
        self.display_name.as_str()
    }
}
