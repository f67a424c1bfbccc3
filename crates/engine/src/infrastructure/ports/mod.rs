//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Durable storage (users, cooldowns, holdings, combat sessions, achievements)
//! - Identity verification (could swap signed tokens for a session service)
//! - Outbound delivery to connected clients
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{
    AchievementRepo, CombatRepo, CooldownRepo, HoldingsRepo, LeaderboardRow, UserRepo,
};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{Broadcaster, IdentityPort, RoomEvent, VerifiedIdentity};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

// =============================================================================
// Error Types
// =============================================================================
pub use error::{IdentityError, RepoError};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{
    MockAchievementRepo, MockCombatRepo, MockCooldownRepo, MockHoldingsRepo, MockUserRepo,
};

#[cfg(test)]
pub use external::{MockBroadcaster, MockIdentityPort};

#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};
