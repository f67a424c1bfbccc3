//! Tidewatch Shared - Wire types for the engine and its clients
//!
//! This crate contains every type that crosses the wire:
//! - WebSocket message types (`ClientMessage`, `ServerMessage`)
//! - Room and combat event payloads
//! - Rejection and termination codes
//! - HTTP request and response bodies
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - serde, uuid, chrono and the domain vocabulary enums
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Raw ids** - DTOs carry `uuid::Uuid` and `String` room keys, not domain newtypes

pub mod messages;
pub mod requests;
pub mod responses;

pub use messages::{
    ClientMessage, CombatPayload, CooldownView, RankingView, RejectionCode, RewardView,
    RoomPayload, ServerMessage, TargetView, TerminationReason, PARSE_ERROR,
};
pub use requests::{AchievementChangeRequest, LeaderboardQuery};
pub use responses::{
    AchievementChangeResponse, AchievementView, AchievementsResponse, ActiveSessionView,
    ChallengeTriggerResponse, CooldownsResponse, ErrorResponse, HealthResponse, HoldingView,
    InventoryResponse, LeaderboardEntry, LeaderboardResponse, RaidStatusView, RaidsResponse,
};
