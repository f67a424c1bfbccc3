//! Tidewatch Engine library.
//!
//! This crate contains all server-side code for the Tidewatch game engine.
//!
//! ## Structure
//!
//! - `use_cases/` - Cooldowns, validation, combat sessions, challenges and the gameplay flows built on them
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP and WebSocket entry points, connection manager
//! - `app` - Application composition
//! - `config` - Environment configuration

pub mod api;
pub mod app;
pub mod config;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
