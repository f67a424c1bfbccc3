//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod cache;
pub mod clock;
pub mod identity;
pub mod ports;
pub mod scheduler;
pub mod sqlite;
