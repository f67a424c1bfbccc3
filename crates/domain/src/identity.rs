//! User identity - who is acting, and with what privileges.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::UserId;

/// Maximum display name length, in characters.
const MAX_DISPLAY_NAME_CHARS: usize = 30;

/// Privilege level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Registered,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Registered => "registered",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Role::Guest),
            "registered" => Ok(Role::Registered),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("Unknown role: {other}"))),
        }
    }
}

/// A validated display name (non-empty, <= 30 chars, trimmed, no control characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Create a new validated display name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the trimmed name is empty, longer
    /// than 30 characters, or contains control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("Display name cannot be empty"));
        }
        if trimmed.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(DomainError::validation(format!(
                "Display name cannot exceed {} characters",
                MAX_DISPLAY_NAME_CHARS
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(DomainError::validation(
                "Display name cannot contain control characters",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DisplayName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DisplayName> for String {
    fn from(name: DisplayName) -> String {
        name.0
    }
}

/// A user as known to the server.
///
/// # Invariants
///
/// - `id` never changes once created; every per-user document is keyed by it.
/// - `display_name` and `role` change only through administrative action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    id: UserId,
    display_name: DisplayName,
    role: Role,
    created_at: DateTime<Utc>,
}

impl UserIdentity {
    pub fn new(id: UserId, display_name: DisplayName, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name,
            role,
            created_at: now,
        }
    }

    #[inline]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[inline]
    pub fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Administrative rename.
    pub fn rename(&mut self, display_name: DisplayName) {
        self.display_name = display_name;
    }

    /// Administrative role change.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }
}
