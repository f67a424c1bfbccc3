use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }

            pub fn parse(s: &str) -> Result<Self, DomainError> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| DomainError::invalid_id(format!("{}: {}", stringify!($name), s)))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// Identity
define_id!(UserId);

// One per live socket
define_id!(ConnectionId);

// Combat
define_id!(CombatSessionId);
define_id!(TargetId);

/// Maximum length of a room key.
const MAX_ROOM_ID_LENGTH: usize = 64;

/// Key of a broadcast room (`lobby`, `raid:beginner`, `expedition:<uuid>`, ...).
///
/// Rooms are addressed by readable keys rather than uuids so that clients can
/// subscribe to well-known rooms without a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// The room every joined connection is subscribed to.
    pub const LOBBY: &'static str = "lobby";

    /// Create a validated room key.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidId` if the key is empty, too long, or
    /// contains characters other than ASCII alphanumerics, `-`, `_` and `:`.
    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.is_empty() || key.len() > MAX_ROOM_ID_LENGTH {
            return Err(DomainError::invalid_id(format!("room id: {key:?}")));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
        {
            return Err(DomainError::invalid_id(format!("room id: {key:?}")));
        }
        Ok(Self(key))
    }

    /// For keys built from fixed, known-valid parts inside this crate.
    pub(crate) fn from_trusted(key: String) -> Self {
        Self(key)
    }

    pub fn lobby() -> Self {
        Self(Self::LOBBY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_strings() {
        let id = UserId::new();
        assert_eq!(UserId::parse(&id.to_string()).unwrap(), id);
        assert!(UserId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn room_id_accepts_well_known_keys() {
        assert!(RoomId::new("lobby").is_ok());
        assert!(RoomId::new("raid:beginner").is_ok());
        assert!(RoomId::new("expedition:3f2a-19_b").is_ok());
    }

    #[test]
    fn room_id_rejects_bad_keys() {
        assert!(RoomId::new("").is_err());
        assert!(RoomId::new("has space").is_err());
        assert!(RoomId::new("x".repeat(65)).is_err());
    }

    #[test]
    fn room_id_deserialization_validates() {
        let ok: Result<RoomId, _> = serde_json::from_str("\"raid:advanced\"");
        assert!(ok.is_ok());
        let bad: Result<RoomId, _> = serde_json::from_str("\"../etc\"");
        assert!(bad.is_err());
    }
}
