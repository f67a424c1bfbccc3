//! Counted holdings - money, materials, fish and other per-user counters.
//!
//! Every holding is a non-negative integer keyed by `(user, kind)`. Mutations
//! are additive or subtractive deltas; a decrement that would go below zero
//! fails instead of clamping.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::UserId;

const MAX_ITEM_KIND_LENGTH: usize = 64;
const FISH_PREFIX: &str = "fish:";

/// Kind of a counted holding (`gold`, `amber`, `fish:Tuna`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKind(String);

impl ItemKind {
    pub const GOLD: &'static str = "gold";
    pub const AMBER: &'static str = "amber";
    pub const STAR_PIECE: &'static str = "star_piece";
    pub const FISHING_ROD: &'static str = "fishing_rod";

    pub fn new(kind: impl Into<String>) -> Result<Self, DomainError> {
        let kind = kind.into();
        if kind.is_empty() || kind.len() > MAX_ITEM_KIND_LENGTH {
            return Err(DomainError::validation(format!("Invalid item kind: {kind:?}")));
        }
        if kind.chars().any(char::is_control) {
            return Err(DomainError::validation(format!("Invalid item kind: {kind:?}")));
        }
        Ok(Self(kind))
    }

    pub fn gold() -> Self {
        Self(Self::GOLD.to_string())
    }

    pub fn amber() -> Self {
        Self(Self::AMBER.to_string())
    }

    pub fn star_piece() -> Self {
        Self(Self::STAR_PIECE.to_string())
    }

    pub fn fishing_rod() -> Self {
        Self(Self::FISHING_ROD.to_string())
    }

    /// Holding kind for a caught fish species.
    pub fn fish(species: &str) -> Self {
        Self(format!("{FISH_PREFIX}{species}"))
    }

    pub fn is_fish(&self) -> bool {
        self.0.starts_with(FISH_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemKind {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemKind> for String {
    fn from(value: ItemKind) -> Self {
        value.0
    }
}

/// One counted holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub user_id: UserId,
    pub kind: ItemKind,
    pub count: u64,
}

/// Apply a signed delta to a holding count.
///
/// # Errors
///
/// - `InsufficientResource` if the result would be negative
/// - `Overflow` if the result would not fit in a `u64`
pub fn apply_delta(kind: &ItemKind, current: u64, delta: i64) -> Result<u64, DomainError> {
    if delta >= 0 {
        current
            .checked_add(delta.unsigned_abs())
            .ok_or_else(|| DomainError::Overflow(kind.to_string()))
    } else {
        let required = delta.unsigned_abs();
        current
            .checked_sub(required)
            .ok_or_else(|| DomainError::InsufficientResource {
                kind: kind.to_string(),
                available: current,
                required,
            })
    }
}

/// Total number of fish across all `fish:*` holdings.
pub fn total_fish<'a>(entries: impl IntoIterator<Item = &'a InventoryEntry>) -> u64 {
    entries
        .into_iter()
        .filter(|e| e.kind.is_fish())
        .map(|e| e.count)
        .fold(0u64, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_below_zero_fails() {
        let kind = ItemKind::amber();
        let err = apply_delta(&kind, 5, -6).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientResource {
                kind: "amber".into(),
                available: 5,
                required: 6
            }
        );
    }

    #[test]
    fn decrement_to_exactly_zero_succeeds() {
        assert_eq!(apply_delta(&ItemKind::gold(), 5, -5).unwrap(), 0);
    }

    #[test]
    fn increment_overflow_fails() {
        assert!(matches!(
            apply_delta(&ItemKind::gold(), u64::MAX, 1),
            Err(DomainError::Overflow(_))
        ));
    }

    #[test]
    fn fish_kinds_are_recognised() {
        let tuna = ItemKind::fish("Tuna");
        assert_eq!(tuna.as_str(), "fish:Tuna");
        assert!(tuna.is_fish());
        assert!(!ItemKind::gold().is_fish());
    }

    #[test]
    fn total_fish_ignores_currencies() {
        let user = UserId::new();
        let entries = vec![
            InventoryEntry { user_id: user, kind: ItemKind::fish("Tuna"), count: 3 },
            InventoryEntry { user_id: user, kind: ItemKind::fish("Carp"), count: 4 },
            InventoryEntry { user_id: user, kind: ItemKind::gold(), count: 900 },
        ];
        assert_eq!(total_fish(&entries), 7);
    }
}
