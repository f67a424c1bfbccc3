//! Cooldown records - per-user, per-action-kind timed restrictions.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::UserId;

/// The throttled action families. Each kind has its own independent timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fishing,
    Exploration,
    Raid,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [ActionKind::Fishing, ActionKind::Exploration, ActionKind::Raid];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Fishing => "fishing",
            ActionKind::Exploration => "exploration",
            ActionKind::Raid => "raid",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fishing" => Ok(ActionKind::Fishing),
            "exploration" => Ok(ActionKind::Exploration),
            "raid" => Ok(ActionKind::Raid),
            other => Err(DomainError::validation(format!("Unknown action kind: {other}"))),
        }
    }
}

/// The single active end-time for a (user, kind) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRecord {
    pub user_id: UserId,
    pub kind: ActionKind,
    pub ends_at: DateTime<Utc>,
}

impl CooldownRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.ends_at
    }

    /// Time left before the action is admitted again (zero once elapsed).
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.ends_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Outcome of a cooldown check-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The action may proceed; the next window ends at `ends_at`.
    Admitted { ends_at: DateTime<Utc> },
    /// The action is throttled for `remaining` more.
    Rejected { remaining: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }

    pub fn remaining(&self) -> Duration {
        match self {
            Admission::Admitted { .. } => Duration::ZERO,
            Admission::Rejected { remaining } => *remaining,
        }
    }
}

/// Fishing cooldown shrinks with skill: `max(base - skill * reduction, 0)`.
pub fn fishing_cooldown(base: Duration, reduction_per_skill: Duration, skill: u64) -> Duration {
    let skill = u32::try_from(skill).unwrap_or(u32::MAX);
    base.saturating_sub(reduction_per_skill.saturating_mul(skill))
}
