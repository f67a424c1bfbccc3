//! Anti-automation challenge records.
//!
//! A challenge is a single display word the player must type back before a
//! deadline. It is modal: while one is outstanding the connection can do
//! nothing else but answer it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionId, UserId};

/// Words a challenge can ask for. Case matters when answering.
pub const CHALLENGE_WORDS: [&str; 24] = [
    "Fox", "Harbor", "Lantern", "Marlin", "Anchor", "Coral", "Tide", "Pearl", "Kelp", "Reef",
    "Compass", "Gull", "Driftwood", "Lighthouse", "Seashell", "Barnacle", "Current", "Mackerel",
    "Starfish", "Otter", "Walrus", "Trident", "Seaweed", "Whale",
];

/// How a challenge ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeOutcome {
    Passed,
    Failed,
    Expired,
}

impl ChallengeOutcome {
    /// Failed and expired challenges end the connection.
    pub fn terminates_connection(self) -> bool {
        !matches!(self, ChallengeOutcome::Passed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeOutcome::Passed => "passed",
            ChallengeOutcome::Failed => "failed",
            ChallengeOutcome::Expired => "expired",
        }
    }
}

impl fmt::Display for ChallengeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outstanding challenge for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    connection_id: ConnectionId,
    user_id: UserId,
    word: String,
    issued_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
}

impl ChallengeRecord {
    pub fn new(
        connection_id: ConnectionId,
        user_id: UserId,
        word: impl Into<String>,
        issued_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            word: word.into(),
            issued_at,
            deadline,
        }
    }

    #[inline]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    #[inline]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[inline]
    pub fn word(&self) -> &str {
        &self.word
    }

    #[inline]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    #[inline]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    /// Judge a response. A response at or after the deadline is `Expired`
    /// regardless of content; otherwise it must match the word byte for byte.
    pub fn judge(&self, response: &str, now: DateTime<Utc>) -> ChallengeOutcome {
        if self.is_expired(now) {
            ChallengeOutcome::Expired
        } else if response.as_bytes() == self.word.as_bytes() {
            ChallengeOutcome::Passed
        } else {
            ChallengeOutcome::Failed
        }
    }
}

/// Pick a challenge word from a roll (any `usize`; wrapped into range).
pub fn challenge_word(roll: usize) -> &'static str {
    CHALLENGE_WORDS[roll % CHALLENGE_WORDS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn record(word: &str) -> (ChallengeRecord, DateTime<Utc>) {
        let now = Utc::now();
        (
            ChallengeRecord::new(
                ConnectionId::new(),
                UserId::new(),
                word,
                now,
                now + TimeDelta::seconds(60),
            ),
            now,
        )
    }

    #[test]
    fn exact_match_passes() {
        let (record, now) = record("Fox");
        assert_eq!(record.judge("Fox", now), ChallengeOutcome::Passed);
    }

    #[test]
    fn case_mismatch_fails() {
        let (record, now) = record("Fox");
        assert_eq!(record.judge("fox", now), ChallengeOutcome::Failed);
        assert_eq!(record.judge("Fox ", now), ChallengeOutcome::Failed);
        assert_eq!(record.judge("", now), ChallengeOutcome::Failed);
    }

    #[test]
    fn late_answer_is_expired() {
        let (record, now) = record("Fox");
        let late = now + TimeDelta::seconds(60);
        assert!(record.is_expired(late));
        assert_eq!(record.judge("Fox", late), ChallengeOutcome::Expired);
    }

    #[test]
    fn only_passing_keeps_the_connection() {
        assert!(!ChallengeOutcome::Passed.terminates_connection());
        assert!(ChallengeOutcome::Failed.terminates_connection());
        assert!(ChallengeOutcome::Expired.terminates_connection());
    }

    #[test]
    fn word_roll_wraps() {
        assert_eq!(challenge_word(0), "Fox");
        assert_eq!(challenge_word(CHALLENGE_WORDS.len()), "Fox");
    }
}
