//! TTL-based replay guard for client nonces.
//!
//! Remembers `(user, nonce)` pairs for a fixed window so that a resubmitted
//! gameplay message is refused instead of applied twice. Entries are only
//! dropped by `cleanup_expired()`, which a housekeeping loop runs.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tidewatch_domain::UserId;
use tokio::sync::RwLock;

/// How long a nonce stays remembered.
pub const REPLAY_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Longest nonce accepted; anything longer is treated as malformed.
pub const MAX_NONCE_LENGTH: usize = 128;

/// A thread-safe set of keys with time-to-live expiration.
pub struct TtlSet<K> {
    entries: RwLock<HashMap<K, Instant>>,
    ttl: Duration,
}

impl<K> TtlSet<K>
where
    K: Eq + Hash + Send + Sync,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Record `key` unless a live entry already exists. Returns `true` if it
    /// was recorded. Check and insert happen under one write lock.
    pub async fn insert_if_absent(&self, key: K) -> bool {
        self.insert_if_absent_at(key, Instant::now()).await
    }

    async fn insert_if_absent_at(&self, key: K, now: Instant) -> bool {
        let mut guard = self.entries.write().await;
        match guard.get(&key) {
            Some(seen_at) if now.saturating_duration_since(*seen_at) < self.ttl => false,
            _ => {
                guard.insert(key, now);
                true
            }
        }
    }

    /// Remove all expired entries and return the count of removed entries.
    pub async fn cleanup_expired(&self) -> usize {
        let mut guard = self.entries.write().await;
        let before_count = guard.len();
        guard.retain(|_, seen_at| seen_at.elapsed() < self.ttl);
        before_count - guard.len()
    }

    /// Current number of entries (including expired ones not yet cleaned).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Outcome of a nonce check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceCheck {
    Fresh,
    Replayed,
    Malformed,
}

/// Per-user nonce memory.
pub struct ReplayGuard {
    seen: TtlSet<(UserId, String)>,
}

impl ReplayGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            seen: TtlSet::new(window),
        }
    }

    /// Messages without a nonce are never considered replays.
    pub async fn check(&self, user_id: UserId, nonce: Option<&str>) -> NonceCheck {
        let Some(nonce) = nonce else {
            return NonceCheck::Fresh;
        };
        if nonce.is_empty() || nonce.len() > MAX_NONCE_LENGTH {
            return NonceCheck::Malformed;
        }
        if self.seen.insert_if_absent((user_id, nonce.to_string())).await {
            NonceCheck::Fresh
        } else {
            NonceCheck::Replayed
        }
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.seen.cleanup_expired().await
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(REPLAY_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_nonce_is_replayed_for_same_user_only() {
        let guard = ReplayGuard::default();
        let (alice, bob) = (UserId::new(), UserId::new());

        assert_eq!(guard.check(alice, Some("n-1")).await, NonceCheck::Fresh);
        assert_eq!(guard.check(alice, Some("n-1")).await, NonceCheck::Replayed);
        assert_eq!(guard.check(bob, Some("n-1")).await, NonceCheck::Fresh);
    }

    #[tokio::test]
    async fn missing_nonce_is_always_fresh() {
        let guard = ReplayGuard::default();
        let user = UserId::new();
        assert_eq!(guard.check(user, None).await, NonceCheck::Fresh);
        assert_eq!(guard.check(user, None).await, NonceCheck::Fresh);
    }

    #[tokio::test]
    async fn oversized_nonce_is_malformed() {
        let guard = ReplayGuard::default();
        let long = "x".repeat(MAX_NONCE_LENGTH + 1);
        assert_eq!(guard.check(UserId::new(), Some(&long)).await, NonceCheck::Malformed);
        assert_eq!(guard.check(UserId::new(), Some("")).await, NonceCheck::Malformed);
    }

    #[tokio::test]
    async fn expired_entry_can_be_reused() {
        let ttl = Duration::from_millis(10);
        let set: TtlSet<&str> = TtlSet::new(ttl);
        let start = Instant::now();
        assert!(set.insert_if_absent_at("k", start).await);
        assert!(!set.insert_if_absent_at("k", start + Duration::from_millis(5)).await);
        assert!(set.insert_if_absent_at("k", start + ttl).await);
    }

    #[tokio::test]
    async fn cleanup_removes_expired() {
        let ttl = Duration::from_millis(10);
        let set: TtlSet<&str> = TtlSet::new(ttl);
        let expired_at = Instant::now() - (ttl + Duration::from_millis(1));
        set.insert_if_absent_at("old", expired_at).await;
        set.insert_if_absent("new").await;

        assert_eq!(set.cleanup_expired().await, 1);
        assert_eq!(set.len().await, 1);
    }
}
