//! SQLite-backed cooldown gate storage.
//!
//! Admission is a single conditional upsert, so two racing requests for the
//! same `(user, kind)` cannot both be admitted.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::{Row, SqlitePool};
use tidewatch_domain::{ActionKind, Admission, CooldownRecord, UserId};

use super::parse_user_id;
use crate::infrastructure::ports::{CooldownRepo, RepoError};

/// A row can vanish between the upsert and the follow-up read if a sweep
/// runs in between. That only happens for an elapsed window, so the upsert
/// is simply tried again.
const ADMISSION_ATTEMPTS: usize = 3;

pub struct SqliteCooldownRepo {
    pool: SqlitePool,
}

impl SqliteCooldownRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, RepoError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| RepoError::serialization(format!("timestamp {ms} out of range")))
}

#[async_trait]
impl CooldownRepo for SqliteCooldownRepo {
    async fn try_start(
        &self,
        user_id: UserId,
        kind: ActionKind,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Admission, RepoError> {
        let window = TimeDelta::from_std(duration)
            .map_err(|_| RepoError::constraint(format!("cooldown {duration:?} out of range")))?;
        let ends_at = now + window;
        let now_ms = now.timestamp_millis();

        for _ in 0..ADMISSION_ATTEMPTS {
            let admitted = sqlx::query(
                r#"
                INSERT INTO cooldowns (user_id, kind, ends_at_ms)
                VALUES (?, ?, ?)
                ON CONFLICT(user_id, kind) DO UPDATE SET
                    ends_at_ms = excluded.ends_at_ms
                WHERE cooldowns.ends_at_ms <= ?
                "#,
            )
            .bind(user_id.to_string())
            .bind(kind.as_str())
            .bind(ends_at.timestamp_millis())
            .bind(now_ms)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("cooldowns.try_start", e))?
            .rows_affected()
                == 1;

            if admitted {
                return Ok(Admission::Admitted { ends_at });
            }

            let row = sqlx::query(
                "SELECT ends_at_ms FROM cooldowns WHERE user_id = ? AND kind = ?",
            )
            .bind(user_id.to_string())
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("cooldowns.try_start", e))?;

            if let Some(row) = row {
                let stored_ms: i64 = row.get("ends_at_ms");
                let remaining_ms = u64::try_from(stored_ms.saturating_sub(now_ms)).unwrap_or(0);
                return Ok(Admission::Rejected {
                    remaining: Duration::from_millis(remaining_ms),
                });
            }
        }

        Err(RepoError::constraint(format!(
            "cooldown admission for {user_id}/{kind} did not settle"
        )))
    }

    async fn release(
        &self,
        user_id: UserId,
        kind: ActionKind,
        ends_at: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "DELETE FROM cooldowns WHERE user_id = ? AND kind = ? AND ends_at_ms = ?",
        )
        .bind(user_id.to_string())
        .bind(kind.as_str())
        .bind(ends_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("cooldowns.release", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CooldownRecord>, RepoError> {
        let rows = sqlx::query(
            "SELECT user_id, kind, ends_at_ms FROM cooldowns WHERE user_id = ? ORDER BY kind",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("cooldowns.list_for_user", e))?;

        rows.iter()
            .map(|row| {
                let user_id: String = row.get("user_id");
                let kind: String = row.get("kind");
                let ends_at_ms: i64 = row.get("ends_at_ms");
                Ok(CooldownRecord {
                    user_id: parse_user_id(&user_id)?,
                    kind: kind.parse().map_err(RepoError::serialization)?,
                    ends_at: from_millis(ends_at_ms)?,
                })
            })
            .collect()
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM cooldowns WHERE ends_at_ms < ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("cooldowns.sweep_expired", e))?;
        Ok(result.rows_affected())
    }
}
