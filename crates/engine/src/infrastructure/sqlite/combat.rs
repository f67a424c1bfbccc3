//! SQLite-backed combat sessions, reward ledger and summaries.
//!
//! A live session is one JSON document plus a version column. Saves are
//! compare-and-swap on that version; retiring moves the document into
//! `combat_summaries`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tidewatch_domain::{CombatSession, CombatSessionId, CombatSummary, RewardShare};

use super::to_sql_count;
use crate::infrastructure::ports::{CombatRepo, RepoError};

pub struct SqliteCombatRepo {
    pool: SqlitePool,
}

impl SqliteCombatRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn encode_session(session: &CombatSession) -> Result<String, RepoError> {
    serde_json::to_string(session).map_err(|e| RepoError::Serialization(e.to_string()))
}

fn decode_session(json: &str) -> Result<CombatSession, RepoError> {
    serde_json::from_str(json).map_err(|e| RepoError::Serialization(e.to_string()))
}

#[async_trait]
impl CombatRepo for SqliteCombatRepo {
    async fn create(&self, session: &CombatSession) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO combat_sessions (session_id, room_id, version, state_json, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id().to_string())
        .bind(session.room_id().as_str())
        .bind(to_sql_count(session.version())?)
        .bind(encode_session(session)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("combat.create", e))?;
        Ok(())
    }

    async fn save(
        &self,
        session: &CombatSession,
        expected_version: u64,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE combat_sessions
            SET version = ?, state_json = ?, updated_at = ?
            WHERE session_id = ? AND version = ?
            "#,
        )
        .bind(to_sql_count(session.version())?)
        .bind(encode_session(session)?)
        .bind(Utc::now().to_rfc3339())
        .bind(session.id().to_string())
        .bind(to_sql_count(expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("combat.save", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.get(session.id()).await? {
            Some(_) => Err(RepoError::conflict("CombatSession", session.id())),
            None => Err(RepoError::not_found("CombatSession", session.id())),
        }
    }

    async fn get(&self, id: CombatSessionId) -> Result<Option<CombatSession>, RepoError> {
        let row = sqlx::query("SELECT state_json FROM combat_sessions WHERE session_id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("combat.get", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("state_json");
                Ok(Some(decode_session(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<CombatSession>, RepoError> {
        let rows = sqlx::query("SELECT state_json FROM combat_sessions ORDER BY updated_at")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("combat.list_active", e))?;

        rows.iter()
            .map(|row| {
                let json: String = row.get("state_json");
                decode_session(&json)
            })
            .collect()
    }

    async fn credit_rewards(
        &self,
        session_id: CombatSessionId,
        shares: &[RewardShare],
    ) -> Result<bool, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("combat.credit_rewards", e))?;

        let first_time = sqlx::query(
            "INSERT OR IGNORE INTO reward_distributions (session_id, credited_at) VALUES (?, ?)",
        )
        .bind(session_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("combat.credit_rewards", e))?
        .rows_affected()
            == 1;

        if !first_time {
            tx.rollback()
                .await
                .map_err(|e| RepoError::database("combat.credit_rewards", e))?;
            return Ok(false);
        }

        for share in shares {
            let amount = to_sql_count(share.amount)?;
            sqlx::query(
                r#"
                INSERT INTO reward_ledger (session_id, user_id, kind, amount)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(session_id, user_id, kind) DO UPDATE SET
                    amount = reward_ledger.amount + excluded.amount
                "#,
            )
            .bind(session_id.to_string())
            .bind(share.user_id.to_string())
            .bind(share.kind.as_str())
            .bind(amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("combat.credit_rewards", e))?;

            sqlx::query(
                r#"
                INSERT INTO holdings (user_id, kind, count)
                VALUES (?, ?, ?)
                ON CONFLICT(user_id, kind) DO UPDATE SET
                    count = holdings.count + excluded.count
                "#,
            )
            .bind(share.user_id.to_string())
            .bind(share.kind.as_str())
            .bind(amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("combat.credit_rewards", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("combat.credit_rewards", e))?;
        Ok(true)
    }

    async fn retire(&self, summary: &CombatSummary) -> Result<(), RepoError> {
        let json =
            serde_json::to_string(summary).map_err(|e| RepoError::Serialization(e.to_string()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("combat.retire", e))?;

        sqlx::query(
            r#"
            INSERT INTO combat_summaries (session_id, room_id, summary_json, retired_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(session_id) DO NOTHING
            "#,
        )
        .bind(summary.session_id.to_string())
        .bind(summary.room_id.as_str())
        .bind(json)
        .bind(summary.retired_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("combat.retire", e))?;

        sqlx::query("DELETE FROM combat_sessions WHERE session_id = ?")
            .bind(summary.session_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("combat.retire", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("combat.retire", e))?;
        Ok(())
    }

    async fn get_summary(&self, id: CombatSessionId) -> Result<Option<CombatSummary>, RepoError> {
        let row = sqlx::query("SELECT summary_json FROM combat_summaries WHERE session_id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("combat.get_summary", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("summary_json");
                let summary = serde_json::from_str(&json)
                    .map_err(|e| RepoError::Serialization(e.to_string()))?;
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }
}
