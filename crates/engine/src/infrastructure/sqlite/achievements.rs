//! SQLite-backed achievement grants.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tidewatch_domain::{GrantedAchievement, UserId};

use super::{parse_timestamp, parse_user_id};
use crate::infrastructure::ports::{AchievementRepo, RepoError};

pub struct SqliteAchievementRepo {
    pool: SqlitePool,
}

impl SqliteAchievementRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AchievementRepo for SqliteAchievementRepo {
    async fn grant(&self, grant: &GrantedAchievement) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO achievements (user_id, achievement_id, granted_at, granted_by)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(grant.user_id.to_string())
        .bind(&grant.achievement_id)
        .bind(grant.granted_at.to_rfc3339())
        .bind(grant.granted_by.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("achievements.grant", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke(&self, user_id: UserId, achievement_id: &str) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM achievements WHERE user_id = ? AND achievement_id = ?")
                .bind(user_id.to_string())
                .bind(achievement_id)
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::database("achievements.revoke", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<GrantedAchievement>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT achievement_id, granted_at, granted_by FROM achievements
            WHERE user_id = ?
            ORDER BY granted_at
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("achievements.list_for_user", e))?;

        rows.iter()
            .map(|row| {
                let granted_at: String = row.get("granted_at");
                let granted_by: Option<String> = row.get("granted_by");
                Ok(GrantedAchievement {
                    user_id,
                    achievement_id: row.get("achievement_id"),
                    granted_at: parse_timestamp(&granted_at)?,
                    granted_by: granted_by.as_deref().map(parse_user_id).transpose()?,
                })
            })
            .collect()
    }
}
