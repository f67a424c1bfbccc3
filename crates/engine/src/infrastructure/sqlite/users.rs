//! SQLite-backed user identities.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tidewatch_domain::{DisplayName, Role, UserId, UserIdentity};

use super::{parse_timestamp, parse_user_id};
use crate::infrastructure::ports::{RepoError, UserRepo};

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_identity(row: &SqliteRow) -> Result<UserIdentity, RepoError> {
    let user_id: String = row.get("user_id");
    let display_name: String = row.get("display_name");
    let role: String = row.get("role");
    let created_at: String = row.get("created_at");

    Ok(UserIdentity::new(
        parse_user_id(&user_id)?,
        DisplayName::new(display_name).map_err(RepoError::serialization)?,
        role.parse::<Role>().map_err(RepoError::serialization)?,
        parse_timestamp(&created_at)?,
    ))
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn get(&self, id: UserId) -> Result<Option<UserIdentity>, RepoError> {
        let row = sqlx::query(
            "SELECT user_id, display_name, role, created_at FROM users WHERE user_id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("users.get", e))?;

        row.as_ref().map(row_to_identity).transpose()
    }

    async fn ensure(&self, identity: &UserIdentity) -> Result<UserIdentity, RepoError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name, role, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET user_id = user_id
            RETURNING user_id, display_name, role, created_at
            "#,
        )
        .bind(identity.id().to_string())
        .bind(identity.display_name().as_str())
        .bind(identity.role().as_str())
        .bind(identity.created_at().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::database("users.ensure", e))?;

        row_to_identity(&row)
    }
}
