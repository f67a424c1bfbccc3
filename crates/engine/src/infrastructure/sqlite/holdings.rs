//! SQLite-backed counted holdings.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tidewatch_domain::{InventoryEntry, ItemKind, UserId};

use super::{from_sql_count, parse_user_id, to_sql_count};
use crate::infrastructure::ports::{HoldingsRepo, LeaderboardRow, RepoError};

pub struct SqliteHoldingsRepo {
    pool: SqlitePool,
}

impl SqliteHoldingsRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HoldingsRepo for SqliteHoldingsRepo {
    async fn get(&self, user_id: UserId, kind: &ItemKind) -> Result<u64, RepoError> {
        let row = sqlx::query("SELECT count FROM holdings WHERE user_id = ? AND kind = ?")
            .bind(user_id.to_string())
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("holdings.get", e))?;

        match row {
            Some(row) => from_sql_count(row.get("count")),
            None => Ok(0),
        }
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<InventoryEntry>, RepoError> {
        let rows = sqlx::query(
            "SELECT kind, count FROM holdings WHERE user_id = ? AND count > 0 ORDER BY kind",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("holdings.list_for_user", e))?;

        rows.iter()
            .map(|row| {
                let kind: String = row.get("kind");
                Ok(InventoryEntry {
                    user_id,
                    kind: ItemKind::new(kind).map_err(RepoError::serialization)?,
                    count: from_sql_count(row.get("count"))?,
                })
            })
            .collect()
    }

    async fn adjust(
        &self,
        user_id: UserId,
        kind: &ItemKind,
        delta: i64,
    ) -> Result<Option<u64>, RepoError> {
        if delta == 0 {
            return self.get(user_id, kind).await.map(Some);
        }

        let result = if delta > 0 {
            sqlx::query(
                r#"
                INSERT INTO holdings (user_id, kind, count)
                VALUES (?, ?, ?)
                ON CONFLICT(user_id, kind) DO UPDATE SET
                    count = holdings.count + excluded.count
                RETURNING count
                "#,
            )
            .bind(user_id.to_string())
            .bind(kind.as_str())
            .bind(delta)
            .fetch_optional(&self.pool)
            .await
        } else {
            // Guarded decrement: no row matches when the count would go negative.
            sqlx::query(
                r#"
                UPDATE holdings SET count = count + ?
                WHERE user_id = ? AND kind = ? AND count + ? >= 0
                RETURNING count
                "#,
            )
            .bind(delta)
            .bind(user_id.to_string())
            .bind(kind.as_str())
            .bind(delta)
            .fetch_optional(&self.pool)
            .await
        };
        let row = result.map_err(|e| RepoError::database("holdings.adjust", e))?;

        row.map(|row| from_sql_count(row.get("count"))).transpose()
    }

    async fn total_fish(&self, user_id: UserId) -> Result<u64, RepoError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(count), 0) AS total FROM holdings WHERE user_id = ? AND kind LIKE 'fish:%'",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::database("holdings.total_fish", e))?;

        from_sql_count(row.get("total"))
    }

    async fn leaderboard(
        &self,
        kind: &ItemKind,
        limit: u32,
    ) -> Result<Vec<LeaderboardRow>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT h.user_id AS user_id,
                   COALESCE(u.display_name, h.user_id) AS display_name,
                   h.count AS count
            FROM holdings h
            LEFT JOIN users u ON u.user_id = h.user_id
            WHERE h.kind = ? AND h.count > 0
            ORDER BY h.count DESC, h.user_id ASC
            LIMIT ?
            "#,
        )
        .bind(kind.as_str())
        .bind(to_sql_count(u64::from(limit))?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("holdings.leaderboard", e))?;

        rows.iter()
            .map(|row| {
                let user_id: String = row.get("user_id");
                Ok(LeaderboardRow {
                    user_id: parse_user_id(&user_id)?,
                    display_name: row.get("display_name"),
                    count: from_sql_count(row.get("count"))?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite::memory_pool;

    #[tokio::test]
    async fn decrement_below_zero_fails_without_change() {
        let repo = SqliteHoldingsRepo::new(memory_pool().await);
        let user = UserId::new();
        let amber = ItemKind::amber();

        assert_eq!(repo.adjust(user, &amber, 50).await.unwrap(), Some(50));
        assert_eq!(repo.adjust(user, &amber, -80).await.unwrap(), None);
        assert_eq!(repo.get(user, &amber).await.unwrap(), 50);
        assert_eq!(repo.adjust(user, &amber, -50).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn decrement_of_missing_holding_fails() {
        let repo = SqliteHoldingsRepo::new(memory_pool().await);
        assert_eq!(
            repo.adjust(UserId::new(), &ItemKind::gold(), -1).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn total_fish_counts_only_fish() {
        let repo = SqliteHoldingsRepo::new(memory_pool().await);
        let user = UserId::new();
        repo.adjust(user, &ItemKind::fish("Taco Octopus"), 3).await.unwrap();
        repo.adjust(user, &ItemKind::fish("Starfish"), 2).await.unwrap();
        repo.adjust(user, &ItemKind::gold(), 1000).await.unwrap();

        assert_eq!(repo.total_fish(user).await.unwrap(), 5);
        assert_eq!(repo.total_fish(UserId::new()).await.unwrap(), 0);
        assert_eq!(repo.list_for_user(user).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_count() {
        let repo = SqliteHoldingsRepo::new(memory_pool().await);
        let gold = ItemKind::gold();
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        repo.adjust(a, &gold, 10).await.unwrap();
        repo.adjust(b, &gold, 30).await.unwrap();
        repo.adjust(c, &gold, 20).await.unwrap();

        let top = repo.leaderboard(&gold, 2).await.unwrap();
        assert_eq!(
            top.iter().map(|r| (r.user_id, r.count)).collect::<Vec<_>>(),
            vec![(b, 30), (c, 20)]
        );
        // No users row yet: the id stands in for the name.
        assert_eq!(top[0].display_name, b.to_string());
    }
}
