//! SQLite implementations of the repository ports.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tidewatch_domain::UserId;

use crate::infrastructure::ports::RepoError;

mod achievements;
mod combat;
mod cooldowns;
mod holdings;
mod users;

pub use achievements::SqliteAchievementRepo;
pub use combat::SqliteCombatRepo;
pub use cooldowns::SqliteCooldownRepo;
pub use holdings::SqliteHoldingsRepo;
pub use users::SqliteUserRepo;

const MAX_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        role TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cooldowns (
        user_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        ends_at_ms INTEGER NOT NULL,
        PRIMARY KEY (user_id, kind)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS holdings (
        user_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        count INTEGER NOT NULL CHECK (count >= 0),
        PRIMARY KEY (user_id, kind)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_holdings_kind_count ON holdings (kind, count DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS combat_sessions (
        session_id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL,
        version INTEGER NOT NULL,
        state_json TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS combat_summaries (
        session_id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL,
        summary_json TEXT NOT NULL,
        retired_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reward_distributions (
        session_id TEXT PRIMARY KEY,
        credited_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reward_ledger (
        session_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        amount INTEGER NOT NULL,
        PRIMARY KEY (session_id, user_id, kind)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS achievements (
        user_id TEXT NOT NULL,
        achievement_id TEXT NOT NULL,
        granted_at TEXT NOT NULL,
        granted_by TEXT,
        PRIMARY KEY (user_id, achievement_id)
    )
    "#,
];

/// Open a pool for `database_url` and make sure the schema exists.
///
/// An in-memory database lives and dies with its connection, so those pools
/// are held to a single connection.
pub async fn connect(database_url: &str) -> Result<SqlitePool, RepoError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| RepoError::database("connect", e))?
        .create_if_missing(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| RepoError::database("connect", e))?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Create tables and indexes if they are missing.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), RepoError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| RepoError::database("ensure_schema", e))?;
    }
    Ok(())
}

/// All SQLite repositories over one pool.
pub struct SqliteRepositories {
    pub users: Arc<SqliteUserRepo>,
    pub cooldowns: Arc<SqliteCooldownRepo>,
    pub holdings: Arc<SqliteHoldingsRepo>,
    pub combat: Arc<SqliteCombatRepo>,
    pub achievements: Arc<SqliteAchievementRepo>,
}

impl SqliteRepositories {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: Arc::new(SqliteUserRepo::new(pool.clone())),
            cooldowns: Arc::new(SqliteCooldownRepo::new(pool.clone())),
            holdings: Arc::new(SqliteHoldingsRepo::new(pool.clone())),
            combat: Arc::new(SqliteCombatRepo::new(pool.clone())),
            achievements: Arc::new(SqliteAchievementRepo::new(pool)),
        }
    }
}

// =============================================================================
// Column helpers
// =============================================================================

fn parse_user_id(raw: &str) -> Result<UserId, RepoError> {
    UserId::parse(raw).map_err(RepoError::serialization)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(RepoError::serialization)
}

fn to_sql_count(value: u64) -> Result<i64, RepoError> {
    i64::try_from(value).map_err(|_| RepoError::constraint(format!("count {value} out of range")))
}

fn from_sql_count(value: i64) -> Result<u64, RepoError> {
    u64::try_from(value).map_err(|_| RepoError::constraint(format!("negative count {value}")))
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    connect("sqlite::memory:").await.expect("in-memory sqlite")
}
