pub mod models;
pub mod repository;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

pub use models::{Habit, HabitWithTrackers, NewHabit, PurgeSummary, Tracker};
pub use repository::HabitRepository;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const CREATE_HABITS: &str = r#"
    CREATE TABLE IF NOT EXISTS habits (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        description TEXT
    )
"#;

const CREATE_TRACKERS: &str = r#"
    CREATE TABLE IF NOT EXISTS trackers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        habit_id INTEGER NOT NULL REFERENCES habits (id),
        date TEXT NOT NULL,
        status INTEGER DEFAULT 0
    )
"#;

/// Open a connection pool with foreign key enforcement enabled
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|_| DatabaseError::InvalidDatabaseUrl(config.url.clone()))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    info!("Created database pool for: {}", config.url);
    Ok(pool)
}

/// Create both tables when they do not exist yet
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), DatabaseError> {
    sqlx::query(CREATE_HABITS).execute(pool).await?;
    sqlx::query(CREATE_TRACKERS).execute(pool).await?;
    Ok(())
}

/// Pings the pool to ensure connectivity
pub async fn health_check(pool: &SqlitePool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Single-connection in-memory pool with the schema applied.
///
/// One connection only: every new in-memory connection would see an empty database.
pub async fn memory_pool() -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options)
        .await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}
