use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::filter::FilterError;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DatabaseError::Conflict(unique_violation_message(db_err.message()));
            }
        }
        DatabaseError::Sqlx(err)
    }
}

/// "UNIQUE constraint failed: accounts.role, accounts.email" -> "email already exists"
fn unique_violation_message(raw: &str) -> String {
    let columns: Vec<&str> = raw
        .rsplit(':')
        .next()
        .unwrap_or(raw)
        .split(',')
        .map(|c| c.trim())
        .map(|c| c.rsplit('.').next().unwrap_or(c))
        .filter(|c| *c != "role")
        .collect();
    if columns.is_empty() {
        "Record already exists".to_string()
    } else {
        format!("{} already exists", columns.join(", "))
    }
}

/// Builds the application's connection pool and runs schema bootstrap.
pub struct DatabaseManager;

impl DatabaseManager {
    /// Connect using the configured URL, creating the database file if needed.
    pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
        if config.url.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        if Self::is_memory_url(&config.url) {
            return Self::connect_in_memory().await;
        }

        Self::ensure_parent_dir(&config.url)?;

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DatabaseError::Connection(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.connection_timeout));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        info!("Connected to database: {}", config.url);
        Ok(pool)
    }

    /// Private in-memory database. A single connection that is never
    /// recycled, since every new SQLite memory connection starts empty.
    pub async fn connect_in_memory() -> Result<SqlitePool, DatabaseError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DatabaseError::Connection(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        Ok(pool)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Create every table and index that does not exist yet.
    pub async fn migrate(pool: &SqlitePool) -> Result<(), DatabaseError> {
        for statement in super::schema::STATEMENTS {
            sqlx::query(statement).execute(pool).await?;
        }
        info!("Database schema is up to date ({} statements)", super::schema::STATEMENTS.len());
        Ok(())
    }

    fn is_memory_url(url: &str) -> bool {
        url == ":memory:" || url.starts_with("sqlite::memory:") || url.contains("mode=memory")
    }

    fn ensure_parent_dir(url: &str) -> Result<(), DatabaseError> {
        let path = url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");
        let path = path.split('?').next().unwrap_or(path);

        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Connection(format!("failed to create database directory {:?}: {}", parent, e))
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_memory_urls() {
        assert!(DatabaseManager::is_memory_url("sqlite::memory:"));
        assert!(DatabaseManager::is_memory_url(":memory:"));
        assert!(!DatabaseManager::is_memory_url("sqlite:data/agora.db"));
    }

    #[test]
    fn unique_violation_names_the_columns() {
        assert_eq!(
            unique_violation_message("UNIQUE constraint failed: accounts.role, accounts.email"),
            "email already exists"
        );
        assert_eq!(
            unique_violation_message("UNIQUE constraint failed: community_communities.name"),
            "name already exists"
        );
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        DatabaseManager::migrate(&pool).await.unwrap();
        DatabaseManager::migrate(&pool).await.unwrap();
        DatabaseManager::health_check(&pool).await.unwrap();

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 15);
    }
}
