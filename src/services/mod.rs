//! Providers: one async function per API operation, holding the business
//! rules and talking to the database. Handlers stay thin and only unpack
//! requests into these calls.

pub mod accounts;
pub mod board;
pub mod community;
pub mod market;
pub mod todo;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::Principal;

/// Inclusive creation-time window shared by most search requests.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CreatedRange {
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl CreatedRange {
    pub fn apply(&self, filter: &mut crate::filter::Filter) {
        filter
            .gte_opt("created_at", self.created_from)
            .lte_opt("created_at", self.created_to);
    }
}

/// Trimmed, non-empty, at most `max` characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_field(field, format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::invalid_field(field, format!("{} must be at most {} characters", field, max)));
    }
    Ok(trimmed.to_string())
}

/// Like `required_text`, but blank input becomes `None`.
pub(crate) fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max).map(Some),
    }
}

/// Only the account that created a resource may change it.
pub(crate) fn ensure_owner(owner_id: Uuid, principal: &Principal, label: &str) -> Result<(), ApiError> {
    if owner_id != principal.id {
        tracing::warn!("{} '{}' attempted to modify a {} they do not own", principal.role, principal.username, label);
        return Err(ApiError::forbidden(format!("You can only modify your own {}", label)));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    use crate::auth::Role;
    use crate::config::DatabaseConfig;
    use crate::database::DatabaseManager;
    use crate::middleware::Principal;

    pub async fn pool() -> SqlitePool {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        DatabaseManager::migrate(&pool).await.unwrap();
        pool
    }

    /// Pool over a database file in `dir`, for tests that need several
    /// connections writing at once.
    pub async fn file_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let config = DatabaseConfig {
            url: format!("sqlite:{}", dir.path().join("agora.db").display()),
            max_connections: 8,
            connection_timeout: 10,
            enable_slow_query_warning: false,
            slow_query_threshold_ms: 1_000,
        };
        let pool = DatabaseManager::connect(&config).await.unwrap();
        DatabaseManager::migrate(&pool).await.unwrap();
        pool
    }

    /// Insert an active account directly, skipping password hashing.
    pub async fn principal(pool: &SqlitePool, role: Role, username: &str) -> Principal {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO accounts (id, role, username, email, password_hash, is_active, mfa_enabled, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 'unused', 1, 0, ?5, ?5)",
        )
        .bind(id)
        .bind(role)
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
        Principal {
            id,
            role,
            username: username.to_string(),
        }
    }
}
