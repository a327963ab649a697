//! Session repository
//!
//! Raw storage for server-side sessions: an opaque id, a serialized payload
//! and the last time the session was written. Interpreting the payload is
//! left to [`crate::session::SqlxSessionStore`].

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// A stored session row
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub data: String,
    pub updated_at: DateTime<Utc>,
}

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Get session by ID
    async fn get(&self, id: &str) -> Result<Option<SessionRecord>>;

    /// Insert or replace a session, stamping `updated_at` with the current time
    async fn upsert(&self, id: &str, data: &str) -> Result<()>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete sessions last written before `cutoff`
    async fn delete_idle(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn get(&self, id: &str) -> Result<Option<SessionRecord>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_session_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn upsert(&self, id: &str, data: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                upsert_session_sqlite(self.pool.as_sqlite().unwrap(), id, data).await
            }
            DatabaseDriver::Mysql => {
                upsert_session_mysql(self.pool.as_mysql().unwrap(), id, data).await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_session_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_session_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn delete_idle(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_idle_sessions_sqlite(self.pool.as_sqlite().unwrap(), cutoff).await
            }
            DatabaseDriver::Mysql => {
                delete_idle_sessions_mysql(self.pool.as_mysql().unwrap(), cutoff).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_session_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<SessionRecord>> {
    let row = sqlx::query("SELECT id, data, updated_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session")?;

    Ok(row.as_ref().map(row_to_session_sqlite))
}

async fn upsert_session_sqlite(pool: &SqlitePool, id: &str, data: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, data, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
        "#,
    )
    .bind(id)
    .bind(data)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to save session")?;

    Ok(())
}

async fn delete_session_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_idle_sessions_sqlite(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE updated_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await
        .context("Failed to delete idle sessions")?;

    Ok(result.rows_affected())
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> SessionRecord {
    SessionRecord {
        id: row.get("id"),
        data: row.get("data"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_session_mysql(pool: &MySqlPool, id: &str) -> Result<Option<SessionRecord>> {
    let row = sqlx::query("SELECT id, data, updated_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session")?;

    Ok(row.as_ref().map(row_to_session_mysql))
}

async fn upsert_session_mysql(pool: &MySqlPool, id: &str, data: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, data, updated_at)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE data = VALUES(data), updated_at = VALUES(updated_at)
        "#,
    )
    .bind(id)
    .bind(data)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to save session")?;

    Ok(())
}

async fn delete_session_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_idle_sessions_mysql(pool: &MySqlPool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE updated_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await
        .context("Failed to delete idle sessions")?;

    Ok(result.rows_affected())
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> SessionRecord {
    SessionRecord {
        id: row.get("id"),
        data: row.get("data"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxSessionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSessionRepository::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = setup_test_repo().await;

        repo.upsert("abc", r#"{"logged_in":true}"#).await.unwrap();
        let record = repo.get("abc").await.unwrap().expect("Session should exist");
        assert_eq!(record.id, "abc");
        assert_eq!(record.data, r#"{"logged_in":true}"#);

        repo.upsert("abc", r#"{"logged_in":false}"#).await.unwrap();
        let record = repo.get("abc").await.unwrap().unwrap();
        assert_eq!(record.data, r#"{"logged_in":false}"#);
    }

    #[tokio::test]
    async fn test_get_missing_session() {
        let repo = setup_test_repo().await;
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let repo = setup_test_repo().await;
        repo.upsert("abc", "{}").await.unwrap();

        repo.delete("abc").await.unwrap();
        assert!(repo.get("abc").await.unwrap().is_none());

        // deleting again is fine
        repo.delete("abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_idle_sessions() {
        let repo = setup_test_repo().await;
        repo.upsert("fresh", "{}").await.unwrap();

        let removed = repo.delete_idle(Utc::now() - Duration::hours(1)).await.unwrap();
        assert_eq!(removed, 0);

        let removed = repo.delete_idle(Utc::now() + Duration::hours(1)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get("fresh").await.unwrap().is_none());
    }
}
