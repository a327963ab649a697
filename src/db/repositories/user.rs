//! User repository
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for account lookups
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Accounts are only ever created and looked up. `username` uniqueness is a
//! schema constraint, so a duplicate insert fails with a unique violation
//! (see [`crate::db::is_unique_violation`]).

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by login name
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insert a new user and return its id
    async fn insert(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_user_by_username_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Mysql => {
                find_user_by_username_mysql(self.pool.as_mysql().unwrap(), username).await
            }
        }
    }

    async fn insert(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_user_sqlite(self.pool.as_sqlite().unwrap(), name, username, email, password_hash)
                    .await
            }
            DatabaseDriver::Mysql => {
                insert_user_mysql(self.pool.as_mysql().unwrap(), name, username, email, password_hash)
                    .await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn find_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, username, email, password, created_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    Ok(row.as_ref().map(row_to_user_sqlite))
}

async fn insert_user_sqlite(
    pool: &SqlitePool,
    name: &str,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (name, username, email, password, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(result.last_insert_rowid())
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn find_user_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, username, email, password, created_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    Ok(row.as_ref().map(row_to_user_mysql))
}

async fn insert_user_mysql(
    pool: &MySqlPool,
    name: &str,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (name, username, email, password, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(result.last_insert_id() as i64)
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let (_pool, repo) = setup_test_repo().await;

        let id = repo
            .insert("Alice Liddell", "alice", "alice@example.com", "$argon2id$fake")
            .await
            .expect("Failed to insert user");
        assert!(id > 0);

        let user = repo
            .find_by_username("alice")
            .await
            .expect("Failed to query user")
            .expect("User should exist");

        assert_eq!(user.id, id);
        assert_eq!(user.name, "Alice Liddell");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.password_hash, "$argon2id$fake");
    }

    #[tokio::test]
    async fn test_find_unknown_user() {
        let (_pool, repo) = setup_test_repo().await;

        let user = repo.find_by_username("nobody").await.expect("Query should succeed");
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_username_lookup_is_exact() {
        let (_pool, repo) = setup_test_repo().await;
        repo.insert("Alice Liddell", "alice", "alice@example.com", "hash")
            .await
            .unwrap();

        assert!(repo.find_by_username("ali").await.unwrap().is_none());
        assert!(repo.find_by_username("alice%").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let (_pool, repo) = setup_test_repo().await;
        repo.insert("Alice Liddell", "alice", "alice@example.com", "hash")
            .await
            .unwrap();

        let err = repo
            .insert("Other Alice", "alice", "other@example.com", "hash")
            .await
            .expect_err("Duplicate username should fail");

        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_allowed() {
        let (_pool, repo) = setup_test_repo().await;
        repo.insert("Alice Liddell", "alice", "shared@example.com", "hash")
            .await
            .unwrap();

        let result = repo
            .insert("Bob Builder", "bob", "shared@example.com", "hash")
            .await;
        assert!(result.is_ok());
    }
}
