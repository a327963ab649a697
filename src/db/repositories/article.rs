//! Article repository
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite and MySQL
//!
//! Every operation is a single parameterized statement. Lists are ordered
//! newest first.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Article;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// List every article
    async fn list_all(&self) -> Result<Vec<Article>>;

    /// List the articles written by `username`
    async fn list_by_author(&self, username: &str) -> Result<Vec<Article>>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get article by ID, only if `username` wrote it
    async fn get_by_id_and_author(&self, id: i64, username: &str) -> Result<Option<Article>>;

    /// Insert a new article and return its id
    async fn insert(&self, title: &str, author: &str, content: &str) -> Result<i64>;

    /// Replace title and content. Returns false when no row has this id.
    async fn update_by_id(&self, id: i64, title: &str, content: &str) -> Result<bool>;

    /// Delete an article. Returns false when no row has this id.
    async fn delete_by_id(&self, id: i64) -> Result<bool>;

    /// Articles whose title contains `keyword`
    async fn search_by_title(&self, keyword: &str) -> Result<Vec<Article>>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn list_all(&self) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_all_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_all_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_by_author(&self, username: &str) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_author_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Mysql => {
                list_by_author_mysql(self.pool.as_mysql().unwrap(), username).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_id_and_author(&self, id: i64, username: &str) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_id_and_author_sqlite(self.pool.as_sqlite().unwrap(), id, username).await
            }
            DatabaseDriver::Mysql => {
                get_by_id_and_author_mysql(self.pool.as_mysql().unwrap(), id, username).await
            }
        }
    }

    async fn insert(&self, title: &str, author: &str, content: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_sqlite(self.pool.as_sqlite().unwrap(), title, author, content).await
            }
            DatabaseDriver::Mysql => {
                insert_mysql(self.pool.as_mysql().unwrap(), title, author, content).await
            }
        }
    }

    async fn update_by_id(&self, id: i64, title: &str, content: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_by_id_sqlite(self.pool.as_sqlite().unwrap(), id, title, content).await
            }
            DatabaseDriver::Mysql => {
                update_by_id_mysql(self.pool.as_mysql().unwrap(), id, title, content).await
            }
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn search_by_title(&self, keyword: &str) -> Result<Vec<Article>> {
        let pattern = format!("%{}%", escape_like(keyword));
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                search_by_title_sqlite(self.pool.as_sqlite().unwrap(), &pattern).await
            }
            DatabaseDriver::Mysql => {
                search_by_title_mysql(self.pool.as_mysql().unwrap(), &pattern).await
            }
        }
    }
}

/// Escape LIKE wildcards so the keyword matches literally
fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_all_sqlite(pool: &SqlitePool) -> Result<Vec<Article>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list articles")?;

    Ok(rows.iter().map(row_to_article_sqlite).collect())
}

async fn list_by_author_sqlite(pool: &SqlitePool, username: &str) -> Result<Vec<Article>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        WHERE author = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(username)
    .fetch_all(pool)
    .await
    .context("Failed to list articles by author")?;

    Ok(rows.iter().map(row_to_article_sqlite).collect())
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get article by ID")?;

    Ok(row.as_ref().map(row_to_article_sqlite))
}

async fn get_by_id_and_author_sqlite(
    pool: &SqlitePool,
    id: i64,
    username: &str,
) -> Result<Option<Article>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        WHERE id = ? AND author = ?
        "#,
    )
    .bind(id)
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get article by ID and author")?;

    Ok(row.as_ref().map(row_to_article_sqlite))
}

async fn insert_sqlite(pool: &SqlitePool, title: &str, author: &str, content: &str) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, author, content, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(title)
    .bind(author)
    .bind(content)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(result.last_insert_rowid())
}

async fn update_by_id_sqlite(pool: &SqlitePool, id: i64, title: &str, content: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE articles SET title = ?, content = ? WHERE id = ?")
        .bind(title)
        .bind(content)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update article")?;

    Ok(result.rows_affected() > 0)
}

async fn delete_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete article")?;

    Ok(result.rows_affected() > 0)
}

async fn search_by_title_sqlite(pool: &SqlitePool, pattern: &str) -> Result<Vec<Article>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        WHERE title LIKE ? ESCAPE '\'
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .context("Failed to search articles")?;

    Ok(rows.iter().map(row_to_article_sqlite).collect())
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_all_mysql(pool: &MySqlPool) -> Result<Vec<Article>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list articles")?;

    Ok(rows.iter().map(row_to_article_mysql).collect())
}

async fn list_by_author_mysql(pool: &MySqlPool, username: &str) -> Result<Vec<Article>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        WHERE author = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(username)
    .fetch_all(pool)
    .await
    .context("Failed to list articles by author")?;

    Ok(rows.iter().map(row_to_article_mysql).collect())
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get article by ID")?;

    Ok(row.as_ref().map(row_to_article_mysql))
}

async fn get_by_id_and_author_mysql(
    pool: &MySqlPool,
    id: i64,
    username: &str,
) -> Result<Option<Article>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        WHERE id = ? AND author = ?
        "#,
    )
    .bind(id)
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get article by ID and author")?;

    Ok(row.as_ref().map(row_to_article_mysql))
}

async fn insert_mysql(pool: &MySqlPool, title: &str, author: &str, content: &str) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, author, content, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(title)
    .bind(author)
    .bind(content)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(result.last_insert_id() as i64)
}

async fn update_by_id_mysql(pool: &MySqlPool, id: i64, title: &str, content: &str) -> Result<bool> {
    // MySQL reports changed rows, not matched rows, so an identical
    // resubmission would read as "missing" without the existence check.
    let result = sqlx::query("UPDATE articles SET title = ?, content = ? WHERE id = ?")
        .bind(title)
        .bind(content)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update article")?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }
    Ok(get_by_id_mysql(pool, id).await?.is_some())
}

async fn delete_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete article")?;

    Ok(result.rows_affected() > 0)
}

async fn search_by_title_mysql(pool: &MySqlPool, pattern: &str) -> Result<Vec<Article>> {
    // Backslash is MySQL's default LIKE escape character.
    let rows = sqlx::query(
        r#"
        SELECT id, title, author, content, created_at
        FROM articles
        WHERE title LIKE ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .context("Failed to search articles")?;

    Ok(rows.iter().map(row_to_article_mysql).collect())
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}
