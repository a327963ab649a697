//! Article service
//!
//! Listing, search and ownership-checked mutation of articles. Edits and
//! deletes only go through when the acting username is the article's author.

use crate::db::repositories::ArticleRepository;
use crate::forms::ArticleDraft;
use crate::models::Article;
use anyhow::Context;
use std::sync::Arc;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// No article with this id belongs to the acting user
    #[error("Article not found: {0}")]
    NotFound(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo }
    }

    /// Every article, newest first
    pub async fn list_all(&self) -> Result<Vec<Article>, ArticleServiceError> {
        Ok(self.repo.list_all().await.context("Failed to list articles")?)
    }

    /// Articles written by `username`, newest first
    pub async fn list_by_author(&self, username: &str) -> Result<Vec<Article>, ArticleServiceError> {
        Ok(self
            .repo
            .list_by_author(username)
            .await
            .context("Failed to list articles by author")?)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Article>, ArticleServiceError> {
        Ok(self.repo.get_by_id(id).await.context("Failed to get article")?)
    }

    /// Fetch an article for editing.
    ///
    /// Returns `NotFound` both when the id is absent and when someone else
    /// wrote the article.
    pub async fn get_owned(&self, id: i64, username: &str) -> Result<Article, ArticleServiceError> {
        let article = self
            .repo
            .get_by_id_and_author(id, username)
            .await
            .context("Failed to get article")?;

        article.ok_or_else(|| {
            tracing::warn!("User '{}' has no article {}", username, id);
            ArticleServiceError::NotFound(id)
        })
    }

    /// Title substring search, newest first
    pub async fn search(&self, keyword: &str) -> Result<Vec<Article>, ArticleServiceError> {
        Ok(self
            .repo
            .search_by_title(keyword)
            .await
            .context("Failed to search articles")?)
    }

    /// Create an article written by `author`, returning its id
    pub async fn create(&self, author: &str, draft: &ArticleDraft) -> Result<i64, ArticleServiceError> {
        let id = self
            .repo
            .insert(&draft.title, author, &draft.content)
            .await
            .context("Failed to create article")?;

        tracing::info!("User '{}' created article {}", author, id);
        Ok(id)
    }

    /// Replace title and content of an article owned by `username`
    pub async fn update(
        &self,
        id: i64,
        username: &str,
        draft: &ArticleDraft,
    ) -> Result<(), ArticleServiceError> {
        self.get_owned(id, username).await?;

        let updated = self
            .repo
            .update_by_id(id, &draft.title, &draft.content)
            .await
            .context("Failed to update article")?;
        if !updated {
            return Err(ArticleServiceError::NotFound(id));
        }

        tracing::info!("User '{}' updated article {}", username, id);
        Ok(())
    }

    /// Delete an article owned by `username`
    pub async fn delete(&self, id: i64, username: &str) -> Result<(), ArticleServiceError> {
        self.get_owned(id, username).await?;

        let deleted = self
            .repo
            .delete_by_id(id)
            .await
            .context("Failed to delete article")?;
        if !deleted {
            return Err(ArticleServiceError::NotFound(id));
        }

        tracing::info!("User '{}' deleted article {}", username, id);
        Ok(())
    }
}
