//! Session store persisted in the `sessions` table
//!
//! Payloads are stored as JSON. A row whose `updated_at` is older than the
//! idle timeout is treated as absent and removed when it is next looked up.

use super::SessionStore;
use crate::db::repositories::SessionRepository;
use crate::models::SessionData;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub struct SqlxSessionStore {
    repo: Arc<dyn SessionRepository>,
    idle_timeout: chrono::Duration,
}

impl SqlxSessionStore {
    pub fn new(repo: Arc<dyn SessionRepository>, idle_timeout: Duration) -> Self {
        let idle_timeout =
            chrono::Duration::from_std(idle_timeout).unwrap_or(chrono::Duration::MAX);
        Self { repo, idle_timeout }
    }

    /// Delete every session idle longer than the timeout
    pub async fn purge_idle(&self) -> Result<u64> {
        match Utc::now().checked_sub_signed(self.idle_timeout) {
            Some(cutoff) => self.repo.delete_idle(cutoff).await,
            None => Ok(0),
        }
    }
}

#[async_trait]
impl SessionStore for SqlxSessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        let Some(record) = self.repo.get(id).await? else {
            return Ok(None);
        };

        let idle_since = record
            .updated_at
            .checked_add_signed(self.idle_timeout)
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);
        if idle_since < Utc::now() {
            self.repo.delete(id).await?;
            return Ok(None);
        }

        match serde_json::from_str(&record.data) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                tracing::warn!("Discarding unreadable session {}: {}", id, e);
                self.repo.delete(id).await?;
                Ok(None)
            }
        }
    }

    async fn save(&self, id: &str, data: &SessionData) -> Result<()> {
        let json = serde_json::to_string(data).context("Failed to serialize session")?;
        self.repo.upsert(id, &json).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete(id).await
    }
}
