//! In-process session store backed by moka

use super::SessionStore;
use crate::models::SessionData;
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

/// Upper bound on concurrently held sessions
const DEFAULT_MAX_CAPACITY: u64 = 100_000;

/// moka refuses a time-to-idle above 1000 years
const MAX_TIME_TO_IDLE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Sessions held in memory; lost on restart.
pub struct MemorySessionStore {
    cache: Cache<String, SessionData>,
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MemorySessionStore {
    /// Sessions untouched for `idle_timeout` are evicted.
    pub fn new(idle_timeout: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(DEFAULT_MAX_CAPACITY)
            .time_to_idle(idle_timeout.min(MAX_TIME_TO_IDLE))
            .build();

        Self { cache }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        Ok(self.cache.get(id).await)
    }

    async fn save(&self, id: &str, data: &SessionData) -> Result<()> {
        self.cache.insert(id.to_string(), data.clone()).await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.cache.invalidate(id).await;
        Ok(())
    }
}
