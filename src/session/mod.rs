//! Server-side sessions
//!
//! A browser is identified by a random session id carried in a signed cookie
//! ([`SessionCookie`]). The id resolves to a [`SessionData`] through a
//! [`SessionStore`], either in-process ([`MemorySessionStore`]) or in the
//! `sessions` table ([`SqlxSessionStore`]).

mod cookie;
mod database;
mod memory;

pub use cookie::SessionCookie;
pub use database::SqlxSessionStore;
pub use memory::MemorySessionStore;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{SessionConfig, SessionDriver};
use crate::db::repositories::SqlxSessionRepository;
use crate::db::DynDatabasePool;
use crate::models::SessionData;

/// Storage backend for session data
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session; missing and idle-expired sessions read as `None`
    async fn load(&self, id: &str) -> Result<Option<SessionData>>;

    /// Insert or replace a session and reset its idle timer
    async fn save(&self, id: &str, data: &SessionData) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Type alias for a shared session store
pub type DynSessionStore = Arc<dyn SessionStore>;

/// Generate a fresh, unguessable session id
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Create the session store selected by configuration.
///
/// The database store purges idle rows once at startup.
pub async fn create_session_store(
    config: &SessionConfig,
    pool: DynDatabasePool,
) -> Result<DynSessionStore> {
    let idle_timeout = Duration::from_secs(config.idle_timeout_seconds);

    match config.driver {
        SessionDriver::Memory => {
            tracing::info!("Using in-memory session store");
            Ok(Arc::new(MemorySessionStore::new(idle_timeout)))
        }
        SessionDriver::Database => {
            tracing::info!("Using database session store");
            let store = SqlxSessionStore::new(SqlxSessionRepository::boxed(pool), idle_timeout);
            let purged = store.purge_idle().await?;
            if purged > 0 {
                tracing::info!("Purged {} idle session(s)", purged);
            }
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[test]
    fn test_new_session_id_is_random() {
        let a = new_session_id();
        let b = new_session_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_create_session_store_for_each_driver() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        for driver in [SessionDriver::Memory, SessionDriver::Database] {
            let config = SessionConfig {
                driver,
                ..Default::default()
            };
            let store = create_session_store(&config, pool.clone()).await.unwrap();

            let mut data = SessionData::default();
            data.log_in("alice", "Alice Liddell");
            store.save("abc", &data).await.unwrap();
            assert_eq!(store.load("abc").await.unwrap(), Some(data));

            store.delete("abc").await.unwrap();
            assert_eq!(store.load("abc").await.unwrap(), None);
        }
    }
}
