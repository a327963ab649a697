//! uBlog - A small personal blogging website

use anyhow::Result;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ublog::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxArticleRepository, SqlxUserRepository},
    },
    services::{ArticleService, UserService},
    session::{create_session_store, SessionCookie},
    theme::ThemeEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ublog=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting uBlog...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Services
    let user_service = Arc::new(UserService::new(
        SqlxUserRepository::boxed(pool.clone()),
        config.password.clone(),
    ));
    let article_service = Arc::new(ArticleService::new(SqlxArticleRepository::boxed(
        pool.clone(),
    )));

    // Sessions
    let sessions = create_session_store(&config.session, pool.clone()).await?;
    let cookie = SessionCookie::from_config(&config.session, session_key(&config.session.secret));

    // Templates
    let theme = ThemeEngine::new(config.theme.path.as_deref())?;
    match &config.theme.path {
        Some(path) => tracing::info!("Templates loaded, overrides from {}", path.display()),
        None => tracing::info!("Templates loaded"),
    }

    let state = AppState {
        user_service,
        article_service,
        sessions,
        cookie: Arc::new(cookie),
        theme: Arc::new(theme),
    };

    // Build router
    let app = api::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

/// Cookie signing key. Without a configured secret a random one is used, so
/// sessions do not survive a restart.
fn session_key(secret: &str) -> Vec<u8> {
    if !secret.is_empty() {
        return secret.as_bytes().to_vec();
    }

    tracing::warn!("session.secret is not set; generated a random key, sessions end on restart");
    let mut key = vec![0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}
