//! HTTP layer - handlers and routing
//!
//! It includes:
//! - Home, about and dashboard pages
//! - Article listing, detail, search and the author's add/edit/delete
//! - Registration, login and logout
//! - Session and login-gate middleware

pub mod articles;
pub mod auth;
pub mod middleware;
pub mod pages;


use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

pub use middleware::{AppError, AppState, CurrentUser, RequestContext};

/// Routes that need a logged-in session
fn gated_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(pages::dashboard))
        .route("/addarticle", get(articles::add_form).post(articles::add))
        .route(
            "/articles/edit/{id}",
            get(articles::edit_form).post(articles::edit),
        )
        .route("/articles/delete/{id}", get(articles::delete))
        .route_layer(axum_middleware::from_fn(middleware::require_login))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/about", get(pages::about))
        .route("/articles", get(articles::list))
        .route("/articles/{id}", get(articles::detail))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route(
            "/search",
            get(articles::search_redirect).post(articles::search),
        )
        .merge(gated_router())
        .fallback(pages::not_found)
        // Session layer wraps everything so the gate and the handlers see the session
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::session_layer,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
