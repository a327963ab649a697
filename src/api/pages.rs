//! Static pages, the dashboard and the not-found page

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tera::Context as TeraContext;

use super::middleware::{AppError, AppState, CurrentUser, RequestContext};

pub async fn index(ctx: RequestContext) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("page", &json!({ "title": "Home", "body": "Umut Bektaş" }));
    Ok(ctx.render("index.html", context)?.into_response())
}

pub async fn about(ctx: RequestContext) -> Result<Response, AppError> {
    Ok(ctx.render("about.html", TeraContext::new())?.into_response())
}

/// The logged-in user's own articles
pub async fn dashboard(
    State(state): State<AppState>,
    ctx: RequestContext,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let articles = state.article_service.list_by_author(&user.username).await?;

    let mut context = TeraContext::new();
    context.insert("articles", &articles);
    Ok(ctx.render("dashboard.html", context)?.into_response())
}

pub async fn not_found(ctx: RequestContext) -> Result<Response, AppError> {
    let html = ctx.render("404.html", TeraContext::new())?;
    Ok((StatusCode::NOT_FOUND, html).into_response())
}
