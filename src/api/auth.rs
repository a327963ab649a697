//! Registration, login and logout

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use super::middleware::{found, login_url, safe_next, AppError, AppState, RequestContext};
use crate::forms::{FieldErrors, LoginForm, RegisterForm};
use crate::models::FlashCategory;
use crate::services::UserServiceError;

/// Where to go after logging in
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

fn register_page(
    ctx: &RequestContext,
    form: &RegisterForm,
    errors: &FieldErrors,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(ctx.render("register.html", context)?.into_response())
}

fn login_page(
    ctx: &RequestContext,
    form: &LoginForm,
    errors: &FieldErrors,
    next: Option<&str>,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("next", &next);
    Ok(ctx.render("login.html", context)?.into_response())
}

pub async fn register_form(ctx: RequestContext) -> Result<Response, AppError> {
    register_page(&ctx, &RegisterForm::default(), &FieldErrors::default())
}

pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form?;
    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => return register_page(&ctx, &form, &errors),
    };

    match state.user_service.register(&registration).await {
        Ok(_) => {}
        Err(UserServiceError::UsernameTaken(_)) => {
            let mut errors = FieldErrors::default();
            errors.add("username", "This username is already taken.");
            return register_page(&ctx, &form, &errors);
        }
        Err(e) => return Err(e.into()),
    }

    ctx.flash(
        FlashCategory::Success,
        "Registration successful, welcome! You can now log in.",
    );
    Ok(found("/login"))
}

pub async fn login_form(
    ctx: RequestContext,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    login_page(
        &ctx,
        &LoginForm::default(),
        &FieldErrors::default(),
        query.next.as_deref(),
    )
}

pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    query: Result<Query<LoginQuery>, QueryRejection>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let Form(form) = form?;
    let next = query.next.as_deref();

    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => return login_page(&ctx, &form, &errors, next),
    };

    let user = match state.user_service.authenticate(&credentials).await {
        Ok(user) => user,
        Err(UserServiceError::UnknownUser) => {
            ctx.flash(FlashCategory::Warning, "User not found.");
            return Ok(found(&login_url(next)));
        }
        Err(UserServiceError::WrongPassword) => {
            ctx.flash(FlashCategory::Warning, "Wrong password, please try again.");
            return Ok(found(&login_url(next)));
        }
        Err(e) => return Err(e.into()),
    };

    ctx.log_in(&user);
    ctx.flash(FlashCategory::Success, "You have logged in successfully.");
    tracing::info!("User logged in: {}", user.username);

    Ok(found(safe_next(next).unwrap_or("/dashboard")))
}

/// Logging out without a session is a plain redirect home
pub async fn logout(ctx: RequestContext) -> Response {
    if let Some(username) = ctx.username() {
        ctx.log_out();
        ctx.flash(FlashCategory::Success, "You have logged out successfully.");
        tracing::info!("User logged out: {}", username);
    }
    found("/")
}
