//! Request middleware
//!
//! Contains:
//! - Shared application state
//! - The session layer, which resolves the session cookie before the handler
//!   runs and persists the session afterwards
//! - The login gate for pages that need an authenticated session
//! - `AppError`, the error every handler returns

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        FromRequestParts, Request, State,
    },
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::sync::{Arc, Mutex, MutexGuard};
use tera::Context as TeraContext;

use crate::models::{FlashCategory, SessionData, User};
use crate::services::{ArticleService, ArticleServiceError, UserService, UserServiceError};
use crate::session::{new_session_id, DynSessionStore, SessionCookie};
use crate::theme::{ThemeEngine, ThemeError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub article_service: Arc<ArticleService>,
    pub sessions: DynSessionStore,
    pub cookie: Arc<SessionCookie>,
    pub theme: Arc<ThemeEngine>,
}

// ============================================================================
// Errors
// ============================================================================

/// Handler error. Logged in full and shown to the client as a generic error
/// page: 500, or the rejection status for an unreadable form or query.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error(transparent)]
    User(#[from] UserServiceError),

    #[error(transparent)]
    Article(#[from] ArticleServiceError),

    /// Body was not a readable urlencoded form
    #[error(transparent)]
    Form(#[from] FormRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),
}

/// Marker asking the session layer to render the error template
#[derive(Debug, Clone)]
struct ErrorPage {
    status: StatusCode,
    message: &'static str,
}

const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong on our side. Please try again later.";

const BAD_REQUEST_MESSAGE: &str = "The submitted form could not be read.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let page = match &self {
            AppError::Form(rejection) => {
                tracing::warn!("Rejected form submission: {}", rejection.body_text());
                ErrorPage {
                    status: rejection.status(),
                    message: BAD_REQUEST_MESSAGE,
                }
            }
            AppError::Query(rejection) => {
                tracing::warn!("Rejected query string: {}", rejection.body_text());
                ErrorPage {
                    status: rejection.status(),
                    message: BAD_REQUEST_MESSAGE,
                }
            }
            _ => {
                tracing::error!("Request failed: {:#}", self);
                ErrorPage {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: INTERNAL_ERROR_MESSAGE,
                }
            }
        };

        let mut response = page.status.into_response();
        response.extensions_mut().insert(page);
        response
    }
}

/// Plain 302 redirect. `Redirect::to` answers 303, which browsers treat the
/// same, but the site has always used 302.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

// ============================================================================
// Request-scoped session
// ============================================================================

#[derive(Debug, Default)]
struct SessionState {
    data: SessionData,
    /// Issue a new session id when persisting (identity changed)
    regenerate: bool,
}

/// Handle to the current request's session, shared between the session layer
/// and the handler.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle(Arc<Mutex<SessionState>>);

impl SessionHandle {
    fn new(data: SessionData) -> Self {
        Self(Arc::new(Mutex::new(SessionState {
            data,
            regenerate: false,
        })))
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // a panicking handler cannot leave SessionData half-updated
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> (SessionData, bool) {
        let state = self.lock();
        (state.data.clone(), state.regenerate)
    }
}

/// Template context with `session` and the pending flashes, which are
/// consumed by this call.
fn page_context(handle: &SessionHandle) -> TeraContext {
    let mut state = handle.lock();
    let flashes = state.data.take_flashes();

    let mut context = TeraContext::new();
    context.insert(
        "session",
        &serde_json::json!({
            "logged_in": state.data.logged_in,
            "username": state.data.username,
            "name": state.data.name,
        }),
    );
    context.insert("flashes", &flashes);
    context
}

/// Extractor giving handlers access to the session and page rendering
#[derive(Clone)]
pub struct RequestContext {
    session: SessionHandle,
    theme: Arc<ThemeEngine>,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Session layer is not installed"))?;

        Ok(Self {
            session,
            theme: state.theme.clone(),
        })
    }
}

impl RequestContext {
    /// Username of the logged-in account
    pub fn username(&self) -> Option<String> {
        self.session.lock().data.current_user().map(str::to_string)
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.lock().data.logged_in
    }

    pub fn flash(&self, category: FlashCategory, message: impl Into<String>) {
        self.session.lock().data.flash(category, message);
    }

    /// Establish an authenticated session for `user`
    pub fn log_in(&self, user: &User) {
        let mut state = self.session.lock();
        state.data.log_in(&user.username, &user.name);
        state.regenerate = true;
    }

    /// Forget the identity and pending flashes
    pub fn log_out(&self) {
        let mut state = self.session.lock();
        state.data.clear();
        state.regenerate = true;
    }

    /// Render a page, merging `context` over the session variables
    pub fn render(&self, template: &str, context: TeraContext) -> Result<Html<String>, AppError> {
        let mut full_context = page_context(&self.session);
        full_context.extend(context);
        Ok(Html(self.theme.render(template, &full_context)?))
    }
}

/// The logged-in account, for handlers behind [`require_login`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
    pub name: String,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<SessionHandle>().and_then(|handle| {
            let state = handle.lock();
            state.data.current_user().map(|username| CurrentUser {
                username: username.to_string(),
                name: state.data.name.clone().unwrap_or_default(),
            })
        });

        user.ok_or_else(|| found("/login"))
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolve the session before the handler runs and persist it afterwards.
///
/// A session is only stored once it holds something (an identity or a
/// flash); when it becomes empty again the stored copy and the cookie are
/// removed.
pub async fn session_layer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let cookie_id = state.cookie.session_id(request.headers());

    let stored = match &cookie_id {
        Some(id) => match state.sessions.load(id).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Failed to load session: {:#}", e);
                return fallback_error_response();
            }
        },
        None => None,
    };
    let stored_id = cookie_id.clone().filter(|_| stored.is_some());

    let handle = SessionHandle::new(stored.unwrap_or_default());
    request.extensions_mut().insert(handle.clone());

    let mut response = next.run(request).await;

    if let Some(page) = response.extensions_mut().remove::<ErrorPage>() {
        response = render_error_page(&state.theme, &handle, page);
    }

    let (data, regenerate) = handle.snapshot();

    if data.is_empty() {
        if let Some(id) = &stored_id {
            if let Err(e) = state.sessions.delete(id).await {
                tracing::error!("Failed to delete session: {:#}", e);
                return fallback_error_response();
            }
        }
        if cookie_id.is_some() {
            response
                .headers_mut()
                .append(header::SET_COOKIE, state.cookie.expire_cookie());
        }
        return response;
    }

    let id = match stored_id {
        Some(old) if regenerate => {
            if let Err(e) = state.sessions.delete(&old).await {
                tracing::error!("Failed to delete session: {:#}", e);
                return fallback_error_response();
            }
            new_session_id()
        }
        Some(id) => id,
        None => new_session_id(),
    };

    if let Err(e) = state.sessions.save(&id, &data).await {
        tracing::error!("Failed to save session: {:#}", e);
        return fallback_error_response();
    }

    response
        .headers_mut()
        .append(header::SET_COOKIE, state.cookie.set_cookie(&id));
    response
}

/// Login gate for pages that need an authenticated session.
///
/// Anonymous visitors get a warning flash and a redirect to the login page
/// that brings them back here afterwards.
pub async fn require_login(request: Request, next: Next) -> Response {
    let Some(handle) = request.extensions().get::<SessionHandle>().cloned() else {
        return AppError::Internal(anyhow::anyhow!("Session layer is not installed")).into_response();
    };

    if handle.lock().data.current_user().is_some() {
        return next.run(request).await;
    }

    handle
        .lock()
        .data
        .flash(FlashCategory::Warning, "Please log in to view this page.");

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    found(&login_url(Some(target)))
}

/// `/login`, carrying `next` when there is somewhere to return to
pub fn login_url(next: Option<&str>) -> String {
    match next {
        Some(next) => format!("/login?next={}", urlencoding::encode(next).replace("%2F", "/")),
        None => "/login".to_string(),
    }
}

/// Accept only same-site relative paths as a post-login destination.
///
/// Browsers drop tabs and newlines from a `Location` before resolving it, so
/// anything outside visible ASCII is refused rather than stripped.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| {
        n.starts_with('/')
            && !n.starts_with("//")
            && !n.contains('\\')
            && n.chars().all(|c| c.is_ascii_graphic())
    })
}

fn render_error_page(theme: &ThemeEngine, handle: &SessionHandle, page: ErrorPage) -> Response {
    let mut context = page_context(handle);
    context.insert("status", &page.status.as_u16());
    context.insert("message", page.message);

    let html = theme.render("error.html", &context).unwrap_or_else(|e| {
        tracing::error!("Failed to render error page: {}", e);
        ThemeEngine::fallback_error_page(page.status.as_u16(), page.message)
    });
    (page.status, Html(html)).into_response()
}

fn fallback_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(ThemeEngine::fallback_error_page(500, INTERNAL_ERROR_MESSAGE)),
    )
        .into_response()
}
