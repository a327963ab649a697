//! Article pages: listing, detail, search and the author's add/edit/delete

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use tera::Context as TeraContext;

use super::middleware::{found, AppError, AppState, CurrentUser, RequestContext};
use crate::forms::{ArticleForm, FieldErrors, SearchForm};
use crate::models::FlashCategory;
use crate::services::ArticleServiceError;

const NOT_OWNED_EDIT: &str = "There is no such article or you are not allowed to edit it.";
const NOT_OWNED_DELETE: &str = "There is no such article or you are not allowed to delete it.";

/// Parse an id path segment; anything non-numeric names no article
fn parse_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

fn article_form_page(
    ctx: &RequestContext,
    template: &str,
    form: &ArticleForm,
    errors: &FieldErrors,
    article_id: Option<i64>,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    if let Some(id) = article_id {
        context.insert("article_id", &id);
    }
    Ok(ctx.render(template, context)?.into_response())
}

pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> Result<Response, AppError> {
    let articles = state.article_service.list_all().await?;

    let mut context = TeraContext::new();
    context.insert("articles", &articles);
    Ok(ctx.render("articles.html", context)?.into_response())
}

pub async fn detail(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let article = match parse_id(&id) {
        Some(id) => state.article_service.get(id).await?,
        None => None,
    };

    let status = if article.is_some() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };

    let mut context = TeraContext::new();
    context.insert("article", &article);
    Ok((status, ctx.render("article.html", context)?).into_response())
}

pub async fn add_form(ctx: RequestContext) -> Result<Response, AppError> {
    article_form_page(
        &ctx,
        "addarticle.html",
        &ArticleForm::default(),
        &FieldErrors::default(),
        None,
    )
}

pub async fn add(
    State(state): State<AppState>,
    ctx: RequestContext,
    user: CurrentUser,
    form: Result<Form<ArticleForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form?;
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => return article_form_page(&ctx, "addarticle.html", &form, &errors, None),
    };

    state.article_service.create(&user.username, &draft).await?;

    ctx.flash(FlashCategory::Success, "Article added successfully.");
    Ok(found("/dashboard"))
}

pub async fn edit_form(
    State(state): State<AppState>,
    ctx: RequestContext,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(id) = parse_id(&id) else {
        ctx.flash(FlashCategory::Warning, NOT_OWNED_EDIT);
        return Ok(found("/dashboard"));
    };

    let article = match state.article_service.get_owned(id, &user.username).await {
        Ok(article) => article,
        Err(ArticleServiceError::NotFound(_)) => {
            ctx.flash(FlashCategory::Warning, NOT_OWNED_EDIT);
            return Ok(found("/dashboard"));
        }
        Err(e) => return Err(e.into()),
    };

    let form = ArticleForm {
        title: article.title,
        content: article.content,
    };
    article_form_page(&ctx, "editarticle.html", &form, &FieldErrors::default(), Some(id))
}

/// Save an edit. Ownership is checked again here; the form alone proves nothing.
pub async fn edit(
    State(state): State<AppState>,
    ctx: RequestContext,
    user: CurrentUser,
    Path(id): Path<String>,
    form: Result<Form<ArticleForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form?;
    let Some(id) = parse_id(&id) else {
        ctx.flash(FlashCategory::Warning, NOT_OWNED_EDIT);
        return Ok(found("/dashboard"));
    };

    match state.article_service.get_owned(id, &user.username).await {
        Ok(_) => {}
        Err(ArticleServiceError::NotFound(_)) => {
            ctx.flash(FlashCategory::Warning, NOT_OWNED_EDIT);
            return Ok(found("/dashboard"));
        }
        Err(e) => return Err(e.into()),
    }

    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            return article_form_page(&ctx, "editarticle.html", &form, &errors, Some(id));
        }
    };

    match state.article_service.update(id, &user.username, &draft).await {
        Ok(()) => {
            ctx.flash(FlashCategory::Success, "Article updated successfully.");
        }
        Err(ArticleServiceError::NotFound(_)) => {
            ctx.flash(FlashCategory::Warning, NOT_OWNED_EDIT);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(found("/dashboard"))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let result = match parse_id(&id) {
        Some(id) => state.article_service.delete(id, &user.username).await,
        None => Err(ArticleServiceError::NotFound(0)),
    };

    match result {
        Ok(()) => ctx.flash(FlashCategory::Success, "Article deleted successfully."),
        Err(ArticleServiceError::NotFound(_)) => ctx.flash(FlashCategory::Warning, NOT_OWNED_DELETE),
        Err(e) => return Err(e.into()),
    }
    Ok(found("/dashboard"))
}

/// Searching only happens through the form
pub async fn search_redirect() -> Response {
    found("/")
}

pub async fn search(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Result<Form<SearchForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form?;
    let keyword = match form.validate() {
        Ok(keyword) => keyword,
        Err(_) => {
            ctx.flash(FlashCategory::Warning, "Enter something to search for.");
            return Ok(found("/articles"));
        }
    };

    let articles = state.article_service.search(&keyword).await?;

    let mut context = TeraContext::new();
    context.insert("keyword", &keyword);
    context.insert("articles", &articles);
    Ok(ctx.render("articles.html", context)?.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("5"), Some(5));
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("5.0"), None);
        assert_eq!(parse_id(""), None);
    }
}
