/// API routes and handlers
pub mod admin;
pub mod health;
pub mod middleware;
pub mod reports;

use crate::{
    context::AppContext,
    error::{AppError, AppResult},
    pagination::PageRequest,
};
use axum::{extract::rejection::JsonRejection, Json, Router};
use std::str::FromStr;
use validator::Validate;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(reports::routes())
        .merge(admin::routes())
}

/// Unwrap a JSON body, turning malformed input into a validation error
pub(crate) fn json_body<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    let Json(body) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(body)
}

/// Parse an optional enumerated query value; absent or blank means no filter
pub(crate) fn parse_filter<T>(raw: Option<&str>) -> AppResult<Option<T>>
where
    T: FromStr<Err = AppError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

fn parse_number(name: &str, raw: Option<&str>) -> AppResult<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{} must be a number", name))),
    }
}

/// Normalize `page`/`limit` query values against the configured bounds
pub(crate) fn page_request(
    ctx: &AppContext,
    page: Option<&str>,
    limit: Option<&str>,
) -> AppResult<PageRequest> {
    let to_u32 = |n: i64| n.clamp(0, i64::from(u32::MAX)) as u32;
    let page = parse_number("page", page)?.map(to_u32);
    let limit = parse_number("limit", limit)?.map(to_u32);

    Ok(PageRequest::new(page, limit, ctx.config.pagination))
}

/// Parse a numeric path id
pub(crate) fn parse_id(raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid id: {}", raw)))
}
