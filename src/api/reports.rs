/// Report API Endpoints
///
/// Intake is open to any signed-in, non-suspended user; everything else
/// needs moderator or higher.
use crate::{
    admin::{Report, ReportFilter, ReportStats, ReportTarget, ReportTransition},
    api::{json_body, page_request, parse_filter, parse_id},
    auth::{AdminAuthContext, AuthContext},
    error::{AppError, AppResult},
    pagination::Pagination,
    AppContext,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Build report API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/reports", get(list_reports).post(create_report))
        .route("/api/reports/stats", get(report_stats))
        .route("/api/reports/:id", get(get_report).put(update_report))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateReportRequest {
    reason: String,
    #[validate(length(max = 1000))]
    description: Option<String>,
    target_type: String,
    #[validate(length(min = 1, max = 128))]
    target_id: String,
}

/// File a report
async fn create_report(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    payload: Result<Json<CreateReportRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Report>)> {
    let req = json_body(payload)?;
    let reason = req.reason.parse()?;
    let target = ReportTarget::new(req.target_type.parse()?, req.target_id.trim());

    let report = ctx
        .moderation
        .submit_report(&auth.actor(), reason, req.description.as_deref(), target)
        .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListReportsQuery {
    status: Option<String>,
    reason: Option<String>,
    target_type: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListReportsResponse {
    pub reports: Vec<Report>,
    pub pagination: Pagination,
}

/// List reports, newest first
async fn list_reports(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Query(query): Query<ListReportsQuery>,
) -> AppResult<Json<ListReportsResponse>> {
    let filter = ReportFilter {
        status: parse_filter(query.status.as_deref())?,
        reason: parse_filter(query.reason.as_deref())?,
        target_type: parse_filter(query.target_type.as_deref())?,
    };
    let page = page_request(&ctx, query.page.as_deref(), query.limit.as_deref())?;

    let result = ctx.report_manager.list_reports(&filter, page).await?;

    Ok(Json(ListReportsResponse {
        reports: result.items,
        pagination: result.pagination,
    }))
}

/// Per-status counts and recent volume
async fn report_stats(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> AppResult<Json<ReportStats>> {
    Ok(Json(ctx.report_manager.stats().await?))
}

/// Get one report
async fn get_report(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<Report>> {
    let id = parse_id(&id)?;
    let report = ctx
        .report_manager
        .get_report(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

    Ok(Json(report))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateReportRequest {
    status: String,
    #[validate(length(max = 2000))]
    moderation_notes: Option<String>,
    action_taken: Option<String>,
}

/// Review a report: change status, record notes and apply an action
async fn update_report(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateReportRequest>, JsonRejection>,
) -> AppResult<Json<Report>> {
    let id = parse_id(&id)?;
    let req = json_body(payload)?;

    let transition = ReportTransition {
        status: req.status.parse()?,
        moderation_notes: req
            .moderation_notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty()),
        action_taken: parse_filter(req.action_taken.as_deref())?,
    };

    let report = ctx
        .moderation
        .transition_report(&auth.actor(), id, transition)
        .await?;

    Ok(Json(report))
}
