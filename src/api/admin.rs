/// Admin API Endpoints
///
/// Audit trail queries and quick moderation actions on posts and users.
use crate::{
    admin::{AuditFilter, AuditRecord, Role},
    api::{json_body, page_request, parse_filter},
    auth::AdminAuthContext,
    content::{Post, User},
    error::AppResult,
    pagination::Pagination,
    AppContext,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        // Audit trail
        .route("/api/admin/audits", get(list_audits))
        // Posts
        .route("/api/admin/posts/:id/hidden", put(set_post_hidden))
        .route("/api/admin/posts/:id", delete(delete_post))
        // Users
        .route("/api/admin/users/:id/suspend", put(set_user_suspended))
        .route("/api/admin/users/:id/role", put(change_role))
        .route("/api/admin/users/:id", delete(delete_user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAuditsQuery {
    action: Option<String>,
    target_type: Option<String>,
    admin: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListAuditsResponse {
    pub audits: Vec<AuditRecord>,
    pub pagination: Pagination,
}

/// Query the audit trail, newest first
async fn list_audits(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Query(query): Query<ListAuditsQuery>,
) -> AppResult<Json<ListAuditsResponse>> {
    let filter = AuditFilter {
        action: parse_filter(query.action.as_deref())?,
        target_type: parse_filter(query.target_type.as_deref())?,
        admin: query
            .admin
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
    };
    let page = page_request(&ctx, query.page.as_deref(), query.limit.as_deref())?;

    let result = ctx.audit_log.list(&filter, page).await?;

    Ok(Json(ListAuditsResponse {
        audits: result.items,
        pagination: result.pagination,
    }))
}

#[derive(Debug, Deserialize, Validate)]
struct SetHiddenRequest {
    hidden: bool,
    #[validate(length(max = 2000))]
    reason: Option<String>,
}

/// Hide or unhide a post
async fn set_post_hidden(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(post_id): Path<String>,
    payload: Result<Json<SetHiddenRequest>, JsonRejection>,
) -> AppResult<Json<Post>> {
    let req = json_body(payload)?;
    let post = ctx
        .moderation
        .set_post_hidden(&auth.actor(), &post_id, req.hidden, req.reason)
        .await?;

    Ok(Json(post))
}

#[derive(Debug, Deserialize, Validate)]
struct SetSuspendedRequest {
    suspended: bool,
    #[validate(length(max = 2000))]
    reason: Option<String>,
}

/// Suspend or reinstate a user
async fn set_user_suspended(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(user_id): Path<String>,
    payload: Result<Json<SetSuspendedRequest>, JsonRejection>,
) -> AppResult<Json<User>> {
    let req = json_body(payload)?;
    let user = ctx
        .moderation
        .set_user_suspended(&auth.actor(), &user_id, req.suspended, req.reason)
        .await?;

    Ok(Json(user))
}

#[derive(Debug, Deserialize, Validate)]
struct ChangeRoleRequest {
    #[validate(length(min = 1))]
    role: String,
}

/// Change a user's role (admin only)
async fn change_role(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(user_id): Path<String>,
    payload: Result<Json<ChangeRoleRequest>, JsonRejection>,
) -> AppResult<Json<User>> {
    crate::require_admin_role!(auth, Role::Admin);

    let req = json_body(payload)?;
    let role: Role = req.role.parse()?;
    let user = ctx
        .moderation
        .change_role(&auth.actor(), &user_id, role)
        .await?;

    Ok(Json(user))
}

/// Delete a post
async fn delete_post(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(post_id): Path<String>,
) -> AppResult<StatusCode> {
    ctx.moderation.delete_post(&auth.actor(), &post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a user account (admin only)
async fn delete_user(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(user_id): Path<String>,
) -> AppResult<StatusCode> {
    crate::require_admin_role!(auth, Role::Admin);

    ctx.moderation.delete_user(&auth.actor(), &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
