/// Admin action audit trail
///
/// Records are append-only: there is no update or delete path here, and the
/// schema rejects both with triggers.
use crate::db::{decode_timestamp, encode_timestamp, like_pattern};
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::pagination::{Page, PageRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

text_enum! {
    /// What an admin or moderator did
    pub enum AuditAction: "audit action" {
        ReportReviewing => "report_reviewing",
        ReportResolved => "report_resolved",
        ReportDismissed => "report_dismissed",
        UserWarned => "user_warned",
        PostHidden => "post_hidden",
        PostUnhidden => "post_unhidden",
        PostDeleted => "post_deleted",
        CommentDeleted => "comment_deleted",
        UserSuspended => "user_suspended",
        UserUnsuspended => "user_unsuspended",
        UserBanned => "user_banned",
        UserRoleChanged => "user_role_changed",
        UserDeleted => "user_deleted",
    }
}

text_enum! {
    pub enum AuditTargetType: "audit target type" {
        Post => "post",
        User => "user",
        Comment => "comment",
        Report => "report",
    }
}

/// The acting user; names are `None` once that account is deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRef {
    pub id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

/// Admin action audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: i64,
    pub action: AuditAction,
    pub admin: AdminRef,
    pub target_type: AuditTargetType,
    pub target_id: String,
    pub reason: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
}

/// Fields of a record about to be written
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub action: AuditAction,
    pub admin_id: String,
    pub target_type: AuditTargetType,
    pub target_id: String,
    pub reason: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: String,
}

/// Audit query filters. `admin` is a substring of the acting user's display
/// name or username; the others are exact.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub target_type: Option<AuditTargetType>,
    pub admin: Option<String>,
}

const AUDIT_SELECT: &str = "SELECT a.id, a.action, a.admin_id, u.username AS admin_username, \
     u.display_name AS admin_display_name, a.target_type, a.target_id, a.reason, a.details, \
     a.ip_address, a.created_at \
     FROM audit_records a LEFT JOIN users u ON u.id = a.admin_id WHERE 1=1";

/// Audit log reader and writer
#[derive(Clone)]
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one record outside of any larger transaction
    pub async fn record(&self, entry: &NewAuditRecord) -> AppResult<AuditRecord> {
        let mut conn = self.db.acquire().await?;
        insert_record(&mut conn, entry).await
    }

    /// List records newest first, filtered and paged
    pub async fn list(&self, filter: &AuditFilter, page: PageRequest) -> AppResult<Page<AuditRecord>> {
        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM audit_records a LEFT JOIN users u ON u.id = a.admin_id WHERE 1=1",
        );
        push_filters(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(AUDIT_SELECT);
        push_filters(&mut select, filter);
        select.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ");
        select.push_bind(i64::from(page.limit()));
        select.push(" OFFSET ");
        select.push_bind(page.offset() as i64);

        let rows = select.build().fetch_all(&self.db).await?;
        let records = rows
            .into_iter()
            .map(parse_record)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Page::new(records, page, total.max(0) as u64))
    }
}

/// Append one record on the given connection (possibly inside a transaction)
pub(crate) async fn insert_record(
    conn: &mut SqliteConnection,
    entry: &NewAuditRecord,
) -> AppResult<AuditRecord> {
    let details = entry
        .details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| AppError::Internal(format!("Failed to encode audit details: {}", e)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO audit_records (action, admin_id, target_type, target_id, reason, details, ip_address, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.action.as_str())
    .bind(&entry.admin_id)
    .bind(entry.target_type.as_str())
    .bind(&entry.target_id)
    .bind(&entry.reason)
    .bind(&details)
    .bind(&entry.ip_address)
    .bind(encode_timestamp(Utc::now()))
    .execute(&mut *conn)
    .await?;

    let id = result.last_insert_rowid();
    let row = sqlx::query(&format!("{} AND a.id = ?", AUDIT_SELECT))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    metrics::AUDIT_RECORDS_TOTAL
        .with_label_values(&[entry.action.as_str()])
        .inc();
    tracing::info!(
        "Audit: {} by {} on {} {}",
        entry.action,
        entry.admin_id,
        entry.target_type,
        entry.target_id
    );

    parse_record(row)
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AuditFilter) {
    if let Some(action) = filter.action {
        qb.push(" AND a.action = ");
        qb.push_bind(action.as_str());
    }

    if let Some(target_type) = filter.target_type {
        qb.push(" AND a.target_type = ");
        qb.push_bind(target_type.as_str());
    }

    if let Some(admin) = filter.admin.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(admin);
        qb.push(" AND (u.display_name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR u.username LIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
}

fn parse_record(row: SqliteRow) -> AppResult<AuditRecord> {
    let action: String = row.try_get("action")?;
    let target_type: String = row.try_get("target_type")?;
    let details: Option<String> = row.try_get("details")?;
    let created_at: String = row.try_get("created_at")?;

    let details = details
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| AppError::Internal(format!("Invalid audit details: {}", e)))?;

    Ok(AuditRecord {
        id: row.try_get("id")?,
        action: action.parse()?,
        admin: AdminRef {
            id: row.try_get("admin_id")?,
            username: row.try_get("admin_username")?,
            display_name: row.try_get("admin_display_name")?,
        },
        target_type: target_type.parse()?,
        target_id: row.try_get("target_id")?,
        reason: row.try_get("reason")?,
        details,
        ip_address: row.try_get("ip_address")?,
        created_at: decode_timestamp(&created_at)?,
    })
}
