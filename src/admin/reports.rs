/// Report Management System
use crate::db::{decode_timestamp, encode_timestamp};
use crate::error::{AppError, AppResult};
use crate::pagination::{Page, PageRequest};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

text_enum! {
    /// Why content was flagged
    pub enum ReportReason: "report reason" {
        Spam => "spam",
        Harassment => "harassment",
        HateSpeech => "hate_speech",
        InappropriateContent => "inappropriate_content",
        FakeNews => "fake_news",
        CopyrightViolation => "copyright_violation",
        Violence => "violence",
        Nudity => "nudity",
        Other => "other",
    }
}

text_enum! {
    /// Report lifecycle: pending -> reviewing -> resolved | dismissed
    pub enum ReportStatus: "report status" {
        Pending => "pending",
        Reviewing => "reviewing",
        Resolved => "resolved",
        Dismissed => "dismissed",
    }
}

impl ReportStatus {
    /// Resolved and dismissed reports cannot be transitioned again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Dismissed)
    }
}

text_enum! {
    /// Moderation action recorded on a report
    pub enum ActionTaken: "moderation action" {
        None => "none",
        Warning => "warning",
        HideContent => "hide_content",
        DeleteContent => "delete_content",
        SuspendUser => "suspend_user",
        BanUser => "ban_user",
    }
}

text_enum! {
    /// Kind of entity a report points at
    pub enum ReportTargetType: "report target type" {
        Post => "post",
        User => "user",
        Comment => "comment",
    }
}

/// The single entity a report points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ReportTarget {
    Post(String),
    User(String),
    Comment(String),
}

impl ReportTarget {
    pub fn new(kind: ReportTargetType, id: impl Into<String>) -> Self {
        let id = id.into();
        match kind {
            ReportTargetType::Post => ReportTarget::Post(id),
            ReportTargetType::User => ReportTarget::User(id),
            ReportTargetType::Comment => ReportTarget::Comment(id),
        }
    }

    pub fn kind(&self) -> ReportTargetType {
        match self {
            ReportTarget::Post(_) => ReportTargetType::Post,
            ReportTarget::User(_) => ReportTargetType::User,
            ReportTarget::Comment(_) => ReportTargetType::Comment,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ReportTarget::Post(id) | ReportTarget::User(id) | ReportTarget::Comment(id) => id,
        }
    }
}

/// Report record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub action_taken: ActionTaken,
    pub moderation_notes: Option<String>,
    pub target: ReportTarget,
    pub reporter_id: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conjunctive list filters; `None` means unconstrained
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub reason: Option<ReportReason>,
    pub target_type: Option<ReportTargetType>,
}

/// Requested change to a report's review fields
#[derive(Debug, Clone)]
pub struct ReportTransition {
    pub status: ReportStatus,
    pub moderation_notes: Option<String>,
    pub action_taken: Option<ActionTaken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    #[serde(rename = "_id")]
    pub status: ReportStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub status_stats: Vec<StatusCount>,
    pub recent_reports: i64,
}

/// How far back `recentReports` looks
pub const RECENT_REPORT_WINDOW_DAYS: i64 = 7;

const REPORT_COLUMNS: &str = "id, reason, description, status, action_taken, moderation_notes, \
     target_type, target_id, reporter_id, reviewed_by, reviewed_at, created_at, updated_at";

/// Report manager
#[derive(Clone)]
pub struct ReportManager {
    db: SqlitePool,
}

impl ReportManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Submit a report; always starts `pending` with no action
    pub async fn submit_report(
        &self,
        reporter_id: &str,
        reason: ReportReason,
        description: Option<&str>,
        target: ReportTarget,
    ) -> AppResult<Report> {
        if target.id().trim().is_empty() {
            return Err(AppError::Validation("Report target id cannot be empty".to_string()));
        }

        let now = Utc::now();
        let stamp = encode_timestamp(now);
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);

        let result = sqlx::query(
            r#"
            INSERT INTO reports (reason, description, status, action_taken, target_type, target_id,
                                 reporter_id, created_at, updated_at)
            VALUES (?, ?, 'pending', 'none', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reason.as_str())
        .bind(&description)
        .bind(target.kind().as_str())
        .bind(target.id())
        .bind(reporter_id)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.db)
        .await?;

        Ok(Report {
            id: result.last_insert_rowid(),
            reason,
            description,
            status: ReportStatus::Pending,
            action_taken: ActionTaken::None,
            moderation_notes: None,
            target,
            reporter_id: reporter_id.to_string(),
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get report by ID
    pub async fn get_report(&self, report_id: i64) -> AppResult<Option<Report>> {
        let mut conn = self.db.acquire().await?;
        fetch_report(&mut conn, report_id).await
    }

    /// List reports newest first, filtered and paged
    pub async fn list_reports(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> AppResult<Page<Report>> {
        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM reports WHERE 1=1");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM reports WHERE 1=1",
            REPORT_COLUMNS
        ));
        push_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(i64::from(page.limit()));
        select.push(" OFFSET ");
        select.push_bind(page.offset() as i64);

        let rows = select.build().fetch_all(&self.db).await?;
        let reports = rows
            .into_iter()
            .map(parse_report)
            .collect::<AppResult<Vec<_>>>()?;

        tracing::debug!(
            "Listed {} of {} reports (page {}, filter {:?})",
            reports.len(),
            total,
            page.page(),
            filter
        );

        Ok(Page::new(reports, page, total.max(0) as u64))
    }

    /// Per-status counts plus the number of recent reports
    pub async fn stats(&self) -> AppResult<ReportStats> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM reports GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.db)
        .await?;

        let mut status_stats = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.try_get("status")?;
            status_stats.push(StatusCount {
                status: status.parse()?,
                count: row.try_get("count")?,
            });
        }

        let since = Utc::now() - Duration::days(RECENT_REPORT_WINDOW_DAYS);
        let recent_reports: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE created_at >= ?")
                .bind(encode_timestamp(since))
                .fetch_one(&self.db)
                .await?;

        Ok(ReportStats {
            status_stats,
            recent_reports,
        })
    }
}

/// Apply a transition inside the caller's transaction.
///
/// The terminal-state guard is part of the UPDATE, so of two racing
/// transitions at most one can leave a terminal state behind it.
pub(crate) async fn apply_transition(
    conn: &mut SqliteConnection,
    report_id: i64,
    transition: &ReportTransition,
    reviewer_id: &str,
) -> AppResult<Report> {
    let stamp = encode_timestamp(Utc::now());

    let result = sqlx::query(
        r#"
        UPDATE reports
        SET status = ?,
            moderation_notes = COALESCE(?, moderation_notes),
            action_taken = COALESCE(?, action_taken),
            reviewed_by = ?,
            reviewed_at = ?,
            updated_at = ?
        WHERE id = ? AND status NOT IN ('resolved', 'dismissed')
        "#,
    )
    .bind(transition.status.as_str())
    .bind(&transition.moderation_notes)
    .bind(transition.action_taken.map(|a| a.as_str()))
    .bind(reviewer_id)
    .bind(&stamp)
    .bind(&stamp)
    .bind(report_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return match fetch_report(conn, report_id).await? {
            None => Err(AppError::NotFound(format!("Report {} not found", report_id))),
            Some(existing) => Err(AppError::Conflict(format!(
                "Report {} is already {}",
                report_id, existing.status
            ))),
        };
    }

    fetch_report(conn, report_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))
}

pub(crate) async fn fetch_report(
    conn: &mut SqliteConnection,
    report_id: i64,
) -> AppResult<Option<Report>> {
    let row = sqlx::query(&format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS))
        .bind(report_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(parse_report).transpose()
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ReportFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status.as_str());
    }

    if let Some(reason) = filter.reason {
        qb.push(" AND reason = ");
        qb.push_bind(reason.as_str());
    }

    if let Some(target_type) = filter.target_type {
        qb.push(" AND target_type = ");
        qb.push_bind(target_type.as_str());
    }
}

fn parse_report(row: SqliteRow) -> AppResult<Report> {
    let reason: String = row.try_get("reason")?;
    let status: String = row.try_get("status")?;
    let action_taken: String = row.try_get("action_taken")?;
    let target_type: String = row.try_get("target_type")?;
    let target_id: String = row.try_get("target_id")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let reviewed_at: Option<String> = row.try_get("reviewed_at")?;

    Ok(Report {
        id: row.try_get("id")?,
        reason: reason.parse()?,
        description: row.try_get("description")?,
        status: status.parse()?,
        action_taken: action_taken.parse()?,
        moderation_notes: row.try_get("moderation_notes")?,
        target: ReportTarget::new(target_type.parse()?, target_id),
        reporter_id: row.try_get("reporter_id")?,
        reviewed_by: row.try_get("reviewed_by")?,
        reviewed_at: reviewed_at.as_deref().map(decode_timestamp).transpose()?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationConfig;
    use crate::db::connect_in_memory;
    use std::str::FromStr;

    fn page(page: u32, limit: u32) -> PageRequest {
        PageRequest::new(Some(page), Some(limit), PaginationConfig::default())
    }

    async fn seeded() -> (SqlitePool, ReportManager) {
        let db = connect_in_memory().await.unwrap();
        let manager = ReportManager::new(db.clone());

        let fixtures = [
            (ReportReason::Spam, ReportTarget::Post("P1".into())),
            (ReportReason::Spam, ReportTarget::User("U1".into())),
            (ReportReason::Harassment, ReportTarget::Post("P2".into())),
            (ReportReason::Nudity, ReportTarget::Comment("C1".into())),
            (ReportReason::Spam, ReportTarget::Post("P3".into())),
        ];
        for (reason, target) in fixtures {
            manager
                .submit_report("reporter", reason, Some("look at this"), target)
                .await
                .unwrap();
        }

        (db, manager)
    }

    async fn transition(
        db: &SqlitePool,
        id: i64,
        status: ReportStatus,
        action: Option<ActionTaken>,
    ) -> AppResult<Report> {
        let mut conn = db.acquire().await.unwrap();
        apply_transition(
            &mut conn,
            id,
            &ReportTransition {
                status,
                moderation_notes: Some("checked".to_string()),
                action_taken: action,
            },
            "mod",
        )
        .await
    }

    #[test]
    fn test_reason_from_str() {
        assert_eq!(
            ReportReason::from_str("hate_speech").unwrap(),
            ReportReason::HateSpeech
        );
        assert!(ReportReason::from_str("rude").is_err());
        assert_eq!(ReportReason::ALL.len(), 9);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ReportStatus::Resolved.is_terminal());
        assert!(ReportStatus::Dismissed.is_terminal());
        assert!(!ReportStatus::Pending.is_terminal());
        assert!(!ReportStatus::Reviewing.is_terminal());
    }

    #[test]
    fn test_target_serializes_as_tagged_union() {
        let json = serde_json::to_value(ReportTarget::Post("P1".into())).unwrap();
        assert_eq!(json, serde_json::json!({"type": "post", "id": "P1"}));
    }

    #[tokio::test]
    async fn test_submit_starts_pending() {
        let (_db, manager) = seeded().await;
        let report = manager
            .submit_report("alice", ReportReason::Other, Some("   "), ReportTarget::User("U9".into()))
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.action_taken, ActionTaken::None);
        assert!(report.description.is_none());

        let stored = manager.get_report(report.id).await.unwrap().unwrap();
        assert_eq!(stored.target, ReportTarget::User("U9".into()));
        assert_eq!(stored.reporter_id, "alice");
    }

    #[tokio::test]
    async fn test_list_newest_first_with_total() {
        let (_db, manager) = seeded().await;
        let result = manager
            .list_reports(&ReportFilter::default(), page(1, 2))
            .await
            .unwrap();

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.pagination.total, 5);
        assert_eq!(result.pagination.pages, 3);
        assert!(result.items[0].id > result.items[1].id);

        let last = manager
            .list_reports(&ReportFilter::default(), page(3, 2))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, 1);
    }

    #[tokio::test]
    async fn test_filters_are_conjunctive() {
        let (_db, manager) = seeded().await;

        let spam = ReportFilter {
            reason: Some(ReportReason::Spam),
            ..Default::default()
        };
        let result = manager.list_reports(&spam, page(1, 20)).await.unwrap();
        assert_eq!(result.pagination.total, 3);
        assert!(result.items.iter().all(|r| r.reason == ReportReason::Spam));

        let spam_posts = ReportFilter {
            reason: Some(ReportReason::Spam),
            target_type: Some(ReportTargetType::Post),
            ..Default::default()
        };
        let result = manager.list_reports(&spam_posts, page(1, 20)).await.unwrap();
        assert_eq!(result.pagination.total, 2);
        assert!(result
            .items
            .iter()
            .all(|r| r.reason == ReportReason::Spam && r.target.kind() == ReportTargetType::Post));
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let db = connect_in_memory().await.unwrap();
        let manager = ReportManager::new(db);
        for n in 0..3 {
            manager
                .submit_report("r", ReportReason::Spam, None, ReportTarget::Post(format!("P{n}")))
                .await
                .unwrap();
        }

        let result = manager
            .list_reports(&ReportFilter::default(), page(5, 20))
            .await
            .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.pagination.total, 3);
        assert_eq!(result.pagination.pages, 1);
        assert_eq!(result.pagination.page, 5);
    }

    #[tokio::test]
    async fn test_status_filter_after_transition() {
        let (db, manager) = seeded().await;
        transition(&db, 2, ReportStatus::Reviewing, None).await.unwrap();

        let reviewing = ReportFilter {
            status: Some(ReportStatus::Reviewing),
            ..Default::default()
        };
        let result = manager.list_reports(&reviewing, page(1, 20)).await.unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, 2);
        assert_eq!(result.items[0].reviewed_by.as_deref(), Some("mod"));
    }

    #[tokio::test]
    async fn test_terminal_report_rejects_transition() {
        let (db, manager) = seeded().await;

        let resolved = transition(&db, 1, ReportStatus::Resolved, Some(ActionTaken::HideContent))
            .await
            .unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);
        assert_eq!(resolved.action_taken, ActionTaken::HideContent);
        assert_eq!(resolved.moderation_notes.as_deref(), Some("checked"));

        let again = transition(&db, 1, ReportStatus::Dismissed, None).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let stored = manager.get_report(1).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Resolved);
    }

    #[tokio::test]
    async fn test_transition_unknown_report() {
        let (db, _manager) = seeded().await;
        let result = transition(&db, 999, ReportStatus::Reviewing, None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stats() {
        let (db, manager) = seeded().await;
        transition(&db, 1, ReportStatus::Dismissed, None).await.unwrap();

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.recent_reports, 5);

        let pending = stats
            .status_stats
            .iter()
            .find(|s| s.status == ReportStatus::Pending)
            .unwrap();
        assert_eq!(pending.count, 4);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["statusStats"][0].get("_id").is_some());
        assert!(json.get("recentReports").is_some());
    }
}
