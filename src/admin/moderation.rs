/// Moderation review and quick admin actions
///
/// Every mutation here writes exactly one audit record. Report transitions
/// commit the report update and its audit record together, then apply the
/// requested side effect best-effort. Quick actions commit the change and its
/// audit record in one transaction, so neither lands without the other.
use crate::admin::audit::{self, AuditAction, AuditTargetType, NewAuditRecord};
use crate::admin::reports::{
    self, ActionTaken, Report, ReportManager, ReportReason, ReportStatus, ReportTarget,
    ReportTransition,
};
use crate::admin::Role;
use crate::content::{posts, users, Comment, ContentStores, Post, User};
use crate::error::{AppError, AppResult};
use crate::mailer::Mailer;
use crate::metrics;
use serde_json::json;
use sqlx::SqlitePool;

/// Who is acting, as established by authentication
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub ip_address: String,
}

/// Side effect of a report transition, resolved before anything is written
#[derive(Debug, Clone)]
enum SideEffect {
    Nothing,
    HidePost(String),
    DeletePost(String),
    DeleteComment(String),
    Warn(User),
    Suspend(User),
    Ban(User),
}

impl SideEffect {
    fn audit_action(&self, status: ReportStatus) -> AuditAction {
        match self {
            SideEffect::Nothing => match status {
                ReportStatus::Resolved => AuditAction::ReportResolved,
                ReportStatus::Dismissed => AuditAction::ReportDismissed,
                _ => AuditAction::ReportReviewing,
            },
            SideEffect::HidePost(_) => AuditAction::PostHidden,
            SideEffect::DeletePost(_) => AuditAction::PostDeleted,
            SideEffect::DeleteComment(_) => AuditAction::CommentDeleted,
            SideEffect::Warn(_) => AuditAction::UserWarned,
            SideEffect::Suspend(_) => AuditAction::UserSuspended,
            SideEffect::Ban(_) => AuditAction::UserBanned,
        }
    }

    fn audit_target(&self, report_id: i64) -> (AuditTargetType, String) {
        match self {
            SideEffect::Nothing => (AuditTargetType::Report, report_id.to_string()),
            SideEffect::HidePost(id) | SideEffect::DeletePost(id) => {
                (AuditTargetType::Post, id.clone())
            }
            SideEffect::DeleteComment(id) => (AuditTargetType::Comment, id.clone()),
            SideEffect::Warn(user) | SideEffect::Suspend(user) | SideEffect::Ban(user) => {
                (AuditTargetType::User, user.id.clone())
            }
        }
    }
}

/// Moderation service
#[derive(Clone)]
pub struct ModerationService {
    db: SqlitePool,
    reports: ReportManager,
    content: ContentStores,
    mailer: Mailer,
}

impl ModerationService {
    pub fn new(db: SqlitePool, content: ContentStores, mailer: Mailer) -> Self {
        Self {
            reports: ReportManager::new(db.clone()),
            db,
            content,
            mailer,
        }
    }

    /// File a report against an existing post, user or comment
    pub async fn submit_report(
        &self,
        reporter: &Actor,
        reason: ReportReason,
        description: Option<&str>,
        target: ReportTarget,
    ) -> AppResult<Report> {
        if let ReportTarget::User(id) = &target {
            if id == &reporter.user_id {
                return Err(AppError::Validation("You cannot report yourself".to_string()));
            }
        }

        let exists = match &target {
            ReportTarget::Post(id) => self.content.posts.get_post(id).await?.is_some(),
            ReportTarget::User(id) => self.content.users.get_user(id).await?.is_some(),
            ReportTarget::Comment(id) => self.content.comments.get_comment(id).await?.is_some(),
        };
        if !exists {
            return Err(AppError::NotFound(format!(
                "{} {} not found",
                target.kind(),
                target.id()
            )));
        }

        let report = self
            .reports
            .submit_report(&reporter.user_id, reason, description, target)
            .await?;

        metrics::record_report_submitted(reason.as_str());
        tracing::info!(
            "User {} reported {} {} for {}",
            reporter.user_id,
            report.target.kind(),
            report.target.id(),
            reason
        );

        Ok(report)
    }

    /// Move a report to `reviewing`, `resolved` or `dismissed`.
    ///
    /// Validation and target lookups happen before the transaction. The
    /// report row and its audit record commit together; the side effect
    /// runs afterwards and only logs on failure.
    pub async fn transition_report(
        &self,
        actor: &Actor,
        report_id: i64,
        transition: ReportTransition,
    ) -> AppResult<Report> {
        if transition.status == ReportStatus::Pending {
            return Err(AppError::Validation(
                "Reports cannot be moved back to pending".to_string(),
            ));
        }

        let current = self
            .reports
            .get_report(report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;
        if current.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Report {} is already {}",
                report_id, current.status
            )));
        }

        let action = transition.action_taken.unwrap_or(ActionTaken::None);
        let effect = self.plan_side_effect(actor, &current.target, action).await?;
        let (target_type, target_id) = effect.audit_target(report_id);
        let entry = NewAuditRecord {
            action: effect.audit_action(transition.status),
            admin_id: actor.user_id.clone(),
            target_type,
            target_id,
            reason: transition.moderation_notes.clone(),
            details: Some(json!({
                "reportId": report_id,
                "status": transition.status,
                "actionTaken": action,
            })),
            ip_address: actor.ip_address.clone(),
        };

        let mut tx = self.db.begin().await?;
        let updated =
            reports::apply_transition(&mut *tx, report_id, &transition, &actor.user_id).await?;
        audit::insert_record(&mut *tx, &entry).await?;
        tx.commit().await?;

        metrics::record_report_transition(updated.status.as_str());
        tracing::info!(
            "Moderator {} moved report {} to {} (action {})",
            actor.user_id,
            report_id,
            updated.status,
            action
        );

        self.apply_side_effect(&effect, action, transition.moderation_notes.as_deref())
            .await;

        Ok(updated)
    }

    /// Check the action fits the report target and resolve what it touches
    async fn plan_side_effect(
        &self,
        actor: &Actor,
        target: &ReportTarget,
        action: ActionTaken,
    ) -> AppResult<SideEffect> {
        match (action, target) {
            (ActionTaken::None, _) => Ok(SideEffect::Nothing),
            (ActionTaken::HideContent, ReportTarget::Post(id)) => {
                self.require_post(id).await?;
                Ok(SideEffect::HidePost(id.clone()))
            }
            (ActionTaken::HideContent, _) => Err(AppError::Validation(
                "hide_content applies only to posts".to_string(),
            )),
            (ActionTaken::DeleteContent, ReportTarget::Post(id)) => {
                self.require_post(id).await?;
                Ok(SideEffect::DeletePost(id.clone()))
            }
            (ActionTaken::DeleteContent, ReportTarget::Comment(id)) => {
                self.require_comment(id).await?;
                Ok(SideEffect::DeleteComment(id.clone()))
            }
            (ActionTaken::DeleteContent, ReportTarget::User(_)) => Err(AppError::Validation(
                "delete_content applies only to posts and comments".to_string(),
            )),
            (ActionTaken::Warning | ActionTaken::SuspendUser | ActionTaken::BanUser, target) => {
                let user_id = match target {
                    ReportTarget::User(id) => id.clone(),
                    ReportTarget::Post(id) => self.require_post(id).await?.author_id,
                    ReportTarget::Comment(id) => self.require_comment(id).await?.author_id,
                };
                let user = self.require_user(&user_id).await?;
                let verb = match action {
                    ActionTaken::Warning => "warn",
                    ActionTaken::SuspendUser => "suspend",
                    _ => "ban",
                };
                check_outranks(actor, &user, verb)?;

                Ok(match action {
                    ActionTaken::Warning => SideEffect::Warn(user),
                    ActionTaken::SuspendUser => SideEffect::Suspend(user),
                    _ => SideEffect::Ban(user),
                })
            }
        }
    }

    async fn apply_side_effect(
        &self,
        effect: &SideEffect,
        action: ActionTaken,
        notes: Option<&str>,
    ) {
        let outcome = match effect {
            SideEffect::Nothing => Ok(()),
            SideEffect::HidePost(id) => self
                .content
                .posts
                .set_hidden(id, true)
                .await
                .and_then(|post| found(post, "Post", id)),
            SideEffect::DeletePost(id) => self
                .content
                .posts
                .delete_post(id)
                .await
                .and_then(|deleted| found(deleted.then_some(()), "Post", id)),
            SideEffect::DeleteComment(id) => self
                .content
                .comments
                .delete_comment(id)
                .await
                .and_then(|deleted| found(deleted.then_some(()), "Comment", id)),
            SideEffect::Warn(user) => {
                self.notify(user, action, notes);
                Ok(())
            }
            SideEffect::Suspend(user) | SideEffect::Ban(user) => {
                let result = self
                    .content
                    .users
                    .set_suspended(&user.id, true)
                    .await
                    .and_then(|updated| found(updated, "User", &user.id));
                self.notify(user, action, notes);
                result
            }
        };

        if let Err(e) = outcome {
            metrics::record_side_effect_failure(action.as_str());
            tracing::warn!("Moderation side effect {} failed: {}", action, e);
        }
    }

    /// Fire-and-forget notification to the affected user
    fn notify(&self, user: &User, action: ActionTaken, notes: Option<&str>) {
        let Some(email) = user.email.clone() else {
            tracing::debug!("User {} has no email, skipping {} notice", user.id, action);
            return;
        };

        let (subject, headline) = match action {
            ActionTaken::Warning => (
                "You have received a warning",
                "a moderator has issued a warning on your account",
            ),
            ActionTaken::SuspendUser => (
                "Your account has been suspended",
                "your account has been suspended",
            ),
            _ => ("Your account has been banned", "your account has been banned"),
        };

        let mut text = format!(
            "Hello {},\n\nFollowing a review of a report, {}.\n",
            user.display_name, headline
        );
        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            text.push_str(&format!("\nModerator notes: {}\n", notes));
        }
        text.push_str("\nIf you believe this was a mistake, reply to this email.\n\nThe Folio team\n");

        self.mailer.dispatch(email, subject.to_string(), text);
    }

    /// Hide or unhide a post
    pub async fn set_post_hidden(
        &self,
        actor: &Actor,
        post_id: &str,
        hidden: bool,
        reason: Option<String>,
    ) -> AppResult<Post> {
        let action = if hidden {
            AuditAction::PostHidden
        } else {
            AuditAction::PostUnhidden
        };
        let entry = audit_entry(actor, action, AuditTargetType::Post, post_id, reason, None);

        let mut tx = self.db.begin().await?;
        let post = posts::update_hidden(&mut *tx, post_id, hidden)
            .await?
            .ok_or_else(|| not_found("Post", post_id))?;
        audit::insert_record(&mut *tx, &entry).await?;
        tx.commit().await?;

        applied(actor, &entry);
        Ok(post)
    }

    /// Suspend or reinstate a user
    pub async fn set_user_suspended(
        &self,
        actor: &Actor,
        user_id: &str,
        suspended: bool,
        reason: Option<String>,
    ) -> AppResult<User> {
        let action = if suspended {
            AuditAction::UserSuspended
        } else {
            AuditAction::UserUnsuspended
        };
        let entry = audit_entry(actor, action, AuditTargetType::User, user_id, reason, None);

        let mut tx = self.db.begin().await?;
        let target = users::fetch_user(&mut *tx, user_id)
            .await?
            .ok_or_else(|| not_found("User", user_id))?;
        check_outranks(actor, &target, "suspend")?;
        let user = users::update_suspended(&mut *tx, user_id, suspended)
            .await?
            .ok_or_else(|| not_found("User", user_id))?;
        audit::insert_record(&mut *tx, &entry).await?;
        tx.commit().await?;

        applied(actor, &entry);
        Ok(user)
    }

    /// Change a user's role
    pub async fn change_role(&self, actor: &Actor, user_id: &str, role: Role) -> AppResult<User> {
        if user_id == actor.user_id {
            return Err(AppError::Validation("You cannot change your own role".to_string()));
        }

        let mut tx = self.db.begin().await?;
        let before = users::fetch_user(&mut *tx, user_id)
            .await?
            .ok_or_else(|| not_found("User", user_id))?;
        let user = users::update_role(&mut *tx, user_id, role)
            .await?
            .ok_or_else(|| not_found("User", user_id))?;
        let entry = audit_entry(
            actor,
            AuditAction::UserRoleChanged,
            AuditTargetType::User,
            user_id,
            None,
            Some(json!({ "from": before.role, "to": role })),
        );
        audit::insert_record(&mut *tx, &entry).await?;
        tx.commit().await?;

        applied(actor, &entry);
        Ok(user)
    }

    /// Permanently delete a post
    pub async fn delete_post(&self, actor: &Actor, post_id: &str) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let post = posts::fetch_post(&mut *tx, post_id)
            .await?
            .ok_or_else(|| not_found("Post", post_id))?;
        posts::remove_post(&mut *tx, post_id).await?;
        let entry = audit_entry(
            actor,
            AuditAction::PostDeleted,
            AuditTargetType::Post,
            post_id,
            None,
            Some(json!({ "title": post.title, "authorId": post.author_id })),
        );
        audit::insert_record(&mut *tx, &entry).await?;
        tx.commit().await?;

        applied(actor, &entry);
        Ok(())
    }

    /// Permanently delete a user account
    pub async fn delete_user(&self, actor: &Actor, user_id: &str) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let user = users::fetch_user(&mut *tx, user_id)
            .await?
            .ok_or_else(|| not_found("User", user_id))?;
        check_outranks(actor, &user, "delete")?;
        users::remove_user(&mut *tx, user_id).await?;
        let entry = audit_entry(
            actor,
            AuditAction::UserDeleted,
            AuditTargetType::User,
            user_id,
            None,
            Some(json!({ "username": user.username })),
        );
        audit::insert_record(&mut *tx, &entry).await?;
        tx.commit().await?;

        applied(actor, &entry);
        Ok(())
    }

    async fn require_post(&self, id: &str) -> AppResult<Post> {
        self.content
            .posts
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    async fn require_comment(&self, id: &str) -> AppResult<Comment> {
        self.content
            .comments
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
    }

    async fn require_user(&self, id: &str) -> AppResult<User> {
        self.content
            .users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }
}

fn found<T>(value: Option<T>, kind: &str, id: &str) -> AppResult<()> {
    value
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("{} {} no longer exists", kind, id)))
}

fn not_found(kind: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} {} not found", kind, id))
}

/// Actors may not act on themselves or on accounts of equal or higher rank
fn check_outranks(actor: &Actor, target: &User, verb: &str) -> AppResult<()> {
    if target.id == actor.user_id {
        return Err(AppError::Validation(format!("You cannot {} yourself", verb)));
    }
    if target.role >= actor.role {
        tracing::warn!(
            "{} {} tried to {} {} {}",
            actor.role,
            actor.user_id,
            verb,
            target.role,
            target.id
        );
        return Err(AppError::Authorization(format!(
            "Cannot {} an account with role {}",
            verb, target.role
        )));
    }
    Ok(())
}

fn audit_entry(
    actor: &Actor,
    action: AuditAction,
    target_type: AuditTargetType,
    target_id: &str,
    reason: Option<String>,
    details: Option<serde_json::Value>,
) -> NewAuditRecord {
    NewAuditRecord {
        action,
        admin_id: actor.user_id.clone(),
        target_type,
        target_id: target_id.to_string(),
        reason: reason.filter(|r| !r.trim().is_empty()),
        details,
        ip_address: actor.ip_address.clone(),
    }
}

fn applied(actor: &Actor, entry: &NewAuditRecord) {
    tracing::info!(
        "{} {} applied {} to {} {}",
        actor.role,
        actor.user_id,
        entry.action,
        entry.target_type,
        entry.target_id
    );
}
