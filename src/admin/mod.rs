/// Admin and Moderation System
///
/// Handles report intake and review, role checks, quick moderation actions
/// on posts and users, and the audit trail every one of them writes to.

pub mod audit;
pub mod moderation;
pub mod reports;
pub mod roles;

pub use audit::{AuditAction, AuditFilter, AuditLog, AuditRecord, AuditTargetType};
pub use moderation::{Actor, ModerationService};
pub use reports::{
    ActionTaken, Report, ReportFilter, ReportManager, ReportReason, ReportStats, ReportStatus,
    ReportTarget, ReportTargetType, ReportTransition,
};
pub use roles::Role;
