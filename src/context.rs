/// Application context and dependency injection
use crate::{
    admin::{AuditLog, ModerationService, ReportManager},
    config::ServerConfig,
    content::ContentStores,
    db,
    error::AppResult,
    mailer::Mailer,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    // Moderation
    pub report_manager: Arc<ReportManager>,
    pub audit_log: Arc<AuditLog>,
    pub moderation: Arc<ModerationService>,
    // Posts, users and comments owned by the rest of the platform
    pub content: ContentStores,
    pub rate_limiter: Arc<RateLimiter>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        let db = db::create_pool(&config.storage.database_path, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        tracing::info!("Database ready at {:?}", config.storage.database_path);

        Self::from_pool(config, db)
    }

    /// Build the context over an existing, migrated pool
    pub fn from_pool(config: ServerConfig, db: SqlitePool) -> AppResult<Self> {
        let mailer = Mailer::new(config.email.as_ref())?;
        if mailer.is_configured() {
            tracing::info!("Email notifications enabled");
        } else {
            tracing::info!("Email not configured - notifications will be skipped");
        }

        let content = ContentStores::sqlite(db.clone());
        let moderation = ModerationService::new(db.clone(), content.clone(), mailer.clone());
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        Ok(Self {
            report_manager: Arc::new(ReportManager::new(db.clone())),
            audit_log: Arc::new(AuditLog::new(db.clone())),
            moderation: Arc::new(moderation),
            content,
            rate_limiter: Arc::new(rate_limiter),
            mailer: Arc::new(mailer),
            config: Arc::new(config),
            db,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
