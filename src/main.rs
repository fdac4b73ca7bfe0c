/// Folio - moderation service for the Folio blogging platform
///
/// Serves report intake, moderation review and the admin audit trail over
/// an HTTP JSON API backed by SQLite.

use anyhow::Context;
use folio::{config::ServerConfig, server, AppContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    init_tracing(config.logging.json);

    tracing::info!("Starting Folio v{}", env!("CARGO_PKG_VERSION"));

    let ctx = AppContext::new(config)
        .await
        .context("Failed to initialize application context")?;

    server::serve(ctx).await.context("Server terminated")?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "folio=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
