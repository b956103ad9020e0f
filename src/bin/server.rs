//! discord-manage HTTP server binary.
//!
//! Builds the capability catalog, connects to the Discord REST API and
//! serves the `discord_manage` tool over HTTP.
//!
//! # Environment Variables
//!
//! - `DISCORD_MANAGE_CONFIG` - Optional YAML config file
//! - `DISCORD_BOT_TOKEN` - Token of the default bot identity
//! - `DISCORD_DEFAULT_GUILD_ID` - Guild used when a call names none
//! - `DISCORD_MANAGE_POLICY_MODE` - `strict` (default) or `permissive`
//! - `DISCORD_MANAGE_ALLOW_DANGEROUS` - Permit dangerous symbols
//! - `PORT` - HTTP port (default: 8080)
//! - `RUST_LOG` - Tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! DISCORD_BOT_TOKEN=... cargo run --bin server
//! ```

use std::sync::Arc;

use anyhow::Context;
use discord_manage::audit::LogAuditSink;
use discord_manage::capabilities::CatalogService;
use discord_manage::config::GatewayConfig;
use discord_manage::connection::RestConnector;
use discord_manage::identity::{IdentityStore, InMemoryIdentityStore};
use discord_manage::server::{app_router, AppState};
use discord_manage::tool::DiscordManageTool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,discord_manage=debug".into()),
        )
        .init();

    let config = GatewayConfig::load().context("loading configuration")?;

    let catalogs = CatalogService::new(config.catalog.clone());
    let catalog = catalogs.catalog().context("building capability catalog")?;
    tracing::info!(
        packages = catalog.list_packages().len(),
        symbols = catalog.symbol_count(),
        "Capability catalog ready"
    );

    let identities = InMemoryIdentityStore::from_config(&config.identities, |name| std::env::var(name).ok());
    if identities.list_identity_ids().is_empty() {
        tracing::warn!("No identities configured; every call will fail with unknown_identity");
    }

    let connector = RestConnector::new(&config.connection).context("creating REST connector")?;
    let tool = DiscordManageTool::new(
        &config,
        catalog,
        Arc::new(identities),
        Arc::new(connector),
        Arc::new(LogAuditSink),
    )
    .context("creating tool")?;

    let app = app_router(AppState::new(Arc::new(tool)));
    let bind_addr = format!("0.0.0.0:{}", config.server.port);

    tracing::info!("discord-manage server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               - liveness probe");
    tracing::info!("  GET  /operations           - tool descriptor");
    tracing::info!("  POST /tools/discord_manage - tool call");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
