//! IOTP API server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use iotp_users_core::api::{self, ApiState, RateLimiter};
use iotp_users_core::logging::setup_logging;
use iotp_users_core::UsersConfig;

#[derive(Parser, Debug)]
#[command(name = "iotp-server")]
#[command(about = "IOTP principal, device and credential API")]
#[command(version)]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long, default_value = "iotp.toml")]
    config: PathBuf,

    /// Overrides the configured log level
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = UsersConfig::load(Some(args.config.as_path())).context("loading configuration")?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.logging.json |= args.json_logs;
    setup_logging(&config.logging)?;

    let bind: SocketAddr = config
        .api_bind_address
        .parse()
        .with_context(|| format!("invalid api_bind_address {}", config.api_bind_address))?;

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    let cleanup = rate_limiter.spawn_cleanup();

    let auth_service = Arc::new(iotp_users_core::init(config).await?);
    let app = api::create_router_with_state(ApiState {
        auth_service,
        rate_limiter,
    });

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {}", bind))?;
    tracing::info!("IOTP API listening on {}", bind);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    tracing::info!("IOTP API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
