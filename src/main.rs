//! CompatWatch API - MySQL Upgrade Compatibility Monitor
//!
//! Hosts the monitored query pipeline: every statement submitted through the
//! API executes through the instrumented executor, and the collected
//! diagnostics (server warnings, deprecation warnings, slow queries) are
//! exposed as read-only endpoints.

use compatwatch::config::Settings;
use compatwatch::db::connect_pool;
use compatwatch::routes::create_router;
use compatwatch::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting CompatWatch - MySQL Upgrade Compatibility Monitor...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");
    info!(
        "🔎 Monitor: warnings={}, slow queries={} (threshold {} ms)",
        settings.monitor.log_warnings,
        settings.monitor.track_slow_queries,
        settings.monitor.slow_query_threshold_ms
    );

    // Connect to the monitored target - REQUIRED
    let state = match connect_pool(&settings.database).await {
        Ok(pool) => {
            info!("✅ Database pool created successfully");
            Arc::new(AppState::new(pool, settings.monitor.clone()))
        }
        Err(e) => {
            error!("❌ FATAL: Failed to initialize database pool: {}", e);
            error!("DATABASE_URL must be set and the MySQL target must be accessible");
            anyhow::bail!("Cannot start server without database connection");
        }
    };

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   POST /api/query              - Execute a statement (monitored)");
    info!("   GET  /api/diagnostics        - Summary statistics");
    info!("   GET  /api/diagnostics/export - Full diagnostics snapshot");
    info!("   POST /api/diagnostics/reset  - Clear diagnostics state");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,compatwatch=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
