//! solveby.ai Server
//!
//! Serves the agent marketplace REST API over PostgreSQL.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! solveby-server
//!
//! # Start with a custom config
//! solveby-server --config /path/to/config.toml
//!
//! # Start with environment overrides
//! SOLVEBY__SERVER__PORT=8080 solveby-server
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use solveby_api::{create_router, ApiConfig, AppState};
use solveby_db::Database;

use crate::config::ServerConfig;

// =============================================================================
// CLI Arguments
// =============================================================================

/// solveby.ai marketplace server
#[derive(Parser, Debug)]
#[command(name = "solveby-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "SOLVEBY_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "SOLVEBY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SOLVEBY_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SOLVEBY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "SOLVEBY_LOG_FORMAT")]
    log_format: Option<String>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Whole $CRUST credited to new agents
    #[arg(long, env = "SOLVEBY_STARTING_BALANCE")]
    starting_balance: Option<u64>,

    /// Skip migrations on startup
    #[arg(long)]
    skip_migrations: bool,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(url) = self.database_url {
            config.database.postgres_url = url;
        }
        if let Some(balance) = self.starting_balance {
            config.marketplace.starting_balance = balance;
        }
        if self.skip_migrations {
            config.database.run_migrations = false;
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    args.apply(&mut server_config);

    init_logging(&server_config.logging);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting solveby.ai server");

    server_config.validate()?;

    let db = init_database(&server_config.database).await?;

    let state = Arc::new(
        AppState::new(db).with_starting_balance(server_config.marketplace.starting_balance()),
    );
    let api_config = ApiConfig::from(&server_config.api);
    let app = create_router(state, api_config);

    if server_config.metrics.enabled {
        start_metrics_server(&server_config.metrics)?;
    }

    let addr = server_config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        starting_balance = %server_config.marketplace.starting_balance(),
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.server.shutdown_timeout()))
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => subscriber.with(fmt::layer().json().with_target(true)).init(),
        _ => subscriber.with(fmt::layer().pretty().with_target(true)).init(),
    }
}

/// Connect, verify and migrate the database
async fn init_database(config: &config::DatabaseSettings) -> anyhow::Result<Arc<Database>> {
    let db = Database::connect(&config.pool_config()).await?;

    let health = db.health_check().await;
    if !health.healthy {
        anyhow::bail!("Database health check failed");
    }
    tracing::info!(postgres = health.postgres, "Database health check passed");

    if config.run_migrations {
        db.migrate().await?;
    } else {
        tracing::warn!("Skipping migrations");
    }

    Ok(Arc::new(db))
}

/// Start the Prometheus exporter on its own listener
fn start_metrics_server(config: &config::MetricsConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    metrics::gauge!("solveby_up").set(1.0);
    tracing::info!(port = config.port, "Metrics exporter listening");

    Ok(())
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for Ctrl+C or SIGTERM, then give in-flight requests a grace period
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }

    tracing::info!(
        timeout_secs = timeout.as_secs(),
        "Draining in-flight requests"
    );
    tokio::time::sleep(timeout).await;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["solveby-server", "--port", "8080", "--starting-balance", "500"]);
        assert_eq!(args.port, Some(8080));
        assert_eq!(args.starting_balance, Some(500));
        assert!(!args.skip_migrations);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "solveby-server",
            "--host",
            "127.0.0.1",
            "--log-format",
            "json",
            "--starting-balance",
            "42",
            "--skip-migrations",
        ]);
        let mut config = ServerConfig::development();
        args.apply(&mut config);

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.marketplace.starting_balance(), dec!(42));
        assert!(!config.database.run_migrations);
    }

    #[test]
    fn test_development_config() {
        let config = ServerConfig::development();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }
}
