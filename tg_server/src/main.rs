//! Authentication server.
//!
//! Serves signup, login, token refresh and logout over HTTP, backed by the
//! tokengate core. Credentials live in PostgreSQL when `DATABASE_URL` is set
//! and in memory otherwise; sessions are always held in memory.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use log::{info, warn};
use pico_args::Arguments;
use tg_server::{
    api,
    config::ServerConfig,
    logging, metrics,
};
use tokengate::{
    auth::AuthManager,
    db::{CredentialStore, Database, InMemoryCredentialStore, PgCredentialStore},
    session::{InMemorySessionRegistry, SessionRegistry},
};

const HELP: &str = "\
Run the tokengate authentication server

USAGE:
  tg_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL, in-memory if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                   Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                  PostgreSQL connection string
  JWT_SECRET                    JWT signing secret (required, >= 32 chars)
  PASSWORD_PEPPER               Password hashing pepper (required, >= 16 chars)
  ACCESS_TOKEN_TTL_SECS         Access token lifetime [default: 900]
  REFRESH_TOKEN_TTL_SECS        Refresh token lifetime [default: 172800]
  REVOKE_ON_REFRESH_REUSE       Revoke the session when a rotated refresh token is reused [default: true]
  SESSION_REAPER_INTERVAL_SECS  Expired session purge interval [default: 60]
  METRICS_BIND                  Prometheus exporter address (disabled if unset)
  SECURE_COOKIES                Mark token cookies Secure (HTTPS only) [default: true]
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported on {}", metrics_bind);
    }

    let credentials: Arc<dyn CredentialStore> = match &config.database {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.health_check()
                .await
                .context("Database health check failed")?;
            let store = PgCredentialStore::new(db.pool().clone());
            store
                .ensure_schema()
                .await
                .context("Failed to prepare accounts table")?;
            info!("Database connected successfully");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, accounts are kept in memory only");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let sessions: Arc<dyn SessionRegistry> =
        Arc::new(InMemorySessionRegistry::from_config(&config.auth));

    let auth_manager = Arc::new(
        AuthManager::new(&config.auth, credentials, sessions.clone())
            .context("Failed to create auth manager")?,
    );

    tokio::spawn(reap_expired_sessions(sessions, config.reaper_interval));

    if !config.secure_cookies {
        warn!("SECURE_COOKIES disabled, token cookies will be sent over plain HTTP");
    }

    let state = api::AppState::new(auth_manager, &config.auth)
        .with_secure_cookies(config.secure_cookies);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Periodically evict expired sessions and publish the live session count
async fn reap_expired_sessions(sessions: Arc<dyn SessionRegistry>, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        match sessions.purge_expired(chrono::Utc::now()).await {
            Ok(0) => {}
            Ok(purged) => info!("Purged {} expired session(s)", purged),
            Err(e) => warn!("Session purge failed: {}", e),
        }

        if let Ok(count) = sessions.active_count().await {
            metrics::active_sessions(count);
        }
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
