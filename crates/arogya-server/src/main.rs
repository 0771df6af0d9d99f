//! # arogya-server
//!
//! HTTP backend for the Arogya medical-store directory.
//!
//! This binary provides:
//! - **Store owner accounts**: registration, login, profile, and the
//!   admin moderation endpoints
//! - **Inventory management**: medicine catalog CRUD, stock
//!   adjustments, and the derived per-shop inventory summary
//! - **Customer search**: nearby stores by location and medicine
//!   search with filters
//! - **Shop management**: operational status, services, announcements,
//!   holidays, and certifications
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod auth;
mod config;
mod error;
mod pagination;
mod rate_limit;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arogya_store::Database;

use crate::api::AppState;
use crate::auth::AuthGate;
use crate::config::ServerConfig;
use crate::rate_limit::IpThrottle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,arogya_server=debug")),
        )
        .init();

    info!("Starting Arogya server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        addr = %config.http_addr,
        database = %config.database_path.display(),
        token_ttl_days = config.token_ttl_days,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Database (creates the file and runs migrations if missing).
    let db = Database::open_at(&config.database_path)?;

    // Auth gate with the process-wide signing secret.
    let auth = Arc::new(AuthGate::new(&config.jwt_secret, config.token_ttl_days));

    // Rate limiter.
    let throttle = IpThrottle::new(config.rate_limit_rps, config.rate_limit_burst);

    // Application state for the HTTP API.
    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        auth,
        throttle: throttle.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic throttle cleanup (every 5 minutes, evict buckets idle >10 min).
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            throttle.evict_idle(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    tokio::select! {
        result = api::serve(state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
