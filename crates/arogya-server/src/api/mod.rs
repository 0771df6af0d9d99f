//! HTTP API: application state, router assembly, and the helpers the
//! route modules share.

pub mod medicines;
pub mod owners;
pub mod shops;
pub mod users;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, Method},
    middleware,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use arogya_store::{Database, StoreOwner};

use crate::auth::{AuthGate, Principal, RequiredRole};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::rate_limit::{throttle_middleware, IpThrottle};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub auth: Arc<AuthGate>,
    pub throttle: IpThrottle,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/users", users::router())
        .nest("/api/store-owners", owners::router())
        .nest("/api/medicines", medicines::router())
        .nest("/api/shop", shops::router())
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            state.throttle.clone(),
            throttle_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Shared helpers for the route modules
// ---------------------------------------------------------------------------

/// The raw `Authorization` header value, if any.
pub(crate) fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Resolve the request to a store-owner principal or fail.
pub(crate) async fn require_owner(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<StoreOwner, ApiError> {
    let db = state.db.lock().await;
    let principal =
        state
            .auth
            .resolve_principal(auth_header(headers), RequiredRole::StoreOwner, &db)?;
    principal
        .as_owner()
        .cloned()
        .ok_or_else(|| ApiError::Unauthenticated("Invalid token".to_string()))
}

/// Resolve the request to an end-user principal or fail.
pub(crate) async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let db = state.db.lock().await;
    let principal = state
        .auth
        .resolve_principal(auth_header(headers), RequiredRole::EndUser, &db)?;
    match principal {
        Principal::EndUser { id } => Ok(id),
        _ => Err(ApiError::Unauthenticated("Invalid token".to_string())),
    }
}

/// Resolve the request to an admin principal or fail.
pub(crate) async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let db = state.db.lock().await;
    let principal = state
        .auth
        .resolve_principal(auth_header(headers), RequiredRole::Admin, &db)?;
    match principal {
        Principal::Admin { id } => Ok(id),
        _ => Err(ApiError::Forbidden("Admin access required".to_string())),
    }
}

/// Recompute the owner's inventory summary after a stock-affecting
/// write. Failures are logged and discarded so they never fail the
/// triggering operation.
pub(crate) async fn refresh_inventory(state: &AppState, owner_id: Uuid) {
    let db = state.db.lock().await;
    if let Err(e) = db.recompute_inventory(owner_id) {
        tracing::error!(owner_id = %owner_id, error = %e, "inventory rollup failed");
    }
}
