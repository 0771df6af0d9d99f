//! End-user routes: registration, login, profile management, password
//! change, account deletion, and the admin listing.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use arogya_store::User;

use crate::api::{require_admin, require_user, AppState};
use crate::api::owners::BCRYPT_COST;
use crate::error::ApiError;
use crate::pagination::{PageQuery, Pagination};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile).put(update_profile))
        .route("/change-password", put(change_password))
        .route("/account", delete(delete_account))
        .route("/all", get(list_all))
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RegisterUserRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    phone: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct AuthUserResponse {
    token: String,
    user: User,
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    name: Option<String>,
    phone: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    current_password: Option<String>,
    new_password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListUsersResponse {
    users: Vec<User>,
    pagination: Pagination,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<AuthUserResponse>), ApiError> {
    let (name, email, password, phone) = match (req.name, req.email, req.password, req.phone) {
        (Some(n), Some(e), Some(p), Some(ph)) => (n, e, p, ph),
        _ => {
            return Err(ApiError::Validation(
                "Name, email, password, and phone are required".to_string(),
            ))
        }
    };

    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation(
            "Phone number must be exactly 10 digits".to_string(),
        ));
    }
    if password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&password, BCRYPT_COST)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name,
        email: email.to_lowercase(),
        password_hash,
        phone,
        created_at: now,
        updated_at: now,
    };

    {
        let db = state.db.lock().await;
        db.create_user(&user)?;
    }

    let token = state.auth.issue_user_token(user.id)?;

    info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(AuthUserResponse { token, user })))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthUserResponse>, ApiError> {
    let (email, password) = match (req.email, req.password) {
        (Some(e), Some(p)) => (e, p),
        _ => {
            return Err(ApiError::Validation(
                "Email and password are required".to_string(),
            ))
        }
    };

    let user = {
        let db = state.db.lock().await;
        db.find_user_by_email(&email.to_lowercase())?
            .ok_or_else(|| ApiError::Unauthenticated("Invalid email or password".to_string()))?
    };

    let valid = bcrypt::verify(&password, &user.password_hash)
        .map_err(|e| ApiError::Internal(format!("password verification failed: {e}")))?;
    if !valid {
        return Err(ApiError::Unauthenticated(
            "Invalid email or password".to_string(),
        ));
    }

    let token = state.auth.issue_user_token(user.id)?;

    Ok(Json(AuthUserResponse { token, user }))
}

async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let user_id = require_user(&state, &headers).await?;

    let user = {
        let db = state.db.lock().await;
        db.get_user(user_id)?
    };

    Ok(Json(user))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let user_id = require_user(&state, &headers).await?;

    if let Some(phone) = &req.phone {
        if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::Validation(
                "Phone number must be exactly 10 digits".to_string(),
            ));
        }
    }

    let user = {
        let db = state.db.lock().await;
        db.update_user_profile(user_id, req.name.as_deref(), req.phone.as_deref())?
    };

    Ok(Json(user))
}

async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user(&state, &headers).await?;

    let (current, new) = match (req.current_password, req.new_password) {
        (Some(c), Some(n)) => (c, n),
        _ => {
            return Err(ApiError::Validation(
                "Current and new passwords are required".to_string(),
            ))
        }
    };
    if new.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let user = {
        let db = state.db.lock().await;
        db.get_user(user_id)?
    };

    let valid = bcrypt::verify(&current, &user.password_hash)
        .map_err(|e| ApiError::Internal(format!("password verification failed: {e}")))?;
    if !valid {
        return Err(ApiError::Unauthenticated(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&new, BCRYPT_COST)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    {
        let db = state.db.lock().await;
        db.update_user_password(user_id, &password_hash)?;
    }

    info!(user_id = %user_id, "password changed");

    Ok(Json(serde_json::json!({ "changed": true })))
}

async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user(&state, &headers).await?;

    let deleted = {
        let db = state.db.lock().await;
        db.delete_user(user_id)?
    };
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(user_id = %user_id, "account deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn list_all(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    require_admin(&state, &headers).await?;

    let (page, limit, offset) = query.resolve();

    let (users, total) = {
        let db = state.db.lock().await;
        db.list_users(limit, offset)?
    };

    Ok(Json(ListUsersResponse {
        users,
        pagination: Pagination::new(page, limit, total),
    }))
}
