//! Store-owner routes: registration, login, profile, shop status,
//! nearby search, and the admin listing/status endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use arogya_shared::{AccountStatus, OperationalStatus};
use arogya_store::{
    InventorySummary, NearbyOwner, OwnerListFilter, OwnerProfileUpdate, Shop, ShopAddress,
    ShopDetails, ShopServices, StoreOwner,
};

use crate::api::{require_admin, require_owner, AppState};
use crate::error::ApiError;
use crate::pagination::{PageQuery, Pagination};

/// Cost factor for bcrypt password hashing.
pub(crate) const BCRYPT_COST: u32 = 12;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/nearby", get(nearby))
        .route("/profile", get(profile).put(update_profile))
        .route("/shop/status", put(update_shop_status))
        .route("/all", get(list_all))
        .route("/:owner_id/status", put(set_account_status))
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterShopDetails {
    shop_name: String,
    address: ShopAddress,
    latitude: f64,
    longitude: f64,
    license_number: String,
    gst_number: String,
    open_time: String,
    close_time: String,
    #[serde(default)]
    working_days: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterOwnerRequest {
    owner_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    phone: Option<String>,
    alternate_phone: Option<String>,
    shop_details: Option<RegisterShopDetails>,
    #[serde(default)]
    delivery_available: bool,
    #[serde(default)]
    delivery_radius_km: f64,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthOwnerResponse {
    token: String,
    owner: StoreOwner,
    #[serde(skip_serializing_if = "Option::is_none")]
    shop: Option<Shop>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NearbyQuery {
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// Radius in kilometers.
    radius: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbyResponse {
    stores: Vec<NearbyOwner>,
    count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    owner: StoreOwner,
    #[serde(skip_serializing_if = "Option::is_none")]
    shop: Option<Shop>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    owner_name: Option<String>,
    phone: Option<String>,
    alternate_phone: Option<String>,
    shop_name: Option<String>,
    address: Option<ShopAddress>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    open_time: Option<String>,
    close_time: Option<String>,
    working_days: Option<Vec<String>>,
    delivery_available: Option<bool>,
    delivery_radius_km: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShopStatusRequest {
    operational_status: Option<String>,
    status_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAllQuery {
    status: Option<String>,
    city: Option<String>,
    verified: Option<bool>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListAllResponse {
    owners: Vec<StoreOwner>,
    pagination: Pagination,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountStatusRequest {
    account_status: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterOwnerRequest>,
) -> Result<(StatusCode, Json<AuthOwnerResponse>), ApiError> {
    let (owner_name, email, password, phone, details) = match (
        req.owner_name,
        req.email,
        req.password,
        req.phone,
        req.shop_details,
    ) {
        (Some(n), Some(e), Some(p), Some(ph), Some(d)) => (n, e, p, ph, d),
        _ => {
            return Err(ApiError::Validation(
                "Owner name, email, password, phone, and shop details are required".to_string(),
            ))
        }
    };

    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation(
            "Phone number must be exactly 10 digits".to_string(),
        ));
    }

    let email = email.to_lowercase();

    {
        let db = state.db.lock().await;
        if db.owner_conflict_exists(&email, &phone, &details.license_number, &details.gst_number)? {
            return Err(ApiError::Conflict(
                "Owner already exists with this email, phone, license number, or GST number"
                    .to_string(),
            ));
        }
    }

    let password_hash = bcrypt::hash(&password, BCRYPT_COST)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    let now = Utc::now();
    let owner = StoreOwner {
        id: Uuid::new_v4(),
        owner_name,
        email,
        password_hash,
        phone,
        alternate_phone: req.alternate_phone,
        shop_details: ShopDetails {
            shop_name: details.shop_name,
            address: details.address,
            latitude: details.latitude,
            longitude: details.longitude,
            license_number: details.license_number,
            gst_number: details.gst_number,
            open_time: details.open_time,
            close_time: details.close_time,
            working_days: details.working_days,
            is_active: true,
            is_verified: false,
            verification_date: None,
            delivery_available: req.delivery_available,
            delivery_radius_km: req.delivery_radius_km,
        },
        account_status: AccountStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    // New shops start closed until the account is verified.
    let shop = Shop {
        id: Uuid::new_v4(),
        owner_id: owner.id,
        operational_status: OperationalStatus::Closed,
        status_message: None,
        inventory: InventorySummary::default(),
        services: ShopServices {
            home_delivery_available: req.delivery_available,
            ..Default::default()
        },
        tags: Vec::new(),
        last_active_at: now,
        created_at: now,
        updated_at: now,
    };

    {
        let db = state.db.lock().await;
        db.create_owner(&owner)?;
        db.create_shop(&shop)?;
    }

    let token = state.auth.issue_owner_token(owner.id)?;

    info!(owner_id = %owner.id, email = %owner.email, "store owner registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthOwnerResponse {
            token,
            owner,
            shop: Some(shop),
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthOwnerResponse>, ApiError> {
    let (email, password) = match (req.email, req.password) {
        (Some(e), Some(p)) => (e, p),
        _ => {
            return Err(ApiError::Validation(
                "Email and password are required".to_string(),
            ))
        }
    };

    let (owner, shop) = {
        let db = state.db.lock().await;
        let owner = db
            .find_owner_by_email(&email.to_lowercase())?
            .ok_or_else(|| {
                ApiError::Unauthenticated("Invalid email or password".to_string())
            })?;
        let shop = db.get_shop_by_owner(owner.id).ok();
        (owner, shop)
    };

    if owner.account_status.is_locked_out() {
        return Err(ApiError::Forbidden(format!(
            "Account is {}. Please contact support.",
            owner.account_status
        )));
    }

    let valid = bcrypt::verify(&password, &owner.password_hash)
        .map_err(|e| ApiError::Internal(format!("password verification failed: {e}")))?;
    if !valid {
        return Err(ApiError::Unauthenticated(
            "Invalid email or password".to_string(),
        ));
    }

    let token = state.auth.issue_owner_token(owner.id)?;

    info!(owner_id = %owner.id, "store owner logged in");

    Ok(Json(AuthOwnerResponse { token, owner, shop }))
}

async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<NearbyResponse>, ApiError> {
    let (latitude, longitude) = match (query.latitude, query.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err(ApiError::Validation(
                "Latitude and longitude are required".to_string(),
            ))
        }
    };
    let radius_km = query.radius.unwrap_or(10.0);

    let stores = {
        let db = state.db.lock().await;
        db.owners_near(latitude, longitude, radius_km * 1000.0)?
    };

    let count = stores.len();
    Ok(Json(NearbyResponse { stores, count }))
}

async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let owner = require_owner(&state, &headers).await?;

    let shop = {
        let db = state.db.lock().await;
        db.get_shop_by_owner(owner.id).ok()
    };

    Ok(Json(ProfileResponse { owner, shop }))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<StoreOwner>, ApiError> {
    let owner = require_owner(&state, &headers).await?;

    // Email, password, and account status are not updatable here; the
    // update struct cannot even express them.
    let update = OwnerProfileUpdate {
        owner_name: req.owner_name,
        phone: req.phone,
        alternate_phone: req.alternate_phone,
        shop_name: req.shop_name,
        address: req.address,
        latitude: req.latitude,
        longitude: req.longitude,
        open_time: req.open_time,
        close_time: req.close_time,
        working_days: req.working_days,
        delivery_available: req.delivery_available,
        delivery_radius_km: req.delivery_radius_km,
    };

    let updated = {
        let db = state.db.lock().await;
        db.update_owner_profile(owner.id, &update)?
    };

    Ok(Json(updated))
}

async fn update_shop_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ShopStatusRequest>,
) -> Result<Json<Shop>, ApiError> {
    let owner = require_owner(&state, &headers).await?;

    let operational_status = req
        .operational_status
        .as_deref()
        .map(|s| {
            s.parse::<OperationalStatus>()
                .map_err(|_| ApiError::Validation("Invalid operational status".to_string()))
        })
        .transpose()?;

    let shop = {
        let db = state.db.lock().await;
        db.update_shop_status(owner.id, operational_status, req.status_message.as_deref())?
    };

    Ok(Json(shop))
}

async fn list_all(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListAllQuery>,
) -> Result<Json<ListAllResponse>, ApiError> {
    require_admin(&state, &headers).await?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<AccountStatus>()
                .map_err(|_| ApiError::Validation("Invalid account status".to_string()))
        })
        .transpose()?;

    let filter = OwnerListFilter {
        status,
        city: query.city,
        verified: query.verified,
    };
    let (page, limit, offset) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let (owners, total) = {
        let db = state.db.lock().await;
        db.list_owners(&filter, limit, offset)?
    };

    Ok(Json(ListAllResponse {
        owners,
        pagination: Pagination::new(page, limit, total),
    }))
}

async fn set_account_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(owner_id): Path<Uuid>,
    Json(req): Json<AccountStatusRequest>,
) -> Result<Json<StoreOwner>, ApiError> {
    require_admin(&state, &headers).await?;

    let status = req
        .account_status
        .as_deref()
        .and_then(|s| s.parse::<AccountStatus>().ok())
        .ok_or_else(|| ApiError::Validation("Invalid account status".to_string()))?;

    let updated = {
        let db = state.db.lock().await;
        db.set_account_status(owner_id, status).map_err(|e| match e {
            arogya_store::StoreError::NotFound => {
                ApiError::NotFound("Store owner not found".to_string())
            }
            other => other.into(),
        })?
    };

    info!(owner_id = %owner_id, status = %status, "account status updated");

    Ok(Json(updated))
}
