//! Shop management routes: details, services, statistics, tags,
//! announcements, holidays, and certifications. All owner-scoped.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use arogya_shared::{AnnouncementKind, OperationalStatus};
use arogya_store::{
    Announcement, Certification, Holiday, InventorySummary, Shop, ShopServices, StoreOwner,
};

use crate::api::{require_owner, AppState};
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/details", get(details))
        .route("/services", put(update_services))
        .route("/statistics", get(statistics))
        .route("/tags", put(update_tags))
        .route("/announcements", post(add_announcement))
        .route("/announcements/active", get(active_announcements))
        .route("/announcements/:announcement_id/status", put(set_announcement_status))
        .route("/holidays", post(add_holiday))
        .route("/certifications", post(add_certification))
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailsResponse {
    shop: Shop,
    owner: StoreOwner,
}

#[derive(Deserialize)]
struct UpdateServicesRequest {
    services: Option<ShopServices>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsResponse {
    inventory: InventorySummary,
    operational_status: OperationalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_message: Option<String>,
    total_certifications: i64,
    active_announcements: i64,
    upcoming_holidays: i64,
    last_active_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct UpdateTagsRequest {
    tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddAnnouncementRequest {
    title: Option<String>,
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    end_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnouncementStatusRequest {
    is_active: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnouncementListResponse {
    announcements: Vec<Announcement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddHolidayRequest {
    date: Option<DateTime<Utc>>,
    reason: Option<String>,
    #[serde(default)]
    is_recurring: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCertificationRequest {
    name: Option<String>,
    issued_by: Option<String>,
    issued_date: Option<DateTime<Utc>>,
    expiry_date: Option<DateTime<Utc>>,
    certificate_number: Option<String>,
    document_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Fetch the owner's shop, mapping absence to a friendly NotFound.
async fn shop_of(state: &AppState, owner_id: Uuid) -> Result<Shop, ApiError> {
    let db = state.db.lock().await;
    db.get_shop_by_owner(owner_id).map_err(|e| match e {
        arogya_store::StoreError::NotFound => ApiError::NotFound("Shop not found".to_string()),
        other => other.into(),
    })
}

async fn details(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DetailsResponse>, ApiError> {
    let owner = require_owner(&state, &headers).await?;
    let shop = shop_of(&state, owner.id).await?;
    Ok(Json(DetailsResponse { shop, owner }))
}

async fn update_services(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateServicesRequest>,
) -> Result<Json<Shop>, ApiError> {
    let owner = require_owner(&state, &headers).await?;
    let services = req
        .services
        .ok_or_else(|| ApiError::Validation("Services are required".to_string()))?;

    let shop = {
        let db = state.db.lock().await;
        db.update_shop_services(owner.id, &services)
            .map_err(|e| match e {
                arogya_store::StoreError::NotFound => {
                    ApiError::NotFound("Shop not found".to_string())
                }
                other => other.into(),
            })?
    };

    Ok(Json(shop))
}

async fn statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let owner = require_owner(&state, &headers).await?;
    let shop = shop_of(&state, owner.id).await?;

    let (total_certifications, active_announcements, upcoming_holidays) = {
        let db = state.db.lock().await;
        db.shop_counts(shop.id, Utc::now())?
    };

    Ok(Json(StatisticsResponse {
        inventory: shop.inventory,
        operational_status: shop.operational_status,
        status_message: shop.status_message,
        total_certifications,
        active_announcements,
        upcoming_holidays,
        last_active_at: shop.last_active_at,
    }))
}

async fn update_tags(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateTagsRequest>,
) -> Result<Json<Shop>, ApiError> {
    let owner = require_owner(&state, &headers).await?;
    let tags = req
        .tags
        .ok_or_else(|| ApiError::Validation("Tags must be an array".to_string()))?;

    let shop = {
        let db = state.db.lock().await;
        db.update_shop_tags(owner.id, &tags).map_err(|e| match e {
            arogya_store::StoreError::NotFound => ApiError::NotFound("Shop not found".to_string()),
            other => other.into(),
        })?
    };

    Ok(Json(shop))
}

async fn add_announcement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>), ApiError> {
    let owner = require_owner(&state, &headers).await?;
    let shop = shop_of(&state, owner.id).await?;

    let (title, message) = match (req.title, req.message) {
        (Some(t), Some(m)) => (t, m),
        _ => {
            return Err(ApiError::Validation(
                "Title and message are required".to_string(),
            ))
        }
    };

    let kind = req
        .kind
        .as_deref()
        .map(|k| {
            k.parse::<AnnouncementKind>()
                .map_err(|_| ApiError::Validation("Invalid announcement type".to_string()))
        })
        .transpose()?
        .unwrap_or(AnnouncementKind::Info);

    let announcement = Announcement {
        id: Uuid::new_v4(),
        shop_id: shop.id,
        title,
        message,
        kind,
        is_active: true,
        start_date: Utc::now(),
        end_date: req.end_date,
        created_at: Utc::now(),
    };

    {
        let db = state.db.lock().await;
        db.add_announcement(&announcement)?;
    }

    info!(shop_id = %shop.id, announcement_id = %announcement.id, "announcement added");

    Ok((StatusCode::CREATED, Json(announcement)))
}

async fn active_announcements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AnnouncementListResponse>, ApiError> {
    let owner = require_owner(&state, &headers).await?;
    let shop = shop_of(&state, owner.id).await?;

    let announcements = {
        let db = state.db.lock().await;
        db.active_announcements(shop.id, Utc::now())?
    };

    Ok(Json(AnnouncementListResponse { announcements }))
}

async fn set_announcement_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(announcement_id): Path<Uuid>,
    Json(req): Json<AnnouncementStatusRequest>,
) -> Result<Json<Announcement>, ApiError> {
    let owner = require_owner(&state, &headers).await?;
    let shop = shop_of(&state, owner.id).await?;

    let is_active = req
        .is_active
        .ok_or_else(|| ApiError::Validation("isActive is required".to_string()))?;

    let announcement = {
        let db = state.db.lock().await;
        db.set_announcement_active(shop.id, announcement_id, is_active)
            .map_err(|e| match e {
                arogya_store::StoreError::NotFound => {
                    ApiError::NotFound("Announcement not found".to_string())
                }
                other => other.into(),
            })?
    };

    Ok(Json(announcement))
}

async fn add_holiday(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddHolidayRequest>,
) -> Result<(StatusCode, Json<Holiday>), ApiError> {
    let owner = require_owner(&state, &headers).await?;
    let shop = shop_of(&state, owner.id).await?;

    let (date, reason) = match (req.date, req.reason) {
        (Some(d), Some(r)) => (d, r),
        _ => {
            return Err(ApiError::Validation(
                "Date and reason are required".to_string(),
            ))
        }
    };

    let holiday = Holiday {
        id: Uuid::new_v4(),
        shop_id: shop.id,
        date,
        reason,
        is_recurring: req.is_recurring,
    };

    {
        let db = state.db.lock().await;
        db.add_holiday(&holiday)?;
    }

    Ok((StatusCode::CREATED, Json(holiday)))
}

async fn add_certification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddCertificationRequest>,
) -> Result<(StatusCode, Json<Certification>), ApiError> {
    let owner = require_owner(&state, &headers).await?;
    let shop = shop_of(&state, owner.id).await?;

    let (name, issued_by, issued_date, certificate_number) = match (
        req.name,
        req.issued_by,
        req.issued_date,
        req.certificate_number,
    ) {
        (Some(n), Some(i), Some(d), Some(c)) => (n, i, d, c),
        _ => {
            return Err(ApiError::Validation(
                "Name, issuer, issued date, and certificate number are required".to_string(),
            ))
        }
    };

    let certification = Certification {
        id: Uuid::new_v4(),
        shop_id: shop.id,
        name,
        issued_by,
        issued_date,
        expiry_date: req.expiry_date,
        certificate_number,
        document_url: req.document_url,
        is_active: true,
    };

    {
        let db = state.db.lock().await;
        db.add_certification(&certification)?;
    }

    Ok((StatusCode::CREATED, Json(certification)))
}
