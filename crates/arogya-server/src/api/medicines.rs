//! Medicine routes: the public search/details endpoints and the
//! owner-scoped catalog and stock management.
//!
//! Every stock-affecting write (create, stock-touching update, delete,
//! explicit adjustment) finishes by recomputing the owning shop's
//! inventory summary; a rollup failure never fails the write itself.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use arogya_shared::{
    adjust_stock, discount_percentage, MedicineStatus, StockLevel, StockOperation,
};
use arogya_store::{
    Batch, Medicine, MedicineSearchFilter, MedicineUpdate, OwnerMedicineFilter, StoreOwner,
};

use crate::api::{auth_header, refresh_inventory, require_owner, AppState};
use crate::auth::RequiredRole;
use crate::error::ApiError;
use crate::pagination::{PageQuery, Pagination};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/add", post(add_medicine))
        .route("/owner/all", get(owner_medicines))
        .route("/owner/low-stock", get(low_stock))
        .route("/owner/expired", get(expired))
        .route("/:medicine_id", get(details).put(update_medicine).delete(delete_medicine))
        .route("/:medicine_id/stock", put(update_stock))
}

/// Fields a new medicine must carry. Reported back by name when absent.
const REQUIRED_FIELDS: [&str; 8] = [
    "medicineName",
    "genericName",
    "manufacturer",
    "category",
    "therapeuticClass",
    "composition",
    "strength",
    "dosageForm",
];

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery {
    search: Option<String>,
    category: Option<String>,
    therapeutic_class: Option<String>,
    prescription_required: Option<bool>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// Radius in kilometers.
    radius: Option<f64>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    medicines: Vec<Medicine>,
    pagination: Pagination,
}

/// The store summary attached to public medicine responses. Never
/// exposes contact or credential fields.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreSummary {
    id: Uuid,
    owner_name: String,
    shop_name: String,
    city: String,
    account_status: arogya_shared::AccountStatus,
}

impl From<&StoreOwner> for StoreSummary {
    fn from(owner: &StoreOwner) -> Self {
        Self {
            id: owner.id,
            owner_name: owner.owner_name.clone(),
            shop_name: owner.shop_details.shop_name.clone(),
            city: owner.shop_details.address.city.clone(),
            account_status: owner.account_status,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailsResponse {
    medicine: Medicine,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<StoreSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddMedicineRequest {
    medicine_name: Option<String>,
    generic_name: Option<String>,
    brand_name: Option<String>,
    manufacturer: Option<String>,
    category: Option<String>,
    therapeutic_class: Option<String>,
    composition: Option<String>,
    strength: Option<String>,
    dosage_form: Option<String>,
    #[serde(default)]
    mrp: f64,
    #[serde(default)]
    selling_price: f64,
    #[serde(default)]
    available_quantity: i64,
    #[serde(default)]
    reserved_quantity: i64,
    minimum_stock_level: Option<i64>,
    unit: Option<String>,
    #[serde(default)]
    batches: Vec<BatchRequest>,
    #[serde(default)]
    prescription_required: bool,
    schedule_type: Option<String>,
    description: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    is_visible: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest {
    batch_number: String,
    manufacturing_date: chrono::DateTime<Utc>,
    expiry_date: chrono::DateTime<Utc>,
    quantity: i64,
}

impl From<BatchRequest> for Batch {
    fn from(b: BatchRequest) -> Self {
        Batch {
            batch_number: b.batch_number,
            manufacturing_date: b.manufacturing_date,
            expiry_date: b.expiry_date,
            quantity: b.quantity,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerMedicinesQuery {
    category: Option<String>,
    status: Option<String>,
    therapeutic_class: Option<String>,
    search: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMedicineRequest {
    medicine_name: Option<String>,
    generic_name: Option<String>,
    brand_name: Option<String>,
    manufacturer: Option<String>,
    category: Option<String>,
    therapeutic_class: Option<String>,
    composition: Option<String>,
    strength: Option<String>,
    dosage_form: Option<String>,
    mrp: Option<f64>,
    selling_price: Option<f64>,
    available_quantity: Option<i64>,
    reserved_quantity: Option<i64>,
    minimum_stock_level: Option<i64>,
    unit: Option<String>,
    prescription_required: Option<bool>,
    schedule_type: Option<String>,
    status: Option<String>,
    description: Option<String>,
    keywords: Option<Vec<String>>,
    is_visible: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockRequest {
    operation: Option<String>,
    quantity: Option<i64>,
    batch_details: Option<Vec<BatchRequest>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MedicineListResponse {
    medicines: Vec<Medicine>,
    count: usize,
}

// ---------------------------------------------------------------------------
// Public handlers
// ---------------------------------------------------------------------------

async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let (page, limit, offset) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let db = state.db.lock().await;

    // Personalization hook: resolve the caller when a token is present,
    // but never fail the request over a bad one.
    if state
        .auth
        .optional_principal(auth_header(&headers), RequiredRole::StoreOwner, &db)
        .is_some()
    {
        debug!("medicine search by authenticated store owner");
    }

    // Geo restriction: limit hits to stores within the radius.
    let owner_ids = match (query.latitude, query.longitude) {
        (Some(lat), Some(lon)) => {
            let radius_km = query.radius.unwrap_or(10.0);
            Some(db.owner_ids_near(lat, lon, radius_km * 1000.0)?)
        }
        _ => None,
    };

    let filter = MedicineSearchFilter {
        search: query.search,
        category: query.category,
        therapeutic_class: query.therapeutic_class,
        prescription_required: query.prescription_required,
        min_price: query.min_price,
        max_price: query.max_price,
        owner_ids,
    };

    let (medicines, total) = db.search_medicines(&filter, limit, offset)?;

    Ok(Json(SearchResponse {
        medicines,
        pagination: Pagination::new(page, limit, total),
    }))
}

async fn details(
    State(state): State<AppState>,
    Path(medicine_id): Path<Uuid>,
) -> Result<Json<DetailsResponse>, ApiError> {
    let db = state.db.lock().await;

    let medicine = db.get_visible_medicine(medicine_id).map_err(|e| match e {
        arogya_store::StoreError::NotFound => {
            ApiError::NotFound("Medicine not found".to_string())
        }
        other => other.into(),
    })?;

    let store = db
        .get_owner(medicine.owner_id)
        .ok()
        .map(|o| StoreSummary::from(&o));

    Ok(Json(DetailsResponse { medicine, store }))
}

// ---------------------------------------------------------------------------
// Owner handlers
// ---------------------------------------------------------------------------

async fn add_medicine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddMedicineRequest>,
) -> Result<(StatusCode, Json<Medicine>), ApiError> {
    let owner = require_owner(&state, &headers).await?;

    // The gate admits pending owners; catalog writes additionally
    // require a fully activated account.
    if owner.account_status != arogya_shared::AccountStatus::Active {
        return Err(ApiError::Forbidden(
            "Store owner account is not active".to_string(),
        ));
    }

    let present = [
        req.medicine_name.is_some(),
        req.generic_name.is_some(),
        req.manufacturer.is_some(),
        req.category.is_some(),
        req.therapeutic_class.is_some(),
        req.composition.is_some(),
        req.strength.is_some(),
        req.dosage_form.is_some(),
    ];
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .zip(present)
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let name = req.medicine_name.unwrap();
    let generic_name = req.generic_name.unwrap();
    let strength = req.strength.unwrap();

    {
        let db = state.db.lock().await;
        if db.medicine_signature_exists(owner.id, &name, &generic_name, &strength)? {
            return Err(ApiError::Conflict(
                "Medicine with same name, generic name, and strength already exists".to_string(),
            ));
        }
    }

    let available = req.available_quantity.max(0);
    let reserved = req.reserved_quantity.max(0);
    let now = Utc::now();

    let medicine = Medicine {
        id: Uuid::new_v4(),
        owner_id: owner.id,
        name,
        generic_name,
        brand_name: req.brand_name,
        manufacturer: req.manufacturer.unwrap(),
        category: req.category.unwrap(),
        therapeutic_class: req.therapeutic_class.unwrap(),
        composition: req.composition.unwrap(),
        strength,
        dosage_form: req.dosage_form.unwrap(),
        mrp: req.mrp,
        selling_price: req.selling_price,
        discount_percentage: discount_percentage(req.mrp, req.selling_price).unwrap_or(0),
        stock: StockLevel {
            total_quantity: available + reserved,
            available_quantity: available,
            reserved_quantity: reserved,
            minimum_stock_level: req.minimum_stock_level.unwrap_or(10),
        },
        unit: req.unit.unwrap_or_else(|| "Piece".to_string()),
        batches: req.batches.into_iter().map(Batch::from).collect(),
        prescription_required: req.prescription_required,
        schedule_type: req.schedule_type.unwrap_or_else(|| "OTC".to_string()),
        status: if available == 0 {
            MedicineStatus::OutOfStock
        } else {
            MedicineStatus::Active
        },
        description: req.description,
        keywords: req.keywords,
        total_sold: 0,
        is_visible: req.is_visible.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    {
        let db = state.db.lock().await;
        db.create_medicine(&medicine)?;
    }

    refresh_inventory(&state, owner.id).await;

    info!(medicine_id = %medicine.id, owner_id = %owner.id, "medicine added");

    Ok((StatusCode::CREATED, Json(medicine)))
}

async fn owner_medicines(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OwnerMedicinesQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let owner = require_owner(&state, &headers).await?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<MedicineStatus>()
                .map_err(|_| ApiError::Validation("Invalid medicine status".to_string()))
        })
        .transpose()?;

    let filter = OwnerMedicineFilter {
        category: query.category,
        status,
        therapeutic_class: query.therapeutic_class,
        search: query.search,
    };
    let (page, limit, offset) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let (medicines, total) = {
        let db = state.db.lock().await;
        db.list_owner_medicines(owner.id, &filter, limit, offset)?
    };

    Ok(Json(SearchResponse {
        medicines,
        pagination: Pagination::new(page, limit, total),
    }))
}

async fn update_medicine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(medicine_id): Path<Uuid>,
    Json(req): Json<UpdateMedicineRequest>,
) -> Result<Json<Medicine>, ApiError> {
    let owner = require_owner(&state, &headers).await?;

    let existing = {
        let db = state.db.lock().await;
        db.get_owner_medicine(medicine_id, owner.id).map_err(|e| match e {
            arogya_store::StoreError::NotFound => ApiError::NotFound(
                "Medicine not found or you do not have permission to update it".to_string(),
            ),
            other => other.into(),
        })?
    };

    let status = req
        .status
        .as_deref()
        .map(|s| {
            s.parse::<MedicineStatus>()
                .map_err(|_| ApiError::Validation("Invalid medicine status".to_string()))
        })
        .transpose()?;

    // Re-derive the discount whenever either price changes.
    let discount = if req.mrp.is_some() || req.selling_price.is_some() {
        let mrp = req.mrp.unwrap_or(existing.mrp);
        let selling = req.selling_price.unwrap_or(existing.selling_price);
        discount_percentage(mrp, selling)
    } else {
        None
    };

    // The owner reference and sales counter cannot be expressed in the
    // update struct, so they are immune to mass-assignment.
    let update = MedicineUpdate {
        name: req.medicine_name,
        generic_name: req.generic_name,
        brand_name: req.brand_name,
        manufacturer: req.manufacturer,
        category: req.category,
        therapeutic_class: req.therapeutic_class,
        composition: req.composition,
        strength: req.strength,
        dosage_form: req.dosage_form,
        mrp: req.mrp,
        selling_price: req.selling_price,
        discount_percentage: discount,
        total_quantity: match (req.available_quantity, req.reserved_quantity) {
            (None, None) => None,
            (available, reserved) => Some(
                available.unwrap_or(existing.stock.available_quantity)
                    + reserved.unwrap_or(existing.stock.reserved_quantity),
            ),
        },
        available_quantity: req.available_quantity,
        reserved_quantity: req.reserved_quantity,
        minimum_stock_level: req.minimum_stock_level,
        unit: req.unit,
        prescription_required: req.prescription_required,
        schedule_type: req.schedule_type,
        status,
        description: req.description,
        keywords: req.keywords,
        is_visible: req.is_visible,
    };

    let touches_stock = update.touches_stock();

    let updated = {
        let db = state.db.lock().await;
        db.update_medicine(medicine_id, &update)?
    };

    if touches_stock {
        refresh_inventory(&state, owner.id).await;
    }

    Ok(Json(updated))
}

async fn delete_medicine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(medicine_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let owner = require_owner(&state, &headers).await?;

    let deleted = {
        let db = state.db.lock().await;
        db.delete_owner_medicine(medicine_id, owner.id)?
    };
    if !deleted {
        return Err(ApiError::NotFound(
            "Medicine not found or you do not have permission to delete it".to_string(),
        ));
    }

    refresh_inventory(&state, owner.id).await;

    info!(medicine_id = %medicine_id, owner_id = %owner.id, "medicine deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn update_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(medicine_id): Path<Uuid>,
    Json(req): Json<StockRequest>,
) -> Result<Json<Medicine>, ApiError> {
    let owner = require_owner(&state, &headers).await?;

    let operation = req
        .operation
        .as_deref()
        .and_then(StockOperation::parse)
        .ok_or_else(|| {
            ApiError::Validation("Invalid operation. Use add, remove, or set".to_string())
        })?;
    let quantity = req
        .quantity
        .ok_or_else(|| ApiError::Validation("Quantity is required".to_string()))?;
    if quantity < 0 {
        return Err(ApiError::Validation(
            "Quantity must not be negative".to_string(),
        ));
    }

    // Read-modify-write without a surrounding transaction: concurrent
    // adjustments on the same medicine can interleave (accepted).
    let medicine = {
        let db = state.db.lock().await;
        db.get_owner_medicine(medicine_id, owner.id).map_err(|e| match e {
            arogya_store::StoreError::NotFound => {
                ApiError::NotFound("Medicine not found".to_string())
            }
            other => other.into(),
        })?
    };

    let (stock, status) = adjust_stock(medicine.stock, medicine.status, operation, quantity);
    let batches: Option<Vec<Batch>> = req
        .batch_details
        .map(|b| b.into_iter().map(Batch::from).collect());

    let updated = {
        let db = state.db.lock().await;
        db.write_stock(medicine_id, &stock, status, batches.as_deref())?;
        db.get_medicine(medicine_id)?
    };

    refresh_inventory(&state, owner.id).await;

    info!(
        medicine_id = %medicine_id,
        operation = ?operation,
        quantity,
        available = stock.available_quantity,
        "stock adjusted"
    );

    Ok(Json(updated))
}

async fn low_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MedicineListResponse>, ApiError> {
    let owner = require_owner(&state, &headers).await?;

    let medicines = {
        let db = state.db.lock().await;
        db.low_stock_medicines(owner.id)?
    };

    let count = medicines.len();
    Ok(Json(MedicineListResponse { medicines, count }))
}

async fn expired(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MedicineListResponse>, ApiError> {
    let owner = require_owner(&state, &headers).await?;

    let medicines = {
        let db = state.db.lock().await;
        db.expired_medicines(owner.id, Utc::now())?
    };

    let count = medicines.len();
    Ok(Json(MedicineListResponse { medicines, count }))
}
