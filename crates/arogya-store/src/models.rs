//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the
//! HTTP layer; password hashes are skipped during serialization and
//! never leave the store boundary in API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use arogya_shared::{
    AccountStatus, AnnouncementKind, MedicineStatus, OperationalStatus, StockLevel,
};

// ---------------------------------------------------------------------------
// User (end customer)
// ---------------------------------------------------------------------------

/// A registered end user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Store owner
// ---------------------------------------------------------------------------

/// Postal address of a shop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShopAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

/// Shop-facing details embedded in the owner record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDetails {
    pub shop_name: String,
    pub address: ShopAddress,
    pub latitude: f64,
    pub longitude: f64,
    pub license_number: String,
    pub gst_number: String,
    pub open_time: String,
    pub close_time: String,
    pub working_days: Vec<String>,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_date: Option<DateTime<Utc>>,
    pub delivery_available: bool,
    pub delivery_radius_km: f64,
}

/// A registered medical store owner. One row per shop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOwner {
    pub id: Uuid,
    pub owner_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_phone: Option<String>,
    pub shop_details: ShopDetails,
    pub account_status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Medicine
// ---------------------------------------------------------------------------

/// One physical batch of a medicine, with its validity window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch_number: String,
    pub manufacturing_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub quantity: i64,
}

/// A medicine in a store's catalog. Ownership is immutable after
/// creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(rename = "medicineName")]
    pub name: String,
    pub generic_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    pub manufacturer: String,
    pub category: String,
    pub therapeutic_class: String,
    pub composition: String,
    pub strength: String,
    pub dosage_form: String,

    pub mrp: f64,
    pub selling_price: f64,
    /// Derived from `mrp` and `selling_price`; recomputed on every
    /// price change.
    pub discount_percentage: i64,

    pub stock: StockLevel,
    pub unit: String,
    pub batches: Vec<Batch>,

    pub prescription_required: bool,
    pub schedule_type: String,
    pub status: MedicineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub total_sold: i64,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    /// True when any batch is past its expiry date.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.batches.iter().any(|b| b.expiry_date < now)
    }
}

// ---------------------------------------------------------------------------
// Shop
// ---------------------------------------------------------------------------

/// The five rollup counters, fully derived from the owner's medicines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_medicines: i64,
    pub active_medicines: i64,
    pub out_of_stock_medicines: i64,
    pub low_stock_medicines: i64,
    pub total_inventory_value: f64,
}

/// Customer-facing service options of a shop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShopServices {
    pub home_delivery_available: bool,
    pub home_delivery_charges: f64,
    pub free_delivery_above: f64,
    pub estimated_delivery_time: String,
    pub online_payment: bool,
    pub cash_on_delivery: bool,
    pub prescription_upload: bool,
    pub emergency_service: bool,
}

impl Default for ShopServices {
    fn default() -> Self {
        Self {
            home_delivery_available: false,
            home_delivery_charges: 0.0,
            free_delivery_above: 0.0,
            estimated_delivery_time: "30-60 minutes".to_string(),
            online_payment: false,
            cash_on_delivery: true,
            prescription_upload: true,
            emergency_service: false,
        }
    }
}

/// The shop record paired with each owner. Holds operational state and
/// the derived inventory summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub operational_status: OperationalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub inventory: InventorySummary,
    pub services: ShopServices,
    pub tags: Vec<String>,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Shop children: announcements, holidays, certifications
// ---------------------------------------------------------------------------

/// A customer-visible notice published by a shop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: AnnouncementKind,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A scheduled closure day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub date: DateTime<Utc>,
    pub reason: String,
    pub is_recurring: bool,
}

/// A certification held by a shop (e.g. drug license renewals).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub issued_by: String,
    pub issued_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub certificate_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    pub is_active: bool,
}
