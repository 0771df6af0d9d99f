//! CRUD operations and queries for [`Medicine`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::ToSql;
use uuid::Uuid;

use arogya_shared::{MedicineStatus, StockLevel};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Batch, Medicine};
use crate::row::{enum_col, json_col, ts_col, uuid_col};
use crate::users::not_found;

/// Select list shared by every medicine query; keep in sync with
/// [`row_to_medicine`].
const MEDICINE_COLUMNS: &str = "id, owner_id, name, generic_name, brand_name, manufacturer, \
     category, therapeutic_class, composition, strength, dosage_form, \
     mrp, selling_price, discount_percentage, \
     total_quantity, available_quantity, reserved_quantity, minimum_stock_level, \
     unit, batches, prescription_required, schedule_type, status, description, \
     keywords, total_sold, is_visible, created_at, updated_at";

/// Catalog fields an owner may change on an existing medicine. `None`
/// leaves the stored value untouched. The owner reference and sales
/// counter are deliberately not representable here.
#[derive(Debug, Default, Clone)]
pub struct MedicineUpdate {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub therapeutic_class: Option<String>,
    pub composition: Option<String>,
    pub strength: Option<String>,
    pub dosage_form: Option<String>,
    pub mrp: Option<f64>,
    pub selling_price: Option<f64>,
    /// Derived by the caller whenever either price changes.
    pub discount_percentage: Option<i64>,
    pub total_quantity: Option<i64>,
    pub available_quantity: Option<i64>,
    pub reserved_quantity: Option<i64>,
    pub minimum_stock_level: Option<i64>,
    pub unit: Option<String>,
    pub prescription_required: Option<bool>,
    pub schedule_type: Option<String>,
    pub status: Option<MedicineStatus>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub is_visible: Option<bool>,
}

impl MedicineUpdate {
    /// True when the update touches any stock counter (and therefore
    /// requires an inventory rollup afterwards).
    pub fn touches_stock(&self) -> bool {
        self.total_quantity.is_some()
            || self.available_quantity.is_some()
            || self.reserved_quantity.is_some()
            || self.minimum_stock_level.is_some()
    }
}

/// Filter for the owner's catalog listing.
#[derive(Debug, Default, Clone)]
pub struct OwnerMedicineFilter {
    pub category: Option<String>,
    pub status: Option<MedicineStatus>,
    pub therapeutic_class: Option<String>,
    pub search: Option<String>,
}

/// Filter for the public medicine search.
#[derive(Debug, Default, Clone)]
pub struct MedicineSearchFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub therapeutic_class: Option<String>,
    pub prescription_required: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// When present, restricts hits to these stores (geo filter). An
    /// empty list yields no results.
    pub owner_ids: Option<Vec<Uuid>>,
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new medicine.
    pub fn create_medicine(&self, medicine: &Medicine) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO medicines ({MEDICINE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)"
            ),
            params![
                medicine.id.to_string(),
                medicine.owner_id.to_string(),
                medicine.name,
                medicine.generic_name,
                medicine.brand_name,
                medicine.manufacturer,
                medicine.category,
                medicine.therapeutic_class,
                medicine.composition,
                medicine.strength,
                medicine.dosage_form,
                medicine.mrp,
                medicine.selling_price,
                medicine.discount_percentage,
                medicine.stock.total_quantity,
                medicine.stock.available_quantity,
                medicine.stock.reserved_quantity,
                medicine.stock.minimum_stock_level,
                medicine.unit,
                serde_json::to_string(&medicine.batches)?,
                medicine.prescription_required,
                medicine.schedule_type,
                medicine.status.as_str(),
                medicine.description,
                serde_json::to_string(&medicine.keywords)?,
                medicine.total_sold,
                medicine.is_visible,
                medicine.created_at.to_rfc3339(),
                medicine.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// True when the store already carries a medicine with the same
    /// (name, generic name, strength) signature.
    pub fn medicine_signature_exists(
        &self,
        owner_id: Uuid,
        name: &str,
        generic_name: &str,
        strength: &str,
    ) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM medicines
             WHERE owner_id = ?1 AND name = ?2 AND generic_name = ?3 AND strength = ?4",
            params![owner_id.to_string(), name, generic_name, strength],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a medicine by UUID regardless of status or visibility.
    pub fn get_medicine(&self, id: Uuid) -> Result<Medicine> {
        self.conn()
            .query_row(
                &format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?1"),
                params![id.to_string()],
                row_to_medicine,
            )
            .map_err(not_found)
    }

    /// Fetch a medicine only if it belongs to the given owner.
    /// Ownership mismatch is indistinguishable from absence.
    pub fn get_owner_medicine(&self, id: Uuid, owner_id: Uuid) -> Result<Medicine> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?1 AND owner_id = ?2"
                ),
                params![id.to_string(), owner_id.to_string()],
                row_to_medicine,
            )
            .map_err(not_found)
    }

    /// Fetch a medicine for public display: active and visible only.
    pub fn get_visible_medicine(&self, id: Uuid) -> Result<Medicine> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {MEDICINE_COLUMNS} FROM medicines
                     WHERE id = ?1 AND status = 'active' AND is_visible = 1"
                ),
                params![id.to_string()],
                row_to_medicine,
            )
            .map_err(not_found)
    }

    /// The owner's catalog, newest first, with the unpaginated total.
    pub fn list_owner_medicines(
        &self,
        owner_id: Uuid,
        filter: &OwnerMedicineFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Medicine>, i64)> {
        let mut conditions = vec!["owner_id = ?".to_string()];
        let mut bind: Vec<Box<dyn ToSql>> = vec![Box::new(owner_id.to_string())];

        if let Some(category) = &filter.category {
            conditions.push("category = ?".to_string());
            bind.push(Box::new(category.clone()));
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?".to_string());
            bind.push(Box::new(status.as_str().to_string()));
        }
        if let Some(class) = &filter.therapeutic_class {
            conditions.push("therapeutic_class = ?".to_string());
            bind.push(Box::new(class.clone()));
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            conditions.push(
                "(name LIKE ? OR generic_name LIKE ? OR brand_name LIKE ? OR manufacturer LIKE ?)"
                    .to_string(),
            );
            for _ in 0..4 {
                bind.push(Box::new(pattern.clone()));
            }
        }

        self.query_medicines_page(&conditions, bind, "created_at DESC", limit, offset)
    }

    /// Public search: active + visible medicines matching the filter,
    /// best sellers first.
    pub fn search_medicines(
        &self,
        filter: &MedicineSearchFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Medicine>, i64)> {
        let mut conditions = vec![
            "status = 'active'".to_string(),
            "is_visible = 1".to_string(),
        ];
        let mut bind: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            conditions.push(
                "(name LIKE ? OR generic_name LIKE ? OR brand_name LIKE ? OR keywords LIKE ?)"
                    .to_string(),
            );
            for _ in 0..4 {
                bind.push(Box::new(pattern.clone()));
            }
        }
        if let Some(category) = &filter.category {
            conditions.push("category = ?".to_string());
            bind.push(Box::new(category.clone()));
        }
        if let Some(class) = &filter.therapeutic_class {
            conditions.push("therapeutic_class = ?".to_string());
            bind.push(Box::new(class.clone()));
        }
        if let Some(rx) = filter.prescription_required {
            conditions.push("prescription_required = ?".to_string());
            bind.push(Box::new(rx));
        }
        if let Some(min) = filter.min_price {
            conditions.push("selling_price >= ?".to_string());
            bind.push(Box::new(min));
        }
        if let Some(max) = filter.max_price {
            conditions.push("selling_price <= ?".to_string());
            bind.push(Box::new(max));
        }
        if let Some(owner_ids) = &filter.owner_ids {
            if owner_ids.is_empty() {
                return Ok((Vec::new(), 0));
            }
            let placeholders = vec!["?"; owner_ids.len()].join(", ");
            conditions.push(format!("owner_id IN ({placeholders})"));
            for id in owner_ids {
                bind.push(Box::new(id.to_string()));
            }
        }

        self.query_medicines_page(
            &conditions,
            bind,
            "total_sold DESC, created_at DESC",
            limit,
            offset,
        )
    }

    /// Medicines at or below their reorder level, most depleted first.
    /// Discontinued entries are excluded.
    pub fn low_stock_medicines(&self, owner_id: Uuid) -> Result<Vec<Medicine>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines
             WHERE owner_id = ?1
               AND available_quantity <= minimum_stock_level
               AND status != 'discontinued'
             ORDER BY available_quantity ASC"
        ))?;
        let rows = stmt.query_map(params![owner_id.to_string()], row_to_medicine)?;

        let mut medicines = Vec::new();
        for row in rows {
            medicines.push(row?);
        }
        Ok(medicines)
    }

    /// Medicines with at least one batch past its expiry date.
    ///
    /// Batch windows live in a JSON column, so the expiry check runs in
    /// Rust over the owner's catalog (per-store catalogs are small).
    pub fn expired_medicines(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Medicine>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE owner_id = ?1"
        ))?;
        let rows = stmt.query_map(params![owner_id.to_string()], row_to_medicine)?;

        let mut expired = Vec::new();
        for row in rows {
            let medicine = row?;
            if medicine.is_expired(now) {
                expired.push(medicine);
            }
        }
        Ok(expired)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a catalog update; returns the fresh record.
    pub fn update_medicine(&self, id: Uuid, update: &MedicineUpdate) -> Result<Medicine> {
        let keywords = update
            .keywords
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let affected = self.conn().execute(
            "UPDATE medicines SET
                 name                  = COALESCE(?2, name),
                 generic_name          = COALESCE(?3, generic_name),
                 brand_name            = COALESCE(?4, brand_name),
                 manufacturer          = COALESCE(?5, manufacturer),
                 category              = COALESCE(?6, category),
                 therapeutic_class     = COALESCE(?7, therapeutic_class),
                 composition           = COALESCE(?8, composition),
                 strength              = COALESCE(?9, strength),
                 dosage_form           = COALESCE(?10, dosage_form),
                 mrp                   = COALESCE(?11, mrp),
                 selling_price         = COALESCE(?12, selling_price),
                 discount_percentage   = COALESCE(?13, discount_percentage),
                 total_quantity        = COALESCE(?14, total_quantity),
                 available_quantity    = COALESCE(?15, available_quantity),
                 reserved_quantity     = COALESCE(?16, reserved_quantity),
                 minimum_stock_level   = COALESCE(?17, minimum_stock_level),
                 unit                  = COALESCE(?18, unit),
                 prescription_required = COALESCE(?19, prescription_required),
                 schedule_type         = COALESCE(?20, schedule_type),
                 status                = COALESCE(?21, status),
                 description           = COALESCE(?22, description),
                 keywords              = COALESCE(?23, keywords),
                 is_visible            = COALESCE(?24, is_visible),
                 updated_at            = ?25
             WHERE id = ?1",
            params![
                id.to_string(),
                update.name,
                update.generic_name,
                update.brand_name,
                update.manufacturer,
                update.category,
                update.therapeutic_class,
                update.composition,
                update.strength,
                update.dosage_form,
                update.mrp,
                update.selling_price,
                update.discount_percentage,
                update.total_quantity,
                update.available_quantity,
                update.reserved_quantity,
                update.minimum_stock_level,
                update.unit,
                update.prescription_required,
                update.schedule_type,
                update.status.map(|s| s.as_str().to_string()),
                update.description,
                keywords,
                update.is_visible,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_medicine(id)
    }

    /// Write back an adjusted stock snapshot and the status it implies,
    /// optionally replacing the batch list, as one atomic row update.
    pub fn write_stock(
        &self,
        id: Uuid,
        stock: &StockLevel,
        status: MedicineStatus,
        batches: Option<&[Batch]>,
    ) -> Result<()> {
        let batches_json = batches.map(serde_json::to_string).transpose()?;

        let affected = self.conn().execute(
            "UPDATE medicines SET
                 total_quantity      = ?2,
                 available_quantity  = ?3,
                 reserved_quantity   = ?4,
                 minimum_stock_level = ?5,
                 status              = ?6,
                 batches             = COALESCE(?7, batches),
                 updated_at          = ?8
             WHERE id = ?1",
            params![
                id.to_string(),
                stock.total_quantity,
                stock.available_quantity,
                stock.reserved_quantity,
                stock.minimum_stock_level,
                status.as_str(),
                batches_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a medicine if it belongs to the owner. Returns `true` if
    /// a row was deleted.
    pub fn delete_owner_medicine(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM medicines WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Shared paging plumbing
    // ------------------------------------------------------------------

    fn query_medicines_page(
        &self,
        conditions: &[String],
        mut bind: Vec<Box<dyn ToSql>>,
        order_by: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Medicine>, i64)> {
        let where_clause = format!("WHERE {}", conditions.join(" AND "));

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM medicines {where_clause}"),
            rusqlite::params_from_iter(bind.iter().map(|b| b.as_ref())),
            |row| row.get(0),
        )?;

        bind.push(Box::new(limit));
        bind.push(Box::new(offset));

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines {where_clause}
             ORDER BY {order_by}
             LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(bind.iter().map(|b| b.as_ref())),
            row_to_medicine,
        )?;

        let mut medicines = Vec::new();
        for row in rows {
            medicines.push(row?);
        }
        Ok((medicines, total))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Medicine`].
fn row_to_medicine(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medicine> {
    Ok(Medicine {
        id: uuid_col(row, 0)?,
        owner_id: uuid_col(row, 1)?,
        name: row.get(2)?,
        generic_name: row.get(3)?,
        brand_name: row.get(4)?,
        manufacturer: row.get(5)?,
        category: row.get(6)?,
        therapeutic_class: row.get(7)?,
        composition: row.get(8)?,
        strength: row.get(9)?,
        dosage_form: row.get(10)?,
        mrp: row.get(11)?,
        selling_price: row.get(12)?,
        discount_percentage: row.get(13)?,
        stock: StockLevel {
            total_quantity: row.get(14)?,
            available_quantity: row.get(15)?,
            reserved_quantity: row.get(16)?,
            minimum_stock_level: row.get(17)?,
        },
        unit: row.get(18)?,
        batches: json_col(row, 19)?,
        prescription_required: row.get(20)?,
        schedule_type: row.get(21)?,
        status: enum_col(row, 22)?,
        description: row.get(23)?,
        keywords: json_col(row, 24)?,
        total_sold: row.get(25)?,
        is_visible: row.get(26)?,
        created_at: ts_col(row, 27)?,
        updated_at: ts_col(row, 28)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::owners::tests::sample_owner;
    use chrono::Duration;

    /// A minimal valid medicine for store tests; other modules reuse it.
    pub(crate) fn sample_medicine(owner_id: Uuid, name: &str, available: i64) -> Medicine {
        Medicine {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            generic_name: "Paracetamol".to_string(),
            brand_name: None,
            manufacturer: "Cipla".to_string(),
            category: "Tablet".to_string(),
            therapeutic_class: "Analgesic".to_string(),
            composition: "Paracetamol 500mg".to_string(),
            strength: "500mg".to_string(),
            dosage_form: "Oral".to_string(),
            mrp: 100.0,
            selling_price: 80.0,
            discount_percentage: 20,
            stock: StockLevel {
                total_quantity: available,
                available_quantity: available,
                reserved_quantity: 0,
                minimum_stock_level: 10,
            },
            unit: "Strip".to_string(),
            batches: Vec::new(),
            prescription_required: false,
            schedule_type: "OTC".to_string(),
            status: if available == 0 {
                MedicineStatus::OutOfStock
            } else {
                MedicineStatus::Active
            },
            description: None,
            keywords: vec!["fever".to_string(), "pain".to_string()],
            total_sold: 0,
            is_visible: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn db_with_owner() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let owner = sample_owner("med@example.com", "9000000001");
        db.create_owner(&owner).unwrap();
        (db, owner.id)
    }

    #[test]
    fn create_and_round_trip() {
        let (db, owner_id) = db_with_owner();
        let medicine = sample_medicine(owner_id, "Calpol 500", 40);
        db.create_medicine(&medicine).unwrap();

        let fetched = db.get_medicine(medicine.id).unwrap();
        assert_eq!(fetched.name, "Calpol 500");
        assert_eq!(fetched.stock.available_quantity, 40);
        assert_eq!(fetched.keywords, vec!["fever", "pain"]);
        assert_eq!(fetched.status, MedicineStatus::Active);
    }

    #[test]
    fn signature_probe_detects_duplicates() {
        let (db, owner_id) = db_with_owner();
        db.create_medicine(&sample_medicine(owner_id, "Calpol 500", 40))
            .unwrap();

        assert!(db
            .medicine_signature_exists(owner_id, "Calpol 500", "Paracetamol", "500mg")
            .unwrap());
        assert!(!db
            .medicine_signature_exists(owner_id, "Calpol 650", "Paracetamol", "500mg")
            .unwrap());
    }

    #[test]
    fn ownership_scoped_lookup() {
        let (db, owner_id) = db_with_owner();
        let other = sample_owner("other@example.com", "9000000002");
        db.create_owner(&other).unwrap();

        let medicine = sample_medicine(owner_id, "Calpol 500", 40);
        db.create_medicine(&medicine).unwrap();

        assert!(db.get_owner_medicine(medicine.id, owner_id).is_ok());
        assert!(matches!(
            db.get_owner_medicine(medicine.id, other.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn visible_lookup_hides_inactive() {
        let (db, owner_id) = db_with_owner();
        let mut medicine = sample_medicine(owner_id, "Hidden", 10);
        medicine.is_visible = false;
        db.create_medicine(&medicine).unwrap();

        assert!(matches!(
            db.get_visible_medicine(medicine.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn search_filters_and_pagination() {
        let (db, owner_id) = db_with_owner();
        for i in 0..15 {
            db.create_medicine(&sample_medicine(owner_id, &format!("Med {i}"), 5))
                .unwrap();
        }
        let mut rx = sample_medicine(owner_id, "Amoxicillin", 5);
        rx.generic_name = "Amoxicillin".to_string();
        rx.therapeutic_class = "Antibiotic".to_string();
        rx.prescription_required = true;
        db.create_medicine(&rx).unwrap();

        let filter = MedicineSearchFilter::default();
        let (page, total) = db.search_medicines(&filter, 10, 0).unwrap();
        assert_eq!(total, 16);
        assert_eq!(page.len(), 10);

        let filter = MedicineSearchFilter {
            prescription_required: Some(true),
            ..Default::default()
        };
        let (page, total) = db.search_medicines(&filter, 10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].name, "Amoxicillin");

        // Keyword text matches through the JSON column.
        let filter = MedicineSearchFilter {
            search: Some("fever".to_string()),
            ..Default::default()
        };
        let (_, total) = db.search_medicines(&filter, 10, 0).unwrap();
        assert_eq!(total, 16);
    }

    #[test]
    fn geo_restriction_with_empty_owner_set_is_empty() {
        let (db, owner_id) = db_with_owner();
        db.create_medicine(&sample_medicine(owner_id, "Calpol 500", 40))
            .unwrap();

        let filter = MedicineSearchFilter {
            owner_ids: Some(Vec::new()),
            ..Default::default()
        };
        let (page, total) = db.search_medicines(&filter, 10, 0).unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn price_range_filter() {
        let (db, owner_id) = db_with_owner();
        let mut cheap = sample_medicine(owner_id, "Cheap", 5);
        cheap.selling_price = 20.0;
        db.create_medicine(&cheap).unwrap();
        let mut dear = sample_medicine(owner_id, "Dear", 5);
        dear.selling_price = 300.0;
        db.create_medicine(&dear).unwrap();

        let filter = MedicineSearchFilter {
            min_price: Some(50.0),
            max_price: Some(400.0),
            ..Default::default()
        };
        let (page, _) = db.search_medicines(&filter, 10, 0).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Dear");
    }

    #[test]
    fn update_leaves_unset_fields() {
        let (db, owner_id) = db_with_owner();
        let medicine = sample_medicine(owner_id, "Calpol 500", 40);
        db.create_medicine(&medicine).unwrap();

        let update = MedicineUpdate {
            selling_price: Some(50.0),
            discount_percentage: Some(50),
            ..Default::default()
        };
        let updated = db.update_medicine(medicine.id, &update).unwrap();
        assert_eq!(updated.selling_price, 50.0);
        assert_eq!(updated.discount_percentage, 50);
        assert_eq!(updated.mrp, 100.0);
        assert_eq!(updated.name, "Calpol 500");
        assert!(!update.touches_stock());
    }

    #[test]
    fn write_stock_replaces_counters_and_batches() {
        let (db, owner_id) = db_with_owner();
        let medicine = sample_medicine(owner_id, "Calpol 500", 5);
        db.create_medicine(&medicine).unwrap();

        let stock = StockLevel {
            total_quantity: 2,
            available_quantity: 0,
            reserved_quantity: 2,
            minimum_stock_level: 10,
        };
        let batches = vec![Batch {
            batch_number: "B42".to_string(),
            manufacturing_date: Utc::now() - Duration::days(30),
            expiry_date: Utc::now() + Duration::days(300),
            quantity: 2,
        }];
        db.write_stock(medicine.id, &stock, MedicineStatus::OutOfStock, Some(&batches))
            .unwrap();

        let fetched = db.get_medicine(medicine.id).unwrap();
        assert_eq!(fetched.stock, stock);
        assert_eq!(fetched.status, MedicineStatus::OutOfStock);
        assert_eq!(fetched.batches.len(), 1);
    }

    #[test]
    fn low_stock_excludes_discontinued() {
        let (db, owner_id) = db_with_owner();
        db.create_medicine(&sample_medicine(owner_id, "Low", 3)).unwrap();
        let mut gone = sample_medicine(owner_id, "Gone", 2);
        gone.status = MedicineStatus::Discontinued;
        db.create_medicine(&gone).unwrap();
        db.create_medicine(&sample_medicine(owner_id, "Plenty", 500))
            .unwrap();

        let low = db.low_stock_medicines(owner_id).unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Low");
    }

    #[test]
    fn expired_scan_checks_batches() {
        let (db, owner_id) = db_with_owner();
        let mut medicine = sample_medicine(owner_id, "Old", 5);
        medicine.batches = vec![Batch {
            batch_number: "B1".to_string(),
            manufacturing_date: Utc::now() - Duration::days(400),
            expiry_date: Utc::now() - Duration::days(10),
            quantity: 5,
        }];
        db.create_medicine(&medicine).unwrap();
        db.create_medicine(&sample_medicine(owner_id, "Fresh", 5))
            .unwrap();

        let expired = db.expired_medicines(owner_id, Utc::now()).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].name, "Old");
    }

    #[test]
    fn delete_respects_ownership() {
        let (db, owner_id) = db_with_owner();
        let other = sample_owner("other@example.com", "9000000002");
        db.create_owner(&other).unwrap();

        let medicine = sample_medicine(owner_id, "Calpol 500", 40);
        db.create_medicine(&medicine).unwrap();

        assert!(!db.delete_owner_medicine(medicine.id, other.id).unwrap());
        assert!(db.delete_owner_medicine(medicine.id, owner_id).unwrap());
    }
}
