//! Inventory rollup: keeps each shop's denormalized summary consistent
//! with its medicine detail records.
//!
//! The five counters are recomputed with a single aggregation over the
//! owner's medicines and written back in one row update
//! (last-writer-wins; a later recompute always supersedes an earlier
//! one). Callers treat a failure here as non-fatal: the triggering
//! write has already committed, so the summary is allowed to go stale
//! until the next recompute.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::InventorySummary;

impl Database {
    /// Recompute the five inventory counters for an owner's shop.
    ///
    /// Missing shop row is a logged no-op; an owner with zero medicines
    /// gets all-zero counters.
    pub fn recompute_inventory(&self, owner_id: Uuid) -> Result<InventorySummary> {
        let summary = self.aggregate_inventory(owner_id)?;

        let affected = self.conn().execute(
            "UPDATE shops SET
                 total_medicines        = ?2,
                 active_medicines       = ?3,
                 out_of_stock_medicines = ?4,
                 low_stock_medicines    = ?5,
                 total_inventory_value  = ?6,
                 updated_at             = ?7
             WHERE owner_id = ?1",
            params![
                owner_id.to_string(),
                summary.total_medicines,
                summary.active_medicines,
                summary.out_of_stock_medicines,
                summary.low_stock_medicines,
                summary.total_inventory_value,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if affected == 0 {
            tracing::warn!(owner_id = %owner_id, "inventory rollup skipped: no shop record");
        }

        Ok(summary)
    }

    /// The aggregation itself, without the write-back.
    fn aggregate_inventory(&self, owner_id: Uuid) -> Result<InventorySummary> {
        let summary = self.conn().query_row(
            "SELECT
                 COUNT(*),
                 COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0),
                 COALESCE(SUM(CASE WHEN status = 'out_of_stock' THEN 1 ELSE 0 END), 0),
                 COALESCE(SUM(CASE WHEN available_quantity <= minimum_stock_level
                                    AND status != 'discontinued' THEN 1 ELSE 0 END), 0),
                 COALESCE(SUM(available_quantity * selling_price), 0)
             FROM medicines
             WHERE owner_id = ?1",
            params![owner_id.to_string()],
            |row| {
                Ok(InventorySummary {
                    total_medicines: row.get(0)?,
                    active_medicines: row.get(1)?,
                    out_of_stock_medicines: row.get(2)?,
                    low_stock_medicines: row.get(3)?,
                    total_inventory_value: row.get(4)?,
                })
            },
        )?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medicines::tests::sample_medicine;
    use crate::owners::tests::sample_owner;
    use crate::shops::tests::sample_shop;
    use arogya_shared::MedicineStatus;

    fn db_with_shop() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let owner = sample_owner("rollup@example.com", "9000000001");
        db.create_owner(&owner).unwrap();
        db.create_shop(&sample_shop(owner.id)).unwrap();
        (db, owner.id)
    }

    #[test]
    fn zero_medicines_yields_all_zero_counters() {
        let (db, owner_id) = db_with_shop();

        let summary = db.recompute_inventory(owner_id).unwrap();
        assert_eq!(summary, InventorySummary::default());

        let shop = db.get_shop_by_owner(owner_id).unwrap();
        assert_eq!(shop.inventory, InventorySummary::default());
    }

    #[test]
    fn counters_reflect_catalog_state() {
        let (db, owner_id) = db_with_shop();

        // 40 available at 80 each.
        db.create_medicine(&sample_medicine(owner_id, "Active", 40))
            .unwrap();
        // Out of stock contributes nothing to value.
        db.create_medicine(&sample_medicine(owner_id, "Empty", 0))
            .unwrap();
        // Low stock: 5 <= 10.
        db.create_medicine(&sample_medicine(owner_id, "Low", 5)).unwrap();
        // Discontinued low stock must not count as low.
        let mut gone = sample_medicine(owner_id, "Gone", 2);
        gone.status = MedicineStatus::Discontinued;
        db.create_medicine(&gone).unwrap();

        let summary = db.recompute_inventory(owner_id).unwrap();
        assert_eq!(summary.total_medicines, 4);
        assert_eq!(summary.active_medicines, 2);
        assert_eq!(summary.out_of_stock_medicines, 1);
        // "Empty" (0 <= 10) and "Low" count; "Gone" is discontinued.
        assert_eq!(summary.low_stock_medicines, 2);
        // 40*80 + 5*80 + 2*80 = 3760.
        assert_eq!(summary.total_inventory_value, 3760.0);
    }

    #[test]
    fn missing_shop_is_a_logged_noop() {
        let db = Database::open_in_memory().unwrap();
        let owner = sample_owner("noshop@example.com", "9000000001");
        db.create_owner(&owner).unwrap();

        // No shop row: the recompute must still succeed.
        let summary = db.recompute_inventory(owner.id).unwrap();
        assert_eq!(summary, InventorySummary::default());
    }

    #[test]
    fn later_recompute_supersedes() {
        let (db, owner_id) = db_with_shop();
        let medicine = sample_medicine(owner_id, "Calpol 500", 40);
        db.create_medicine(&medicine).unwrap();
        db.recompute_inventory(owner_id).unwrap();

        db.delete_owner_medicine(medicine.id, owner_id).unwrap();
        db.recompute_inventory(owner_id).unwrap();

        let shop = db.get_shop_by_owner(owner_id).unwrap();
        assert_eq!(shop.inventory.total_medicines, 0);
    }
}
