//! CRUD operations for [`Shop`] records and their children
//! (announcements, holidays, certifications).
//!
//! Every mutation refreshes the shop's `last_active_at` stamp.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use arogya_shared::OperationalStatus;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Announcement, Certification, Holiday, InventorySummary, Shop, ShopServices};
use crate::row::{enum_col, json_col, opt_ts_col, ts_col, uuid_col};
use crate::users::not_found;

/// Select list shared by every shop query; keep in sync with
/// [`row_to_shop`].
const SHOP_COLUMNS: &str = "id, owner_id, operational_status, status_message, \
     total_medicines, active_medicines, out_of_stock_medicines, low_stock_medicines, \
     total_inventory_value, home_delivery_available, home_delivery_charges, \
     free_delivery_above, estimated_delivery_time, online_payment, cash_on_delivery, \
     prescription_upload, emergency_service, tags, last_active_at, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Shop
    // ------------------------------------------------------------------

    /// Insert the shop record paired with a freshly registered owner.
    pub fn create_shop(&self, shop: &Shop) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO shops ({SHOP_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         ?15, ?16, ?17, ?18, ?19, ?20, ?21)"
            ),
            params![
                shop.id.to_string(),
                shop.owner_id.to_string(),
                shop.operational_status.as_str(),
                shop.status_message,
                shop.inventory.total_medicines,
                shop.inventory.active_medicines,
                shop.inventory.out_of_stock_medicines,
                shop.inventory.low_stock_medicines,
                shop.inventory.total_inventory_value,
                shop.services.home_delivery_available,
                shop.services.home_delivery_charges,
                shop.services.free_delivery_above,
                shop.services.estimated_delivery_time,
                shop.services.online_payment,
                shop.services.cash_on_delivery,
                shop.services.prescription_upload,
                shop.services.emergency_service,
                serde_json::to_string(&shop.tags)?,
                shop.last_active_at.to_rfc3339(),
                shop.created_at.to_rfc3339(),
                shop.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch the shop belonging to an owner.
    pub fn get_shop_by_owner(&self, owner_id: Uuid) -> Result<Shop> {
        self.conn()
            .query_row(
                &format!("SELECT {SHOP_COLUMNS} FROM shops WHERE owner_id = ?1"),
                params![owner_id.to_string()],
                row_to_shop,
            )
            .map_err(not_found)
    }

    /// Update the operational status and/or status message.
    pub fn update_shop_status(
        &self,
        owner_id: Uuid,
        operational_status: Option<OperationalStatus>,
        status_message: Option<&str>,
    ) -> Result<Shop> {
        let now = Utc::now().to_rfc3339();
        let affected = self.conn().execute(
            "UPDATE shops SET
                 operational_status = COALESCE(?2, operational_status),
                 status_message     = COALESCE(?3, status_message),
                 last_active_at     = ?4,
                 updated_at         = ?4
             WHERE owner_id = ?1",
            params![
                owner_id.to_string(),
                operational_status.map(|s| s.as_str().to_string()),
                status_message,
                now,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_shop_by_owner(owner_id)
    }

    /// Replace the service options wholesale.
    pub fn update_shop_services(&self, owner_id: Uuid, services: &ShopServices) -> Result<Shop> {
        let now = Utc::now().to_rfc3339();
        let affected = self.conn().execute(
            "UPDATE shops SET
                 home_delivery_available = ?2,
                 home_delivery_charges   = ?3,
                 free_delivery_above     = ?4,
                 estimated_delivery_time = ?5,
                 online_payment          = ?6,
                 cash_on_delivery        = ?7,
                 prescription_upload     = ?8,
                 emergency_service       = ?9,
                 last_active_at          = ?10,
                 updated_at              = ?10
             WHERE owner_id = ?1",
            params![
                owner_id.to_string(),
                services.home_delivery_available,
                services.home_delivery_charges,
                services.free_delivery_above,
                services.estimated_delivery_time,
                services.online_payment,
                services.cash_on_delivery,
                services.prescription_upload,
                services.emergency_service,
                now,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_shop_by_owner(owner_id)
    }

    /// Replace the tag list wholesale.
    pub fn update_shop_tags(&self, owner_id: Uuid, tags: &[String]) -> Result<Shop> {
        let now = Utc::now().to_rfc3339();
        let affected = self.conn().execute(
            "UPDATE shops SET tags = ?2, last_active_at = ?3, updated_at = ?3
             WHERE owner_id = ?1",
            params![owner_id.to_string(), serde_json::to_string(tags)?, now],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_shop_by_owner(owner_id)
    }

    // ------------------------------------------------------------------
    // Announcements
    // ------------------------------------------------------------------

    /// Insert a new announcement.
    pub fn add_announcement(&self, announcement: &Announcement) -> Result<()> {
        self.conn().execute(
            "INSERT INTO announcements
                 (id, shop_id, title, message, kind, is_active, start_date, end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                announcement.id.to_string(),
                announcement.shop_id.to_string(),
                announcement.title,
                announcement.message,
                announcement.kind.as_str(),
                announcement.is_active,
                announcement.start_date.to_rfc3339(),
                announcement.end_date.map(|t| t.to_rfc3339()),
                announcement.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Announcements that are active and whose end date (if any) has
    /// not passed, newest first.
    pub fn active_announcements(
        &self,
        shop_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Announcement>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, shop_id, title, message, kind, is_active, start_date, end_date, created_at
             FROM announcements
             WHERE shop_id = ?1 AND is_active = 1
               AND (end_date IS NULL OR end_date > ?2)
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(
            params![shop_id.to_string(), now.to_rfc3339()],
            row_to_announcement,
        )?;

        let mut announcements = Vec::new();
        for row in rows {
            announcements.push(row?);
        }
        Ok(announcements)
    }

    /// Flip an announcement's active flag; returns the fresh record.
    pub fn set_announcement_active(
        &self,
        shop_id: Uuid,
        announcement_id: Uuid,
        is_active: bool,
    ) -> Result<Announcement> {
        let affected = self.conn().execute(
            "UPDATE announcements SET is_active = ?3 WHERE id = ?1 AND shop_id = ?2",
            params![
                announcement_id.to_string(),
                shop_id.to_string(),
                is_active
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.conn()
            .query_row(
                "SELECT id, shop_id, title, message, kind, is_active, start_date, end_date, created_at
                 FROM announcements WHERE id = ?1",
                params![announcement_id.to_string()],
                row_to_announcement,
            )
            .map_err(not_found)
    }

    // ------------------------------------------------------------------
    // Holidays
    // ------------------------------------------------------------------

    /// Insert a scheduled closure day.
    pub fn add_holiday(&self, holiday: &Holiday) -> Result<()> {
        self.conn().execute(
            "INSERT INTO holidays (id, shop_id, date, reason, is_recurring)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                holiday.id.to_string(),
                holiday.shop_id.to_string(),
                holiday.date.to_rfc3339(),
                holiday.reason,
                holiday.is_recurring,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Certifications
    // ------------------------------------------------------------------

    /// Insert a certification record.
    pub fn add_certification(&self, certification: &Certification) -> Result<()> {
        self.conn().execute(
            "INSERT INTO certifications
                 (id, shop_id, name, issued_by, issued_date, expiry_date,
                  certificate_number, document_url, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                certification.id.to_string(),
                certification.shop_id.to_string(),
                certification.name,
                certification.issued_by,
                certification.issued_date.to_rfc3339(),
                certification.expiry_date.map(|t| t.to_rfc3339()),
                certification.certificate_number,
                certification.document_url,
                certification.is_active,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    /// Counts shown on the statistics endpoint: certifications held,
    /// announcements currently active, holidays still ahead.
    pub fn shop_counts(&self, shop_id: Uuid, now: DateTime<Utc>) -> Result<(i64, i64, i64)> {
        let shop = shop_id.to_string();
        let certifications: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM certifications WHERE shop_id = ?1",
            params![shop],
            |row| row.get(0),
        )?;
        let announcements: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM announcements WHERE shop_id = ?1 AND is_active = 1",
            params![shop],
            |row| row.get(0),
        )?;
        let upcoming_holidays: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM holidays WHERE shop_id = ?1 AND date > ?2",
            params![shop, now.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok((certifications, announcements, upcoming_holidays))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Shop`].
fn row_to_shop(row: &rusqlite::Row<'_>) -> rusqlite::Result<Shop> {
    Ok(Shop {
        id: uuid_col(row, 0)?,
        owner_id: uuid_col(row, 1)?,
        operational_status: enum_col(row, 2)?,
        status_message: row.get(3)?,
        inventory: InventorySummary {
            total_medicines: row.get(4)?,
            active_medicines: row.get(5)?,
            out_of_stock_medicines: row.get(6)?,
            low_stock_medicines: row.get(7)?,
            total_inventory_value: row.get(8)?,
        },
        services: ShopServices {
            home_delivery_available: row.get(9)?,
            home_delivery_charges: row.get(10)?,
            free_delivery_above: row.get(11)?,
            estimated_delivery_time: row.get(12)?,
            online_payment: row.get(13)?,
            cash_on_delivery: row.get(14)?,
            prescription_upload: row.get(15)?,
            emergency_service: row.get(16)?,
        },
        tags: json_col(row, 17)?,
        last_active_at: ts_col(row, 18)?,
        created_at: ts_col(row, 19)?,
        updated_at: ts_col(row, 20)?,
    })
}

/// Map a `rusqlite::Row` to an [`Announcement`].
fn row_to_announcement(row: &rusqlite::Row<'_>) -> rusqlite::Result<Announcement> {
    Ok(Announcement {
        id: uuid_col(row, 0)?,
        shop_id: uuid_col(row, 1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: enum_col(row, 4)?,
        is_active: row.get(5)?,
        start_date: ts_col(row, 6)?,
        end_date: opt_ts_col(row, 7)?,
        created_at: ts_col(row, 8)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::owners::tests::sample_owner;
    use arogya_shared::AnnouncementKind;
    use chrono::Duration;

    /// A fresh shop for a newly created owner; other modules reuse it.
    pub(crate) fn sample_shop(owner_id: Uuid) -> Shop {
        Shop {
            id: Uuid::new_v4(),
            owner_id,
            operational_status: OperationalStatus::Closed,
            status_message: None,
            inventory: InventorySummary::default(),
            services: ShopServices::default(),
            tags: Vec::new(),
            last_active_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn db_with_shop() -> (Database, Uuid, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let owner = sample_owner("shop@example.com", "9000000001");
        db.create_owner(&owner).unwrap();
        let shop = sample_shop(owner.id);
        db.create_shop(&shop).unwrap();
        (db, owner.id, shop.id)
    }

    #[test]
    fn create_and_fetch_by_owner() {
        let (db, owner_id, shop_id) = db_with_shop();
        let shop = db.get_shop_by_owner(owner_id).unwrap();
        assert_eq!(shop.id, shop_id);
        assert_eq!(shop.operational_status, OperationalStatus::Closed);
        assert_eq!(shop.inventory, InventorySummary::default());
    }

    #[test]
    fn status_update_keeps_message_when_unset() {
        let (db, owner_id, _) = db_with_shop();
        db.update_shop_status(owner_id, None, Some("Back at 5pm"))
            .unwrap();
        let shop = db
            .update_shop_status(owner_id, Some(OperationalStatus::Open), None)
            .unwrap();
        assert_eq!(shop.operational_status, OperationalStatus::Open);
        assert_eq!(shop.status_message.as_deref(), Some("Back at 5pm"));
    }

    #[test]
    fn services_replaced_wholesale() {
        let (db, owner_id, _) = db_with_shop();
        let services = ShopServices {
            home_delivery_available: true,
            home_delivery_charges: 40.0,
            ..Default::default()
        };
        let shop = db.update_shop_services(owner_id, &services).unwrap();
        assert!(shop.services.home_delivery_available);
        assert_eq!(shop.services.home_delivery_charges, 40.0);
    }

    #[test]
    fn tags_round_trip() {
        let (db, owner_id, _) = db_with_shop();
        let tags = vec!["24x7".to_string(), "home_delivery".to_string()];
        let shop = db.update_shop_tags(owner_id, &tags).unwrap();
        assert_eq!(shop.tags, tags);
    }

    #[test]
    fn active_announcements_exclude_disabled_and_ended() {
        let (db, _, shop_id) = db_with_shop();

        let current = Announcement {
            id: Uuid::new_v4(),
            shop_id,
            title: "Diwali discount".to_string(),
            message: "10% off".to_string(),
            kind: AnnouncementKind::Promotion,
            is_active: true,
            start_date: Utc::now(),
            end_date: Some(Utc::now() + Duration::days(7)),
            created_at: Utc::now(),
        };
        db.add_announcement(&current).unwrap();

        let ended = Announcement {
            id: Uuid::new_v4(),
            end_date: Some(Utc::now() - Duration::days(1)),
            ..current.clone()
        };
        db.add_announcement(&ended).unwrap();

        let disabled = Announcement {
            id: Uuid::new_v4(),
            is_active: false,
            end_date: None,
            ..current.clone()
        };
        db.add_announcement(&disabled).unwrap();

        let active = db.active_announcements(shop_id, Utc::now()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, current.id);

        // Re-enabling brings the announcement back.
        db.set_announcement_active(shop_id, disabled.id, true).unwrap();
        assert_eq!(db.active_announcements(shop_id, Utc::now()).unwrap().len(), 2);
    }

    #[test]
    fn counts_for_statistics() {
        let (db, _, shop_id) = db_with_shop();

        db.add_certification(&Certification {
            id: Uuid::new_v4(),
            shop_id,
            name: "Drug License".to_string(),
            issued_by: "State FDA".to_string(),
            issued_date: Utc::now() - Duration::days(100),
            expiry_date: None,
            certificate_number: "DL-1234".to_string(),
            document_url: None,
            is_active: true,
        })
        .unwrap();

        db.add_holiday(&Holiday {
            id: Uuid::new_v4(),
            shop_id,
            date: Utc::now() + Duration::days(3),
            reason: "Inventory audit".to_string(),
            is_recurring: false,
        })
        .unwrap();
        db.add_holiday(&Holiday {
            id: Uuid::new_v4(),
            shop_id,
            date: Utc::now() - Duration::days(3),
            reason: "Past holiday".to_string(),
            is_recurring: false,
        })
        .unwrap();

        let (certifications, announcements, upcoming) =
            db.shop_counts(shop_id, Utc::now()).unwrap();
        assert_eq!(certifications, 1);
        assert_eq!(announcements, 0);
        assert_eq!(upcoming, 1);
    }
}
