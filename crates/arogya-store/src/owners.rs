//! CRUD operations and queries for [`StoreOwner`] records.

use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

use arogya_shared::geo::{haversine_meters, BoundingBox};
use arogya_shared::AccountStatus;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{ShopAddress, ShopDetails, StoreOwner};
use crate::row::{enum_col, json_col, opt_ts_col, ts_col, uuid_col};
use crate::users::{map_unique, not_found};

/// Select list shared by every owner query; keep in sync with
/// [`row_to_owner`].
const OWNER_COLUMNS: &str = "id, owner_name, email, password_hash, phone, alternate_phone, \
     shop_name, street, city, state, pincode, landmark, latitude, longitude, \
     license_number, gst_number, open_time, close_time, working_days, \
     is_active, is_verified, verification_date, delivery_available, \
     delivery_radius_km, account_status, created_at, updated_at";

/// Profile fields an owner may change. `None` leaves the stored value
/// untouched. Email, password, and account status are deliberately not
/// representable here.
#[derive(Debug, Default, Clone)]
pub struct OwnerProfileUpdate {
    pub owner_name: Option<String>,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub shop_name: Option<String>,
    pub address: Option<ShopAddress>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub working_days: Option<Vec<String>>,
    pub delivery_available: Option<bool>,
    pub delivery_radius_km: Option<f64>,
}

/// Admin listing filter.
#[derive(Debug, Default, Clone)]
pub struct OwnerListFilter {
    pub status: Option<AccountStatus>,
    pub city: Option<String>,
    pub verified: Option<bool>,
}

/// A store matched by the proximity query, with its distance from the
/// search point.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyOwner {
    #[serde(flatten)]
    pub owner: StoreOwner,
    pub distance_meters: f64,
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new store owner. Duplicate email/phone/license/GST maps
    /// to [`StoreError::Conflict`].
    pub fn create_owner(&self, owner: &StoreOwner) -> Result<()> {
        let d = &owner.shop_details;
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO store_owners ({OWNER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                             ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)"
                ),
                params![
                    owner.id.to_string(),
                    owner.owner_name,
                    owner.email,
                    owner.password_hash,
                    owner.phone,
                    owner.alternate_phone,
                    d.shop_name,
                    d.address.street,
                    d.address.city,
                    d.address.state,
                    d.address.pincode,
                    d.address.landmark,
                    d.latitude,
                    d.longitude,
                    d.license_number,
                    d.gst_number,
                    d.open_time,
                    d.close_time,
                    serde_json::to_string(&d.working_days)?,
                    d.is_active,
                    d.is_verified,
                    d.verification_date.map(|t| t.to_rfc3339()),
                    d.delivery_available,
                    d.delivery_radius_km,
                    owner.account_status.as_str(),
                    owner.created_at.to_rfc3339(),
                    owner.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| {
                map_unique(
                    e,
                    "Owner already exists with this email, phone, license number, or GST number",
                )
            })?;
        Ok(())
    }

    /// True when any owner already uses one of the given unique keys.
    pub fn owner_conflict_exists(
        &self,
        email: &str,
        phone: &str,
        license_number: &str,
        gst_number: &str,
    ) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM store_owners
             WHERE email = ?1 OR phone = ?2 OR license_number = ?3 OR gst_number = ?4",
            params![email, phone, license_number, gst_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single owner by UUID.
    pub fn get_owner(&self, id: Uuid) -> Result<StoreOwner> {
        self.conn()
            .query_row(
                &format!("SELECT {OWNER_COLUMNS} FROM store_owners WHERE id = ?1"),
                params![id.to_string()],
                row_to_owner,
            )
            .map_err(not_found)
    }

    /// Look an owner up by email (login path). Returns `None` when absent.
    pub fn find_owner_by_email(&self, email: &str) -> Result<Option<StoreOwner>> {
        match self.conn().query_row(
            &format!("SELECT {OWNER_COLUMNS} FROM store_owners WHERE email = ?1"),
            params![email],
            row_to_owner,
        ) {
            Ok(owner) => Ok(Some(owner)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Admin listing with filters, newest first, plus the unpaginated
    /// total for the pagination envelope.
    pub fn list_owners(
        &self,
        filter: &OwnerListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<StoreOwner>, i64)> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut bind: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("account_status = ?");
            bind.push(Box::new(status.as_str().to_string()));
        }
        if let Some(city) = &filter.city {
            conditions.push("city LIKE ?");
            bind.push(Box::new(format!("%{city}%")));
        }
        if let Some(verified) = filter.verified {
            conditions.push("is_verified = ?");
            bind.push(Box::new(verified));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM store_owners {where_clause}"),
            rusqlite::params_from_iter(bind.iter().map(|b| b.as_ref())),
            |row| row.get(0),
        )?;

        bind.push(Box::new(limit));
        bind.push(Box::new(offset));

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {OWNER_COLUMNS} FROM store_owners {where_clause}
             ORDER BY created_at DESC
             LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(bind.iter().map(|b| b.as_ref())),
            row_to_owner,
        )?;

        let mut owners = Vec::new();
        for row in rows {
            owners.push(row?);
        }
        Ok((owners, total))
    }

    /// Active, customer-visible stores within `radius_meters` of a
    /// point, nearest first.
    ///
    /// A latitude/longitude bounding box prefilters candidates in SQL;
    /// the exact haversine distance confirms each hit.
    pub fn owners_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> Result<Vec<NearbyOwner>> {
        let bbox = BoundingBox::around(latitude, longitude, radius_meters);

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {OWNER_COLUMNS} FROM store_owners
             WHERE account_status = 'active' AND is_active = 1
               AND latitude  BETWEEN ?1 AND ?2
               AND longitude BETWEEN ?3 AND ?4"
        ))?;
        let rows = stmt.query_map(
            params![bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon],
            row_to_owner,
        )?;

        let mut nearby = Vec::new();
        for row in rows {
            let owner = row?;
            let distance = haversine_meters(
                latitude,
                longitude,
                owner.shop_details.latitude,
                owner.shop_details.longitude,
            );
            if distance <= radius_meters {
                nearby.push(NearbyOwner {
                    owner,
                    distance_meters: distance,
                });
            }
        }
        nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        Ok(nearby)
    }

    /// Ids of the stores [`Database::owners_near`] would return; used to
    /// restrict medicine search to nearby shops.
    pub fn owner_ids_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> Result<Vec<Uuid>> {
        Ok(self
            .owners_near(latitude, longitude, radius_meters)?
            .into_iter()
            .map(|n| n.owner.id)
            .collect())
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a profile update; returns the fresh record.
    pub fn update_owner_profile(&self, id: Uuid, update: &OwnerProfileUpdate) -> Result<StoreOwner> {
        let (street, city, state, pincode, landmark) = match &update.address {
            Some(a) => (
                Some(a.street.clone()),
                Some(a.city.clone()),
                Some(a.state.clone()),
                Some(a.pincode.clone()),
                a.landmark.clone(),
            ),
            None => (None, None, None, None, None),
        };
        let working_days = update
            .working_days
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let affected = self.conn().execute(
            "UPDATE store_owners SET
                 owner_name         = COALESCE(?2, owner_name),
                 phone              = COALESCE(?3, phone),
                 alternate_phone    = COALESCE(?4, alternate_phone),
                 shop_name          = COALESCE(?5, shop_name),
                 street             = COALESCE(?6, street),
                 city               = COALESCE(?7, city),
                 state              = COALESCE(?8, state),
                 pincode            = COALESCE(?9, pincode),
                 landmark           = COALESCE(?10, landmark),
                 latitude           = COALESCE(?11, latitude),
                 longitude          = COALESCE(?12, longitude),
                 open_time          = COALESCE(?13, open_time),
                 close_time         = COALESCE(?14, close_time),
                 working_days       = COALESCE(?15, working_days),
                 delivery_available = COALESCE(?16, delivery_available),
                 delivery_radius_km = COALESCE(?17, delivery_radius_km),
                 updated_at         = ?18
             WHERE id = ?1",
            params![
                id.to_string(),
                update.owner_name,
                update.phone,
                update.alternate_phone,
                update.shop_name,
                street,
                city,
                state,
                pincode,
                landmark,
                update.latitude,
                update.longitude,
                update.open_time,
                update.close_time,
                working_days,
                update.delivery_available,
                update.delivery_radius_km,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_owner(id)
    }

    /// Admin transition of the account status. Moving to `active`
    /// stamps the verification date.
    pub fn set_account_status(&self, id: Uuid, status: AccountStatus) -> Result<StoreOwner> {
        let now = Utc::now().to_rfc3339();
        let verification_date = (status == AccountStatus::Active).then(|| now.clone());

        let affected = self.conn().execute(
            "UPDATE store_owners SET
                 account_status    = ?2,
                 is_verified       = CASE WHEN ?3 IS NOT NULL THEN 1 ELSE is_verified END,
                 verification_date = COALESCE(?3, verification_date),
                 updated_at        = ?4
             WHERE id = ?1",
            params![id.to_string(), status.as_str(), verification_date, now],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_owner(id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`StoreOwner`].
fn row_to_owner(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoreOwner> {
    Ok(StoreOwner {
        id: uuid_col(row, 0)?,
        owner_name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        phone: row.get(4)?,
        alternate_phone: row.get(5)?,
        shop_details: ShopDetails {
            shop_name: row.get(6)?,
            address: ShopAddress {
                street: row.get(7)?,
                city: row.get(8)?,
                state: row.get(9)?,
                pincode: row.get(10)?,
                landmark: row.get(11)?,
            },
            latitude: row.get(12)?,
            longitude: row.get(13)?,
            license_number: row.get(14)?,
            gst_number: row.get(15)?,
            open_time: row.get(16)?,
            close_time: row.get(17)?,
            working_days: json_col(row, 18)?,
            is_active: row.get(19)?,
            is_verified: row.get(20)?,
            verification_date: opt_ts_col(row, 21)?,
            delivery_available: row.get(22)?,
            delivery_radius_km: row.get(23)?,
        },
        account_status: enum_col(row, 24)?,
        created_at: ts_col(row, 25)?,
        updated_at: ts_col(row, 26)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    /// A minimal valid owner for store tests; other modules reuse it.
    pub(crate) fn sample_owner(email: &str, phone: &str) -> StoreOwner {
        StoreOwner {
            id: Uuid::new_v4(),
            owner_name: "Ravi Kumar".to_string(),
            email: email.to_string(),
            password_hash: "$2b$12$hash".to_string(),
            phone: phone.to_string(),
            alternate_phone: None,
            shop_details: ShopDetails {
                shop_name: "Sri Sai Medicals".to_string(),
                address: ShopAddress {
                    street: "12 MG Road".to_string(),
                    city: "Bengaluru".to_string(),
                    state: "Karnataka".to_string(),
                    pincode: "560001".to_string(),
                    landmark: None,
                },
                latitude: 12.9716,
                longitude: 77.5946,
                license_number: format!("KA-{phone}"),
                gst_number: format!("29GST{phone}"),
                open_time: "09:00".to_string(),
                close_time: "21:00".to_string(),
                working_days: vec!["Monday".to_string(), "Tuesday".to_string()],
                is_active: true,
                is_verified: false,
                verification_date: None,
                delivery_available: true,
                delivery_radius_km: 5.0,
            },
            account_status: AccountStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let owner = sample_owner("ravi@example.com", "9000000001");
        db.create_owner(&owner).unwrap();

        let fetched = db.get_owner(owner.id).unwrap();
        assert_eq!(fetched.shop_details.shop_name, "Sri Sai Medicals");
        assert_eq!(fetched.shop_details.working_days.len(), 2);
        assert_eq!(fetched.account_status, AccountStatus::Active);
    }

    #[test]
    fn duplicate_license_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_owner(&sample_owner("a@example.com", "9000000001"))
            .unwrap();

        let mut dup = sample_owner("b@example.com", "9000000002");
        dup.shop_details.license_number = "KA-9000000001".to_string();
        let err = db.create_owner(&dup).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn conflict_probe_matches_any_unique_key() {
        let db = Database::open_in_memory().unwrap();
        db.create_owner(&sample_owner("a@example.com", "9000000001"))
            .unwrap();

        assert!(db
            .owner_conflict_exists("a@example.com", "x", "x", "x")
            .unwrap());
        assert!(db
            .owner_conflict_exists("x", "9000000001", "x", "x")
            .unwrap());
        assert!(!db.owner_conflict_exists("x", "x", "x", "x").unwrap());
    }

    #[test]
    fn list_filters_by_status_and_city() {
        let db = Database::open_in_memory().unwrap();
        let mut pending = sample_owner("p@example.com", "9000000001");
        pending.account_status = AccountStatus::Pending;
        db.create_owner(&pending).unwrap();
        db.create_owner(&sample_owner("a@example.com", "9000000002"))
            .unwrap();

        let filter = OwnerListFilter {
            status: Some(AccountStatus::Pending),
            ..Default::default()
        };
        let (owners, total) = db.list_owners(&filter, 10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(owners[0].email, "p@example.com");

        let filter = OwnerListFilter {
            city: Some("bengal".to_string()),
            ..Default::default()
        };
        // LIKE is case-insensitive for ASCII in SQLite.
        let (_, total) = db.list_owners(&filter, 10, 0).unwrap();
        assert_eq!(total, 2);
    }

    #[test]
    fn nearby_excludes_far_and_inactive_stores() {
        let db = Database::open_in_memory().unwrap();

        let near = sample_owner("near@example.com", "9000000001");
        db.create_owner(&near).unwrap();

        // ~570 km away (Hyderabad).
        let mut far = sample_owner("far@example.com", "9000000002");
        far.shop_details.latitude = 17.3850;
        far.shop_details.longitude = 78.4867;
        db.create_owner(&far).unwrap();

        let mut suspended = sample_owner("s@example.com", "9000000003");
        suspended.account_status = AccountStatus::Suspended;
        db.create_owner(&suspended).unwrap();

        let hits = db.owners_near(12.9716, 77.5946, 10_000.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].owner.email, "near@example.com");
        assert!(hits[0].distance_meters < 1.0);
    }

    #[test]
    fn profile_update_leaves_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        let owner = sample_owner("u@example.com", "9000000001");
        db.create_owner(&owner).unwrap();

        let update = OwnerProfileUpdate {
            shop_name: Some("New Name Pharmacy".to_string()),
            ..Default::default()
        };
        let updated = db.update_owner_profile(owner.id, &update).unwrap();
        assert_eq!(updated.shop_details.shop_name, "New Name Pharmacy");
        assert_eq!(updated.email, owner.email);
        assert_eq!(updated.shop_details.license_number, owner.shop_details.license_number);
    }

    #[test]
    fn activation_stamps_verification_date() {
        let db = Database::open_in_memory().unwrap();
        let mut owner = sample_owner("v@example.com", "9000000001");
        owner.account_status = AccountStatus::Pending;
        db.create_owner(&owner).unwrap();

        let updated = db
            .set_account_status(owner.id, AccountStatus::Active)
            .unwrap();
        assert_eq!(updated.account_status, AccountStatus::Active);
        assert!(updated.shop_details.is_verified);
        assert!(updated.shop_details.verification_date.is_some());

        let suspended = db
            .set_account_status(owner.id, AccountStatus::Suspended)
            .unwrap();
        assert_eq!(suspended.account_status, AccountStatus::Suspended);
        // Suspension must not clear the original verification stamp.
        assert!(suspended.shop_details.verification_date.is_some());
    }
}
