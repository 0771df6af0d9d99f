//! v001 -- Initial schema creation.
//!
//! Creates the core tables: `users`, `store_owners`, `medicines`,
//! `shops`, and the per-shop child tables `announcements`, `holidays`,
//! and `certifications`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- End users (customers searching for stores and medicines)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    phone         TEXT NOT NULL,
    created_at    TEXT NOT NULL,              -- ISO-8601 / RFC-3339
    updated_at    TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Store owners (one row per registered medical store)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS store_owners (
    id                 TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    owner_name         TEXT NOT NULL,
    email              TEXT NOT NULL UNIQUE,
    password_hash      TEXT NOT NULL,
    phone              TEXT NOT NULL UNIQUE,
    alternate_phone    TEXT,

    shop_name          TEXT NOT NULL,
    street             TEXT NOT NULL,
    city               TEXT NOT NULL,
    state              TEXT NOT NULL,
    pincode            TEXT NOT NULL,
    landmark           TEXT,
    latitude           REAL NOT NULL,
    longitude          REAL NOT NULL,
    license_number     TEXT NOT NULL UNIQUE,
    gst_number         TEXT NOT NULL UNIQUE,
    open_time          TEXT NOT NULL,
    close_time         TEXT NOT NULL,
    working_days       TEXT NOT NULL DEFAULT '[]', -- JSON array of day names
    is_active          INTEGER NOT NULL DEFAULT 1, -- boolean 0/1
    is_verified        INTEGER NOT NULL DEFAULT 0,
    verification_date  TEXT,
    delivery_available INTEGER NOT NULL DEFAULT 0,
    delivery_radius_km REAL NOT NULL DEFAULT 0,

    account_status     TEXT NOT NULL DEFAULT 'pending',
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_owners_city     ON store_owners(city);
CREATE INDEX IF NOT EXISTS idx_owners_status   ON store_owners(account_status);
CREATE INDEX IF NOT EXISTS idx_owners_location ON store_owners(latitude, longitude);

-- ----------------------------------------------------------------
-- Medicines (detail records; owner is immutable after creation)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS medicines (
    id                    TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    owner_id              TEXT NOT NULL,              -- FK -> store_owners(id)
    name                  TEXT NOT NULL,
    generic_name          TEXT NOT NULL,
    brand_name            TEXT,
    manufacturer          TEXT NOT NULL,
    category              TEXT NOT NULL,
    therapeutic_class     TEXT NOT NULL,
    composition           TEXT NOT NULL,
    strength              TEXT NOT NULL,
    dosage_form           TEXT NOT NULL,

    mrp                   REAL NOT NULL DEFAULT 0,
    selling_price         REAL NOT NULL DEFAULT 0,
    discount_percentage   INTEGER NOT NULL DEFAULT 0,

    total_quantity        INTEGER NOT NULL DEFAULT 0,
    available_quantity    INTEGER NOT NULL DEFAULT 0,
    reserved_quantity     INTEGER NOT NULL DEFAULT 0,
    minimum_stock_level   INTEGER NOT NULL DEFAULT 10,
    unit                  TEXT NOT NULL,
    batches               TEXT NOT NULL DEFAULT '[]', -- JSON array of batch records

    prescription_required INTEGER NOT NULL DEFAULT 0,
    schedule_type         TEXT NOT NULL DEFAULT 'OTC',
    status                TEXT NOT NULL DEFAULT 'active',
    description           TEXT,
    keywords              TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
    total_sold            INTEGER NOT NULL DEFAULT 0,
    is_visible            INTEGER NOT NULL DEFAULT 1,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES store_owners(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_medicines_owner    ON medicines(owner_id);
CREATE INDEX IF NOT EXISTS idx_medicines_status   ON medicines(status);
CREATE INDEX IF NOT EXISTS idx_medicines_category ON medicines(category);
CREATE INDEX IF NOT EXISTS idx_medicines_class    ON medicines(therapeutic_class);
CREATE INDEX IF NOT EXISTS idx_medicines_price    ON medicines(selling_price);

-- ----------------------------------------------------------------
-- Shops (one per owner; carries the derived inventory summary)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS shops (
    id                      TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    owner_id                TEXT NOT NULL UNIQUE,       -- FK -> store_owners(id)
    operational_status      TEXT NOT NULL DEFAULT 'open',
    status_message          TEXT,

    -- Derived inventory summary; written only by the rollup.
    total_medicines         INTEGER NOT NULL DEFAULT 0,
    active_medicines        INTEGER NOT NULL DEFAULT 0,
    out_of_stock_medicines  INTEGER NOT NULL DEFAULT 0,
    low_stock_medicines     INTEGER NOT NULL DEFAULT 0,
    total_inventory_value   REAL NOT NULL DEFAULT 0,

    home_delivery_available INTEGER NOT NULL DEFAULT 0,
    home_delivery_charges   REAL NOT NULL DEFAULT 0,
    free_delivery_above     REAL NOT NULL DEFAULT 0,
    estimated_delivery_time TEXT NOT NULL DEFAULT '30-60 minutes',
    online_payment          INTEGER NOT NULL DEFAULT 0,
    cash_on_delivery        INTEGER NOT NULL DEFAULT 1,
    prescription_upload     INTEGER NOT NULL DEFAULT 1,
    emergency_service       INTEGER NOT NULL DEFAULT 0,

    tags                    TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
    last_active_at          TEXT NOT NULL,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES store_owners(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Announcements
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS announcements (
    id         TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    shop_id    TEXT NOT NULL,              -- FK -> shops(id)
    title      TEXT NOT NULL,
    message    TEXT NOT NULL,
    kind       TEXT NOT NULL DEFAULT 'info',
    is_active  INTEGER NOT NULL DEFAULT 1,
    start_date TEXT NOT NULL,
    end_date   TEXT,
    created_at TEXT NOT NULL,

    FOREIGN KEY (shop_id) REFERENCES shops(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_announcements_shop ON announcements(shop_id);

-- ----------------------------------------------------------------
-- Holidays
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS holidays (
    id           TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    shop_id      TEXT NOT NULL,              -- FK -> shops(id)
    date         TEXT NOT NULL,
    reason       TEXT NOT NULL,
    is_recurring INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (shop_id) REFERENCES shops(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_holidays_shop ON holidays(shop_id);

-- ----------------------------------------------------------------
-- Certifications
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS certifications (
    id                 TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    shop_id            TEXT NOT NULL,              -- FK -> shops(id)
    name               TEXT NOT NULL,
    issued_by          TEXT NOT NULL,
    issued_date        TEXT NOT NULL,
    expiry_date        TEXT,
    certificate_number TEXT NOT NULL,
    document_url       TEXT,
    is_active          INTEGER NOT NULL DEFAULT 1,

    FOREIGN KEY (shop_id) REFERENCES shops(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_certifications_shop ON certifications(shop_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
