//! # arogya-store
//!
//! Persistence layer for the Arogya directory, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every
//! domain model, plus the inventory rollup that keeps each shop's
//! denormalized summary consistent with its medicine records.

pub mod database;
pub mod medicines;
pub mod migrations;
pub mod models;
pub mod owners;
pub mod rollup;
pub mod shops;
pub mod users;

mod error;
mod row;

pub use database::Database;
pub use error::StoreError;
pub use medicines::{MedicineSearchFilter, MedicineUpdate, OwnerMedicineFilter};
pub use models::*;
pub use owners::{NearbyOwner, OwnerListFilter, OwnerProfileUpdate};
