//! # arogya-shared
//!
//! Domain types and pure kernel logic shared between the store and the
//! HTTP server:
//!
//! - **Enumerations** for account status, medicine classification,
//!   shop state, and stock units
//! - **Stock arithmetic**: the adjust/clamp/status-transition rules and
//!   the discount derivation applied on every price change
//! - **Geo helpers**: haversine distance and the bounding box used to
//!   prefilter nearby-store queries

pub mod geo;
pub mod stock;
pub mod types;

pub use stock::{adjust_stock, discount_percentage, StockLevel, StockOperation};
pub use types::*;
