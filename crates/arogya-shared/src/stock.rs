//! Stock bookkeeping for a medicine.
//!
//! The quantities obey two invariants that every mutation must
//! re-establish:
//!
//! - `available_quantity >= 0` (removals clamp, never go negative)
//! - `total_quantity == available_quantity + reserved_quantity`
//!
//! Status follows availability: hitting zero flips the medicine to
//! `out_of_stock`, regaining stock from `out_of_stock` flips it back to
//! `active`. Any other prior status is left alone.

use serde::{Deserialize, Serialize};

use crate::types::MedicineStatus;

/// Quantity bookkeeping attached to every medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub total_quantity: i64,
    pub available_quantity: i64,
    pub reserved_quantity: i64,
    pub minimum_stock_level: i64,
}

impl StockLevel {
    /// True when the available quantity has fallen to the reorder level.
    pub fn is_low(&self) -> bool {
        self.available_quantity <= self.minimum_stock_level
    }
}

/// How a stock adjustment modifies the available quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockOperation {
    /// `available += quantity`
    Add,
    /// `available = max(0, available - quantity)`
    Remove,
    /// `available = quantity`
    Set,
}

impl StockOperation {
    /// Parse the wire form (`add` / `remove` / `set`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(StockOperation::Add),
            "remove" => Some(StockOperation::Remove),
            "set" => Some(StockOperation::Set),
            _ => None,
        }
    }
}

/// Apply a stock operation and re-derive the dependent fields.
///
/// Returns the updated stock snapshot together with the status the
/// medicine should carry afterwards. `quantity` is assumed non-negative;
/// the caller validates `set` against negative input before reaching
/// this point.
pub fn adjust_stock(
    stock: StockLevel,
    status: MedicineStatus,
    operation: StockOperation,
    quantity: i64,
) -> (StockLevel, MedicineStatus) {
    let available = match operation {
        StockOperation::Add => stock.available_quantity + quantity,
        StockOperation::Remove => (stock.available_quantity - quantity).max(0),
        StockOperation::Set => quantity,
    };

    let updated = StockLevel {
        available_quantity: available,
        total_quantity: available + stock.reserved_quantity,
        ..stock
    };

    let new_status = if available == 0 {
        MedicineStatus::OutOfStock
    } else if status == MedicineStatus::OutOfStock {
        MedicineStatus::Active
    } else {
        status
    };

    (updated, new_status)
}

/// Discount derived from MRP vs. selling price, as a rounded percentage.
///
/// Returns `None` when the MRP is zero (nothing meaningful to derive).
pub fn discount_percentage(mrp: f64, selling_price: f64) -> Option<i64> {
    if mrp == 0.0 {
        return None;
    }
    Some((((mrp - selling_price) / mrp) * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(available: i64, reserved: i64) -> StockLevel {
        StockLevel {
            total_quantity: available + reserved,
            available_quantity: available,
            reserved_quantity: reserved,
            minimum_stock_level: 10,
        }
    }

    #[test]
    fn add_increases_available_and_total() {
        let (s, status) = adjust_stock(stock(5, 2), MedicineStatus::Active, StockOperation::Add, 7);
        assert_eq!(s.available_quantity, 12);
        assert_eq!(s.total_quantity, 14);
        assert_eq!(s.reserved_quantity, 2);
        assert_eq!(status, MedicineStatus::Active);
    }

    #[test]
    fn remove_clamps_at_zero() {
        // Removing more than is available must clamp, never go negative.
        let (s, status) =
            adjust_stock(stock(5, 2), MedicineStatus::Active, StockOperation::Remove, 10);
        assert_eq!(s.available_quantity, 0);
        assert_eq!(s.total_quantity, 2);
        assert_eq!(status, MedicineStatus::OutOfStock);
    }

    #[test]
    fn total_invariant_holds_for_every_operation() {
        for op in [StockOperation::Add, StockOperation::Remove, StockOperation::Set] {
            for qty in [0, 1, 5, 100] {
                let (s, _) = adjust_stock(stock(5, 3), MedicineStatus::Active, op, qty);
                assert!(s.available_quantity >= 0);
                assert_eq!(s.total_quantity, s.available_quantity + s.reserved_quantity);
            }
        }
    }

    #[test]
    fn regaining_stock_reactivates_out_of_stock() {
        let (s, status) =
            adjust_stock(stock(0, 1), MedicineStatus::OutOfStock, StockOperation::Add, 3);
        assert_eq!(s.available_quantity, 3);
        assert_eq!(status, MedicineStatus::Active);
    }

    #[test]
    fn set_to_zero_marks_out_of_stock_regardless_of_prior_status() {
        for prior in [
            MedicineStatus::Active,
            MedicineStatus::Inactive,
            MedicineStatus::Discontinued,
        ] {
            let (s, status) = adjust_stock(stock(8, 0), prior, StockOperation::Set, 0);
            assert_eq!(s.available_quantity, 0);
            assert_eq!(status, MedicineStatus::OutOfStock);
        }
    }

    #[test]
    fn regaining_stock_leaves_other_statuses_alone() {
        let (_, status) =
            adjust_stock(stock(4, 0), MedicineStatus::Inactive, StockOperation::Add, 2);
        assert_eq!(status, MedicineStatus::Inactive);
    }

    #[test]
    fn low_stock_threshold_is_inclusive() {
        let s = StockLevel {
            total_quantity: 10,
            available_quantity: 10,
            reserved_quantity: 0,
            minimum_stock_level: 10,
        };
        assert!(s.is_low());
    }

    #[test]
    fn discount_examples() {
        assert_eq!(discount_percentage(100.0, 80.0), Some(20));
        assert_eq!(discount_percentage(100.0, 50.0), Some(50));
        assert_eq!(discount_percentage(0.0, 50.0), None);
        // Rounds to the nearest integer.
        assert_eq!(discount_percentage(3.0, 2.0), Some(33));
    }
}
