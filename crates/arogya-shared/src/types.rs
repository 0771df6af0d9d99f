//! Domain enumerations persisted as text and exchanged over the API.
//!
//! Every enum round-trips through its serde representation; the store
//! writes `as_str()` values and parses them back with `FromStr`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a store-owner account.
///
/// Only `Active` owners may perform owner-scoped mutations. `Suspended`
/// and `Blocked` are terminal until an admin resets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Suspended,
    Blocked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Blocked => "blocked",
        }
    }

    /// True for the states that reject every owner-scoped operation.
    pub fn is_locked_out(&self) -> bool {
        matches!(self, AccountStatus::Suspended | AccountStatus::Blocked)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AccountStatus::Pending),
            "active" => Ok(AccountStatus::Active),
            "suspended" => Ok(AccountStatus::Suspended),
            "blocked" => Ok(AccountStatus::Blocked),
            other => Err(format!("unknown account status: {other}")),
        }
    }
}

/// Derived availability state of a medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicineStatus {
    Active,
    Inactive,
    OutOfStock,
    Discontinued,
}

impl MedicineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MedicineStatus::Active => "active",
            MedicineStatus::Inactive => "inactive",
            MedicineStatus::OutOfStock => "out_of_stock",
            MedicineStatus::Discontinued => "discontinued",
        }
    }
}

impl fmt::Display for MedicineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MedicineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MedicineStatus::Active),
            "inactive" => Ok(MedicineStatus::Inactive),
            "out_of_stock" => Ok(MedicineStatus::OutOfStock),
            "discontinued" => Ok(MedicineStatus::Discontinued),
            other => Err(format!("unknown medicine status: {other}")),
        }
    }
}

/// Whether the shop is currently serving customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    Open,
    Closed,
    TemporarilyClosed,
    Maintenance,
}

impl OperationalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalStatus::Open => "open",
            OperationalStatus::Closed => "closed",
            OperationalStatus::TemporarilyClosed => "temporarily_closed",
            OperationalStatus::Maintenance => "maintenance",
        }
    }
}

impl FromStr for OperationalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(OperationalStatus::Open),
            "closed" => Ok(OperationalStatus::Closed),
            "temporarily_closed" => Ok(OperationalStatus::TemporarilyClosed),
            "maintenance" => Ok(OperationalStatus::Maintenance),
            other => Err(format!("unknown operational status: {other}")),
        }
    }
}

/// Severity / intent of a shop announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    Info,
    Warning,
    Promotion,
    Emergency,
}

impl AnnouncementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementKind::Info => "info",
            AnnouncementKind::Warning => "warning",
            AnnouncementKind::Promotion => "promotion",
            AnnouncementKind::Emergency => "emergency",
        }
    }
}

impl FromStr for AnnouncementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(AnnouncementKind::Info),
            "warning" => Ok(AnnouncementKind::Warning),
            "promotion" => Ok(AnnouncementKind::Promotion),
            "emergency" => Ok(AnnouncementKind::Emergency),
            other => Err(format!("unknown announcement kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_status_round_trip() {
        for s in ["pending", "active", "suspended", "blocked"] {
            assert_eq!(s.parse::<AccountStatus>().unwrap().as_str(), s);
        }
        assert!("deleted".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn locked_out_states() {
        assert!(AccountStatus::Suspended.is_locked_out());
        assert!(AccountStatus::Blocked.is_locked_out());
        assert!(!AccountStatus::Active.is_locked_out());
        assert!(!AccountStatus::Pending.is_locked_out());
    }

    #[test]
    fn medicine_status_serde_uses_snake_case() {
        let json = serde_json::to_string(&MedicineStatus::OutOfStock).unwrap();
        assert_eq!(json, "\"out_of_stock\"");
    }
}
