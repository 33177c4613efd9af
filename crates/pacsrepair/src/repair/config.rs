//! Repair policy and placeholder values

use serde::{Deserialize, Serialize};

/// Values injected by the repair engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Country written when the address carries no `Ctry`
    pub fallback_country: String,
    /// Town written by hybrid repair when the address carries no `TwnNm`
    pub fallback_town: String,
    /// Placeholder legal entity identifier
    pub lei: String,
    /// Placeholder purpose code (goods purchase)
    pub purpose_code: String,
    /// Placeholder structured creditor reference
    pub remittance_reference: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            fallback_country: "SG".to_string(),
            fallback_town: "Singapore".to_string(),
            lei: "5493001KJTIIGC8Y1R12".to_string(),
            purpose_code: "GDDS".to_string(),
            remittance_reference: "RF712345678901234567".to_string(),
        }
    }
}

/// How the postal address block should be rebuilt
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressMode {
    /// Named sub-fields: `StrtNm`, `BldgNb`, `PstCd`, `TwnNm`, `Ctry`
    #[default]
    Structured,
    /// Free-text `AdrLine`s plus `TwnNm` and `Ctry`
    Hybrid,
}

/// Party whose address and identifier are repaired
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    #[default]
    Debtor,
    Creditor,
}

impl Party {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Debtor => "Dbtr",
            Self::Creditor => "Cdtr",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Debtor => "Debtor",
            Self::Creditor => "Creditor",
        }
    }
}

/// Caller choices for one repair pass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairOptions {
    /// Address rebuild mode; `None` leaves the address alone
    pub address: Option<AddressMode>,
    pub party: Party,
    pub fix_lei: bool,
    pub fix_purpose: bool,
    pub fix_remittance: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            address: Some(AddressMode::Structured),
            party: Party::Debtor,
            fix_lei: false,
            fix_purpose: false,
            fix_remittance: false,
        }
    }
}

impl RepairOptions {
    /// Every fix requested, address rebuilt in `mode`
    pub const fn all(mode: AddressMode) -> Self {
        Self {
            address: Some(mode),
            party: Party::Debtor,
            fix_lei: true,
            fix_purpose: true,
            fix_remittance: true,
        }
    }
}
