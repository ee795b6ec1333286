use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_core::{DomainError, EntryId};

/// Classification of an accounting entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    /// Purchase recognition (base and tax credit).
    Compra,
    /// Sale recognition (base and tax payable).
    Venta,
    /// Manual adjustment.
    Ajuste,
    /// Goods moved into merchandise inventory.
    Destino,
    /// Supplier payable settled.
    Pago,
    /// Customer receivable collected.
    Cobro,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Compra => "COMPRA",
            EntryType::Venta => "VENTA",
            EntryType::Ajuste => "AJUSTE",
            EntryType::Destino => "DESTINO",
            EntryType::Pago => "PAGO",
            EntryType::Cobro => "COBRO",
        }
    }
}

impl core::fmt::Display for EntryType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COMPRA" => Ok(EntryType::Compra),
            "VENTA" => Ok(EntryType::Venta),
            "AJUSTE" => Ok(EntryType::Ajuste),
            "DESTINO" => Ok(EntryType::Destino),
            "PAGO" => Ok(EntryType::Pago),
            "COBRO" => Ok(EntryType::Cobro),
            other => Err(DomainError::invalid_argument(format!("unknown entry type: '{other}'"))),
        }
    }
}

/// What business document an entry was posted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReferenceType {
    Purchase,
    Sale,
    Adjustment,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Purchase => "PURCHASE",
            ReferenceType::Sale => "SALE",
            ReferenceType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl core::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PURCHASE" => Ok(ReferenceType::Purchase),
            "SALE" => Ok(ReferenceType::Sale),
            "ADJUSTMENT" => Ok(ReferenceType::Adjustment),
            other => Err(DomainError::invalid_argument(format!(
                "unknown reference type: '{other}'"
            ))),
        }
    }
}

/// One balanced debit/credit pair in the append-only ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingEntry {
    pub id: EntryId,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub debit_account: String,
    pub credit_account: String,
    pub amount: Decimal,
    pub reference_type: ReferenceType,
    pub reference_id: Option<u64>,
    pub description: String,
}

impl AccountingEntry {
    pub fn is_reference(&self, reference_type: ReferenceType, reference_id: Option<u64>) -> bool {
        self.reference_type == reference_type && self.reference_id == reference_id
    }
}
