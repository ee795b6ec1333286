use serde::{Deserialize, Serialize};

use tradeflow_core::StockRecordId;

use crate::movement::MovementType;

/// Current quantity of one SKU. Created lazily on the first movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub id: StockRecordId,
    pub product_sku: String,
    pub quantity: u64,
    pub location: Option<String>,
}

impl StockRecord {
    pub fn new(id: StockRecordId, product_sku: impl Into<String>) -> Self {
        Self {
            id,
            product_sku: product_sku.into(),
            quantity: 0,
            location: None,
        }
    }

    /// Apply a movement and return the shortfall.
    ///
    /// SALIDA is clamped at zero: whatever could not be taken is returned
    /// instead of driving the quantity negative.
    pub fn apply(&mut self, movement_type: MovementType, quantity: u64) -> u64 {
        match movement_type {
            MovementType::Entrada => {
                self.quantity = self.quantity.saturating_add(quantity);
                0
            }
            MovementType::Salida => {
                let taken = quantity.min(self.quantity);
                self.quantity -= taken;
                quantity - taken
            }
        }
    }
}
