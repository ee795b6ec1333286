use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeflow_core::{DomainError, DomainResult, MovementId, require_non_blank};

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock in (purchase receipt, manual entry).
    Entrada,
    /// Stock out (sale completion, manual withdrawal).
    Salida,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entrada => "ENTRADA",
            MovementType::Salida => "SALIDA",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENTRADA" => Ok(MovementType::Entrada),
            "SALIDA" => Ok(MovementType::Salida),
            other => Err(DomainError::invalid_argument(format!(
                "invalid movement type: '{other}'"
            ))),
        }
    }
}

/// Wire shape of a stock update, shared by `POST /inventory/update` and the
/// stock gateway.
///
/// Fields stay loosely typed here so that malformed input surfaces as an
/// `InvalidArgument` from [`StockUpdateRequest::validate`] rather than as a
/// deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateRequest {
    #[serde(default)]
    pub product_sku: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(rename = "type", default)]
    pub movement_type: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A validated stock update ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    pub product_sku: String,
    pub quantity: u64,
    pub movement_type: MovementType,
    pub reference: Option<String>,
    pub reason: Option<String>,
}

impl StockUpdateRequest {
    pub fn new(
        product_sku: impl Into<String>,
        quantity: u64,
        movement_type: MovementType,
        reference: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            product_sku: product_sku.into(),
            quantity: Some(quantity.min(i64::MAX as u64) as i64),
            movement_type: movement_type.as_str().to_string(),
            reference: Some(reference.into()),
            reason: Some(reason.into()),
        }
    }

    /// Blank SKU, negative quantity and unknown type are rejected. An absent
    /// quantity counts as 0.
    pub fn validate(&self) -> DomainResult<StockUpdate> {
        require_non_blank(&self.product_sku, "productSku")?;
        let sku = self.product_sku.trim();

        let quantity = match self.quantity {
            None => 0,
            Some(q) if q < 0 => {
                return Err(DomainError::invalid_argument(format!(
                    "quantity must not be negative (got {q})"
                )));
            }
            Some(q) => q as u64,
        };

        let movement_type = self.movement_type.parse::<MovementType>()?;

        Ok(StockUpdate {
            product_sku: sku.to_string(),
            quantity,
            movement_type,
            reference: self.reference.clone(),
            reason: self.reason.clone(),
        })
    }
}

/// One entry of the append-only movement log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: MovementId,
    pub product_sku: String,
    /// Requested quantity, even when a SALIDA was clamped.
    pub quantity: u64,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub reference: Option<String>,
    pub reason: Option<String>,
    /// Units a SALIDA could not take because stock reached zero.
    pub shortfall: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sku: &str, quantity: Option<i64>, ty: &str) -> StockUpdateRequest {
        StockUpdateRequest {
            product_sku: sku.to_string(),
            quantity,
            movement_type: ty.to_string(),
            reference: Some("REF-1".to_string()),
            reason: None,
        }
    }

    #[test]
    fn movement_type_parses_case_insensitively() {
        assert_eq!("entrada".parse::<MovementType>().unwrap(), MovementType::Entrada);
        assert_eq!(" Salida ".parse::<MovementType>().unwrap(), MovementType::Salida);
        assert!(matches!(
            "TRANSFER".parse::<MovementType>(),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn absent_quantity_counts_as_zero() {
        let update = request("A1", None, "ENTRADA").validate().unwrap();
        assert_eq!(update.quantity, 0);
        assert_eq!(update.movement_type, MovementType::Entrada);
    }

    #[test]
    fn blank_sku_and_negative_quantity_are_rejected() {
        assert!(matches!(
            request("  ", Some(1), "ENTRADA").validate(),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            request("A1", Some(-3), "SALIDA").validate(),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn request_uses_type_on_the_wire() {
        let req = StockUpdateRequest::new("A1", 120, MovementType::Entrada, "PURCHASE-1", "r");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["productSku"], "A1");
        assert_eq!(json["quantity"], 120);
        assert_eq!(json["type"], "ENTRADA");

        let back: StockUpdateRequest =
            serde_json::from_value(serde_json::json!({"productSku": "B2", "type": "salida"}))
                .unwrap();
        assert_eq!(back.quantity, None);
        assert_eq!(back.validate().unwrap().movement_type, MovementType::Salida);
    }
}
