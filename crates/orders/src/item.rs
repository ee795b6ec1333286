use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_core::{DomainError, DomainResult, ensure_within_limit, require_non_blank};

pub const DEFAULT_UNIT_TYPE: &str = "UNIT";

/// Line item as supplied by a client, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    #[serde(default)]
    pub product_sku: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub units_per_package: Option<i64>,
}

/// Line item owned by an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// 1-based position in insertion order.
    pub line_no: u32,
    pub product_sku: String,
    /// Quantity in packages.
    pub quantity: u32,
    pub unit_price: Decimal,
    pub unit_type: String,
    pub units_per_package: u32,
}

impl NewOrderItem {
    pub fn new(product_sku: impl Into<String>, quantity: i64, unit_price: Decimal) -> Self {
        Self {
            product_sku: product_sku.into(),
            quantity: Some(quantity),
            unit_price: Some(unit_price),
            ..Self::default()
        }
    }

    pub fn with_packaging(mut self, unit_type: impl Into<String>, units_per_package: i64) -> Self {
        self.unit_type = Some(unit_type.into());
        self.units_per_package = Some(units_per_package);
        self
    }

    /// Validate and apply defaults.
    ///
    /// - absent quantity -> 0
    /// - absent or blank unit type -> `UNIT`
    /// - absent or zero units per package -> 1
    pub fn resolve(&self, line_no: u32) -> DomainResult<OrderItem> {
        require_non_blank(&self.product_sku, &format!("item {line_no}: productSku"))?;
        let sku = self.product_sku.trim();

        let quantity = match self.quantity.unwrap_or(0) {
            q if q < 0 => {
                return Err(DomainError::invalid_argument(format!(
                    "item {line_no}: quantity must not be negative"
                )));
            }
            q => u32::try_from(q).map_err(|_| {
                DomainError::invalid_argument(format!("item {line_no}: quantity is too large"))
            })?,
        };

        let unit_price = match self.unit_price {
            None => {
                return Err(DomainError::invalid_argument(format!(
                    "item {line_no}: unitPrice is required"
                )));
            }
            Some(p) if p < Decimal::ZERO => {
                return Err(DomainError::invalid_argument(format!(
                    "item {line_no}: unitPrice must not be negative"
                )));
            }
            Some(p) => ensure_within_limit(p, &format!("item {line_no}: unitPrice"))?,
        };

        Decimal::from(quantity)
            .checked_mul(unit_price)
            .ok_or_else(|| {
                DomainError::invalid_argument(format!("item {line_no}: line total is out of range"))
            })
            .and_then(|total| ensure_within_limit(total, &format!("item {line_no}: line total")))?;

        let unit_type = self
            .unit_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_UNIT_TYPE)
            .to_string();

        let units_per_package = match self.units_per_package.unwrap_or(0) {
            0 => 1,
            n if n < 0 => {
                return Err(DomainError::invalid_argument(format!(
                    "item {line_no}: unitsPerPackage must not be negative"
                )));
            }
            n => u32::try_from(n).map_err(|_| {
                DomainError::invalid_argument(format!("item {line_no}: unitsPerPackage is too large"))
            })?,
        };

        Ok(OrderItem {
            line_no,
            product_sku: sku.to_string(),
            quantity,
            unit_price,
            unit_type,
            units_per_package,
        })
    }
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    /// Quantity expressed in stock units (`quantity * unitsPerPackage`).
    pub fn base_units(&self) -> u64 {
        u64::from(self.quantity) * u64::from(self.units_per_package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradeflow_core::MAX_AMOUNT;

    #[test]
    fn defaults_are_applied() {
        let item = NewOrderItem {
            product_sku: " A1 ".to_string(),
            unit_price: Some(dec!(5.00)),
            units_per_package: Some(0),
            ..NewOrderItem::default()
        }
        .resolve(1)
        .unwrap();

        assert_eq!(item.product_sku, "A1");
        assert_eq!(item.quantity, 0);
        assert_eq!(item.unit_type, "UNIT");
        assert_eq!(item.units_per_package, 1);
    }

    #[test]
    fn base_units_multiply_by_package_size() {
        let item = NewOrderItem::new("A1", 10, dec!(5.00))
            .with_packaging("BOX", 12)
            .resolve(1)
            .unwrap();
        assert_eq!(item.base_units(), 120);
        assert_eq!(item.line_total(), dec!(50.00));
    }

    #[test]
    fn invalid_items_are_rejected() {
        let blank = NewOrderItem::new("  ", 1, dec!(1));
        assert!(matches!(blank.resolve(1), Err(DomainError::InvalidArgument(_))));

        let negative = NewOrderItem::new("A1", -1, dec!(1));
        assert!(matches!(negative.resolve(1), Err(DomainError::InvalidArgument(_))));

        let no_price = NewOrderItem {
            product_sku: "A1".to_string(),
            quantity: Some(1),
            ..NewOrderItem::default()
        };
        assert!(matches!(no_price.resolve(1), Err(DomainError::InvalidArgument(_))));

        let bad_package = NewOrderItem::new("A1", 1, dec!(1)).with_packaging("BOX", -2);
        assert!(matches!(bad_package.resolve(1), Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn amounts_beyond_the_limit_are_rejected() {
        let huge_price = NewOrderItem::new("A1", 3, dec!(70000000000000000000000000000));
        assert!(matches!(huge_price.resolve(1), Err(DomainError::InvalidArgument(_))));

        let huge_line = NewOrderItem::new("A1", 3, dec!(900000000000000));
        let err = huge_line.resolve(2).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidArgument(format!("item 2: line total must not exceed {MAX_AMOUNT}"))
        );

        let at_limit = NewOrderItem::new("A1", 1, MAX_AMOUNT).resolve(1).unwrap();
        assert_eq!(at_limit.line_total(), MAX_AMOUNT);
    }
}
