use serde::{Deserialize, Serialize};

use tradeflow_accounting::ReferenceType;
use tradeflow_inventory::MovementType;

use crate::order::OrderStatus;

/// Which directory a counterparty id is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterpartyRole {
    Supplier,
    Customer,
}

impl CounterpartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterpartyRole::Supplier => "supplier",
            CounterpartyRole::Customer => "customer",
        }
    }
}

/// Kind-specific labels of an order.
pub trait OrderKind: Copy + Clone + core::fmt::Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Event store aggregate type.
    const AGGREGATE_TYPE: &'static str;
    /// Prefix of correlation references (`PURCHASE-42`).
    const REFERENCE_PREFIX: &'static str;
    /// Status reached by `finalize`.
    const FINAL_STATUS: OrderStatus;
    const MOVEMENT_TYPE: MovementType;
    const MOVEMENT_REASON: &'static str;
    const REFERENCE_TYPE: ReferenceType;
    const COUNTERPARTY: CounterpartyRole;
}

/// Purchase from a supplier; finalized by `receive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchase;

/// Sale to a customer; finalized by `complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sale;

impl OrderKind for Purchase {
    const AGGREGATE_TYPE: &'static str = "purchasing.order";
    const REFERENCE_PREFIX: &'static str = "PURCHASE";
    const FINAL_STATUS: OrderStatus = OrderStatus::Received;
    const MOVEMENT_TYPE: MovementType = MovementType::Entrada;
    const MOVEMENT_REASON: &'static str = "Recepción de compra";
    const REFERENCE_TYPE: ReferenceType = ReferenceType::Purchase;
    const COUNTERPARTY: CounterpartyRole = CounterpartyRole::Supplier;
}

impl OrderKind for Sale {
    const AGGREGATE_TYPE: &'static str = "sales.order";
    const REFERENCE_PREFIX: &'static str = "SALE";
    const FINAL_STATUS: OrderStatus = OrderStatus::Completed;
    const MOVEMENT_TYPE: MovementType = MovementType::Salida;
    const MOVEMENT_REASON: &'static str = "Venta completada";
    const REFERENCE_TYPE: ReferenceType = ReferenceType::Sale;
    const COUNTERPARTY: CounterpartyRole = CounterpartyRole::Customer;
}
