use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_orders::{NewOrderItem, Order, OrderItem, OrderKind, OrderStatus, Purchase, Sale};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseRequest {
    pub supplier_id: Option<u64>,
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub customer_id: Option<u64>,
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePostingRequest {
    pub purchase_id: Option<u64>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePostingRequest {
    pub sale_id: Option<u64>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    #[serde(default)]
    pub debit_account: String,
    #[serde(default)]
    pub credit_account: String,
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: String,
}

/// Date and filter parameters arrive as raw strings so malformed values get
/// the same JSON error body as every other bad request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub search: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub account: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReferenceQuery {
    #[serde(rename = "type")]
    pub reference_type: Option<String>,
    pub id: Option<u64>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub line_no: u32,
    pub product_sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub unit_type: String,
    pub units_per_package: u32,
    pub subtotal: Decimal,
    pub total_base_units: u64,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            line_no: item.line_no,
            product_sku: item.product_sku.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            unit_type: item.unit_type.clone(),
            units_per_package: item.units_per_package,
            subtotal: item.line_total(),
            total_base_units: item.base_units(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub id: u64,
    pub supplier_id: Option<u64>,
    pub supplier_name: String,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub id: u64,
    pub customer_id: Option<u64>,
    pub customer_name: String,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: Decimal,
}

fn items_of<K: OrderKind>(order: &Order<K>) -> Vec<OrderItemResponse> {
    order.items().iter().map(OrderItemResponse::from).collect()
}

impl From<&Order<Purchase>> for PurchaseResponse {
    fn from(order: &Order<Purchase>) -> Self {
        Self {
            id: order.id_typed().value(),
            supplier_id: order.counterparty_id().map(|id| id.value()),
            supplier_name: order.counterparty_name().to_string(),
            status: order.status(),
            created_at: order.created_at(),
            received_at: order.finalized_at(),
            items: items_of(order),
            total_amount: order.total(),
        }
    }
}

impl From<&Order<Sale>> for SaleResponse {
    fn from(order: &Order<Sale>) -> Self {
        Self {
            id: order.id_typed().value(),
            customer_id: order.counterparty_id().map(|id| id.value()),
            customer_name: order.counterparty_name().to_string(),
            status: order.status(),
            created_at: order.created_at(),
            completed_at: order.finalized_at(),
            items: items_of(order),
            total_amount: order.total(),
        }
    }
}
