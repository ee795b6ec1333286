use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use tradeflow_core::{CounterpartyId, OrderId};
use tradeflow_events::EventEnvelope;
use tradeflow_orders::{NewOrderItem, OrderEvent};

use crate::app::dto::{CreatePurchaseRequest, PurchaseResponse};
use crate::app::errors::ApiError;
use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_purchase).get(list_purchases))
        .route("/:id", get(get_purchase))
        .route("/:id/items", post(add_purchase_item))
        .route("/:id/receive", post(receive_purchase))
        .route("/:id/cancel", post(cancel_purchase))
        .route("/:id/history", get(purchase_history))
}

fn purchase_id(raw: &str) -> Result<OrderId, ApiError> {
    parse_id(raw, "purchase").map(OrderId::new)
}

pub async fn create_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CreatePurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let supplier_id = body
        .supplier_id
        .ok_or_else(|| ApiError::bad_request("supplierId is required"))?;
    let order = services
        .purchases
        .create(CounterpartyId::new(supplier_id), body.items)?;
    Ok(Json(PurchaseResponse::from(&order)))
}

pub async fn list_purchases(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<PurchaseResponse>>, ApiError> {
    let orders = services.purchases.list()?;
    Ok(Json(orders.iter().map(PurchaseResponse::from).collect()))
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let order = services.purchases.get(purchase_id(&id)?)?;
    Ok(Json(PurchaseResponse::from(&order)))
}

pub async fn add_purchase_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(item): Json<NewOrderItem>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let order = services.purchases.add_item(purchase_id(&id)?, item)?;
    Ok(Json(PurchaseResponse::from(&order)))
}

/// Marks the purchase RECEIVED; stock entries and the ledger posting follow
/// asynchronously through the outbox.
pub async fn receive_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let order = services.purchases.finalize(purchase_id(&id)?)?;
    Ok(Json(PurchaseResponse::from(&order)))
}

pub async fn cancel_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let order = services.purchases.cancel(purchase_id(&id)?)?;
    Ok(Json(PurchaseResponse::from(&order)))
}

pub async fn purchase_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelope<OrderEvent>>>, ApiError> {
    Ok(Json(services.purchases.history(purchase_id(&id)?)?))
}
