use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use tradeflow_core::{CounterpartyId, OrderId};
use tradeflow_events::EventEnvelope;
use tradeflow_orders::{NewOrderItem, OrderEvent};

use crate::app::dto::{CreateSaleRequest, SaleResponse};
use crate::app::errors::ApiError;
use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_sale).get(list_sales))
        .route("/:id", get(get_sale))
        .route("/:id/items", post(add_sale_item))
        .route("/:id/complete", post(complete_sale))
        .route("/:id/cancel", post(cancel_sale))
        .route("/:id/history", get(sale_history))
}

fn sale_id(raw: &str) -> Result<OrderId, ApiError> {
    parse_id(raw, "sale").map(OrderId::new)
}

pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CreateSaleRequest>,
) -> Result<Json<SaleResponse>, ApiError> {
    let customer_id = body
        .customer_id
        .ok_or_else(|| ApiError::bad_request("customerId is required"))?;
    let order = services
        .sales
        .create(CounterpartyId::new(customer_id), body.items)?;
    Ok(Json(SaleResponse::from(&order)))
}

pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<SaleResponse>>, ApiError> {
    let orders = services.sales.list()?;
    Ok(Json(orders.iter().map(SaleResponse::from).collect()))
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, ApiError> {
    let order = services.sales.get(sale_id(&id)?)?;
    Ok(Json(SaleResponse::from(&order)))
}

pub async fn add_sale_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(item): Json<NewOrderItem>,
) -> Result<Json<SaleResponse>, ApiError> {
    let order = services.sales.add_item(sale_id(&id)?, item)?;
    Ok(Json(SaleResponse::from(&order)))
}

/// Marks the sale COMPLETED and queues its stock exits and ledger posting.
pub async fn complete_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, ApiError> {
    let order = services.sales.finalize(sale_id(&id)?)?;
    Ok(Json(SaleResponse::from(&order)))
}

pub async fn cancel_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, ApiError> {
    let order = services.sales.cancel(sale_id(&id)?)?;
    Ok(Json(SaleResponse::from(&order)))
}

pub async fn sale_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelope<OrderEvent>>>, ApiError> {
    Ok(Json(services.sales.history(sale_id(&id)?)?))
}
