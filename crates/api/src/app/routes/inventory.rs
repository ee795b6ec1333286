use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};

use tradeflow_inventory::{StockMovement, StockRecord, StockUpdateRequest};

use crate::app::errors::ApiError;
use crate::app::routes::common::idempotency_key;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/update", post(update_stock))
        .route("/movements/:sku", get(list_movements))
        .route("/:sku", get(get_stock))
}

/// Apply one ENTRADA/SALIDA movement. Replays with the same
/// `Idempotency-Key` are acknowledged without touching stock.
pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<StockUpdateRequest>,
) -> Result<StatusCode, ApiError> {
    let key = idempotency_key(&headers);
    services.stock.apply_movement(&body, key.as_deref())?;
    Ok(StatusCode::OK)
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(sku): Path<String>,
) -> Result<Json<StockRecord>, ApiError> {
    Ok(Json(services.stock.stock(&sku)?))
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Path(sku): Path<String>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
    Ok(Json(services.stock.movements(&sku)?))
}
