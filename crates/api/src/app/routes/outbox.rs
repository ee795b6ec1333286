use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    routing::{get, post},
};

use tradeflow_infra::{Intent, RelayReport};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_intents))
        .route("/drain", post(drain))
}

pub async fn list_intents(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Intent>>, ApiError> {
    Ok(Json(services.outbox.list()?))
}

/// Deliver whatever is due now instead of waiting for the next relay tick.
pub async fn drain(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<RelayReport>, ApiError> {
    Ok(Json(services.relay().drain_once().await?))
}
