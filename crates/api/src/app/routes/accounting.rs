use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::HeaderMap,
    routing::{get, post},
};

use tradeflow_accounting::{
    AccountBalance, AccountingEntry, DateRange, EntryFilter, ReferenceType, Summary, headline,
};
use tradeflow_core::{DomainError, EntryId};

use crate::app::dto::{
    AdjustmentRequest, PurchasePostingRequest, ReferenceQuery, ReportQuery, SalePostingRequest,
};
use crate::app::errors::ApiError;
use crate::app::routes::common::{
    idempotency_key, optional_decimal, parse_id, required_amount, required_date,
};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/purchase", post(post_purchase))
        .route("/sale", post(post_sale))
        .route("/adjustment", post(post_adjustment))
        .route("/summary", get(summary))
        .route("/entries", get(list_entries))
        .route("/account-balance", get(account_balance))
        .route("/by-reference", get(by_reference))
        .route("/:id", get(get_entry))
}

fn date_range(query: &ReportQuery) -> Result<DateRange, ApiError> {
    let from = required_date(query.from.as_deref(), "from")?;
    let to = required_date(query.to.as_deref(), "to")?;
    Ok(DateRange::new(from, to)?)
}

/// The posting's tax entry stands for the whole sequence in the response.
fn headline_entry(entries: Vec<AccountingEntry>) -> Result<Json<AccountingEntry>, ApiError> {
    let entry = headline(&entries)
        .cloned()
        .ok_or_else(|| DomainError::invalid_state("posting produced no entries"))?;
    Ok(Json(entry))
}

pub async fn post_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<PurchasePostingRequest>,
) -> Result<Json<AccountingEntry>, ApiError> {
    let purchase_id = body
        .purchase_id
        .ok_or_else(|| ApiError::bad_request("purchaseId is required"))?;
    let amount = required_amount(body.amount)?;
    let key = idempotency_key(&headers);
    let entries = services
        .accounting
        .post_purchase(purchase_id, amount, key.as_deref())?;
    headline_entry(entries)
}

pub async fn post_sale(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<SalePostingRequest>,
) -> Result<Json<AccountingEntry>, ApiError> {
    let sale_id = body
        .sale_id
        .ok_or_else(|| ApiError::bad_request("saleId is required"))?;
    let amount = required_amount(body.amount)?;
    let key = idempotency_key(&headers);
    let entries = services
        .accounting
        .post_sale(sale_id, amount, key.as_deref())?;
    headline_entry(entries)
}

pub async fn post_adjustment(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<AdjustmentRequest>,
) -> Result<Json<AccountingEntry>, ApiError> {
    let amount = required_amount(body.amount)?;
    let entry = services.accounting.post_adjustment(
        &body.debit_account,
        &body.credit_account,
        amount,
        &body.description,
    )?;
    Ok(Json(entry))
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Summary>, ApiError> {
    Ok(Json(services.accounting.summary(date_range(&query)?)?))
}

pub async fn list_entries(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<AccountingEntry>>, ApiError> {
    let filter = EntryFilter::new(date_range(&query)?)
        .with_type(query.entry_type.as_deref())?
        .with_search(query.search.as_deref())
        .with_amount_bounds(
            optional_decimal(query.min_amount.as_deref(), "minAmount")?,
            optional_decimal(query.max_amount.as_deref(), "maxAmount")?,
        )?;
    Ok(Json(services.accounting.entries(&filter)?))
}

pub async fn account_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AccountBalance>, ApiError> {
    let account = query.account.clone().unwrap_or_default();
    let range = date_range(&query)?;
    Ok(Json(services.accounting.account_balance(&account, range)?))
}

pub async fn by_reference(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ReferenceQuery>,
) -> Result<Json<Vec<AccountingEntry>>, ApiError> {
    let reference_type: ReferenceType = query
        .reference_type
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("type is required"))?
        .parse()?;
    Ok(Json(services.accounting.by_reference(reference_type, query.id)?))
}

pub async fn get_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<AccountingEntry>, ApiError> {
    let id = EntryId::new(parse_id(&id, "accounting entry")?);
    Ok(Json(services.accounting.entry(id)?))
}
