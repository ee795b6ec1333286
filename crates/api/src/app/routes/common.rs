use axum::http::HeaderMap;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::app::errors::ApiError;

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

pub fn parse_id(raw: &str, what: &str) -> Result<u64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid {what} id '{raw}'")))
}

/// Trimmed `Idempotency-Key` header; absent, blank or non-ASCII headers count
/// as no key.
pub fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Required `YYYY-MM-DD` query parameter.
pub fn required_date(raw: Option<&str>, name: &str) -> Result<NaiveDate, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{name} is required")))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("{name} must be a YYYY-MM-DD date, got '{raw}'")))
}

pub fn optional_decimal(raw: Option<&str>, name: &str) -> Result<Option<Decimal>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<Decimal>()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{name} must be a number, got '{v}'"))),
    }
}

pub fn required_amount(amount: Option<Decimal>) -> Result<Decimal, ApiError> {
    amount.ok_or_else(|| ApiError::bad_request("amount is required"))
}
