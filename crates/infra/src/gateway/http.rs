//! Gateways that reach the ledgers over HTTP.
//!
//! Bodies match what the ledgers' own endpoints accept, so a second
//! instance of this service can act as the remote side.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Serialize;

use tradeflow_inventory::StockUpdateRequest;

use super::{GatewayError, LedgerGateway, StockGateway};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchasePostingBody {
    purchase_id: u64,
    amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SalePostingBody {
    sale_id: u64,
    amount: Decimal,
}

/// 408 and 429 are worth another try; every other 4xx means the request
/// itself is wrong.
pub(crate) fn classify(status: StatusCode, body: String) -> Result<(), GatewayError> {
    if status.is_success() {
        return Ok(());
    }
    let message = format!("{} {}", status.as_u16(), body);
    if status.is_client_error()
        && status != StatusCode::REQUEST_TIMEOUT
        && status != StatusCode::TOO_MANY_REQUESTS
    {
        Err(GatewayError::Rejected(message))
    } else {
        Err(GatewayError::Unavailable(message))
    }
}

#[derive(Debug, Clone)]
struct JsonPoster {
    client: reqwest::Client,
    base_url: String,
}

impl JsonPoster {
    fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("POST {url}: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        classify(status, text)
    }
}

#[derive(Debug, Clone)]
pub struct HttpStockGateway {
    inner: JsonPoster,
}

impl HttpStockGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            inner: JsonPoster::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl StockGateway for HttpStockGateway {
    async fn apply_movement(
        &self,
        request: &StockUpdateRequest,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        self.inner
            .post("/inventory/update", request, idempotency_key)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct HttpLedgerGateway {
    inner: JsonPoster,
}

impl HttpLedgerGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            inner: JsonPoster::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn post_purchase(
        &self,
        purchase_id: u64,
        amount: Decimal,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        let body = PurchasePostingBody { purchase_id, amount };
        self.inner
            .post("/accounting/purchase", &body, idempotency_key)
            .await
    }

    async fn post_sale(
        &self,
        sale_id: u64,
        amount: Decimal,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        let body = SalePostingBody { sale_id, amount };
        self.inner
            .post("/accounting/sale", &body, idempotency_key)
            .await
    }
}
