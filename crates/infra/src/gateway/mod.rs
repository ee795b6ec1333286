//! How the order side reaches the stock and accounting ledgers.
//!
//! Calls are async and may cross a process boundary. Every call carries an
//! idempotency key so a retry after an ambiguous failure is safe.

pub mod http;
pub mod local;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use tradeflow_accounting::{LedgerPosting, ReferenceType};
use tradeflow_inventory::StockUpdateRequest;

pub use http::{HttpLedgerGateway, HttpStockGateway};
pub use local::{LocalLedgerGateway, LocalStockGateway};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The receiving ledger refused the request itself; retrying cannot help.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Transport failure, timeout or server-side error; worth retrying.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

#[async_trait]
pub trait StockGateway: Send + Sync {
    async fn apply_movement(
        &self,
        request: &StockUpdateRequest,
        idempotency_key: &str,
    ) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn post_purchase(
        &self,
        purchase_id: u64,
        amount: Decimal,
        idempotency_key: &str,
    ) -> Result<(), GatewayError>;

    async fn post_sale(
        &self,
        sale_id: u64,
        amount: Decimal,
        idempotency_key: &str,
    ) -> Result<(), GatewayError>;

    async fn post(&self, posting: &LedgerPosting, idempotency_key: &str) -> Result<(), GatewayError> {
        match posting.reference_type {
            ReferenceType::Purchase => {
                self.post_purchase(posting.reference_id, posting.amount, idempotency_key)
                    .await
            }
            ReferenceType::Sale => {
                self.post_sale(posting.reference_id, posting.amount, idempotency_key)
                    .await
            }
            ReferenceType::Adjustment => Err(GatewayError::Rejected(
                "adjustments are not order postings".to_string(),
            )),
        }
    }
}
