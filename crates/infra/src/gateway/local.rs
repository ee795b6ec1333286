//! In-process gateways calling the ledgers in this process directly.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use tradeflow_inventory::StockUpdateRequest;

use crate::accounting_ledger::AccountingLedger;
use crate::error::StoreError;
use crate::stock_ledger::StockLedger;

use super::{GatewayError, LedgerGateway, StockGateway};

impl From<StoreError> for GatewayError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Domain(e) => GatewayError::Rejected(e.to_string()),
            StoreError::Poisoned(what) => GatewayError::Unavailable(format!("{what} lock poisoned")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalStockGateway {
    ledger: Arc<StockLedger>,
}

impl LocalStockGateway {
    pub fn new(ledger: Arc<StockLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl StockGateway for LocalStockGateway {
    async fn apply_movement(
        &self,
        request: &StockUpdateRequest,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        self.ledger.apply_movement(request, Some(idempotency_key))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LocalLedgerGateway {
    ledger: Arc<AccountingLedger>,
}

impl LocalLedgerGateway {
    pub fn new(ledger: Arc<AccountingLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl LedgerGateway for LocalLedgerGateway {
    async fn post_purchase(
        &self,
        purchase_id: u64,
        amount: Decimal,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        self.ledger.post_purchase(purchase_id, amount, Some(idempotency_key))?;
        Ok(())
    }

    async fn post_sale(
        &self,
        sale_id: u64,
        amount: Decimal,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        self.ledger.post_sale(sale_id, amount, Some(idempotency_key))?;
        Ok(())
    }
}
