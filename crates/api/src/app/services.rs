//! Process wiring: stores, ledgers, gateways and the outbox relay.

use std::sync::Arc;

use tradeflow_core::CounterpartyId;
use tradeflow_infra::{
    AccountingLedger, InMemoryDirectory, OrderService, Outbox, Relay, RelayHandle, StockLedger,
    event_store::InMemoryEventStore,
    gateway::{
        GatewayError, HttpLedgerGateway, HttpStockGateway, LedgerGateway, LocalLedgerGateway,
        LocalStockGateway, StockGateway,
    },
};
use tradeflow_orders::{CounterpartyRole, Purchase, Sale};

use crate::config::{Config, GatewayMode};

pub type PurchaseService = OrderService<Purchase, Arc<InMemoryEventStore>>;
pub type SaleService = OrderService<Sale, Arc<InMemoryEventStore>>;

pub struct AppServices {
    pub purchases: PurchaseService,
    pub sales: SaleService,
    pub stock: Arc<StockLedger>,
    pub accounting: Arc<AccountingLedger>,
    pub outbox: Arc<Outbox>,
    relay: Relay,
    /// Dropping the services stops the background relay.
    _relay_task: RelayHandle,
}

impl AppServices {
    pub fn relay(&self) -> &Relay {
        &self.relay
    }
}

/// Wire everything and start the relay. Must run inside a tokio runtime.
pub fn build_services(config: &Config) -> Result<AppServices, GatewayError> {
    let store = Arc::new(InMemoryEventStore::new());
    let outbox = Arc::new(Outbox::new());
    let stock = Arc::new(StockLedger::new());
    let accounting = Arc::new(AccountingLedger::new());

    let directory = InMemoryDirectory::new();
    for (id, name) in &config.suppliers {
        directory.register(CounterpartyRole::Supplier, CounterpartyId::new(*id), name.clone());
    }
    for (id, name) in &config.customers {
        directory.register(CounterpartyRole::Customer, CounterpartyId::new(*id), name.clone());
    }
    let directory = Arc::new(directory);

    let (stock_gateway, ledger_gateway): (Arc<dyn StockGateway>, Arc<dyn LedgerGateway>) =
        match &config.gateway {
            GatewayMode::InProcess => (
                Arc::new(LocalStockGateway::new(stock.clone())),
                Arc::new(LocalLedgerGateway::new(accounting.clone())),
            ),
            GatewayMode::Http {
                inventory_url,
                accounting_url,
            } => (
                Arc::new(HttpStockGateway::new(inventory_url, config.gateway_timeout)?),
                Arc::new(HttpLedgerGateway::new(accounting_url, config.gateway_timeout)?),
            ),
        };

    let relay = Relay::new(outbox.clone(), stock_gateway, ledger_gateway, config.retry);
    let relay_task = relay.clone().spawn(config.poll_interval);

    let mode = match config.gateway {
        GatewayMode::InProcess => "in_process",
        GatewayMode::Http { .. } => "http",
    };
    tracing::info!(
        gateway = mode,
        suppliers = config.suppliers.len(),
        customers = config.customers.len(),
        "services ready"
    );

    Ok(AppServices {
        purchases: OrderService::new(store.clone(), directory.clone(), outbox.clone()),
        sales: OrderService::new(store, directory, outbox.clone()),
        stock,
        accounting,
        outbox,
        relay,
        _relay_task: relay_task,
    })
}
