//! Infrastructure layer: event store, ledgers, gateways and the outbox.

pub mod accounting_ledger;
pub mod command_dispatcher;
pub mod directory;
pub mod error;
pub mod event_store;
pub mod gateway;
pub mod ids;
pub mod orders;
pub mod outbox;
pub mod stock_ledger;

pub use accounting_ledger::AccountingLedger;
pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use directory::{Counterparty, CounterpartyDirectory, InMemoryDirectory};
pub use error::{StoreError, StoreResult};
pub use orders::OrderService;
pub use outbox::{Intent, IntentStatus, Outbox, Relay, RelayHandle, RelayReport, RetryPolicy};
pub use stock_ledger::StockLedger;
