//! Delivers queued intents through the gateways.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tradeflow_orders::SideEffect;

use crate::error::StoreResult;
use crate::gateway::{GatewayError, LedgerGateway, StockGateway};

use super::{Intent, IntentStatus, Outbox, RetryPolicy};

/// Outcome of one pass over the due intents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayReport {
    pub delivered: usize,
    pub retried: usize,
    pub dead_lettered: usize,
}

/// Clones share one pass lock, so the background loop and on-demand drains
/// never deliver the same intent concurrently.
#[derive(Clone)]
pub struct Relay {
    outbox: Arc<Outbox>,
    stock: Arc<dyn StockGateway>,
    ledger: Arc<dyn LedgerGateway>,
    policy: RetryPolicy,
    pass: Arc<Mutex<()>>,
}

impl Relay {
    pub fn new(
        outbox: Arc<Outbox>,
        stock: Arc<dyn StockGateway>,
        ledger: Arc<dyn LedgerGateway>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            outbox,
            stock,
            ledger,
            policy,
            pass: Arc::new(Mutex::new(())),
        }
    }

    pub fn outbox(&self) -> &Arc<Outbox> {
        &self.outbox
    }

    async fn deliver(&self, intent: &Intent) -> Result<(), GatewayError> {
        match &intent.effect {
            SideEffect::Stock(request) => {
                self.stock
                    .apply_movement(request, &intent.idempotency_key)
                    .await
            }
            SideEffect::Ledger(posting) => self.ledger.post(posting, &intent.idempotency_key).await,
        }
    }

    /// Attempt every intent that is currently due, once. Passes run one at a
    /// time; gateway calls run without holding the outbox lock.
    pub async fn drain_once(&self) -> StoreResult<RelayReport> {
        let _pass = self.pass.lock().await;
        let mut report = RelayReport::default();

        for intent in self.outbox.due(Utc::now())? {
            match self.deliver(&intent).await {
                Ok(()) => {
                    if self.outbox.mark_delivered(intent.id)? {
                        debug!(idempotency_key = %intent.idempotency_key, "intent delivered");
                        report.delivered += 1;
                    }
                }
                Err(e) => {
                    let status = self.outbox.mark_failed(
                        intent.id,
                        &e.to_string(),
                        e.is_retryable(),
                        &self.policy,
                        Utc::now(),
                    )?;
                    match status {
                        None => {
                            debug!(idempotency_key = %intent.idempotency_key, "intent already settled");
                        }
                        Some(IntentStatus::DeadLettered) => {
                            error!(
                                idempotency_key = %intent.idempotency_key,
                                attempts = intent.attempts + 1,
                                error = %e,
                                "intent dead-lettered"
                            );
                            report.dead_lettered += 1;
                        }
                        Some(_) => {
                            warn!(
                                idempotency_key = %intent.idempotency_key,
                                attempt = intent.attempts + 1,
                                error = %e,
                                "delivery failed; will retry"
                            );
                            report.retried += 1;
                        }
                    }
                }
            }
        }

        if report != RelayReport::default() {
            info!(
                delivered = report.delivered,
                retried = report.retried,
                dead_lettered = report.dead_lettered,
                "relay pass finished"
            );
        }
        Ok(report)
    }

    /// Run in the background, draining on every enqueue and on each tick of
    /// `poll_interval` (retries become due without a new enqueue).
    pub fn spawn(self, poll_interval: Duration) -> RelayHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let outbox = self.outbox.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(poll_ms = poll_interval.as_millis() as u64, "outbox relay started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = outbox.notified() => {}
                    _ = ticker.tick() => {}
                }
                if let Err(e) = self.drain_once().await {
                    error!(error = %e, "relay pass failed");
                }
            }

            info!("outbox relay stopped");
        });

        RelayHandle {
            shutdown: Some(shutdown_tx),
            join: Some(join),
        }
    }
}

/// Handle to a running relay task.
#[derive(Debug)]
pub struct RelayHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl RelayHandle {
    /// Stop the relay and wait for its current pass to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use tradeflow_accounting::{LedgerPosting, ReferenceType};
    use tradeflow_inventory::{MovementType, StockUpdateRequest};
    use tradeflow_orders::PlannedEffect;

    use crate::accounting_ledger::AccountingLedger;
    use crate::gateway::{LocalLedgerGateway, LocalStockGateway};
    use crate::stock_ledger::StockLedger;

    /// Local gateways that can be switched to fail like an unreachable peer.
    struct Flaky {
        stock: LocalStockGateway,
        ledger: LocalLedgerGateway,
        fail_stock: AtomicBool,
        fail_ledger: AtomicBool,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(stock: Arc<StockLedger>, ledger: Arc<AccountingLedger>) -> Self {
            Self {
                stock: LocalStockGateway::new(stock),
                ledger: LocalLedgerGateway::new(ledger),
                fail_stock: AtomicBool::new(false),
                fail_ledger: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }

        fn set_fail_on_stock(&self, fail: bool) {
            self.fail_stock.store(fail, Ordering::SeqCst);
        }

        fn set_fail_on_ledger(&self, fail: bool) {
            self.fail_ledger.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl StockGateway for Flaky {
        async fn apply_movement(
            &self,
            request: &StockUpdateRequest,
            idempotency_key: &str,
        ) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Let a concurrent pass run while this call is in flight.
            tokio::task::yield_now().await;
            if self.fail_stock.load(Ordering::SeqCst) {
                return Err(GatewayError::Unavailable("inventory down".into()));
            }
            self.stock.apply_movement(request, idempotency_key).await
        }
    }

    #[async_trait]
    impl LedgerGateway for Flaky {
        async fn post_purchase(
            &self,
            purchase_id: u64,
            amount: Decimal,
            idempotency_key: &str,
        ) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail_ledger.load(Ordering::SeqCst) {
                return Err(GatewayError::Unavailable("accounting down".into()));
            }
            self.ledger.post_purchase(purchase_id, amount, idempotency_key).await
        }

        async fn post_sale(
            &self,
            sale_id: u64,
            amount: Decimal,
            idempotency_key: &str,
        ) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail_ledger.load(Ordering::SeqCst) {
                return Err(GatewayError::Unavailable("accounting down".into()));
            }
            self.ledger.post_sale(sale_id, amount, idempotency_key).await
        }
    }

    struct Fixture {
        stock: Arc<StockLedger>,
        ledger: Arc<AccountingLedger>,
        gateways: Arc<Flaky>,
        relay: Relay,
    }

    fn fixture(max_attempts: u32) -> Fixture {
        let stock = Arc::new(StockLedger::new());
        let ledger = Arc::new(AccountingLedger::new());
        let gateways = Arc::new(Flaky::new(stock.clone(), ledger.clone()));
        let relay = Relay::new(
            Arc::new(Outbox::new()),
            gateways.clone(),
            gateways.clone(),
            RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO),
        );
        Fixture {
            stock,
            ledger,
            gateways,
            relay,
        }
    }

    fn purchase_plan() -> Vec<PlannedEffect> {
        vec![
            PlannedEffect {
                idempotency_key: "PURCHASE-1:line-0".into(),
                effect: SideEffect::Stock(StockUpdateRequest::new(
                    "A1",
                    120,
                    MovementType::Entrada,
                    "PURCHASE-1",
                    "Recepción de compra",
                )),
            },
            PlannedEffect {
                idempotency_key: "PURCHASE-1:posting".into(),
                effect: SideEffect::Ledger(LedgerPosting::purchase(1, dec!(50.00))),
            },
        ]
    }

    #[tokio::test]
    async fn delivers_everything_once() {
        let f = fixture(3);
        f.relay.outbox().enqueue(purchase_plan()).unwrap();

        let report = f.relay.drain_once().await.unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(f.relay.drain_once().await.unwrap(), RelayReport::default());

        assert_eq!(f.stock.stock("A1").unwrap().quantity, 120);
        assert_eq!(f.ledger.by_reference(ReferenceType::Purchase, Some(1)).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn concurrent_passes_deliver_each_intent_once() {
        let f = fixture(3);
        f.relay.outbox().enqueue(purchase_plan()).unwrap();

        let other = f.relay.clone();
        let (a, b) = tokio::join!(f.relay.drain_once(), other.drain_once());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.delivered + b.delivered, 2);
        assert_eq!(a.retried + b.retried + a.dead_lettered + b.dead_lettered, 0);
        assert_eq!(f.gateways.calls.load(Ordering::SeqCst), 2);
        for intent in f.relay.outbox().list().unwrap() {
            assert_eq!(intent.status, IntentStatus::Delivered);
            assert_eq!(intent.attempts, 1);
        }
        assert_eq!(f.stock.stock("A1").unwrap().quantity, 120);
    }

    #[tokio::test]
    async fn unavailable_ledger_keeps_intent_pending_until_it_recovers() {
        let f = fixture(5);
        f.gateways.set_fail_on_ledger(true);
        f.relay.outbox().enqueue(purchase_plan()).unwrap();

        let report = f.relay.drain_once().await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.retried, 1);
        assert!(f.ledger.by_reference(ReferenceType::Purchase, Some(1)).unwrap().is_empty());

        f.gateways.set_fail_on_ledger(false);
        let report = f.relay.drain_once().await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(f.ledger.by_reference(ReferenceType::Purchase, Some(1)).unwrap().len(), 4);

        let statuses: Vec<IntentStatus> =
            f.relay.outbox().list().unwrap().iter().map(|i| i.status).collect();
        assert_eq!(statuses, vec![IntentStatus::Delivered, IntentStatus::Delivered]);
    }

    #[tokio::test]
    async fn exhausted_attempts_dead_letter() {
        let f = fixture(2);
        f.gateways.set_fail_on_stock(true);
        f.relay.outbox().enqueue(purchase_plan()).unwrap();

        assert_eq!(f.relay.drain_once().await.unwrap().retried, 1);
        assert_eq!(f.relay.drain_once().await.unwrap().dead_lettered, 1);

        let intents = f.relay.outbox().list().unwrap();
        assert_eq!(intents[0].status, IntentStatus::DeadLettered);
        assert_eq!(intents[0].attempts, 2);
        assert!(f.stock.stock("A1").is_err());
    }

    #[tokio::test]
    async fn rejected_intent_is_not_retried() {
        let f = fixture(5);
        f.relay
            .outbox()
            .enqueue(vec![PlannedEffect {
                idempotency_key: "SALE-2:posting".into(),
                effect: SideEffect::Ledger(LedgerPosting::sale(2, dec!(-1))),
            }])
            .unwrap();

        let report = f.relay.drain_once().await.unwrap();
        assert_eq!(report.dead_lettered, 1);
        assert_eq!(f.relay.outbox().list().unwrap()[0].attempts, 1);
    }

    #[tokio::test]
    async fn background_relay_delivers_on_enqueue() {
        let f = fixture(3);
        let outbox = f.relay.outbox().clone();
        let handle = f.relay.clone().spawn(Duration::from_millis(20));

        outbox.enqueue(purchase_plan()).unwrap();
        for _ in 0..100 {
            if outbox.due(Utc::now()).unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown().await;

        assert_eq!(f.stock.stock("A1").unwrap().quantity, 120);
    }
}
