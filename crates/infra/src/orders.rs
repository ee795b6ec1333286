//! Application service for purchase and sale orders.
//!
//! Wraps the command dispatcher with id allocation, counterparty lookup and
//! side-effect queueing. Finalize commits the order and queues its stock
//! movements and ledger posting; delivery is the relay's job.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use tradeflow_core::{CounterpartyId, DomainError, OrderId};
use tradeflow_events::EventEnvelope;
use tradeflow_orders::{
    AddItem, CancelOrder, CreateOrder, FinalizeOrder, NewOrderItem, Order, OrderCommand,
    OrderEvent, OrderKind, plan_side_effects,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::directory::CounterpartyDirectory;
use crate::event_store::EventStore;
use crate::ids::IdSequence;
use crate::outbox::Outbox;

pub struct OrderService<K: OrderKind, S> {
    dispatcher: CommandDispatcher<S>,
    directory: Arc<dyn CounterpartyDirectory>,
    outbox: Arc<Outbox>,
    ids: IdSequence,
    kind: PhantomData<K>,
}

impl<K, S> OrderService<K, S>
where
    K: OrderKind,
    S: EventStore,
{
    pub fn new(store: S, directory: Arc<dyn CounterpartyDirectory>, outbox: Arc<Outbox>) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store),
            directory,
            outbox,
            ids: IdSequence::new(),
            kind: PhantomData,
        }
    }

    /// Create a PENDING order for a known counterparty.
    #[tracing::instrument(skip_all, fields(kind = K::REFERENCE_PREFIX, counterparty_id = %counterparty_id, items = items.len()))]
    pub fn create(
        &self,
        counterparty_id: CounterpartyId,
        items: Vec<NewOrderItem>,
    ) -> Result<Order<K>, DispatchError> {
        let role = K::COUNTERPARTY;
        let counterparty = self.directory.resolve(role, counterparty_id).ok_or_else(|| {
            DomainError::not_found(format!("{} {counterparty_id} not found", role.as_str()))
        })?;

        let order_id = OrderId::new(self.ids.next());
        let out = self.dispatcher.dispatch::<Order<K>>(
            K::AGGREGATE_TYPE,
            order_id,
            OrderCommand::Create(CreateOrder {
                order_id,
                counterparty_id,
                counterparty_name: counterparty.name,
                items,
                occurred_at: Utc::now(),
            }),
        )?;

        info!(order_id = %order_id, total = %out.aggregate.total(), "order created");
        Ok(out.aggregate)
    }

    #[tracing::instrument(skip_all, fields(kind = K::REFERENCE_PREFIX, order_id = %order_id))]
    pub fn add_item(&self, order_id: OrderId, item: NewOrderItem) -> Result<Order<K>, DispatchError> {
        let out = self.dispatcher.dispatch::<Order<K>>(
            K::AGGREGATE_TYPE,
            order_id,
            OrderCommand::AddItem(AddItem {
                order_id,
                item,
                occurred_at: Utc::now(),
            }),
        )?;
        Ok(out.aggregate)
    }

    /// Receive a purchase or complete a sale.
    ///
    /// Repeating it on an already finalized order returns the order unchanged
    /// and queues nothing.
    #[tracing::instrument(skip_all, fields(kind = K::REFERENCE_PREFIX, order_id = %order_id))]
    pub fn finalize(&self, order_id: OrderId) -> Result<Order<K>, DispatchError> {
        let out = self.dispatcher.dispatch::<Order<K>>(
            K::AGGREGATE_TYPE,
            order_id,
            OrderCommand::Finalize(FinalizeOrder {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;

        let planned: Vec<_> = out
            .events
            .iter()
            .filter_map(|e| match e {
                OrderEvent::OrderFinalized(f) => Some(plan_side_effects::<K>(f)),
                _ => None,
            })
            .flatten()
            .collect();

        if !out.events.is_empty() {
            let queued = self
                .outbox
                .enqueue(planned)
                .map_err(|e| DispatchError::Outbox(e.to_string()))?;
            info!(
                status = %out.aggregate.status(),
                total = %out.aggregate.total(),
                side_effects = queued,
                "order finalized"
            );
        }

        Ok(out.aggregate)
    }

    #[tracing::instrument(skip_all, fields(kind = K::REFERENCE_PREFIX, order_id = %order_id))]
    pub fn cancel(&self, order_id: OrderId) -> Result<Order<K>, DispatchError> {
        let out = self.dispatcher.dispatch::<Order<K>>(
            K::AGGREGATE_TYPE,
            order_id,
            OrderCommand::Cancel(CancelOrder {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        if !out.events.is_empty() {
            info!("order cancelled");
        }
        Ok(out.aggregate)
    }

    pub fn get(&self, order_id: OrderId) -> Result<Order<K>, DispatchError> {
        let (order, _) = self
            .dispatcher
            .load::<Order<K>>(K::AGGREGATE_TYPE, order_id)?;
        if !order.exists() {
            return Err(DomainError::not_found(format!(
                "{} {order_id} not found",
                K::REFERENCE_PREFIX.to_lowercase()
            ))
            .into());
        }
        Ok(order)
    }

    /// All orders of this kind, ascending by id.
    pub fn list(&self) -> Result<Vec<Order<K>>, DispatchError> {
        self.dispatcher
            .store()
            .list_streams(K::AGGREGATE_TYPE)?
            .into_iter()
            .map(|id| self.get(OrderId::new(id)))
            .collect()
    }

    /// Lifecycle events of one order, oldest first.
    pub fn history(&self, order_id: OrderId) -> Result<Vec<EventEnvelope<OrderEvent>>, DispatchError> {
        let (order, stream) = self
            .dispatcher
            .load::<Order<K>>(K::AGGREGATE_TYPE, order_id)?;
        if !order.exists() {
            return Err(DomainError::not_found(format!(
                "{} {order_id} not found",
                K::REFERENCE_PREFIX.to_lowercase()
            ))
            .into());
        }
        stream
            .iter()
            .map(|e| e.to_envelope::<OrderEvent>().map_err(DispatchError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradeflow_accounting::LedgerPosting;
    use tradeflow_orders::{CounterpartyRole, OrderStatus, Purchase, Sale, SideEffect};

    use crate::directory::InMemoryDirectory;
    use crate::event_store::InMemoryEventStore;

    fn directory() -> Arc<dyn CounterpartyDirectory> {
        Arc::new(
            InMemoryDirectory::new()
                .with(CounterpartyRole::Supplier, 1, "Distribuidora Lima")
                .with(CounterpartyRole::Customer, 2, "Bodega Central"),
        )
    }

    fn purchases(outbox: Arc<Outbox>) -> OrderService<Purchase, InMemoryEventStore> {
        OrderService::new(InMemoryEventStore::new(), directory(), outbox)
    }

    #[test]
    fn create_resolves_the_counterparty_name() {
        let service = purchases(Arc::new(Outbox::new()));
        let order = service
            .create(CounterpartyId::new(1), vec![NewOrderItem::new("A1", 10, dec!(5.00))])
            .unwrap();

        assert_eq!(order.id_typed(), OrderId::new(1));
        assert_eq!(order.counterparty_name(), "Distribuidora Lima");
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total(), dec!(50.00));
    }

    #[test]
    fn unknown_counterparty_is_not_found() {
        let service = purchases(Arc::new(Outbox::new()));
        // Customer 2 is not a supplier.
        let err = service.create(CounterpartyId::new(2), vec![]).unwrap_err();
        match err {
            DispatchError::Domain(DomainError::NotFound(msg)) => assert_eq!(msg, "supplier 2 not found"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(service.list().unwrap().is_empty());
    }

    #[test]
    fn receive_queues_movements_and_posting_once() {
        let outbox = Arc::new(Outbox::new());
        let service = purchases(outbox.clone());
        let order = service
            .create(
                CounterpartyId::new(1),
                vec![NewOrderItem::new("A1", 10, dec!(5.00)).with_packaging("BOX", 12)],
            )
            .unwrap();

        let received = service.finalize(order.id_typed()).unwrap();
        assert_eq!(received.status(), OrderStatus::Received);
        assert!(received.finalized_at().is_some());

        let again = service.finalize(order.id_typed()).unwrap();
        assert_eq!(again, received);

        let intents = outbox.list().unwrap();
        let keys: Vec<&str> = intents.iter().map(|i| i.idempotency_key.as_str()).collect();
        assert_eq!(keys, vec!["PURCHASE-1:line-0", "PURCHASE-1:posting"]);
        assert_eq!(
            intents[1].effect,
            SideEffect::Ledger(LedgerPosting::purchase(1, dec!(50.00)))
        );
    }

    #[test]
    fn add_item_after_receive_is_rejected() {
        let service = purchases(Arc::new(Outbox::new()));
        let order = service.create(CounterpartyId::new(1), vec![]).unwrap();
        let order = service
            .add_item(order.id_typed(), NewOrderItem::new("A1", 1, dec!(3)))
            .unwrap();
        assert_eq!(order.items().len(), 1);

        service.finalize(order.id_typed()).unwrap();
        let err = service
            .add_item(order.id_typed(), NewOrderItem::new("B2", 1, dec!(3)))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::InvalidState(_))));
    }

    #[test]
    fn cancelled_sale_cannot_complete_and_queues_nothing() {
        let outbox = Arc::new(Outbox::new());
        let service: OrderService<Sale, _> =
            OrderService::new(InMemoryEventStore::new(), directory(), outbox.clone());
        let sale = service
            .create(CounterpartyId::new(2), vec![NewOrderItem::new("A1", 1, dec!(10))])
            .unwrap();

        assert_eq!(service.cancel(sale.id_typed()).unwrap().status(), OrderStatus::Cancelled);
        let err = service.finalize(sale.id_typed()).unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::InvalidState(_))));
        assert!(outbox.list().unwrap().is_empty());
    }

    #[test]
    fn get_and_history_of_missing_order_are_not_found() {
        let service = purchases(Arc::new(Outbox::new()));
        assert!(matches!(
            service.get(OrderId::new(9)),
            Err(DispatchError::Domain(DomainError::NotFound(_)))
        ));
        assert!(matches!(
            service.history(OrderId::new(9)),
            Err(DispatchError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[test]
    fn history_lists_lifecycle_events_in_order() {
        let service = purchases(Arc::new(Outbox::new()));
        let order = service.create(CounterpartyId::new(1), vec![]).unwrap();
        service
            .add_item(order.id_typed(), NewOrderItem::new("A1", 2, dec!(1.50)))
            .unwrap();
        service.finalize(order.id_typed()).unwrap();

        let history = service.history(order.id_typed()).unwrap();
        let types: Vec<&str> = history.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["order.created", "order.item_added", "order.finalized"]);
        assert_eq!(history[2].sequence_number(), 3);
    }
}
