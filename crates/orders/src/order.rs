use core::marker::PhantomData;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_core::{
    Aggregate, AggregateRoot, CounterpartyId, DomainError, DomainResult, OrderId, checked_sum,
    ensure_within_limit,
};
use tradeflow_events::Event;

use crate::item::{NewOrderItem, OrderItem};
use crate::kind::OrderKind;

/// Order status lifecycle.
///
/// `PENDING -> RECEIVED` (purchase) or `PENDING -> COMPLETED` (sale), and
/// `PENDING -> CANCELLED`. Nothing leaves a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Received,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate root: a purchase or sale order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order<K: OrderKind> {
    id: OrderId,
    counterparty_id: Option<CounterpartyId>,
    counterparty_name: String,
    status: OrderStatus,
    created_at: Option<DateTime<Utc>>,
    finalized_at: Option<DateTime<Utc>>,
    items: Vec<OrderItem>,
    version: u64,
    created: bool,
    kind: PhantomData<K>,
}

impl<K: OrderKind> Order<K> {
    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn counterparty_id(&self) -> Option<CounterpartyId> {
        self.counterparty_id
    }

    pub fn counterparty_name(&self) -> &str {
        &self.counterparty_name
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// `receivedAt` for purchases, `completedAt` for sales.
    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Sum of `quantity * unitPrice` over all lines. Never stored; commands
    /// keep it within `MAX_AMOUNT`.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Correlation reference used on stock movements (`SALE-7`).
    pub fn reference(&self) -> String {
        format!("{}-{}", K::REFERENCE_PREFIX, self.id)
    }
}

impl<K: OrderKind> AggregateRoot for Order<K> {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder. Items may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub order_id: OrderId,
    pub counterparty_id: CounterpartyId,
    /// Display name resolved from the directory at create time.
    pub counterparty_name: String,
    pub items: Vec<NewOrderItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddItem (only while PENDING).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub order_id: OrderId,
    pub item: NewOrderItem,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FinalizeOrder (`receive` / `complete`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    Create(CreateOrder),
    AddItem(AddItem),
    Finalize(FinalizeOrder),
    Cancel(CancelOrder),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub counterparty_id: CounterpartyId,
    pub counterparty_name: String,
    pub items: Vec<OrderItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAdded {
    pub order_id: OrderId,
    pub item: OrderItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderFinalized.
///
/// Carries the lines and total as of finalization so side effects can be
/// planned from the event alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFinalized {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderCreated(OrderCreated),
    ItemAdded(ItemAdded),
    OrderFinalized(OrderFinalized),
    OrderCancelled(OrderCancelled),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "order.created",
            OrderEvent::ItemAdded(_) => "order.item_added",
            OrderEvent::OrderFinalized(_) => "order.finalized",
            OrderEvent::OrderCancelled(_) => "order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(e) => e.occurred_at,
            OrderEvent::ItemAdded(e) => e.occurred_at,
            OrderEvent::OrderFinalized(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl<K: OrderKind> Aggregate for Order<K> {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn empty(id: OrderId) -> Self {
        Self {
            id,
            counterparty_id: None,
            counterparty_name: String::new(),
            status: OrderStatus::Pending,
            created_at: None,
            finalized_at: None,
            items: Vec::new(),
            version: 0,
            created: false,
            kind: PhantomData,
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.counterparty_id = Some(e.counterparty_id);
                self.counterparty_name = e.counterparty_name.clone();
                self.status = OrderStatus::Pending;
                self.created_at = Some(e.occurred_at);
                self.items = e.items.clone();
                self.created = true;
            }
            OrderEvent::ItemAdded(e) => {
                self.items.push(e.item.clone());
            }
            OrderEvent::OrderFinalized(e) => {
                self.status = e.status;
                self.finalized_at = Some(e.occurred_at);
            }
            OrderEvent::OrderCancelled(_) => {
                self.status = OrderStatus::Cancelled;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::Create(cmd) => self.handle_create(cmd),
            OrderCommand::AddItem(cmd) => self.handle_add_item(cmd),
            OrderCommand::Finalize(cmd) => self.handle_finalize(cmd),
            OrderCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl<K: OrderKind> Order<K> {
    fn ensure_exists(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!(
                "{} {order_id} not found",
                K::AGGREGATE_TYPE
            )));
        }
        if self.id != order_id {
            return Err(DomainError::invalid_state("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!("order {} already exists", cmd.order_id)));
        }

        let items = cmd
            .items
            .iter()
            .zip(1u32..)
            .map(|(item, line_no)| item.resolve(line_no))
            .collect::<Result<Vec<_>, _>>()?;
        ensure_total_within_limit(&items)?;

        Ok(vec![OrderEvent::OrderCreated(OrderCreated {
            order_id: cmd.order_id,
            counterparty_id: cmd.counterparty_id,
            counterparty_name: cmd.counterparty_name.clone(),
            items,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_item(&self, cmd: &AddItem) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;

        if self.status != OrderStatus::Pending {
            return Err(DomainError::invalid_state(format!(
                "cannot add items to an order in status {}",
                self.status
            )));
        }

        let line_no = u32::try_from(self.items.len() + 1)
            .map_err(|_| DomainError::invalid_argument("too many items"))?;
        let item = cmd.item.resolve(line_no)?;
        ensure_total_within_limit(self.items.iter().chain(core::iter::once(&item)))?;

        Ok(vec![OrderEvent::ItemAdded(ItemAdded {
            order_id: cmd.order_id,
            item,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_finalize(&self, cmd: &FinalizeOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;

        match self.status {
            OrderStatus::Pending => {}
            // Already finalized: nothing to record, nothing to re-trigger.
            status if status == K::FINAL_STATUS => return Ok(vec![]),
            status => {
                return Err(DomainError::invalid_state(format!(
                    "cannot move an order from {status} to {}",
                    K::FINAL_STATUS
                )));
            }
        }

        Ok(vec![OrderEvent::OrderFinalized(OrderFinalized {
            order_id: cmd.order_id,
            status: K::FINAL_STATUS,
            items: self.items.clone(),
            total: self.total(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;

        match self.status {
            OrderStatus::Pending => Ok(vec![OrderEvent::OrderCancelled(OrderCancelled {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            })]),
            OrderStatus::Cancelled => Ok(vec![]),
            status => Err(DomainError::invalid_state(format!(
                "cannot cancel an order in status {status}"
            ))),
        }
    }
}

/// Lines and totals are bounded before they are committed, so `total()`
/// never overflows on a stored order.
fn ensure_total_within_limit<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> DomainResult<Decimal> {
    let total = items
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, item| checked_sum(acc, item.line_total(), "order total"))?;
    ensure_within_limit(total, "order total")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{Purchase, Sale};
    use rust_decimal_macros::dec;

    fn order_id() -> OrderId {
        OrderId::new(42)
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn execute<K: OrderKind>(order: &mut Order<K>, cmd: OrderCommand) -> Result<Vec<OrderEvent>, DomainError> {
        let events = order.handle(&cmd)?;
        for e in &events {
            order.apply(e);
        }
        Ok(events)
    }

    fn created<K: OrderKind>(items: Vec<NewOrderItem>) -> Order<K> {
        let mut order = Order::<K>::empty(order_id());
        execute(
            &mut order,
            OrderCommand::Create(CreateOrder {
                order_id: order_id(),
                counterparty_id: CounterpartyId::new(1),
                counterparty_name: "Distribuidora Lima".to_string(),
                items,
                occurred_at: now(),
            }),
        )
        .unwrap();
        order
    }

    fn add_item(id: OrderId, sku: &str) -> OrderCommand {
        OrderCommand::AddItem(AddItem {
            order_id: id,
            item: NewOrderItem::new(sku, 2, dec!(3.50)),
            occurred_at: now(),
        })
    }

    fn finalize(id: OrderId) -> OrderCommand {
        OrderCommand::Finalize(FinalizeOrder {
            order_id: id,
            occurred_at: now(),
        })
    }

    fn cancel(id: OrderId) -> OrderCommand {
        OrderCommand::Cancel(CancelOrder {
            order_id: id,
            occurred_at: now(),
        })
    }

    #[test]
    fn create_allows_an_empty_cart() {
        let order = created::<Purchase>(vec![]);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.items().is_empty());
        assert_eq!(order.total(), Decimal::ZERO);
        assert_eq!(order.version(), 1);
        assert_eq!(order.counterparty_name(), "Distribuidora Lima");
    }

    #[test]
    fn create_numbers_lines_in_order() {
        let order = created::<Sale>(vec![
            NewOrderItem::new("A1", 1, dec!(1)),
            NewOrderItem::new("B2", 1, dec!(1)),
        ]);
        let line_nos: Vec<u32> = order.items().iter().map(|i| i.line_no).collect();
        assert_eq!(line_nos, vec![1, 2]);
    }

    #[test]
    fn create_rejects_blank_sku() {
        let order = Order::<Purchase>::empty(order_id());
        let err = order
            .handle(&OrderCommand::Create(CreateOrder {
                order_id: order_id(),
                counterparty_id: CounterpartyId::new(1),
                counterparty_name: "x".to_string(),
                items: vec![NewOrderItem::new(" ", 1, dec!(1))],
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn add_item_on_pending_appends_one_line() {
        let mut order = created::<Purchase>(vec![]);
        execute(&mut order, add_item(order_id(), "A1")).unwrap();
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.items()[0].line_no, 1);
        assert_eq!(order.total(), dec!(7.00));
    }

    #[test]
    fn add_item_on_unknown_order_is_not_found() {
        let order = Order::<Sale>::empty(order_id());
        let err = order.handle(&add_item(order_id(), "A1")).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn finalize_sets_final_status_and_timestamp() {
        let mut order = created::<Purchase>(vec![NewOrderItem::new("A1", 10, dec!(5.00))]);
        let events = execute(&mut order, finalize(order_id())).unwrap();
        assert_eq!(order.status(), OrderStatus::Received);
        assert!(order.finalized_at().is_some());

        match &events[0] {
            OrderEvent::OrderFinalized(e) => {
                assert_eq!(e.status, OrderStatus::Received);
                assert_eq!(e.total, dec!(50.00));
                assert_eq!(e.items.len(), 1);
            }
            other => panic!("expected OrderFinalized, got {other:?}"),
        }

        let mut sale = created::<Sale>(vec![]);
        execute(&mut sale, finalize(order_id())).unwrap();
        assert_eq!(sale.status(), OrderStatus::Completed);
    }

    #[test]
    fn add_item_after_finalize_is_invalid_state() {
        let mut order = created::<Sale>(vec![]);
        execute(&mut order, finalize(order_id())).unwrap();
        let err = order.handle(&add_item(order_id(), "A1")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn repeated_finalize_is_a_no_op() {
        let mut order = created::<Purchase>(vec![NewOrderItem::new("A1", 1, dec!(1))]);
        execute(&mut order, finalize(order_id())).unwrap();
        let version = order.version();
        let stamp = order.finalized_at();

        let events = execute(&mut order, finalize(order_id())).unwrap();
        assert!(events.is_empty());
        assert_eq!(order.version(), version);
        assert_eq!(order.finalized_at(), stamp);
    }

    #[test]
    fn cancelled_orders_cannot_be_finalized() {
        let mut order = created::<Purchase>(vec![]);
        execute(&mut order, cancel(order_id())).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(order.finalized_at().is_none());

        let err = order.handle(&finalize(order_id())).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert!(order.handle(&cancel(order_id())).unwrap().is_empty());
    }

    #[test]
    fn finalized_orders_cannot_be_cancelled() {
        let mut order = created::<Sale>(vec![]);
        execute(&mut order, finalize(order_id())).unwrap();
        let err = order.handle(&cancel(order_id())).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn rehydrate_rebuilds_state_from_history() {
        let mut order = Order::<Purchase>::empty(order_id());
        let mut history = execute(
            &mut order,
            OrderCommand::Create(CreateOrder {
                order_id: order_id(),
                counterparty_id: CounterpartyId::new(9),
                counterparty_name: "Proveedor Sur".to_string(),
                items: vec![],
                occurred_at: now(),
            }),
        )
        .unwrap();
        history.extend(execute(&mut order, add_item(order_id(), "A1")).unwrap());
        history.extend(execute(&mut order, finalize(order_id())).unwrap());

        let rebuilt = Order::<Purchase>::rehydrate(order_id(), &history);
        assert_eq!(rebuilt, order);
        assert_eq!(rebuilt.version(), 3);
    }

    #[test]
    fn lines_that_would_push_the_total_past_the_limit_are_rejected() {
        let half = tradeflow_core::MAX_AMOUNT / dec!(2);
        let mut order = created::<Purchase>(vec![NewOrderItem::new("A1", 1, half)]);
        execute(
            &mut order,
            OrderCommand::AddItem(AddItem {
                order_id: order_id(),
                item: NewOrderItem::new("B2", 1, half),
                occurred_at: now(),
            }),
        )
        .unwrap();

        let err = order
            .handle(&OrderCommand::AddItem(AddItem {
                order_id: order_id(),
                item: NewOrderItem::new("C3", 1, dec!(0.01)),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.total(), tradeflow_core::MAX_AMOUNT);

        let fresh = Order::<Sale>::empty(order_id());
        let err = fresh
            .handle(&OrderCommand::Create(CreateOrder {
                order_id: order_id(),
                counterparty_id: CounterpartyId::new(1),
                counterparty_name: "x".to_string(),
                items: vec![
                    NewOrderItem::new("A1", 1, half),
                    NewOrderItem::new("B2", 2, half),
                ],
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn reference_uses_kind_prefix() {
        assert_eq!(created::<Purchase>(vec![]).reference(), "PURCHASE-42");
        assert_eq!(created::<Sale>(vec![]).reference(), "SALE-42");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn line() -> impl Strategy<Value = (i64, i64)> {
            // (quantity, price in cents)
            (0i64..1_000, 0i64..100_000)
        }

        proptest! {
            /// Each accepted addItem adds one line; the total is the sum of
            /// line totals and nothing can be added once finalized.
            #[test]
            fn pending_orders_grow_one_line_per_item(lines in prop::collection::vec(line(), 0..20)) {
                let mut order = created::<Purchase>(vec![]);
                let mut expected = Decimal::ZERO;

                for (n, (qty, cents)) in lines.iter().enumerate() {
                    let price = Decimal::new(*cents, 2);
                    let cmd = OrderCommand::AddItem(AddItem {
                        order_id: order_id(),
                        item: NewOrderItem::new("A1", *qty, price),
                        occurred_at: now(),
                    });
                    execute(&mut order, cmd).unwrap();
                    expected += price * Decimal::from(*qty);
                    prop_assert_eq!(order.items().len(), n + 1);
                    prop_assert_eq!(order.items()[n].line_no as usize, n + 1);
                }
                prop_assert_eq!(order.total(), expected);

                execute(&mut order, finalize(order_id())).unwrap();
                let err = order.handle(&add_item(order_id(), "B2")).unwrap_err();
                prop_assert!(matches!(err, DomainError::InvalidState(_)));
            }
        }
    }
}
