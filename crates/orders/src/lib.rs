//! Purchase and sale orders (event-sourced).
//!
//! Both order kinds share one aggregate, [`Order`], parameterized by an
//! [`OrderKind`] marker that carries the kind-specific labels (final status,
//! movement direction, correlation prefix). Deterministic domain logic only.

pub mod effects;
pub mod item;
pub mod kind;
pub mod order;

pub use effects::{PlannedEffect, SideEffect, plan_side_effects};
pub use item::{NewOrderItem, OrderItem};
pub use kind::{CounterpartyRole, OrderKind, Purchase, Sale};
pub use order::{
    AddItem, CancelOrder, CreateOrder, FinalizeOrder, ItemAdded, Order, OrderCancelled,
    OrderCommand, OrderCreated, OrderEvent, OrderFinalized, OrderStatus,
};
