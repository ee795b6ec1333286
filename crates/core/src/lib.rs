//! `tradeflow-core` - shared domain building blocks.
//!
//! Pure domain primitives only: identifiers, the aggregate contract, the error
//! taxonomy and money rounding. No IO lives here.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult, require_non_blank};
pub use id::{CounterpartyId, EntryId, MovementId, OrderId, StockRecordId};
pub use money::{MAX_AMOUNT, checked_sum, ensure_within_limit, round2};
