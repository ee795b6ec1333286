//! Accounting module (tax-aware double-entry postings and ledger reports).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. The
//! append-only store that owns entries lives in the infrastructure crate.

pub mod entry;
pub mod posting;
pub mod report;
pub mod tax;

pub use entry::{AccountingEntry, EntryType, ReferenceType};
pub use posting::{LedgerPosting, PlannedEntry, headline};
pub use report::{AccountBalance, DateRange, EntryFilter, Summary};
pub use tax::{TAX_RATE, TaxSplit};
