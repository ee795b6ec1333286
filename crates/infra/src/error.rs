use thiserror::Error;

use tradeflow_core::DomainError;

/// Failure of an in-memory ledger or outbox operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;
