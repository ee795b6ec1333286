//! Monetary amounts.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Largest amount a single line, order total or posting may carry
/// (10^15). Sums of any realistic number of such amounts stay inside
/// `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Round half-up (away from zero) to two decimal places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Reject amounts above [`MAX_AMOUNT`].
pub fn ensure_within_limit(amount: Decimal, field: &str) -> DomainResult<Decimal> {
    if amount > MAX_AMOUNT {
        return Err(DomainError::invalid_argument(format!(
            "{field} must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(amount)
}

/// `acc + amount`, as an error instead of a panic when it overflows.
pub fn checked_sum(acc: Decimal, amount: Decimal, field: &str) -> DomainResult<Decimal> {
    acc.checked_add(amount)
        .ok_or_else(|| DomainError::invalid_argument(format!("{field} is out of range")))
}
