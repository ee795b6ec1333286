//! Side effects of a finalized order.
//!
//! Finalizing commits the order first; the stock movements and the ledger
//! posting are then planned from the committed `OrderFinalized` event and
//! delivered separately, each under a stable idempotency key so that
//! re-delivery never duplicates a movement or a posting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_accounting::LedgerPosting;
use tradeflow_inventory::StockUpdateRequest;

use crate::kind::OrderKind;
use crate::order::OrderFinalized;

/// A request for another ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "request", rename_all = "lowercase")]
pub enum SideEffect {
    Stock(StockUpdateRequest),
    Ledger(LedgerPosting),
}

/// A side effect together with the key the receiving ledger dedupes on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedEffect {
    pub idempotency_key: String,
    pub effect: SideEffect,
}

/// One stock movement per line (`quantity * unitsPerPackage` base units),
/// then one posting for the order total. Orders totalling zero get no
/// posting.
pub fn plan_side_effects<K: OrderKind>(finalized: &OrderFinalized) -> Vec<PlannedEffect> {
    let reference = format!("{}-{}", K::REFERENCE_PREFIX, finalized.order_id);

    let mut planned: Vec<PlannedEffect> = finalized
        .items
        .iter()
        .enumerate()
        .map(|(idx, item)| PlannedEffect {
            idempotency_key: format!("{reference}:line-{idx}"),
            effect: SideEffect::Stock(StockUpdateRequest::new(
                item.product_sku.clone(),
                item.base_units(),
                K::MOVEMENT_TYPE,
                reference.clone(),
                K::MOVEMENT_REASON,
            )),
        })
        .collect();

    if finalized.total > Decimal::ZERO {
        planned.push(PlannedEffect {
            idempotency_key: format!("{reference}:posting"),
            effect: SideEffect::Ledger(LedgerPosting {
                reference_type: K::REFERENCE_TYPE,
                reference_id: finalized.order_id.value(),
                amount: finalized.total,
            }),
        });
    }

    planned
}
