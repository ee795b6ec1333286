//! Per-SKU stock records and the append-only movement log.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use tradeflow_core::{DomainError, MovementId, StockRecordId};
use tradeflow_inventory::{StockMovement, StockRecord, StockUpdateRequest};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct StockState {
    records: HashMap<String, StockRecord>,
    movements: Vec<StockMovement>,
    /// Idempotency key -> index into `movements`.
    applied: HashMap<String, usize>,
    last_record_id: u64,
    last_movement_id: u64,
}

/// Stock store. Writes serialize on one lock; reads take a consistent
/// snapshot under the read lock.
#[derive(Debug, Default)]
pub struct StockLedger {
    state: RwLock<StockState>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one movement and append it to the log.
    ///
    /// A SALIDA larger than the current quantity empties the record and
    /// records the difference as `shortfall`. A key that was already applied
    /// returns the original movement without touching stock.
    #[tracing::instrument(skip(self, request), fields(sku = %request.product_sku))]
    pub fn apply_movement(
        &self,
        request: &StockUpdateRequest,
        idempotency_key: Option<&str>,
    ) -> StoreResult<StockMovement> {
        let update = request.validate()?;
        let key = idempotency_key.map(str::trim).filter(|k| !k.is_empty());

        let mut state = self.state.write().map_err(|_| StoreError::Poisoned("stock"))?;

        if let Some(key) = key {
            if let Some(&idx) = state.applied.get(key) {
                tracing::debug!(idempotency_key = key, "movement already applied");
                return Ok(state.movements[idx].clone());
            }
        }

        let StockState {
            records,
            movements,
            applied,
            last_record_id,
            last_movement_id,
        } = &mut *state;

        let record = records.entry(update.product_sku.clone()).or_insert_with(|| {
            *last_record_id += 1;
            StockRecord::new(StockRecordId::new(*last_record_id), update.product_sku.clone())
        });

        let shortfall = record.apply(update.movement_type, update.quantity);
        let quantity_after = record.quantity;
        if shortfall > 0 {
            tracing::warn!(
                shortfall,
                requested = update.quantity,
                reference = update.reference.as_deref().unwrap_or(""),
                "stock exhausted; outgoing movement truncated at zero"
            );
        }

        *last_movement_id += 1;
        let movement = StockMovement {
            id: MovementId::new(*last_movement_id),
            product_sku: update.product_sku,
            quantity: update.quantity,
            movement_type: update.movement_type,
            reference: update.reference,
            reason: update.reason,
            shortfall,
            idempotency_key: key.map(str::to_string),
            created_at: Utc::now(),
        };

        movements.push(movement.clone());
        if let Some(key) = key {
            applied.insert(key.to_string(), movements.len() - 1);
        }

        tracing::info!(
            movement_id = %movement.id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            quantity_after,
            "stock movement applied"
        );
        Ok(movement)
    }

    pub fn stock(&self, sku: &str) -> StoreResult<StockRecord> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned("stock"))?;
        state
            .records
            .get(sku.trim())
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("no stock record for sku '{sku}'")).into())
    }

    /// Movements of one SKU, newest first. Unknown SKUs have no movements.
    pub fn movements(&self, sku: &str) -> StoreResult<Vec<StockMovement>> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned("stock"))?;
        let sku = sku.trim();
        let mut movements: Vec<StockMovement> = state
            .movements
            .iter()
            .filter(|m| m.product_sku == sku)
            .cloned()
            .collect();
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(movements)
    }
}
