//! Append-only double-entry ledger with report queries.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use rust_decimal::Decimal;

use tradeflow_accounting::posting::{self, PlannedEntry};
use tradeflow_accounting::{
    AccountBalance, AccountingEntry, DateRange, EntryFilter, LedgerPosting, ReferenceType, Summary,
};
use tradeflow_core::{DomainError, EntryId};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<AccountingEntry>,
    /// Idempotency key -> ids posted under it.
    posted: HashMap<String, Vec<EntryId>>,
    last_id: u64,
}

impl LedgerState {
    fn append(&mut self, planned: Vec<PlannedEntry>) -> Vec<AccountingEntry> {
        let date = Utc::now();
        planned
            .into_iter()
            .map(|p| {
                self.last_id += 1;
                let entry = AccountingEntry {
                    id: EntryId::new(self.last_id),
                    date,
                    entry_type: p.entry_type,
                    debit_account: p.debit_account,
                    credit_account: p.credit_account,
                    amount: p.amount,
                    reference_type: p.reference_type,
                    reference_id: p.reference_id,
                    description: p.description,
                };
                self.entries.push(entry.clone());
                entry
            })
            .collect()
    }

    fn by_ids(&self, ids: &[EntryId]) -> Vec<AccountingEntry> {
        self.entries
            .iter()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect()
    }
}

/// Accounting store. A posting's entries are appended under one write lock,
/// so readers never see half a sequence.
#[derive(Debug, Default)]
pub struct AccountingLedger {
    state: RwLock<LedgerState>,
}

impl AccountingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post the fixed entry sequence for a finalized purchase or sale.
    ///
    /// A key seen before returns the entries posted under it and appends
    /// nothing.
    #[tracing::instrument(skip(self, posting), fields(reference = %posting.reference_type, id = posting.reference_id))]
    pub fn post(
        &self,
        posting: &LedgerPosting,
        idempotency_key: Option<&str>,
    ) -> StoreResult<Vec<AccountingEntry>> {
        let planned = posting.plan()?;
        let key = idempotency_key.map(str::trim).filter(|k| !k.is_empty());

        let mut state = self.write()?;
        if let Some(key) = key {
            if let Some(ids) = state.posted.get(key) {
                tracing::debug!(idempotency_key = key, "posting already recorded");
                return Ok(state.by_ids(ids));
            }
        }

        let entries = state.append(planned);
        if let Some(key) = key {
            state
                .posted
                .insert(key.to_string(), entries.iter().map(|e| e.id).collect());
        }

        tracing::info!(
            amount = %posting.amount,
            entries = entries.len(),
            "ledger posting recorded"
        );
        Ok(entries)
    }

    pub fn post_purchase(
        &self,
        purchase_id: u64,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> StoreResult<Vec<AccountingEntry>> {
        self.post(&LedgerPosting::purchase(purchase_id, amount), idempotency_key)
    }

    pub fn post_sale(
        &self,
        sale_id: u64,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> StoreResult<Vec<AccountingEntry>> {
        self.post(&LedgerPosting::sale(sale_id, amount), idempotency_key)
    }

    pub fn post_adjustment(
        &self,
        debit_account: &str,
        credit_account: &str,
        amount: Decimal,
        description: &str,
    ) -> StoreResult<AccountingEntry> {
        let planned = posting::adjustment(debit_account, credit_account, amount, description)?;
        let mut state = self.write()?;
        let entry = state
            .append(vec![planned])
            .pop()
            .ok_or_else(|| DomainError::invalid_state("adjustment produced no entry"))?;
        tracing::info!(entry_id = %entry.id, amount = %entry.amount, "adjustment posted");
        Ok(entry)
    }

    pub fn summary(&self, range: DateRange) -> StoreResult<Summary> {
        let state = self.read()?;
        Ok(Summary::compute(range, &state.entries)?)
    }

    pub fn entries(&self, filter: &EntryFilter) -> StoreResult<Vec<AccountingEntry>> {
        let state = self.read()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    pub fn account_balance(&self, account: &str, range: DateRange) -> StoreResult<AccountBalance> {
        let state = self.read()?;
        Ok(AccountBalance::compute(account, range, &state.entries)?)
    }

    /// Entries sharing a reference, in posting order.
    pub fn by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: Option<u64>,
    ) -> StoreResult<Vec<AccountingEntry>> {
        let state = self.read()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.is_reference(reference_type, reference_id))
            .cloned()
            .collect())
    }

    pub fn entry(&self, id: EntryId) -> StoreResult<AccountingEntry> {
        let state = self.read()?;
        state
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("accounting entry {id} not found")).into())
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, LedgerState>> {
        self.state.read().map_err(|_| StoreError::Poisoned("ledger"))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, LedgerState>> {
        self.state.write().map_err(|_| StoreError::Poisoned("ledger"))
    }
}
