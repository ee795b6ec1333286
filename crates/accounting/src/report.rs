//! Read-side calculations over a snapshot of ledger entries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_core::{DomainError, DomainResult, checked_sum, require_non_blank};

use crate::entry::{AccountingEntry, EntryType};

/// Inclusive range of calendar days, `[from 00:00:00, to 23:59:59.999999999]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> DomainResult<Self> {
        if from > to {
            return Err(DomainError::invalid_argument(format!(
                "from ({from}) must not be after to ({to})"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        day >= self.from && day <= self.to
    }
}

/// Combinable filter for the entry listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    range: DateRange,
    entry_type: Option<EntryType>,
    search: Option<String>,
    min_amount: Option<Decimal>,
    max_amount: Option<Decimal>,
}

impl EntryFilter {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            entry_type: None,
            search: None,
            min_amount: None,
            max_amount: None,
        }
    }

    /// Blank labels mean "any type".
    pub fn with_type(mut self, label: Option<&str>) -> DomainResult<Self> {
        self.entry_type = match label.map(str::trim) {
            None | Some("") => None,
            Some(label) => Some(label.parse()?),
        };
        Ok(self)
    }

    pub fn with_search(mut self, search: Option<&str>) -> Self {
        self.search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        self
    }

    pub fn with_amount_bounds(
        mut self,
        min: Option<Decimal>,
        max: Option<Decimal>,
    ) -> DomainResult<Self> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(DomainError::invalid_argument(format!(
                    "minAmount ({lo}) must not exceed maxAmount ({hi})"
                )));
            }
        }
        self.min_amount = min;
        self.max_amount = max;
        Ok(self)
    }

    pub fn matches(&self, entry: &AccountingEntry) -> bool {
        if !self.range.contains(entry.date) {
            return false;
        }
        if self.entry_type.is_some_and(|t| t != entry.entry_type) {
            return false;
        }
        if self.min_amount.is_some_and(|min| entry.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| entry.amount > max) {
            return false;
        }
        match &self.search {
            None => true,
            Some(needle) => [&entry.debit_account, &entry.credit_account, &entry.description]
                .iter()
                .any(|field| field.to_lowercase().contains(needle.as_str())),
        }
    }
}

/// Purchases vs sales over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_purchases: Decimal,
    pub total_sales: Decimal,
    pub profit: Decimal,
}

impl Summary {
    /// Only COMPRA and VENTA entries count; settlement and destination lines
    /// would double count the same order.
    pub fn compute<'a>(
        range: DateRange,
        entries: impl IntoIterator<Item = &'a AccountingEntry>,
    ) -> DomainResult<Self> {
        let mut total_purchases = Decimal::ZERO;
        let mut total_sales = Decimal::ZERO;

        for entry in entries.into_iter().filter(|e| range.contains(e.date)) {
            match entry.entry_type {
                EntryType::Compra => {
                    total_purchases = checked_sum(total_purchases, entry.amount, "totalPurchases")?
                }
                EntryType::Venta => total_sales = checked_sum(total_sales, entry.amount, "totalSales")?,
                _ => {}
            }
        }

        Ok(Self {
            from: range.from(),
            to: range.to(),
            total_purchases,
            total_sales,
            profit: total_sales - total_purchases,
        })
    }
}

/// Debit and credit totals for one account over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account: String,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub net: Decimal,
}

impl AccountBalance {
    pub fn compute<'a>(
        account: &str,
        range: DateRange,
        entries: impl IntoIterator<Item = &'a AccountingEntry>,
    ) -> DomainResult<Self> {
        require_non_blank(account, "account")?;
        let account = account.trim();

        let mut total_debits = Decimal::ZERO;
        let mut total_credits = Decimal::ZERO;

        for entry in entries.into_iter().filter(|e| range.contains(e.date)) {
            if entry.debit_account == account {
                total_debits = checked_sum(total_debits, entry.amount, "totalDebits")?;
            }
            if entry.credit_account == account {
                total_credits = checked_sum(total_credits, entry.amount, "totalCredits")?;
            }
        }

        Ok(Self {
            account: account.to_string(),
            total_debits,
            total_credits,
            net: total_debits - total_credits,
        })
    }
}
