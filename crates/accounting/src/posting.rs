//! Fixed posting sequences for purchases, sales and manual adjustments.
//!
//! Each function plans the entries to append; the store assigns ids and dates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_core::{DomainError, DomainResult, ensure_within_limit, require_non_blank, round2};

use crate::entry::{AccountingEntry, EntryType, ReferenceType};
use crate::tax::TaxSplit;

pub const PURCHASES: &str = "60.1 Compras";
pub const SUPPLIERS: &str = "42.1 Proveedores";
pub const TAX_CREDIT: &str = "40.111 IGV crédito fiscal";
pub const MERCHANDISE: &str = "20.1 Mercaderías";
pub const STOCK_VARIATION: &str = "61.1 Variación de existencias";
pub const CASH_AND_BANKS: &str = "10.4 Caja y bancos";
pub const CUSTOMERS: &str = "12.1 Clientes";
pub const SALES: &str = "70.1 Ventas";
pub const TAX_PAYABLE: &str = "40.111 IGV por pagar";

/// Request to record the financial side of a finalized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPosting {
    pub reference_type: ReferenceType,
    pub reference_id: u64,
    /// Tax-inclusive order total.
    pub amount: Decimal,
}

/// An entry decided but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub entry_type: EntryType,
    pub debit_account: String,
    pub credit_account: String,
    pub amount: Decimal,
    pub reference_type: ReferenceType,
    pub reference_id: Option<u64>,
    pub description: String,
}

impl PlannedEntry {
    fn new(
        entry_type: EntryType,
        debit: &str,
        credit: &str,
        amount: Decimal,
        reference: (ReferenceType, Option<u64>),
        description: &str,
    ) -> Self {
        Self {
            entry_type,
            debit_account: debit.to_string(),
            credit_account: credit.to_string(),
            amount,
            reference_type: reference.0,
            reference_id: reference.1,
            description: description.to_string(),
        }
    }
}

impl LedgerPosting {
    pub fn purchase(purchase_id: u64, amount: Decimal) -> Self {
        Self {
            reference_type: ReferenceType::Purchase,
            reference_id: purchase_id,
            amount,
        }
    }

    pub fn sale(sale_id: u64, amount: Decimal) -> Self {
        Self {
            reference_type: ReferenceType::Sale,
            reference_id: sale_id,
            amount,
        }
    }

    /// Plan the entry sequence for this posting.
    ///
    /// Entries whose amount rounds to zero are dropped; the rest of the
    /// sequence is kept in order.
    pub fn plan(&self) -> DomainResult<Vec<PlannedEntry>> {
        let total = round2(self.amount);
        if total <= Decimal::ZERO {
            return Err(DomainError::invalid_argument(format!(
                "amount must be greater than zero (got {})",
                self.amount
            )));
        }
        ensure_within_limit(total, "amount")?;

        let split = TaxSplit::from_total(total);
        let reference = (self.reference_type, Some(self.reference_id));

        let planned = match self.reference_type {
            ReferenceType::Purchase => vec![
                PlannedEntry::new(
                    EntryType::Compra,
                    PURCHASES,
                    SUPPLIERS,
                    split.base,
                    reference,
                    "Compra base (sin IGV)",
                ),
                PlannedEntry::new(
                    EntryType::Compra,
                    TAX_CREDIT,
                    SUPPLIERS,
                    split.tax,
                    reference,
                    "IGV crédito fiscal de compra",
                ),
                PlannedEntry::new(
                    EntryType::Destino,
                    MERCHANDISE,
                    STOCK_VARIATION,
                    split.base,
                    reference,
                    "Ingreso de mercadería al almacén",
                ),
                PlannedEntry::new(
                    EntryType::Pago,
                    SUPPLIERS,
                    CASH_AND_BANKS,
                    split.total,
                    reference,
                    "Pago a proveedor",
                ),
            ],
            ReferenceType::Sale => vec![
                PlannedEntry::new(
                    EntryType::Venta,
                    CUSTOMERS,
                    SALES,
                    split.base,
                    reference,
                    "Venta base (sin IGV)",
                ),
                PlannedEntry::new(
                    EntryType::Venta,
                    CUSTOMERS,
                    TAX_PAYABLE,
                    split.tax,
                    reference,
                    "IGV por pagar de venta",
                ),
                PlannedEntry::new(
                    EntryType::Cobro,
                    CASH_AND_BANKS,
                    CUSTOMERS,
                    split.total,
                    reference,
                    "Cobro a cliente",
                ),
            ],
            ReferenceType::Adjustment => {
                return Err(DomainError::invalid_argument(
                    "adjustments are posted through the adjustment operation",
                ));
            }
        };

        Ok(planned.into_iter().filter(|e| !e.amount.is_zero()).collect())
    }
}

/// Plan a manual AJUSTE entry. Adjustments carry no reference id.
pub fn adjustment(
    debit_account: &str,
    credit_account: &str,
    amount: Decimal,
    description: &str,
) -> DomainResult<PlannedEntry> {
    require_non_blank(debit_account, "debitAccount")?;
    require_non_blank(credit_account, "creditAccount")?;
    let debit = debit_account.trim();
    let credit = credit_account.trim();
    let amount = round2(amount);
    if amount <= Decimal::ZERO {
        return Err(DomainError::invalid_argument("amount must be greater than zero"));
    }
    ensure_within_limit(amount, "amount")?;

    Ok(PlannedEntry::new(
        EntryType::Ajuste,
        debit,
        credit,
        amount,
        (ReferenceType::Adjustment, None),
        description,
    ))
}

/// The entry handed back to callers after a purchase or sale post: the tax
/// line when one was posted, otherwise the first entry.
pub fn headline(entries: &[AccountingEntry]) -> Option<&AccountingEntry> {
    entries
        .iter()
        .find(|e| e.debit_account == TAX_CREDIT || e.credit_account == TAX_PAYABLE)
        .or_else(|| entries.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradeflow_core::MAX_AMOUNT;

    #[test]
    fn purchase_posts_four_entries() {
        let planned = LedgerPosting::purchase(42, dec!(50.00)).plan().unwrap();
        let summary: Vec<_> = planned
            .iter()
            .map(|e| (e.entry_type, e.debit_account.as_str(), e.credit_account.as_str(), e.amount))
            .collect();

        assert_eq!(
            summary,
            vec![
                (EntryType::Compra, PURCHASES, SUPPLIERS, dec!(42.37)),
                (EntryType::Compra, TAX_CREDIT, SUPPLIERS, dec!(7.63)),
                (EntryType::Destino, MERCHANDISE, STOCK_VARIATION, dec!(42.37)),
                (EntryType::Pago, SUPPLIERS, CASH_AND_BANKS, dec!(50.00)),
            ]
        );
        assert!(planned
            .iter()
            .all(|e| e.reference_type == ReferenceType::Purchase && e.reference_id == Some(42)));
    }

    #[test]
    fn sale_posts_three_entries() {
        let planned = LedgerPosting::sale(7, dec!(100.00)).plan().unwrap();
        let amounts: Vec<_> = planned.iter().map(|e| (e.entry_type, e.amount)).collect();
        assert_eq!(
            amounts,
            vec![
                (EntryType::Venta, dec!(84.75)),
                (EntryType::Venta, dec!(15.25)),
                (EntryType::Cobro, dec!(100.00)),
            ]
        );
        assert_eq!(planned[1].credit_account, TAX_PAYABLE);
        assert_eq!(planned[2].debit_account, CASH_AND_BANKS);
    }

    #[test]
    fn zero_tax_line_is_skipped() {
        let planned = LedgerPosting::sale(1, dec!(0.01)).plan().unwrap();
        assert_eq!(planned.len(), 2);
        assert!(planned.iter().all(|e| e.credit_account != TAX_PAYABLE));
    }

    #[test]
    fn non_positive_totals_are_rejected() {
        assert!(matches!(
            LedgerPosting::purchase(1, Decimal::ZERO).plan(),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            LedgerPosting::sale(1, dec!(-5)).plan(),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn amounts_above_the_limit_are_rejected() {
        let huge = dec!(70000000000000000000000000000);
        assert!(matches!(
            LedgerPosting::purchase(1, huge).plan(),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            adjustment("69.1 Mermas", "20.1 Mercaderías", huge, "merma"),
            Err(DomainError::InvalidArgument(_))
        ));
        assert_eq!(LedgerPosting::sale(1, MAX_AMOUNT).plan().unwrap().len(), 3);
    }

    #[test]
    fn adjustment_requires_accounts_and_positive_amount() {
        let entry = adjustment("69.1 Mermas", "20.1 Mercaderías", dec!(12.5), "merma").unwrap();
        assert_eq!(entry.entry_type, EntryType::Ajuste);
        assert_eq!(entry.reference_type, ReferenceType::Adjustment);
        assert_eq!(entry.reference_id, None);

        assert!(adjustment(" ", "x", dec!(1), "d").is_err());
        assert!(adjustment("x", "y", Decimal::ZERO, "d").is_err());
    }
}
