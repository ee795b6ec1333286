use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_core::round2;

/// IGV rate applied to every purchase and sale total (0.18).
pub const TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// A tax-inclusive total broken into its base and tax parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSplit {
    pub total: Decimal,
    pub base: Decimal,
    pub tax: Decimal,
}

impl TaxSplit {
    /// `base = round2(total / (1 + rate))`, `tax = round2(total - base)`.
    pub fn from_total(total: Decimal) -> Self {
        let base = round2(total / (Decimal::ONE + TAX_RATE));
        let tax = round2(total - base);
        Self { total, base, tax }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn splits_known_totals() {
        let purchase = TaxSplit::from_total(dec!(50.00));
        assert_eq!(purchase.base, dec!(42.37));
        assert_eq!(purchase.tax, dec!(7.63));

        let sale = TaxSplit::from_total(dec!(100.00));
        assert_eq!(sale.base, dec!(84.75));
        assert_eq!(sale.tax, dec!(15.25));
    }

    #[test]
    fn one_cent_has_no_tax() {
        let split = TaxSplit::from_total(dec!(0.01));
        assert_eq!(split.base, dec!(0.01));
        assert_eq!(split.tax, Decimal::ZERO);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: base and tax always add back up to the total within a cent.
        #[test]
        fn base_plus_tax_matches_total(cents in 1i64..100_000_000i64) {
            let total = Decimal::new(cents, 2);
            let split = TaxSplit::from_total(total);
            prop_assert!((split.base + split.tax - total).abs() <= dec!(0.01));
            prop_assert!(split.base >= Decimal::ZERO);
            prop_assert!(split.tax >= Decimal::ZERO);
            prop_assert!(split.base.scale() <= 2);
            prop_assert!(split.tax.scale() <= 2);
        }
    }
}
