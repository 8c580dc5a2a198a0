use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::{DealInputs, DerivedAssumptions};
use crate::types::Money;

/// Capital stack at close: where the money comes from and where it goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesUses {
    /// (label, amount) in display order
    pub sources: Vec<(String, Money)>,
    pub uses: Vec<(String, Money)>,
    pub total_sources: Money,
    pub total_uses: Money,
    /// Whether sources equal uses to the cent
    pub balanced: bool,
}

pub fn build_sources_uses(deal: &DealInputs, derived: &DerivedAssumptions) -> SourcesUses {
    let sources: Vec<(String, Money)> = vec![
        ("Senior Debt".into(), derived.loan_amount),
        ("Sponsor Equity".into(), derived.equity_required),
    ];
    let uses: Vec<(String, Money)> = vec![
        ("Purchase Price".into(), deal.purchase_price),
        ("Closing Costs".into(), derived.closing_costs),
        ("Deferred Maintenance".into(), deal.deferred_maintenance),
        ("Planned Capex".into(), deal.planned_capex),
    ];

    let total_sources: Money = sources.iter().map(|(_, amt)| *amt).sum();
    let total_uses: Money = uses.iter().map(|(_, amt)| *amt).sum();
    let balanced = (total_sources - total_uses).abs() < Decimal::new(1, 2);

    SourcesUses {
        sources,
        uses,
        total_sources,
        total_uses,
        balanced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::derive;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sources_equal_uses() {
        let deal = DealInputs::builder()
            .purchase_price(dec!(10000000))
            .current_noi(dec!(520000))
            .total_units(40)
            .in_place_rent(dec!(1350))
            .deferred_maintenance(dec!(150000))
            .planned_capex(dec!(250000))
            .build();
        let su = build_sources_uses(&deal, &derive(&deal));
        assert_eq!(su.total_uses, dec!(10700000));
        assert_eq!(su.total_sources, dec!(10700000));
        assert_eq!(su.sources[0], ("Senior Debt".to_string(), dec!(6500000)));
        assert_eq!(su.sources[1].1, dec!(4200000));
        assert!(su.balanced);
    }
}
