use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::deal::{DealInputs, DerivedAssumptions};
use crate::types::{Money, Rate, Years};

/// Straight-line recovery periods (residential rental vs. nonresidential).
const RESIDENTIAL_RECOVERY_YEARS: Years = dec!(27.5);
const NONRESIDENTIAL_RECOVERY_YEARS: Years = dec!(39);

/// Rate applied to gain attributable to depreciation taken.
const RECAPTURE_RATE: Rate = dec!(0.25);
/// Rate applied to gain beyond depreciation taken.
const CAPITAL_GAINS_RATE: Rate = dec!(0.20);

/// Straight-line cost recovery for the improvements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depreciation {
    pub depreciable_basis: Money,
    pub recovery_years: Years,
    pub annual_depreciation: Money,
}

/// Taxes due on disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleTax {
    pub cumulative_depreciation: Money,
    pub adjusted_basis: Money,
    pub gain_on_sale: Money,
    pub depreciation_recapture_tax: Money,
    pub capital_gains_tax: Money,
    pub total_tax: Money,
}

/// Building share of price and closing costs, plus capex, recovered over
/// 27.5 years for multifamily and 39 years otherwise.
pub fn depreciation(deal: &DealInputs, derived: &DerivedAssumptions) -> Depreciation {
    let building_share = (Decimal::ONE - deal.financing.land_value_pct).max(Decimal::ZERO);
    let depreciable_basis =
        (deal.purchase_price + derived.closing_costs) * building_share + derived.total_capex;
    let recovery_years = if derived.is_multifamily() {
        RESIDENTIAL_RECOVERY_YEARS
    } else {
        NONRESIDENTIAL_RECOVERY_YEARS
    };
    Depreciation {
        depreciable_basis,
        recovery_years,
        annual_depreciation: depreciable_basis / recovery_years,
    }
}

/// Income tax for one operating year. Losses are not carried.
pub fn operating_tax(noi: Money, interest: Money, depreciation: Money, tax_rate: Rate) -> Money {
    ((noi - interest - depreciation) * tax_rate).max(Decimal::ZERO)
}

/// Recapture and capital gains tax on a sale after `years_held` years.
pub fn tax_on_sale(
    total_project_cost: Money,
    schedule: &Depreciation,
    years_held: u32,
    sale_price: Money,
    sale_costs: Money,
) -> SaleTax {
    let cumulative_depreciation = (schedule.annual_depreciation * Decimal::from(years_held))
        .min(schedule.depreciable_basis);
    let adjusted_basis = total_project_cost - cumulative_depreciation;
    let gain_on_sale = sale_price - sale_costs - adjusted_basis;

    let recaptured = cumulative_depreciation.min(gain_on_sale.max(Decimal::ZERO));
    let depreciation_recapture_tax = recaptured * RECAPTURE_RATE;
    let capital_gains_tax =
        (gain_on_sale - cumulative_depreciation).max(Decimal::ZERO) * CAPITAL_GAINS_RATE;

    SaleTax {
        cumulative_depreciation,
        adjusted_basis,
        gain_on_sale,
        depreciation_recapture_tax,
        capital_gains_tax,
        total_tax: depreciation_recapture_tax + capital_gains_tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::derive;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn taxed_deal() -> DealInputs {
        DealInputs::builder()
            .purchase_price(dec!(10000000))
            .current_noi(dec!(520000))
            .total_units(40)
            .in_place_rent(dec!(1350))
            .planned_capex(dec!(200000))
            .tax_rate(dec!(0.37))
            .build()
    }

    #[test]
    fn test_multifamily_depreciation() {
        let deal = taxed_deal();
        let d = depreciation(&deal, &derive(&deal));
        // (10M + 300k) * 0.8 + 200k
        assert_eq!(d.depreciable_basis, dec!(8440000));
        assert_eq!(d.recovery_years, dec!(27.5));
        assert_eq!(d.annual_depreciation, dec!(8440000) / dec!(27.5));
    }

    #[test]
    fn test_commercial_uses_39_years() {
        let deal = taxed_deal().to_builder().property_type("Office - Class A").build();
        let d = depreciation(&deal, &derive(&deal));
        assert_eq!(d.recovery_years, dec!(39));
    }

    #[test]
    fn test_operating_tax_never_negative() {
        assert_eq!(operating_tax(dec!(100), dec!(80), dec!(50), dec!(0.3)), Decimal::ZERO);
        assert_eq!(operating_tax(dec!(200), dec!(50), dec!(50), dec!(0.3)), dec!(30));
    }

    #[test]
    fn test_sale_tax_splits_recapture_and_gain() {
        let schedule = Depreciation {
            depreciable_basis: dec!(800000),
            recovery_years: dec!(27.5),
            annual_depreciation: dec!(20000),
        };
        // cost 1M, 5 years => 100k depreciation, adjusted basis 900k
        let tax = tax_on_sale(dec!(1000000), &schedule, 5, dec!(1250000), dec!(50000));
        assert_eq!(tax.cumulative_depreciation, dec!(100000));
        assert_eq!(tax.adjusted_basis, dec!(900000));
        assert_eq!(tax.gain_on_sale, dec!(300000));
        assert_eq!(tax.depreciation_recapture_tax, dec!(25000));
        assert_eq!(tax.capital_gains_tax, dec!(40000));
        assert_eq!(tax.total_tax, dec!(65000));
    }

    #[test]
    fn test_sale_at_loss_owes_nothing() {
        let schedule = Depreciation {
            depreciable_basis: dec!(800000),
            recovery_years: dec!(27.5),
            annual_depreciation: dec!(20000),
        };
        let tax = tax_on_sale(dec!(1000000), &schedule, 5, dec!(800000), dec!(20000));
        assert!(tax.gain_on_sale < Decimal::ZERO);
        assert_eq!(tax.total_tax, Decimal::ZERO);
    }
}
