use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::time_value;
use crate::types::{Money, Multiple, Rate};

/// Starting points tried in order; the first that converges wins.
const IRR_GUESSES: [Rate; 5] = [dec!(0.10), dec!(0.0), dec!(0.25), dec!(-0.20), dec!(0.50)];

/// IRR of an annual cash-flow vector, or `None` when it is undefined
/// (no sign change) or the solver fails from every starting guess.
pub fn irr(cash_flows: &[Money]) -> Option<Rate> {
    if cash_flows.len() < 2 {
        return None;
    }
    let has_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !(has_positive && has_negative) {
        return None;
    }

    IRR_GUESSES
        .iter()
        .find_map(|guess| time_value::irr(cash_flows, *guess).ok())
}

/// Sum of distributions over the initial outlay. Zero for an empty vector or
/// a zero outlay.
pub fn equity_multiple(cash_flows: &[Money]) -> Multiple {
    match cash_flows.split_first() {
        Some((first, rest)) if !first.is_zero() => {
            rest.iter().copied().sum::<Decimal>() / first.abs()
        }
        _ => Decimal::ZERO,
    }
}

pub fn cash_on_cash(cash_flow: Money, equity: Money) -> Rate {
    if equity.is_zero() {
        Decimal::ZERO
    } else {
        cash_flow / equity
    }
}

/// Debt service coverage: NOI / annual debt service.
pub fn dscr(noi: Money, annual_debt_service: Money) -> Multiple {
    if annual_debt_service.is_zero() {
        Decimal::ZERO
    } else {
        noi / annual_debt_service
    }
}

pub fn yield_on_cost(noi: Money, total_cost: Money) -> Rate {
    if total_cost.is_zero() {
        Decimal::ZERO
    } else {
        noi / total_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_irr_known_answer() {
        let r = irr(&[dec!(-1000), dec!(400), dec!(400), dec!(400)]).unwrap();
        assert!((r - dec!(0.0970)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_irr_ten_year_hold_with_reversion() {
        // -3.8M equity, 150k/yr, 6M back in year 10
        let mut flows = vec![dec!(-3800000)];
        flows.extend(std::iter::repeat(dec!(150000)).take(9));
        flows.push(dec!(6150000));
        let r = irr(&flows).unwrap();
        assert!(r > dec!(0.07) && r < dec!(0.09), "irr = {r}");
    }

    #[test]
    fn test_irr_none_without_sign_change() {
        assert_eq!(irr(&[dec!(100), dec!(50), dec!(50)]), None);
        assert_eq!(irr(&[dec!(-100), dec!(-50), dec!(0)]), None);
        assert_eq!(irr(&[dec!(0), dec!(0)]), None);
    }

    #[test]
    fn test_irr_none_when_root_outside_search_range() {
        // -99% and 9900% respectively; the solver bounds must not be reported
        assert_eq!(irr(&[dec!(-100), dec!(1)]), None);
        assert_eq!(irr(&[dec!(-1), dec!(100)]), None);
    }

    #[test]
    fn test_irr_none_for_short_vector() {
        assert_eq!(irr(&[dec!(-100)]), None);
        assert_eq!(irr(&[]), None);
    }

    #[test]
    fn test_equity_multiple() {
        assert_eq!(
            equity_multiple(&[dec!(-100), dec!(50), dec!(50), dec!(200)]),
            dec!(3)
        );
        assert_eq!(equity_multiple(&[dec!(0), dec!(50)]), Decimal::ZERO);
        assert_eq!(equity_multiple(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_ratio_helpers_guard_zero() {
        assert_eq!(cash_on_cash(dec!(100), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(dscr(dec!(100), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(yield_on_cost(dec!(100), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(dscr(dec!(125), dec!(100)), dec!(1.25));
        assert_eq!(cash_on_cash(dec!(50), dec!(1000)), dec!(0.05));
        assert_eq!(yield_on_cost(dec!(60), dec!(1000)), dec!(0.06));
    }
}
