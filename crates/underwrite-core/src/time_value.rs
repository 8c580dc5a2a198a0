use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::UnderwriteError;
use crate::types::{Money, Rate};
use crate::UnderwriteResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const STEP_THRESHOLD: Decimal = dec!(0.000000001);
const MAX_IRR_ITERATIONS: u32 = 100;

// Keeps (1 + r)^-t representable for 10+ year horizons.
const RATE_FLOOR: Decimal = dec!(-0.95);
const RATE_CEILING: Decimal = dec!(10);

/// NPV(r) and dNPV/dr, or None when an intermediate overflows.
fn npv_and_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    // (1+r)^-t
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        let pv = cf.checked_mul(discount)?;
        npv = npv.checked_add(pv)?;
        if t > 0 {
            let term = Decimal::from(t as i64)
                .checked_mul(pv)?
                .checked_div(one_plus_r)?;
            dnpv = dnpv.checked_sub(term)?;
        }
        discount = discount.checked_div(one_plus_r)?;
    }

    Some((npv, dnpv))
}

/// Internal Rate of Return using Newton-Raphson
pub fn irr(cash_flows: &[Money], guess: Rate) -> UnderwriteResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(UnderwriteError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let mut rate = guess.clamp(RATE_FLOOR, RATE_CEILING);
    let mut last_npv = Decimal::MAX;

    for i in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) =
            npv_and_derivative(cash_flows, rate).ok_or_else(|| {
                UnderwriteError::ConvergenceFailure {
                    function: "IRR".into(),
                    iterations: i,
                    last_delta: last_npv,
                }
            })?;
        last_npv = npv_val;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        if dnpv.is_zero() {
            return Err(UnderwriteError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: npv_val,
            });
        }

        let step = npv_val / dnpv;
        let unclamped = rate - step;
        let next = unclamped.clamp(RATE_FLOOR, RATE_CEILING);

        if (next - rate).abs() < STEP_THRESHOLD {
            // Pinned at a bound: the root lies outside the search range.
            if next != unclamped {
                return Err(UnderwriteError::ConvergenceFailure {
                    function: "IRR".into(),
                    iterations: i,
                    last_delta: npv_val,
                });
            }
            return Ok(next);
        }
        rate = next;
    }

    Err(UnderwriteError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: last_npv,
    })
}
