use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One month of the loan schedule. Amounts are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationMonth {
    pub month: u32,
    pub payment: Money,
    pub principal: Money,
    pub interest: Money,
    pub balance: Money,
}

/// Twelve-month roll-up of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationYear {
    pub year: u32,
    pub total_payment: Money,
    pub total_principal: Money,
    pub total_interest: Money,
    pub ending_balance: Money,
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// Level monthly P&I payment: P * r(1+r)^n / ((1+r)^n - 1).
/// Zero rate amortizes straight-line; no principal or no term pays nothing.
pub fn monthly_payment(principal: Money, annual_rate: Rate, amortization_years: u32) -> Money {
    let total_months = amortization_years * 12;
    if principal.is_zero() || total_months == 0 {
        return Decimal::ZERO;
    }

    let monthly_rate = annual_rate / dec!(12);
    if monthly_rate.is_zero() {
        return principal / Decimal::from(total_months);
    }

    // (1 + r)^n via iterative multiplication
    let mut compound = Decimal::ONE;
    for _ in 0..total_months {
        compound *= Decimal::ONE + monthly_rate;
    }

    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return principal / Decimal::from(total_months);
    }
    principal * monthly_rate * compound / denominator
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Month-by-month schedule over the loan term. Interest-only months pay
/// interest on the full balance; afterwards the P&I payment on the full
/// amortization period applies.
pub fn build_amortization_schedule(
    principal: Money,
    annual_rate: Rate,
    amortization_years: u32,
    term_years: u32,
    io_years: u32,
) -> Vec<AmortizationMonth> {
    if principal.is_zero() {
        return Vec::new();
    }

    let monthly_rate = annual_rate / dec!(12);
    let pmt = monthly_payment(principal, annual_rate, amortization_years);
    let io_months = io_years * 12;
    let term_months = term_years * 12;

    let mut balance = principal;
    let mut rows = Vec::with_capacity(term_months as usize);

    for month in 1..=term_months {
        let interest = balance * monthly_rate;
        let (payment, principal_paid) = if month <= io_months {
            (interest, Decimal::ZERO)
        } else {
            let principal_paid = (pmt - interest).min(balance).max(Decimal::ZERO);
            (interest + principal_paid, principal_paid)
        };
        balance = (balance - principal_paid).max(Decimal::ZERO);

        rows.push(AmortizationMonth {
            month,
            payment: payment.round_dp(2),
            principal: principal_paid.round_dp(2),
            interest: interest.round_dp(2),
            balance: balance.round_dp(2),
        });
    }

    rows
}

/// Roll the monthly schedule into at most `max_years` annual rows.
pub fn annual_amortization(schedule: &[AmortizationMonth], max_years: u32) -> Vec<AmortizationYear> {
    schedule
        .chunks(12)
        .take(max_years as usize)
        .zip(1u32..)
        .map(|(months, year)| AmortizationYear {
            year,
            total_payment: months.iter().map(|m| m.payment).sum(),
            total_principal: months.iter().map(|m| m.principal).sum(),
            total_interest: months.iter().map(|m| m.interest).sum(),
            ending_balance: months.last().map(|m| m.balance).unwrap_or_default(),
        })
        .collect()
}

/// Interest paid in each full year the schedule covers.
pub fn interest_by_year(schedule: &[AmortizationMonth]) -> Vec<Money> {
    schedule
        .chunks_exact(12)
        .map(|months| months.iter().map(|m| m.interest).sum())
        .collect()
}

/// Balance after `month` payments, or None for month 0 or a month past the
/// end of the schedule.
pub fn balance_at_month(schedule: &[AmortizationMonth], month: u32) -> Option<Money> {
    let idx = (month as usize).checked_sub(1)?;
    schedule.get(idx).map(|m| m.balance)
}
