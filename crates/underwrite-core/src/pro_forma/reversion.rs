use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::metrics::{balance_at_month, AmortizationMonth};
use crate::pro_forma::tax::{tax_on_sale, Depreciation, SaleTax};
use crate::types::{Money, Rate};

/// Exit cap applied when the derived one is not positive.
pub const FALLBACK_EXIT_CAP: Rate = dec!(0.06);

/// Sale of the property at the end of the hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reversion {
    pub exit_year: u32,
    pub forward_noi: Money,
    pub exit_cap_rate: Rate,
    pub sale_price: Money,
    pub sale_costs: Money,
    pub loan_balance: Money,
    pub net_sale_proceeds: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_tax: Option<SaleTax>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_tax_net_proceeds: Option<Money>,
}

/// Inputs to the exit calculation, gathered by the engine.
pub(crate) struct ExitTerms<'a> {
    pub exit_year: u32,
    pub annual_nois: &'a [Money],
    /// Growth applied to exit-year NOI when the projection has no next year
    pub exit_growth: Rate,
    pub exit_cap_rate: Rate,
    pub sale_costs_pct: Rate,
    pub schedule: &'a [AmortizationMonth],
    pub loan_amount: Money,
    pub total_project_cost: Money,
    pub depreciation: Option<&'a Depreciation>,
}

/// Capitalize next year's NOI at the exit cap and net out costs and debt.
/// Returns the reversion and whether the exit cap had to be floored.
pub(crate) fn compute_reversion(terms: &ExitTerms<'_>) -> (Reversion, bool) {
    let exit_idx = (terms.exit_year.max(1) - 1) as usize;
    let exit_noi = terms
        .annual_nois
        .get(exit_idx)
        .copied()
        .unwrap_or_default();
    let forward_noi = match terms.annual_nois.get(exit_idx + 1) {
        Some(next) => *next,
        None => exit_noi * (Decimal::ONE + terms.exit_growth),
    };

    let floored = terms.exit_cap_rate <= Decimal::ZERO;
    let exit_cap_rate = if floored {
        FALLBACK_EXIT_CAP
    } else {
        terms.exit_cap_rate
    };

    let sale_price = forward_noi / exit_cap_rate;
    let sale_costs = sale_price * terms.sale_costs_pct;
    // No schedule row for the exit month: the full loan is owed.
    let loan_balance =
        balance_at_month(terms.schedule, terms.exit_year * 12).unwrap_or(terms.loan_amount);
    let net_sale_proceeds = sale_price - sale_costs - loan_balance;

    let sale_tax = terms.depreciation.map(|schedule| {
        tax_on_sale(
            terms.total_project_cost,
            schedule,
            terms.exit_year,
            sale_price,
            sale_costs,
        )
    });
    let after_tax_net_proceeds = sale_tax
        .as_ref()
        .map(|tax| net_sale_proceeds - tax.total_tax);

    (
        Reversion {
            exit_year: terms.exit_year,
            forward_noi,
            exit_cap_rate,
            sale_price,
            sale_costs,
            loan_balance,
            net_sale_proceeds,
            sale_tax,
            after_tax_net_proceeds,
        },
        floored,
    )
}
