use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::deal::{derive, DealInputs, DerivedAssumptions};
use crate::metrics::{
    self, annual_amortization, build_amortization_schedule, interest_by_year, monthly_payment,
    AmortizationMonth, AmortizationYear,
};
use crate::pro_forma::growth::{occupancy_for_year, rent_per_unit, GrowthPath};
use crate::pro_forma::reversion::{compute_reversion, ExitTerms, Reversion};
use crate::pro_forma::sources_uses::{build_sources_uses, SourcesUses};
use crate::pro_forma::tax::{depreciation, operating_tax, Depreciation};
use crate::types::{fmt_pct, with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::UnderwriteResult;

/// Length of the operating projection, independent of the hold period.
pub const PROJECTION_YEARS: u32 = 10;

/// Year index (0-based) treated as stabilized.
const STABILIZED_YEAR_INDEX: usize = 2;

const DSCR_WARNING: Multiple = dec!(1.2);
const LTV_WARNING: Rate = dec!(0.80);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One projected operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProFormaRow {
    pub year: u32,
    pub rent_per_unit: Money,
    pub occupancy: Rate,
    pub gross_potential_rent: Money,
    pub vacancy_loss: Money,
    pub other_income: Money,
    pub effective_gross_income: Money,
    pub management_fee: Money,
    pub property_tax: Money,
    pub insurance: Money,
    pub utilities: Money,
    pub repairs_maintenance: Money,
    pub general_admin: Money,
    pub other_expenses: Money,
    pub replacement_reserves: Money,
    pub total_expenses: Money,
    pub noi: Money,
    pub debt_service: Money,
    pub btcf: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_expense: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_tax: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atcf: Option<Money>,
}

/// Headline return and coverage metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealMetrics {
    pub levered_irr: Option<Rate>,
    pub unlevered_irr: Option<Rate>,
    pub equity_multiple: Multiple,
    pub cash_on_cash_yr1: Rate,
    pub dscr_yr1: Multiple,
    pub yield_on_cost: Rate,
    pub stabilized_yoc: Rate,
    pub stabilized_dscr: Multiple,
    pub going_in_cap_rate: Rate,
    pub exit_cap_rate: Rate,
    pub price_per_unit: Money,
    pub price_per_sf: Money,
    pub monthly_payment: Money,
    pub annual_debt_service: Money,
    pub variable_growth_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_tax_irr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_tax_equity_multiple: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_tax_cash_on_cash_yr1: Option<Rate>,
}

/// Everything a full underwriting run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProFormaResult {
    pub inputs: DealInputs,
    pub derived: DerivedAssumptions,
    pub sources_uses: SourcesUses,
    pub growth_rates: Vec<Rate>,
    pub pro_forma: Vec<ProFormaRow>,
    pub amortization_monthly: Vec<AmortizationMonth>,
    pub amortization_annual: Vec<AmortizationYear>,
    pub reversion: Reversion,
    pub metrics: DealMetrics,
    pub levered_cash_flows: Vec<Money>,
    pub unlevered_cash_flows: Vec<Money>,
    pub annual_nois: Vec<Money>,
    pub annual_btcfs: Vec<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation: Option<Depreciation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_tax_cash_flows: Option<Vec<Money>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_atcfs: Option<Vec<Money>>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Build the 10-year pro forma, exit and return metrics for a deal.
///
/// Pure: equal inputs give equal results. Degenerate inputs (zero price,
/// zero equity, no sign change in cash flows) yield zero-valued ratios or a
/// `None` IRR rather than an error.
pub fn build_pro_forma(deal: &DealInputs) -> UnderwriteResult<ComputationOutput<ProFormaResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = project(deal, &mut warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "10-Year Pro Forma (value-add rent ramp, amortizing debt, direct-cap reversion)",
        deal,
        warnings,
        elapsed,
        result,
    ))
}

/// The projection itself, shared with the sensitivity and simulation
/// layers which only need the result.
pub(crate) fn project(deal: &DealInputs, warnings: &mut Vec<String>) -> ProFormaResult {
    let derived = derive(deal);
    let fin = &deal.financing;
    let sources_uses = build_sources_uses(deal, &derived);

    // --- Debt ---
    let loan_amount = derived.loan_amount;
    let monthly_pmt = monthly_payment(loan_amount, fin.interest_rate, fin.amortization_years);
    let annual_ds = monthly_pmt * dec!(12);
    let schedule = build_amortization_schedule(
        loan_amount,
        fin.interest_rate,
        fin.amortization_years,
        fin.loan_term_years,
        fin.io_period_years,
    );
    let amortization_annual = annual_amortization(&schedule, PROJECTION_YEARS);

    // --- Tax basis ---
    let taxed = fin.tax_rate > Decimal::ZERO;
    let dep = taxed.then(|| depreciation(deal, &derived));
    let yearly_interest = interest_by_year(&schedule);

    // --- Operating years ---
    let path = GrowthPath::new(deal, PROJECTION_YEARS);
    let units = Decimal::from(deal.total_units);
    let reserves_base = fin.replacement_reserves_per_unit * units;

    let mut rows: Vec<ProFormaRow> = Vec::with_capacity(PROJECTION_YEARS as usize);
    for year in 1..=PROJECTION_YEARS {
        let rent = rent_per_unit(deal, &path, year);
        let occupancy = occupancy_for_year(deal, year);
        let gpr = rent * units * dec!(12);
        let vacancy_loss = gpr * (Decimal::ONE - occupancy);
        let other_income = derived.other_income * path.factor(year);
        let egi = gpr * occupancy + other_income;

        let expense_growth = compound(fin.expense_growth_rate, year - 1);
        let mut expenses = derived.expenses.grown(expense_growth);
        expenses.management_fee = egi * fin.management_fee_pct;
        let replacement_reserves = reserves_base * expense_growth;
        let total_expenses = expenses.total() + replacement_reserves;

        let noi = egi - total_expenses;
        let debt_service = if year <= fin.io_period_years {
            loan_amount * fin.interest_rate
        } else {
            annual_ds
        };
        let btcf = noi - debt_service;

        let (interest_expense, year_depreciation, income_tax, atcf) = match &dep {
            Some(d) => {
                let interest = yearly_interest
                    .get((year - 1) as usize)
                    .copied()
                    .unwrap_or(loan_amount * fin.interest_rate);
                let tax = operating_tax(noi, interest, d.annual_depreciation, fin.tax_rate);
                (
                    Some(interest),
                    Some(d.annual_depreciation),
                    Some(tax),
                    Some(btcf - tax),
                )
            }
            None => (None, None, None, None),
        };

        rows.push(ProFormaRow {
            year,
            rent_per_unit: rent,
            occupancy,
            gross_potential_rent: gpr,
            vacancy_loss,
            other_income,
            effective_gross_income: egi,
            management_fee: expenses.management_fee,
            property_tax: expenses.property_tax,
            insurance: expenses.insurance,
            utilities: expenses.utilities,
            repairs_maintenance: expenses.repairs_maintenance,
            general_admin: expenses.general_admin,
            other_expenses: expenses.other_expenses,
            replacement_reserves,
            total_expenses,
            noi,
            debt_service,
            btcf,
            interest_expense,
            depreciation: year_depreciation,
            income_tax,
            atcf,
        });
    }

    let annual_nois: Vec<Money> = rows.iter().map(|r| r.noi).collect();
    let annual_btcfs: Vec<Money> = rows.iter().map(|r| r.btcf).collect();
    let annual_atcfs: Option<Vec<Money>> = rows.iter().map(|r| r.atcf).collect();

    // --- Exit ---
    let exit_year = deal.hold_period_years.clamp(1, PROJECTION_YEARS);
    let (reversion, cap_floored) = compute_reversion(&ExitTerms {
        exit_year,
        annual_nois: &annual_nois,
        exit_growth: path.rate(exit_year),
        exit_cap_rate: derived.exit_cap_rate,
        sale_costs_pct: fin.sale_costs_pct,
        schedule: &schedule,
        loan_amount,
        total_project_cost: derived.total_project_cost,
        depreciation: dep.as_ref(),
    });
    if cap_floored {
        warnings.push(format!(
            "Derived exit cap {} is not positive; using {}",
            fmt_pct(derived.exit_cap_rate),
            fmt_pct(reversion.exit_cap_rate)
        ));
    }

    // --- Cash-flow vectors ---
    let equity = derived.equity_required;
    let total_cost = derived.total_project_cost;
    let levered_cash_flows = with_exit(
        -equity,
        &annual_btcfs,
        exit_year,
        reversion.net_sale_proceeds,
    );
    let unlevered_cash_flows = with_exit(
        -total_cost,
        &annual_nois,
        exit_year,
        reversion.sale_price - reversion.sale_costs,
    );
    let after_tax_cash_flows = match (&annual_atcfs, reversion.after_tax_net_proceeds) {
        (Some(atcfs), Some(proceeds)) => Some(with_exit(-equity, atcfs, exit_year, proceeds)),
        _ => None,
    };

    // --- Metrics ---
    let noi_yr1 = annual_nois[0];
    let stabilized_noi = annual_nois[STABILIZED_YEAR_INDEX.min(annual_nois.len() - 1)];
    let positive_equity = equity > Decimal::ZERO;
    let coc = |cf: Money| {
        if positive_equity {
            metrics::cash_on_cash(cf, equity)
        } else {
            Decimal::ZERO
        }
    };

    let levered_irr = metrics::irr(&levered_cash_flows);
    let unlevered_irr = metrics::irr(&unlevered_cash_flows);
    let after_tax_irr = after_tax_cash_flows.as_deref().and_then(metrics::irr);

    let deal_metrics = DealMetrics {
        levered_irr,
        unlevered_irr,
        equity_multiple: metrics::equity_multiple(&levered_cash_flows),
        cash_on_cash_yr1: coc(annual_btcfs[0]),
        dscr_yr1: metrics::dscr(noi_yr1, annual_ds),
        yield_on_cost: metrics::yield_on_cost(noi_yr1, total_cost),
        stabilized_yoc: metrics::yield_on_cost(stabilized_noi, total_cost),
        stabilized_dscr: metrics::dscr(stabilized_noi, annual_ds),
        going_in_cap_rate: derived.going_in_cap_rate,
        exit_cap_rate: reversion.exit_cap_rate,
        price_per_unit: derived.price_per_unit,
        price_per_sf: derived.price_per_sf,
        monthly_payment: monthly_pmt,
        annual_debt_service: annual_ds,
        variable_growth_used: deal.uses_variable_growth(),
        after_tax_irr,
        after_tax_equity_multiple: after_tax_cash_flows
            .as_deref()
            .map(metrics::equity_multiple),
        after_tax_cash_on_cash_yr1: annual_atcfs
            .as_ref()
            .and_then(|a| a.first().copied())
            .map(coc),
    };

    // --- Diagnostics ---
    if levered_irr.is_none() {
        warnings.push("Levered IRR undefined for this cash-flow profile".into());
    }
    if unlevered_irr.is_none() {
        warnings.push("Unlevered IRR undefined for this cash-flow profile".into());
    }
    if taxed && after_tax_irr.is_none() {
        warnings.push("After-tax IRR undefined for this cash-flow profile".into());
    }
    let dscr = deal_metrics.dscr_yr1;
    if dscr > Decimal::ZERO && dscr < DSCR_WARNING {
        warnings.push(format!(
            "DSCR of {dscr:.2} is below 1.20x: lender covenant risk"
        ));
    }
    if fin.ltv > LTV_WARNING {
        warnings.push(format!(
            "LTV of {} exceeds 80%: high leverage",
            fmt_pct(fin.ltv)
        ));
    }
    if deal.yearly_revenue_growth.len() > PROJECTION_YEARS as usize {
        warnings.push(format!(
            "Growth sequence has {} entries; only the first {PROJECTION_YEARS} are used",
            deal.yearly_revenue_growth.len()
        ));
    }
    if fin.io_period_years > fin.loan_term_years {
        warnings.push("Interest-only period exceeds loan term".into());
    }

    debug!(
        exit_year,
        levered_irr = ?levered_irr,
        sale_price = %reversion.sale_price,
        "pro forma built"
    );

    ProFormaResult {
        inputs: deal.clone(),
        derived,
        sources_uses,
        growth_rates: path.rates().to_vec(),
        pro_forma: rows,
        amortization_monthly: schedule,
        amortization_annual,
        reversion,
        metrics: deal_metrics,
        levered_cash_flows,
        unlevered_cash_flows,
        annual_nois,
        annual_btcfs,
        depreciation: dep,
        after_tax_cash_flows,
        annual_atcfs,
    }
}

/// (1 + rate)^periods by repeated multiplication.
fn compound(rate: Rate, periods: u32) -> Decimal {
    (0..periods).fold(Decimal::ONE, |acc, _| acc * (Decimal::ONE + rate))
}

/// [initial, flows[0..exit-1], flows[exit-1] + terminal]
fn with_exit(initial: Money, flows: &[Money], exit_year: u32, terminal: Money) -> Vec<Money> {
    let exit_idx = (exit_year as usize).min(flows.len()).max(1) - 1;
    let mut out = Vec::with_capacity(exit_idx + 2);
    out.push(initial);
    out.extend_from_slice(&flows[..exit_idx]);
    out.push(flows.get(exit_idx).copied().unwrap_or_default() + terminal);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    /// 40-unit Class B garden apartment, $10M at a 5.2% cap.
    fn sample_deal() -> DealInputs {
        DealInputs::builder()
            .address("1200 Oak Street, Austin, TX 78704")
            .purchase_price(dec!(10000000))
            .current_noi(dec!(520000))
            .total_units(40)
            .total_sf(dec!(36000))
            .in_place_rent(dec!(1350))
            .build()
    }

    fn run(deal: &DealInputs) -> ProFormaResult {
        build_pro_forma(deal).unwrap().result
    }

    #[test]
    fn test_projection_is_ten_years() {
        let r = run(&sample_deal());
        assert_eq!(r.pro_forma.len(), 10);
        assert_eq!(r.annual_nois.len(), 10);
        assert_eq!(r.growth_rates.len(), 10);
        assert_eq!(r.amortization_monthly.len(), 120);
        assert_eq!(r.amortization_annual.len(), 10);
    }

    #[test]
    fn test_year_one_rent_and_cap() {
        let r = run(&sample_deal());
        assert_eq!(r.pro_forma[0].rent_per_unit, dec!(1350));
        assert_eq!(r.metrics.going_in_cap_rate, dec!(0.052));
        assert_eq!(r.metrics.exit_cap_rate, dec!(0.0545));
    }

    #[test]
    fn test_row_identities() {
        let r = run(&sample_deal());
        for row in &r.pro_forma {
            assert_eq!(row.noi, row.effective_gross_income - row.total_expenses);
            assert_eq!(row.btcf, row.noi - row.debt_service);
            assert_eq!(
                row.total_expenses,
                row.management_fee
                    + row.property_tax
                    + row.insurance
                    + row.utilities
                    + row.repairs_maintenance
                    + row.general_admin
                    + row.other_expenses
                    + row.replacement_reserves
            );
        }
    }

    #[test]
    fn test_year_one_income_matches_derivation() {
        let r = run(&sample_deal());
        let y1 = &r.pro_forma[0];
        assert_eq!(y1.gross_potential_rent, r.derived.gross_potential_rent);
        assert_eq!(y1.effective_gross_income, r.derived.effective_gross_income);
        assert_eq!(y1.management_fee, r.derived.expenses.management_fee);
        // Year-one NOI is the stated NOI less reserves (250 * 40)
        assert_eq!(y1.noi, dec!(520000) - dec!(10000));
    }

    #[test]
    fn test_expenses_grow_at_expense_rate() {
        let deal = sample_deal()
            .to_builder()
            .expense_growth_rate(dec!(0.02))
            .yearly_revenue_growth(vec![dec!(8), dec!(8)])
            .build();
        let r = run(&deal);
        assert_eq!(
            r.pro_forma[1].property_tax,
            r.pro_forma[0].property_tax * dec!(1.02)
        );
        assert_eq!(
            r.pro_forma[1].replacement_reserves,
            dec!(10000) * dec!(1.02)
        );
    }

    #[test]
    fn test_cash_flow_vectors_shape() {
        let r = run(&sample_deal());
        // hold 7 => initial + 7 years
        assert_eq!(r.levered_cash_flows.len(), 8);
        assert_eq!(r.levered_cash_flows[0], -r.derived.equity_required);
        assert_eq!(r.levered_cash_flows[1], r.annual_btcfs[0]);
        assert_eq!(
            r.levered_cash_flows[7],
            r.annual_btcfs[6] + r.reversion.net_sale_proceeds
        );
        assert_eq!(r.unlevered_cash_flows[0], -r.derived.total_project_cost);
        assert_eq!(
            r.unlevered_cash_flows[7],
            r.annual_nois[6] + r.reversion.sale_price - r.reversion.sale_costs
        );
    }

    #[test]
    fn test_reversion_uses_year_after_exit() {
        let r = run(&sample_deal());
        assert_eq!(r.reversion.exit_year, 7);
        assert_eq!(r.reversion.forward_noi, r.annual_nois[7]);
        assert_eq!(r.reversion.loan_balance, r.amortization_monthly[83].balance);
    }

    #[test]
    fn test_metrics_definitions() {
        let r = run(&sample_deal());
        let m = &r.metrics;
        assert_eq!(m.annual_debt_service, m.monthly_payment * dec!(12));
        assert_eq!(m.dscr_yr1, r.annual_nois[0] / m.annual_debt_service);
        assert_eq!(m.stabilized_yoc, r.annual_nois[2] / r.derived.total_project_cost);
        assert_eq!(m.stabilized_dscr, r.annual_nois[2] / m.annual_debt_service);
        assert_eq!(
            m.equity_multiple,
            metrics::equity_multiple(&r.levered_cash_flows)
        );
        assert!(m.levered_irr.is_some());
        assert!(m.unlevered_irr.is_some());
        assert!(!m.variable_growth_used);
        assert!(m.after_tax_irr.is_none());
    }

    #[test]
    fn test_idempotent() {
        let deal = sample_deal().to_builder().market_rent(dec!(1500)).build();
        assert_eq!(run(&deal), run(&deal));
    }

    #[test]
    fn test_interest_only_debt_service() {
        let deal = sample_deal().to_builder().io_period_years(2).build();
        let r = run(&deal);
        let io_ds = dec!(6500000) * dec!(0.0675);
        assert_eq!(r.pro_forma[0].debt_service, io_ds);
        assert_eq!(r.pro_forma[1].debt_service, io_ds);
        assert_eq!(r.pro_forma[2].debt_service, r.metrics.monthly_payment * dec!(12));
        for pair in r.amortization_annual[1..].windows(2) {
            assert!(pair[1].ending_balance <= pair[0].ending_balance);
        }
    }

    #[test]
    fn test_variable_growth_flag_and_rates() {
        let deal = sample_deal()
            .to_builder()
            .hold_period_years(5)
            .yearly_revenue_growth(vec![dec!(5), dec!(4), dec!(3)])
            .build();
        let r = run(&deal);
        assert!(r.metrics.variable_growth_used);
        assert_eq!(r.growth_rates[0], dec!(0.05));
        assert_eq!(r.growth_rates[2], dec!(0.03));
        assert_eq!(r.growth_rates[4], dec!(0.03));
    }

    #[test]
    fn test_zero_price_is_not_an_error() {
        let deal = sample_deal().to_builder().purchase_price(Decimal::ZERO).build();
        let out = build_pro_forma(&deal).unwrap();
        assert_eq!(out.result.metrics.going_in_cap_rate, Decimal::ZERO);
        assert_eq!(out.result.metrics.levered_irr, None);
        assert!(out.warnings.iter().any(|w| w.contains("IRR undefined")));
        // Spread alone sets the exit cap
        assert_eq!(out.result.reversion.exit_cap_rate, dec!(0.0025));
    }

    #[test]
    fn test_all_cash_deal() {
        let deal = sample_deal().to_builder().ltv(Decimal::ZERO).build();
        let r = run(&deal);
        assert!(r.amortization_monthly.is_empty());
        assert_eq!(r.metrics.dscr_yr1, Decimal::ZERO);
        assert_eq!(r.reversion.loan_balance, Decimal::ZERO);
        assert_eq!(r.levered_cash_flows, r.unlevered_cash_flows);
    }

    #[test]
    fn test_high_leverage_warning() {
        let deal = sample_deal().to_builder().ltv(dec!(0.85)).build();
        let out = build_pro_forma(&deal).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("LTV")));
        assert!(out.warnings.iter().any(|w| w.contains("DSCR")));
    }

    #[test]
    fn test_hold_beyond_projection_exits_in_year_ten() {
        let deal = sample_deal().to_builder().hold_period_years(12).build();
        let r = run(&deal);
        assert_eq!(r.reversion.exit_year, 10);
        assert_eq!(r.levered_cash_flows.len(), 11);
        assert_eq!(
            r.reversion.forward_noi,
            r.annual_nois[9] * (Decimal::ONE + r.growth_rates[9])
        );
    }

    #[test]
    fn test_after_tax_path() {
        let deal = sample_deal().to_builder().tax_rate(dec!(0.37)).build();
        let r = run(&deal);
        let atcfs = r.annual_atcfs.clone().unwrap();
        let dep = r.depreciation.clone().unwrap();
        let y1 = &r.pro_forma[0];
        assert_eq!(y1.interest_expense, Some(r.amortization_annual[0].total_interest));
        assert_eq!(y1.depreciation, Some(dep.annual_depreciation));
        assert_eq!(atcfs[0], y1.btcf - y1.income_tax.unwrap());
        let at = r.after_tax_cash_flows.clone().unwrap();
        assert_eq!(at.len(), r.levered_cash_flows.len());
        assert_eq!(
            at[7],
            atcfs[6] + r.reversion.after_tax_net_proceeds.unwrap()
        );
        assert!(r.metrics.after_tax_irr.is_some());
        assert!(r.metrics.after_tax_irr.unwrap() <= r.metrics.levered_irr.unwrap());
    }

    #[test]
    fn test_with_exit_helper() {
        let flows = [dec!(10), dec!(20), dec!(30)];
        assert_eq!(
            with_exit(dec!(-100), &flows, 2, dec!(100)),
            vec![dec!(-100), dec!(10), dec!(120)]
        );
        assert_eq!(
            with_exit(dec!(-100), &flows, 1, dec!(5)),
            vec![dec!(-100), dec!(15)]
        );
    }
}
