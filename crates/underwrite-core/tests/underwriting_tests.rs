use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use underwrite_core::deal::{derive, derive_assumptions, validate_deal, DealInputs};
use underwrite_core::metrics::{build_amortization_schedule, monthly_payment};
use underwrite_core::pro_forma::build_pro_forma;

fn sample_deal() -> DealInputs {
    DealInputs::builder()
        .property_type("Multifamily - Class B")
        .address("1200 Elm St, Dallas, TX 75201")
        .purchase_price(dec!(10000000))
        .current_noi(dec!(520000))
        .total_units(40)
        .in_place_rent(dec!(1350))
        .build()
}

// ===========================================================================
// Assumption deriver
// ===========================================================================

#[test]
fn test_expense_categories_sum_to_total_across_deals() {
    let prices = [dec!(1000000), dec!(4500000), dec!(10000000), dec!(32000000)];
    let nois = [dec!(10000), dec!(300000), dec!(520000), dec!(2500000)];
    let rents = [dec!(650), dec!(1100), dec!(1350), dec!(2400)];
    for price in prices {
        for noi in nois {
            for rent in rents {
                let deal = sample_deal()
                    .to_builder()
                    .purchase_price(price)
                    .current_noi(noi)
                    .in_place_rent(rent)
                    .build();
                let d = derive(&deal);
                let e = &d.expenses;
                for line in [
                    e.management_fee,
                    e.property_tax,
                    e.insurance,
                    e.utilities,
                    e.repairs_maintenance,
                    e.general_admin,
                    e.other_expenses,
                ] {
                    assert!(line >= Decimal::ZERO, "negative expense line for {price}/{noi}/{rent}");
                }
                assert_eq!(e.total(), d.total_operating_expenses);
            }
        }
    }
}

#[test]
fn test_derived_envelope_for_sample_deal() {
    let out = derive_assumptions(&sample_deal()).unwrap();
    let d = out.result;
    assert_eq!(d.going_in_cap_rate, dec!(0.052));
    assert_eq!(d.gross_potential_rent, dec!(648000));
    assert_eq!(d.effective_gross_income, dec!(628560));
    assert_eq!(d.loan_amount, dec!(6500000));
    assert_eq!(d.price_per_unit, dec!(250000));
    assert_eq!(out.metadata.precision, "rust_decimal_128bit");
}

#[test]
fn test_validation_rejects_non_positive_price() {
    let deal = sample_deal().to_builder().purchase_price(Decimal::ZERO).build();
    assert!(validate_deal(&deal).is_err());
    assert!(validate_deal(&sample_deal()).is_ok());
}

// ===========================================================================
// Pro forma scenarios
// ===========================================================================

#[test]
fn test_scenario_baseline_year_one() {
    let r = build_pro_forma(&sample_deal()).unwrap().result;
    assert_eq!(r.metrics.going_in_cap_rate, dec!(0.052));
    assert_eq!(r.pro_forma[0].rent_per_unit, dec!(1350));
    assert_eq!(r.pro_forma.len(), 10);
    assert_eq!(r.levered_cash_flows.len(), 8);
    assert_eq!(r.levered_cash_flows[0], -r.derived.equity_required);
    let irr = r.metrics.levered_irr.expect("sample deal has a levered IRR");
    assert!(irr > dec!(0.04) && irr < dec!(0.08), "levered IRR {irr}");
}

#[test]
fn test_scenario_zero_price_does_not_fail() {
    let deal = sample_deal().to_builder().purchase_price(Decimal::ZERO).build();
    let r = build_pro_forma(&deal).unwrap().result;
    assert_eq!(r.metrics.going_in_cap_rate, Decimal::ZERO);
    assert_eq!(r.metrics.price_per_unit, Decimal::ZERO);
}

#[test]
fn test_scenario_variable_growth_then_flat() {
    let deal = sample_deal()
        .to_builder()
        .hold_period_years(5)
        .yearly_revenue_growth(vec![dec!(5), dec!(4), dec!(3)])
        .build();
    let r = build_pro_forma(&deal).unwrap().result;
    assert_eq!(
        r.growth_rates[..5].to_vec(),
        vec![dec!(0.05), dec!(0.04), dec!(0.03), dec!(0.03), dec!(0.03)]
    );
    assert!(r.metrics.variable_growth_used);
    assert_eq!(r.pro_forma[1].rent_per_unit, dec!(1350) * dec!(1.04));
}

#[test]
fn test_scenario_interest_only_then_amortizing() {
    let deal = sample_deal()
        .to_builder()
        .io_period_years(2)
        .loan_term_years(10)
        .build();
    let r = build_pro_forma(&deal).unwrap().result;
    let loan = r.derived.loan_amount;
    let io_payment = loan * dec!(0.0675);
    assert_eq!(r.pro_forma[0].debt_service, io_payment);
    assert_eq!(r.pro_forma[1].debt_service, io_payment);
    let pi = monthly_payment(loan, dec!(0.0675), 30) * dec!(12);
    assert_eq!(r.pro_forma[2].debt_service, pi);

    let balances: Vec<Decimal> = r.amortization_monthly.iter().map(|m| m.balance).collect();
    assert!(balances[..24].iter().all(|b| *b == loan));
    assert!(balances[24..].windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn test_scenario_hold_past_loan_maturity_repays_original_loan() {
    let deal = sample_deal()
        .to_builder()
        .hold_period_years(7)
        .loan_term_years(5)
        .build();
    let r = build_pro_forma(&deal).unwrap().result;
    assert_eq!(r.amortization_monthly.len(), 60);
    assert_eq!(r.reversion.loan_balance, r.derived.loan_amount);
    assert_eq!(
        r.reversion.net_sale_proceeds,
        r.reversion.sale_price - r.reversion.sale_costs - r.derived.loan_amount
    );
}

#[test]
fn test_stabilized_metrics_use_year_three() {
    let r = build_pro_forma(&sample_deal()).unwrap().result;
    let year3 = &r.pro_forma[2];
    assert_eq!(
        r.metrics.stabilized_dscr,
        year3.noi / r.metrics.annual_debt_service
    );
    assert_eq!(r.metrics.stabilized_yoc, year3.noi / r.derived.total_project_cost);
}

#[test]
fn test_build_is_idempotent() {
    let deal = sample_deal().to_builder().market_rent(dec!(1450)).planned_capex(dec!(250000)).build();
    let a = build_pro_forma(&deal).unwrap().result;
    let b = build_pro_forma(&deal).unwrap().result;
    assert_eq!(a, b);
}

#[test]
fn test_high_leverage_warnings() {
    let deal = sample_deal().to_builder().ltv(dec!(0.85)).build();
    let out = build_pro_forma(&deal).unwrap();
    assert!(out.warnings.iter().any(|w| w.contains("DSCR")));
    assert!(out.warnings.iter().any(|w| w.contains("LTV")));
}

#[test]
fn test_all_equity_deal() {
    let deal = sample_deal().to_builder().ltv(Decimal::ZERO).build();
    let r = build_pro_forma(&deal).unwrap().result;
    assert_eq!(r.derived.loan_amount, Decimal::ZERO);
    assert!(r.pro_forma.iter().all(|row| row.debt_service.is_zero()));
    assert_eq!(r.metrics.levered_irr, r.metrics.unlevered_irr);
}

#[test]
fn test_after_tax_series_only_when_taxed() {
    let untaxed = build_pro_forma(&sample_deal()).unwrap().result;
    assert!(untaxed.after_tax_cash_flows.is_none());
    assert!(untaxed.metrics.after_tax_irr.is_none());

    let deal = sample_deal().to_builder().tax_rate(dec!(0.37)).build();
    let taxed = build_pro_forma(&deal).unwrap().result;
    let atcfs = taxed.annual_atcfs.expect("taxed deal has ATCFs");
    assert_eq!(atcfs.len(), 10);
    assert!(taxed.reversion.sale_tax.is_some());
}

// ===========================================================================
// Amortization
// ===========================================================================

#[test]
fn test_fully_amortizing_schedule_ends_at_zero() {
    let schedule = build_amortization_schedule(dec!(6500000), dec!(0.0675), 30, 30, 0);
    assert_eq!(schedule.len(), 360);
    assert_eq!(schedule[359].balance, dec!(0.00));
}
