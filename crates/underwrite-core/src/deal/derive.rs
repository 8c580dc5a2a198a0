use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::deal::inputs::{DealInputs, ExpenseOverrides};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::UnderwriteResult;

/// Expense ratio assumed when there is no income to measure against.
const FALLBACK_EXPENSE_RATIO: Rate = dec!(0.45);

/// Other income as a share of GPR for multifamily vs. everything else.
const OTHER_INCOME_MULTIFAMILY: Rate = dec!(0.05);
const OTHER_INCOME_DEFAULT: Rate = dec!(0.03);

// Allocation of non-management operating expenses.
const SHARE_PROPERTY_TAX: Rate = dec!(0.35);
const SHARE_INSURANCE: Rate = dec!(0.15);
const SHARE_UTILITIES: Rate = dec!(0.15);
const SHARE_REPAIRS: Rate = dec!(0.15);
const SHARE_GENERAL_ADMIN: Rate = dec!(0.10);
const SHARE_OTHER: Rate = dec!(0.10);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Annual operating expenses by line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingExpenses {
    pub management_fee: Money,
    pub property_tax: Money,
    pub insurance: Money,
    pub utilities: Money,
    pub repairs_maintenance: Money,
    pub general_admin: Money,
    pub other_expenses: Money,
}

impl OperatingExpenses {
    /// Everything except the management fee.
    pub fn fixed_total(&self) -> Money {
        self.property_tax
            + self.insurance
            + self.utilities
            + self.repairs_maintenance
            + self.general_admin
            + self.other_expenses
    }

    pub fn total(&self) -> Money {
        self.management_fee + self.fixed_total()
    }

    /// Scale every non-management line by `factor`.
    pub fn grown(&self, factor: Decimal) -> OperatingExpenses {
        OperatingExpenses {
            management_fee: self.management_fee,
            property_tax: self.property_tax * factor,
            insurance: self.insurance * factor,
            utilities: self.utilities * factor,
            repairs_maintenance: self.repairs_maintenance * factor,
            general_admin: self.general_admin * factor,
            other_expenses: self.other_expenses * factor,
        }
    }

    fn apply_overrides(&mut self, overrides: &ExpenseOverrides) {
        let lines = [
            (&mut self.property_tax, overrides.property_tax),
            (&mut self.insurance, overrides.insurance),
            (&mut self.utilities, overrides.utilities),
            (&mut self.repairs_maintenance, overrides.repairs_maintenance),
            (&mut self.general_admin, overrides.general_admin),
            (&mut self.other_expenses, overrides.other_expenses),
        ];
        for (line, value) in lines {
            if let Some(v) = value {
                *line = v.max(Decimal::ZERO);
            }
        }
    }
}

/// Everything computed from `DealInputs` before any projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedAssumptions {
    pub property_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub asset_type: String,
    pub asset_class: String,

    pub gross_potential_rent: Money,
    pub market_gross_potential_rent: Money,
    pub vacancy_rate: Rate,
    pub rent_premium_potential: Money,
    pub other_income: Money,
    pub effective_gross_income: Money,

    pub expenses: OperatingExpenses,
    pub total_operating_expenses: Money,
    pub expense_ratio: Rate,

    pub total_capex: Money,
    pub capex_per_unit: Money,
    pub closing_costs: Money,
    pub total_project_cost: Money,
    pub loan_amount: Money,
    pub equity_required: Money,

    pub going_in_cap_rate: Rate,
    pub exit_cap_rate: Rate,
    pub price_per_unit: Money,
    pub price_per_sf: Money,
}

impl DerivedAssumptions {
    pub fn is_multifamily(&self) -> bool {
        self.asset_type.contains("Multifamily")
    }
}

#[derive(Debug, Default, PartialEq)]
struct ParsedAddress {
    street: String,
    city: String,
    state: String,
    zip_code: String,
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the full assumption set from raw deal inputs. Total: every
/// degenerate denominator resolves to zero instead of failing.
pub fn derive(deal: &DealInputs) -> DerivedAssumptions {
    let address = parse_address(&deal.address);
    let property_name = if address.street.is_empty() {
        "Subject Property".to_string()
    } else {
        address.street.clone()
    };
    let (asset_type, asset_class) = split_property_type(&deal.property_type);

    // --- Revenue ---
    let units = Decimal::from(deal.total_units);
    let gross_potential_rent = deal.in_place_rent * units * dec!(12);
    let has_market_rent = deal.market_rent > Decimal::ZERO;
    let market_gross_potential_rent = if has_market_rent {
        deal.market_rent * units * dec!(12)
    } else {
        gross_potential_rent
    };
    let rent_premium_potential = if has_market_rent {
        deal.market_rent - deal.in_place_rent
    } else {
        Decimal::ZERO
    };
    let other_income_share = if asset_type.contains("Multifamily") {
        OTHER_INCOME_MULTIFAMILY
    } else {
        OTHER_INCOME_DEFAULT
    };
    let other_income = gross_potential_rent * other_income_share;
    let effective_gross_income = gross_potential_rent * deal.occupancy + other_income;

    // --- Expenses ---
    let implied_expenses = (effective_gross_income - deal.current_noi).max(Decimal::ZERO);
    let expense_ratio = if effective_gross_income.is_zero() {
        FALLBACK_EXPENSE_RATIO
    } else {
        implied_expenses / effective_gross_income
    };

    let mut management_fee = effective_gross_income * deal.financing.management_fee_pct;
    let mut remaining = implied_expenses - management_fee;
    if remaining < Decimal::ZERO {
        remaining = implied_expenses;
        management_fee = Decimal::ZERO;
    }

    let mut expenses = OperatingExpenses {
        management_fee,
        property_tax: remaining * SHARE_PROPERTY_TAX,
        insurance: remaining * SHARE_INSURANCE,
        utilities: remaining * SHARE_UTILITIES,
        repairs_maintenance: remaining * SHARE_REPAIRS,
        general_admin: remaining * SHARE_GENERAL_ADMIN,
        other_expenses: remaining * SHARE_OTHER,
    };

    let (total_operating_expenses, expense_ratio) = if deal.expense_overrides.is_empty() {
        (implied_expenses, expense_ratio)
    } else {
        expenses.apply_overrides(&deal.expense_overrides);
        let total = expenses.total();
        let ratio = if effective_gross_income.is_zero() {
            expense_ratio
        } else {
            total / effective_gross_income
        };
        (total, ratio)
    };

    // --- Capital stack ---
    let total_capex = deal.total_capex();
    let capex_per_unit = if deal.total_units == 0 {
        Decimal::ZERO
    } else {
        total_capex / units
    };
    let closing_costs = deal.purchase_price * deal.financing.closing_costs_pct;
    let total_project_cost = deal.purchase_price + closing_costs + total_capex;
    let loan_amount = deal.purchase_price * deal.financing.ltv;
    let equity_required = total_project_cost - loan_amount;

    // --- Pricing ---
    let going_in_cap_rate = if deal.purchase_price > Decimal::ZERO {
        deal.current_noi / deal.purchase_price
    } else {
        Decimal::ZERO
    };
    let exit_cap_rate = going_in_cap_rate + deal.financing.exit_cap_rate_spread;
    let price_per_unit = if deal.total_units == 0 {
        Decimal::ZERO
    } else {
        deal.purchase_price / units
    };
    let price_per_sf = if deal.total_sf > Decimal::ZERO {
        deal.purchase_price / deal.total_sf
    } else {
        Decimal::ZERO
    };

    DerivedAssumptions {
        property_name,
        street: address.street,
        city: address.city,
        state: address.state,
        zip_code: address.zip_code,
        asset_type,
        asset_class,
        gross_potential_rent,
        market_gross_potential_rent,
        vacancy_rate: Decimal::ONE - deal.occupancy,
        rent_premium_potential,
        other_income,
        effective_gross_income,
        expenses,
        total_operating_expenses,
        expense_ratio,
        total_capex,
        capex_per_unit,
        closing_costs,
        total_project_cost,
        loan_amount,
        equity_required,
        going_in_cap_rate,
        exit_cap_rate,
        price_per_unit,
        price_per_sf,
    }
}

/// `derive` wrapped in the standard output envelope, with observations about
/// inputs that were accepted but look off.
pub fn derive_assumptions(
    deal: &DealInputs,
) -> UnderwriteResult<ComputationOutput<DerivedAssumptions>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let derived = derive(deal);

    if deal.current_noi > derived.effective_gross_income {
        warnings.push(format!(
            "Stated NOI {} exceeds derived EGI {:.0}; operating expenses floored at zero",
            deal.current_noi, derived.effective_gross_income
        ));
    }
    if derived.rent_premium_potential < Decimal::ZERO {
        warnings.push(format!(
            "Market rent is {:.0}/unit below in-place rent",
            derived.rent_premium_potential.abs()
        ));
    }
    if derived.effective_gross_income.is_zero() {
        warnings.push("EGI is zero; expense ratio defaulted to 45%".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Assumption Derivation (income, expense allocation, capital stack)",
        deal,
        warnings,
        elapsed,
        derived,
    ))
}

/// "street, city, STATE ZIP[, ZIP]"; missing pieces become empty strings.
fn parse_address(raw: &str) -> ParsedAddress {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let mut parsed = ParsedAddress::default();

    if let Some(street) = parts.first() {
        parsed.street = street.to_string();
    }
    if let Some(city) = parts.get(1) {
        parsed.city = city.to_string();
    }
    if let Some(state_zip) = parts.get(2) {
        let mut tokens = state_zip.split_whitespace();
        parsed.state = tokens.next().unwrap_or_default().to_string();
        parsed.zip_code = tokens.next().unwrap_or_default().to_string();
    }
    if let Some(zip) = parts.get(3) {
        parsed.zip_code = zip.to_string();
    }
    parsed
}

fn split_property_type(raw: &str) -> (String, String) {
    match raw.split_once(" - ") {
        Some((kind, class)) => (kind.trim().to_string(), class.trim().to_string()),
        None => (raw.trim().to_string(), String::new()),
    }
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

    #[test]
    fn test_going_in_cap_and_exit_cap() {
        let d = derive(&sample_deal());
        assert_eq!(d.going_in_cap_rate, dec!(0.052));
        assert_eq!(d.exit_cap_rate, dec!(0.0545));
    }

    #[test]
    fn test_revenue_build() {
        let d = derive(&sample_deal());
        // 1350 * 40 * 12
        assert_eq!(d.gross_potential_rent, dec!(648000));
        assert_eq!(d.market_gross_potential_rent, dec!(648000));
        // 5% of GPR for multifamily
        assert_eq!(d.other_income, dec!(32400));
        // 648000 * 0.92 + 32400
        assert_eq!(d.effective_gross_income, dec!(628560));
        assert_eq!(d.vacancy_rate, dec!(0.08));
        assert_eq!(d.rent_premium_potential, Decimal::ZERO);
    }

    #[test]
    fn test_expense_lines_sum_to_total() {
        let d = derive(&sample_deal());
        assert_eq!(d.total_operating_expenses, dec!(108560));
        assert_eq!(d.expenses.total(), d.total_operating_expenses);
        // Management fee 3.5% of EGI
        assert_eq!(d.expenses.management_fee, dec!(21999.60));
        // Property tax takes 35% of the remainder
        assert_eq!(d.expenses.property_tax, (dec!(108560) - dec!(21999.60)) * dec!(0.35));
    }

    #[test]
    fn test_capital_stack() {
        let d = derive(&sample_deal());
        assert_eq!(d.closing_costs, dec!(300000));
        assert_eq!(d.total_project_cost, dec!(10300000));
        assert_eq!(d.loan_amount, dec!(6500000));
        assert_eq!(d.equity_required, dec!(3800000));
        assert_eq!(d.price_per_unit, dec!(250000));
    }

    #[test]
    fn test_address_parsing() {
        let d = derive(&sample_deal());
        assert_eq!(d.property_name, "1200 Oak Street");
        assert_eq!(d.city, "Austin");
        assert_eq!(d.state, "TX");
        assert_eq!(d.zip_code, "78704");
    }

    #[test]
    fn test_address_fourth_part_overrides_zip() {
        let parsed = parse_address("1 Main St, Dallas, TX 75001, 75002");
        assert_eq!(parsed.zip_code, "75002");
    }

    #[test]
    fn test_empty_address_gives_default_name() {
        let deal = sample_deal().to_builder().address("").build();
        let d = derive(&deal);
        assert_eq!(d.property_name, "Subject Property");
        assert_eq!(d.city, "");
    }

    #[test]
    fn test_property_type_split() {
        assert_eq!(
            split_property_type("Multifamily - Class B"),
            ("Multifamily".to_string(), "Class B".to_string())
        );
        assert_eq!(
            split_property_type(" Industrial "),
            ("Industrial".to_string(), String::new())
        );
    }

    #[test]
    fn test_non_multifamily_other_income_share() {
        let deal = sample_deal().to_builder().property_type("Retail - Strip").build();
        let d = derive(&deal);
        assert_eq!(d.other_income, dec!(648000) * dec!(0.03));
        assert!(!d.is_multifamily());
    }

    #[test]
    fn test_zero_price_gives_zero_cap_rate() {
        let deal = sample_deal().to_builder().purchase_price(Decimal::ZERO).build();
        let d = derive(&deal);
        assert_eq!(d.going_in_cap_rate, Decimal::ZERO);
        assert_eq!(d.exit_cap_rate, dec!(0.0025));
    }

    #[test]
    fn test_zero_units_and_sf_guarded() {
        let deal = sample_deal()
            .to_builder()
            .total_units(0)
            .total_sf(Decimal::ZERO)
            .planned_capex(dec!(100000))
            .build();
        let d = derive(&deal);
        assert_eq!(d.price_per_unit, Decimal::ZERO);
        assert_eq!(d.price_per_sf, Decimal::ZERO);
        assert_eq!(d.capex_per_unit, Decimal::ZERO);
        // No units means no income at all
        assert_eq!(d.expense_ratio, dec!(0.45));
    }

    #[test]
    fn test_noi_above_egi_floors_expenses() {
        let deal = sample_deal().to_builder().current_noi(dec!(900000)).build();
        let d = derive(&deal);
        assert_eq!(d.total_operating_expenses, Decimal::ZERO);
        assert_eq!(d.expenses.management_fee, Decimal::ZERO);
        assert_eq!(d.expenses.total(), Decimal::ZERO);

        let out = derive_assumptions(&deal).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("floored at zero")));
    }

    #[test]
    fn test_management_fee_dropped_when_it_exceeds_expenses() {
        // EGI 628560, NOI 615000 => expenses 13560 < mgmt fee 21999.60
        let deal = sample_deal().to_builder().current_noi(dec!(615000)).build();
        let d = derive(&deal);
        assert_eq!(d.expenses.management_fee, Decimal::ZERO);
        assert_eq!(d.expenses.total(), dec!(13560));
    }

    #[test]
    fn test_expense_overrides_replace_lines() {
        let overrides = ExpenseOverrides {
            property_tax: Some(dec!(50000)),
            insurance: Some(dec!(12000)),
            ..Default::default()
        };
        let deal = sample_deal().to_builder().expense_overrides(overrides).build();
        let base = derive(&sample_deal());
        let d = derive(&deal);
        assert_eq!(d.expenses.property_tax, dec!(50000));
        assert_eq!(d.expenses.insurance, dec!(12000));
        assert_eq!(d.expenses.utilities, base.expenses.utilities);
        assert_eq!(d.total_operating_expenses, d.expenses.total());
        assert_eq!(
            d.expense_ratio,
            d.total_operating_expenses / d.effective_gross_income
        );
    }

    #[test]
    fn test_market_rent_premium() {
        let deal = sample_deal().to_builder().market_rent(dec!(1500)).build();
        let d = derive(&deal);
        assert_eq!(d.rent_premium_potential, dec!(150));
        assert_eq!(d.market_gross_potential_rent, dec!(720000));
    }
}
