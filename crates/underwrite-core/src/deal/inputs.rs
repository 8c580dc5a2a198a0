use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::UnderwriteError;
use crate::types::{Money, Rate};
use crate::UnderwriteResult;

// ---------------------------------------------------------------------------
// Financing & operating terms
// ---------------------------------------------------------------------------

/// Debt terms and operating/exit assumptions. Every field has a documented
/// default so a partially specified deal deserializes to a usable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancingTerms {
    /// Loan-to-value on purchase price (default 0.65)
    pub ltv: Rate,
    /// Annual note rate (default 0.0675)
    pub interest_rate: Rate,
    /// Amortization period in years (default 30)
    pub amortization_years: u32,
    /// Loan term in years, i.e. length of the schedule (default 10)
    pub loan_term_years: u32,
    /// Interest-only years at the start of the loan (default 0)
    pub io_period_years: u32,
    /// Closing costs as a share of price (default 0.03)
    pub closing_costs_pct: Rate,
    /// Flat annual rent growth (default 0.03)
    pub revenue_growth_rate: Rate,
    /// Annual expense growth (default 0.03)
    pub expense_growth_rate: Rate,
    /// Management fee as a share of EGI (default 0.035)
    pub management_fee_pct: Rate,
    /// Exit cap = going-in cap + spread (default 0.0025)
    pub exit_cap_rate_spread: Rate,
    /// Selling costs as a share of sale price (default 0.025)
    pub sale_costs_pct: Rate,
    /// Replacement reserves, $/unit/year (default 250)
    pub replacement_reserves_per_unit: Money,
    /// Ordinary income tax rate; zero disables after-tax analysis
    pub tax_rate: Rate,
    /// Share of price + closing attributed to non-depreciable land (default 0.20)
    pub land_value_pct: Rate,
}

impl Default for FinancingTerms {
    fn default() -> Self {
        Self {
            ltv: dec!(0.65),
            interest_rate: dec!(0.0675),
            amortization_years: 30,
            loan_term_years: 10,
            io_period_years: 0,
            closing_costs_pct: dec!(0.03),
            revenue_growth_rate: dec!(0.03),
            expense_growth_rate: dec!(0.03),
            management_fee_pct: dec!(0.035),
            exit_cap_rate_spread: dec!(0.0025),
            sale_costs_pct: dec!(0.025),
            replacement_reserves_per_unit: dec!(250),
            tax_rate: Decimal::ZERO,
            land_value_pct: dec!(0.20),
        }
    }
}

/// Known annual amounts that replace the derived allocation line by line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseOverrides {
    pub property_tax: Option<Money>,
    pub insurance: Option<Money>,
    pub utilities: Option<Money>,
    pub repairs_maintenance: Option<Money>,
    pub general_admin: Option<Money>,
    pub other_expenses: Option<Money>,
}

impl ExpenseOverrides {
    pub fn is_empty(&self) -> bool {
        self == &ExpenseOverrides::default()
    }
}

// ---------------------------------------------------------------------------
// Deal inputs
// ---------------------------------------------------------------------------

/// Everything known about an acquisition before underwriting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInputs {
    /// "<asset type> - <asset class>", e.g. "Multifamily - Class B"
    #[serde(default = "default_property_type")]
    pub property_type: String,
    /// "street, city, STATE ZIP"
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_year_built")]
    pub year_built: u32,
    pub purchase_price: Money,
    pub current_noi: Money,
    pub total_units: u32,
    #[serde(default)]
    pub total_sf: Decimal,
    /// $/unit/month
    pub in_place_rent: Money,
    /// $/unit/month; zero means no market rent supplied
    #[serde(default)]
    pub market_rent: Money,
    #[serde(default = "default_occupancy")]
    pub occupancy: Rate,
    #[serde(default)]
    pub deferred_maintenance: Money,
    #[serde(default)]
    pub planned_capex: Money,
    #[serde(default)]
    pub capex_description: String,
    #[serde(default = "default_hold_period")]
    pub hold_period_years: u32,
    #[serde(default)]
    pub financing: FinancingTerms,
    #[serde(default)]
    pub expense_overrides: ExpenseOverrides,
    /// Predicted annual growth in percent (3.5 = 3.5%), year 1 first
    #[serde(default)]
    pub yearly_revenue_growth: Vec<Decimal>,
}

fn default_property_type() -> String {
    "Multifamily - Class B".to_string()
}

fn default_year_built() -> u32 {
    2000
}

fn default_occupancy() -> Rate {
    dec!(0.92)
}

fn default_hold_period() -> u32 {
    7
}

impl Default for DealInputs {
    fn default() -> Self {
        Self {
            property_type: default_property_type(),
            address: String::new(),
            year_built: default_year_built(),
            purchase_price: Decimal::ZERO,
            current_noi: Decimal::ZERO,
            total_units: 0,
            total_sf: Decimal::ZERO,
            in_place_rent: Decimal::ZERO,
            market_rent: Decimal::ZERO,
            occupancy: default_occupancy(),
            deferred_maintenance: Decimal::ZERO,
            planned_capex: Decimal::ZERO,
            capex_description: String::new(),
            hold_period_years: default_hold_period(),
            financing: FinancingTerms::default(),
            expense_overrides: ExpenseOverrides::default(),
            yearly_revenue_growth: Vec::new(),
        }
    }
}

impl DealInputs {
    pub fn builder() -> DealBuilder {
        DealBuilder::default()
    }

    /// Start a modified copy of this deal.
    pub fn to_builder(&self) -> DealBuilder {
        DealBuilder { deal: self.clone() }
    }

    pub fn total_capex(&self) -> Money {
        self.deferred_maintenance + self.planned_capex
    }

    pub fn uses_variable_growth(&self) -> bool {
        !self.yearly_revenue_growth.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Produces new `DealInputs` values with selected fields overridden.
#[derive(Debug, Clone, Default)]
pub struct DealBuilder {
    deal: DealInputs,
}

macro_rules! deal_setters {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $name(mut self, value: $ty) -> Self {
                self.deal.$name = value;
                self
            }
        )*
    };
}

macro_rules! financing_setters {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $name(mut self, value: $ty) -> Self {
                self.deal.financing.$name = value;
                self
            }
        )*
    };
}

impl DealBuilder {
    pub fn property_type(mut self, value: impl Into<String>) -> Self {
        self.deal.property_type = value.into();
        self
    }

    pub fn address(mut self, value: impl Into<String>) -> Self {
        self.deal.address = value.into();
        self
    }

    pub fn capex_description(mut self, value: impl Into<String>) -> Self {
        self.deal.capex_description = value.into();
        self
    }

    deal_setters! {
        year_built: u32,
        purchase_price: Money,
        current_noi: Money,
        total_units: u32,
        total_sf: Decimal,
        in_place_rent: Money,
        market_rent: Money,
        occupancy: Rate,
        deferred_maintenance: Money,
        planned_capex: Money,
        hold_period_years: u32,
        financing: FinancingTerms,
        expense_overrides: ExpenseOverrides,
        yearly_revenue_growth: Vec<Decimal>,
    }

    financing_setters! {
        ltv: Rate,
        interest_rate: Rate,
        amortization_years: u32,
        loan_term_years: u32,
        io_period_years: u32,
        closing_costs_pct: Rate,
        revenue_growth_rate: Rate,
        expense_growth_rate: Rate,
        management_fee_pct: Rate,
        exit_cap_rate_spread: Rate,
        sale_costs_pct: Rate,
        replacement_reserves_per_unit: Money,
        tax_rate: Rate,
        land_value_pct: Rate,
    }

    /// Drop any predicted growth sequence so the flat rate applies.
    pub fn clear_yearly_growth(mut self) -> Self {
        self.deal.yearly_revenue_growth.clear();
        self
    }

    pub fn build(self) -> DealInputs {
        self.deal
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject deals that cannot be underwritten meaningfully. The engine itself
/// never calls this; degenerate inputs there resolve to zero-valued metrics.
pub fn validate_deal(deal: &DealInputs) -> UnderwriteResult<()> {
    if deal.purchase_price <= Decimal::ZERO {
        return Err(UnderwriteError::invalid(
            "purchase_price",
            "Purchase price must be positive",
        ));
    }
    if deal.total_units == 0 {
        return Err(UnderwriteError::invalid(
            "total_units",
            "Unit count must be at least 1",
        ));
    }
    if deal.in_place_rent <= Decimal::ZERO {
        return Err(UnderwriteError::invalid(
            "in_place_rent",
            "In-place rent must be positive",
        ));
    }
    if deal.occupancy <= Decimal::ZERO || deal.occupancy > Decimal::ONE {
        return Err(UnderwriteError::invalid(
            "occupancy",
            "Occupancy must be in (0, 1]",
        ));
    }
    if deal.hold_period_years == 0 {
        return Err(UnderwriteError::invalid(
            "hold_period_years",
            "Hold period must be at least one year",
        ));
    }
    let f = &deal.financing;
    if f.ltv < Decimal::ZERO || f.ltv > Decimal::ONE {
        return Err(UnderwriteError::invalid("financing.ltv", "LTV must be in [0, 1]"));
    }
    if f.interest_rate < Decimal::ZERO {
        return Err(UnderwriteError::invalid(
            "financing.interest_rate",
            "Interest rate cannot be negative",
        ));
    }
    if f.tax_rate < Decimal::ZERO || f.tax_rate >= Decimal::ONE {
        return Err(UnderwriteError::invalid(
            "financing.tax_rate",
            "Tax rate must be in [0, 1)",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sample_deal() -> DealInputs {
        DealInputs::builder()
            .purchase_price(dec!(10000000))
            .current_noi(dec!(520000))
            .total_units(40)
            .in_place_rent(dec!(1350))
            .build()
    }

    #[test]
    fn test_partial_json_takes_documented_defaults() {
        let json = r#"{
            "purchase_price": "10000000",
            "current_noi": "520000",
            "total_units": 40,
            "in_place_rent": "1350",
            "financing": { "ltv": "0.70" }
        }"#;
        let deal: DealInputs = serde_json::from_str(json).unwrap();
        assert_eq!(deal.property_type, "Multifamily - Class B");
        assert_eq!(deal.occupancy, dec!(0.92));
        assert_eq!(deal.hold_period_years, 7);
        assert_eq!(deal.financing.ltv, dec!(0.70));
        assert_eq!(deal.financing.interest_rate, dec!(0.0675));
        assert_eq!(deal.financing.amortization_years, 30);
        assert!(deal.yearly_revenue_growth.is_empty());
        assert!(deal.expense_overrides.is_empty());
    }

    #[test]
    fn test_builder_override_leaves_original_untouched() {
        let base = sample_deal();
        let shocked = base
            .to_builder()
            .interest_rate(dec!(0.08))
            .occupancy(dec!(0.95))
            .build();
        assert_eq!(base.financing.interest_rate, dec!(0.0675));
        assert_eq!(shocked.financing.interest_rate, dec!(0.08));
        assert_eq!(shocked.occupancy, dec!(0.95));
        assert_eq!(shocked.purchase_price, base.purchase_price);
    }

    #[test]
    fn test_clear_yearly_growth() {
        let deal = sample_deal()
            .to_builder()
            .yearly_revenue_growth(vec![dec!(5), dec!(4)])
            .build();
        assert!(deal.uses_variable_growth());
        assert!(!deal.to_builder().clear_yearly_growth().build().uses_variable_growth());
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(validate_deal(&sample_deal()).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_price() {
        let deal = sample_deal().to_builder().purchase_price(Decimal::ZERO).build();
        match validate_deal(&deal) {
            Err(UnderwriteError::InvalidInput { field, .. }) => assert_eq!(field, "purchase_price"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_occupancy_out_of_range() {
        let deal = sample_deal().to_builder().occupancy(dec!(1.2)).build();
        assert!(validate_deal(&deal).is_err());
    }
}
