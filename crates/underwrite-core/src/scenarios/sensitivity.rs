use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::deal::{derive, DealInputs};
use crate::pro_forma::engine::{project, ProFormaResult};
use crate::types::*;
use crate::UnderwriteResult;

/// Floor applied to shocked note rates.
const MIN_INTEREST_RATE: Rate = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Assumption being flexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityDriver {
    /// Additive shift of the exit cap (through the spread)
    ExitCap,
    /// Additive shift of the note rate, floored at 1%
    InterestRate,
    /// Additive shift of flat rent growth, floored at 0; predicted
    /// growth is dropped
    RentGrowth,
    /// Additive shift of flat revenue growth, predicted growth kept
    NoiGrowth,
    /// Relative change in purchase price
    PurchasePrice,
}

impl SensitivityDriver {
    pub fn default_deltas(&self) -> Vec<Decimal> {
        match self {
            SensitivityDriver::ExitCap => vec![
                dec!(-0.01),
                dec!(-0.005),
                dec!(-0.0025),
                dec!(0),
                dec!(0.0025),
                dec!(0.005),
                dec!(0.01),
            ],
            SensitivityDriver::InterestRate => vec![
                dec!(-0.015),
                dec!(-0.01),
                dec!(-0.005),
                dec!(0),
                dec!(0.005),
                dec!(0.01),
                dec!(0.015),
            ],
            SensitivityDriver::RentGrowth | SensitivityDriver::NoiGrowth => {
                vec![dec!(-0.02), dec!(-0.01), dec!(0), dec!(0.01), dec!(0.02)]
            }
            SensitivityDriver::PurchasePrice => {
                vec![dec!(-0.10), dec!(-0.05), dec!(0), dec!(0.05), dec!(0.10)]
            }
        }
    }

    pub fn input_label(&self) -> &'static str {
        match self {
            SensitivityDriver::ExitCap => "Exit Cap Rate",
            SensitivityDriver::InterestRate => "Interest Rate",
            SensitivityDriver::RentGrowth => "Rent Growth",
            SensitivityDriver::NoiGrowth => "NOI Growth",
            SensitivityDriver::PurchasePrice => "Purchase Price",
        }
    }

    /// Driver-specific metric reported next to IRR and equity multiple.
    pub fn extra_label(&self) -> Option<&'static str> {
        match self {
            SensitivityDriver::ExitCap => Some("Sale Price"),
            SensitivityDriver::InterestRate => Some("DSCR"),
            SensitivityDriver::RentGrowth => Some("Stabilized YOC"),
            SensitivityDriver::NoiGrowth => None,
            SensitivityDriver::PurchasePrice => Some("Going-In Cap"),
        }
    }

    /// The shocked deal and the value of the flexed input, or None when the
    /// shock produces a meaningless deal.
    fn apply(&self, deal: &DealInputs, delta: Decimal) -> Option<(Decimal, DealInputs)> {
        let fin = &deal.financing;
        match self {
            SensitivityDriver::ExitCap => {
                let base_cap = derive(deal).exit_cap_rate;
                let cap = base_cap + delta;
                if cap <= Decimal::ZERO {
                    return None;
                }
                let shocked = deal
                    .to_builder()
                    .exit_cap_rate_spread(fin.exit_cap_rate_spread + delta)
                    .build();
                Some((cap, shocked))
            }
            SensitivityDriver::InterestRate => {
                let rate = (fin.interest_rate + delta).max(MIN_INTEREST_RATE);
                Some((rate, deal.to_builder().interest_rate(rate).build()))
            }
            SensitivityDriver::RentGrowth => {
                let growth = (fin.revenue_growth_rate + delta).max(Decimal::ZERO);
                let shocked = deal
                    .to_builder()
                    .revenue_growth_rate(growth)
                    .clear_yearly_growth()
                    .build();
                Some((growth, shocked))
            }
            SensitivityDriver::NoiGrowth => {
                let growth = fin.revenue_growth_rate + delta;
                Some((growth, deal.to_builder().revenue_growth_rate(growth).build()))
            }
            SensitivityDriver::PurchasePrice => {
                let price = deal.purchase_price * (Decimal::ONE + delta);
                Some((price, deal.to_builder().purchase_price(price).build()))
            }
        }
    }

    fn extra(&self, result: &ProFormaResult) -> Option<Decimal> {
        match self {
            SensitivityDriver::ExitCap => Some(result.reversion.sale_price),
            SensitivityDriver::InterestRate => Some(result.metrics.dscr_yr1),
            SensitivityDriver::RentGrowth => Some(result.metrics.stabilized_yoc),
            SensitivityDriver::NoiGrowth => None,
            SensitivityDriver::PurchasePrice => Some(result.metrics.going_in_cap_rate),
        }
    }
}

/// Outcome of one full rebuild under a shocked assumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub delta: Decimal,
    pub input_value: Decimal,
    pub irr: Option<Rate>,
    pub equity_multiple: Multiple,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Decimal>,
}

/// One-way sensitivity table for a single driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTable {
    pub driver: SensitivityDriver,
    pub input_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_label: Option<String>,
    pub rows: Vec<SensitivityRow>,
}

/// The standard set of tables produced for every deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivitySuite {
    pub exit_cap: SensitivityTable,
    pub interest_rate: SensitivityTable,
    pub rent_growth: SensitivityTable,
    pub noi_growth: SensitivityTable,
    pub purchase_price: SensitivityTable,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn sweep(
    deal: &DealInputs,
    driver: SensitivityDriver,
    deltas: &[Decimal],
    warnings: &mut Vec<String>,
) -> SensitivityTable {
    let mut rows = Vec::with_capacity(deltas.len());

    for delta in deltas {
        let Some((input_value, shocked)) = driver.apply(deal, *delta) else {
            warnings.push(format!(
                "{}: delta {delta} skipped (non-positive resulting value)",
                driver.input_label()
            ));
            continue;
        };

        // Each point is a full independent rebuild.
        let mut scratch = Vec::new();
        let result = project(&shocked, &mut scratch);
        debug!(?driver, %delta, irr = ?result.metrics.levered_irr, "sensitivity point");

        rows.push(SensitivityRow {
            delta: *delta,
            input_value,
            irr: result.metrics.levered_irr,
            equity_multiple: result.metrics.equity_multiple,
            extra: driver.extra(&result),
        });
    }

    SensitivityTable {
        driver,
        input_label: driver.input_label().to_string(),
        extra_label: driver.extra_label().map(str::to_string),
        rows,
    }
}

/// One-way sensitivity of levered IRR and equity multiple to `driver`.
/// `deltas` defaults to the driver's standard grid.
pub fn run_sensitivity(
    deal: &DealInputs,
    driver: SensitivityDriver,
    deltas: Option<&[Decimal]>,
) -> UnderwriteResult<ComputationOutput<SensitivityTable>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let defaults = driver.default_deltas();
    let deltas = deltas.unwrap_or(&defaults);
    let table = sweep(deal, driver, deltas, &mut warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("One-Way Sensitivity ({}, full rebuild per point)", driver.input_label()),
        &serde_json::json!({
            "driver": driver,
            "deltas": deltas,
        }),
        warnings,
        elapsed,
        table,
    ))
}

pub fn exit_cap_sensitivity(
    deal: &DealInputs,
    deltas: Option<&[Decimal]>,
) -> UnderwriteResult<ComputationOutput<SensitivityTable>> {
    run_sensitivity(deal, SensitivityDriver::ExitCap, deltas)
}

pub fn interest_rate_sensitivity(
    deal: &DealInputs,
    deltas: Option<&[Decimal]>,
) -> UnderwriteResult<ComputationOutput<SensitivityTable>> {
    run_sensitivity(deal, SensitivityDriver::InterestRate, deltas)
}

pub fn rent_growth_sensitivity(
    deal: &DealInputs,
    deltas: Option<&[Decimal]>,
) -> UnderwriteResult<ComputationOutput<SensitivityTable>> {
    run_sensitivity(deal, SensitivityDriver::RentGrowth, deltas)
}

pub fn noi_growth_sensitivity(
    deal: &DealInputs,
    deltas: Option<&[Decimal]>,
) -> UnderwriteResult<ComputationOutput<SensitivityTable>> {
    run_sensitivity(deal, SensitivityDriver::NoiGrowth, deltas)
}

pub fn purchase_price_sensitivity(
    deal: &DealInputs,
    deltas: Option<&[Decimal]>,
) -> UnderwriteResult<ComputationOutput<SensitivityTable>> {
    run_sensitivity(deal, SensitivityDriver::PurchasePrice, deltas)
}

/// Every standard table with default deltas.
pub fn run_all_sensitivities(
    deal: &DealInputs,
) -> UnderwriteResult<ComputationOutput<SensitivitySuite>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut table = |driver: SensitivityDriver| {
        sweep(deal, driver, &driver.default_deltas(), &mut warnings)
    };
    let suite = SensitivitySuite {
        exit_cap: table(SensitivityDriver::ExitCap),
        interest_rate: table(SensitivityDriver::InterestRate),
        rent_growth: table(SensitivityDriver::RentGrowth),
        noi_growth: table(SensitivityDriver::NoiGrowth),
        purchase_price: table(SensitivityDriver::PurchasePrice),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sensitivity Suite (exit cap, interest rate, rent growth, NOI growth, purchase price)",
        deal,
        warnings,
        elapsed,
        suite,
    ))
}
