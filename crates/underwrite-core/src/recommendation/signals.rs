use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::deal::DealInputs;
use crate::types::{Money, MonteCarloSignal};

/// Lease rent further than this (percent) from in-place rent is a mismatch.
const RENT_MISMATCH_PCT: Decimal = dec!(10);
/// Escalation further than this (percentage points) from the revenue growth
/// assumption is a mismatch.
const GROWTH_MISMATCH_PTS: Decimal = dec!(1);

/// Forecast rates outside this band (percent) are clamped.
const FORECAST_FLOOR_PCT: Decimal = dec!(-2);
const FORECAST_CEILING_PCT: Decimal = dec!(8);

// ---------------------------------------------------------------------------
// Collaborator envelope
// ---------------------------------------------------------------------------

/// Output of an external collaborator. A collaborator that failed reports
/// `{"error": "..."}` and is scored as if it had not been supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollaboratorSignal<T> {
    Failed { error: String },
    Available(T),
}

impl<T> CollaboratorSignal<T> {
    pub fn available(&self) -> Option<&T> {
        match self {
            CollaboratorSignal::Available(value) => Some(value),
            CollaboratorSignal::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CollaboratorSignal::Failed { error } => Some(error),
            CollaboratorSignal::Available(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Signal payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationAssessment {
    #[serde(rename = "UNDERVALUED")]
    Undervalued,
    #[serde(rename = "FAIR VALUE")]
    FairValue,
    #[serde(rename = "OVERVALUED")]
    Overvalued,
}

/// Model-estimated value versus the asking price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSignal {
    pub assessment: ValuationAssessment,
    /// Asking price premium (+) or discount (-) to estimated value, percent
    #[serde(default)]
    pub premium_discount_pct: Option<Decimal>,
}

/// Findings from a review of the property's leases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseSignal {
    pub risk_flags: Vec<String>,
    pub rent_mismatch: bool,
    pub growth_mismatch: bool,
}

/// Predicted annual rent growth, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentForecastSignal {
    pub predicted_rates: Vec<Decimal>,
    pub avg_predicted_growth: Decimal,
}

/// Everything the scorer may receive besides the deal's own metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalSignals {
    pub valuation: Option<CollaboratorSignal<ValuationSignal>>,
    pub lease: Option<CollaboratorSignal<LeaseSignal>>,
    pub rent_forecast: Option<CollaboratorSignal<RentForecastSignal>>,
    pub monte_carlo: Option<MonteCarloSignal>,
}

// ---------------------------------------------------------------------------
// Lease comparison
// ---------------------------------------------------------------------------

/// Terms extracted from a lease, to be checked against the deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseTerms {
    pub monthly_rent: Money,
    #[serde(default)]
    pub annual_escalation_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseComparison {
    /// Lease rent relative to in-place rent, percent
    pub rent_discrepancy_pct: Decimal,
    pub rent_mismatch: bool,
    pub growth_mismatch: bool,
}

/// Compare lease terms with the rent and growth the deal assumes.
pub fn compare_lease_to_deal(deal: &DealInputs, lease: &LeaseTerms) -> LeaseComparison {
    let rent_discrepancy_pct = if deal.in_place_rent.is_zero() {
        Decimal::ZERO
    } else {
        (lease.monthly_rent - deal.in_place_rent) / deal.in_place_rent * Decimal::ONE_HUNDRED
    };
    let assumed_growth_pct = deal.financing.revenue_growth_rate * Decimal::ONE_HUNDRED;
    let growth_mismatch = lease
        .annual_escalation_pct
        .map(|esc| (esc - assumed_growth_pct).abs() > GROWTH_MISMATCH_PTS)
        .unwrap_or(false);

    LeaseComparison {
        rent_discrepancy_pct: rent_discrepancy_pct.round_dp(2),
        rent_mismatch: rent_discrepancy_pct.abs() > RENT_MISMATCH_PCT,
        growth_mismatch,
    }
}

impl LeaseSignal {
    /// Lease signal carrying the mismatch flags from a comparison.
    pub fn from_comparison(risk_flags: Vec<String>, comparison: &LeaseComparison) -> Self {
        Self {
            risk_flags,
            rent_mismatch: comparison.rent_mismatch,
            growth_mismatch: comparison.growth_mismatch,
        }
    }
}

// ---------------------------------------------------------------------------
// Rent forecast
// ---------------------------------------------------------------------------

/// Clamp raw predicted growth rates (percent) to [-2, 8], round to two
/// places and average them. `None` for an empty forecast.
///
/// The clamped rates are suitable for `DealInputs::yearly_revenue_growth`.
pub fn summarize_forecast(raw_rates: &[Decimal]) -> Option<RentForecastSignal> {
    if raw_rates.is_empty() {
        return None;
    }
    let predicted_rates: Vec<Decimal> = raw_rates
        .iter()
        .map(|&r| r.clamp(FORECAST_FLOOR_PCT, FORECAST_CEILING_PCT).round_dp(2))
        .collect();
    let total: Decimal = predicted_rates.iter().sum();
    let avg_predicted_growth = (total / Decimal::from(predicted_rates.len())).round_dp(2);
    Some(RentForecastSignal {
        predicted_rates,
        avg_predicted_growth,
    })
}
