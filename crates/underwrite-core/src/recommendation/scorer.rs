use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::recommendation::signals::{CollaboratorSignal, ExternalSignals, ValuationAssessment};
use crate::types::{with_metadata, ComputationOutput, Multiple, MonteCarloSignal, Rate};
use crate::UnderwriteResult;

const IRR_STRONG_PCT: Decimal = dec!(15);
const IRR_GOOD_PCT: Decimal = dec!(12);
const IRR_WEAK_PCT: Decimal = dec!(8);

const DSCR_DEFAULT: Multiple = dec!(1.0);
const DSCR_THIN: Multiple = dec!(1.25);

const MAX_LEASE_RISK_FLAGS: usize = 3;

const FORECAST_STRONG_PCT: Decimal = dec!(4);
const FORECAST_WEAK_PCT: Decimal = dec!(1);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The deal's own figures the scorer reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    pub levered_irr: Option<Rate>,
    pub dscr_yr1: Multiple,
}

#[cfg(feature = "pro_forma")]
impl From<&crate::pro_forma::DealMetrics> for ReturnMetrics {
    fn from(metrics: &crate::pro_forma::DealMetrics) -> Self {
        Self {
            levered_irr: metrics.levered_irr,
            dscr_yr1: metrics.dscr_yr1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    #[serde(rename = "IRR")]
    Irr,
    #[serde(rename = "DSCR")]
    Dscr,
    #[serde(rename = "Valuation")]
    Valuation,
    #[serde(rename = "Lease Risk")]
    LeaseRisk,
    #[serde(rename = "Lease Rent")]
    LeaseRent,
    #[serde(rename = "Rent Forecast")]
    RentForecast,
    #[serde(rename = "Monte Carlo")]
    MonteCarlo,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalSource::Irr => "IRR",
            SignalSource::Dscr => "DSCR",
            SignalSource::Valuation => "Valuation",
            SignalSource::LeaseRisk => "Lease Risk",
            SignalSource::LeaseRent => "Lease Rent",
            SignalSource::RentForecast => "Rent Forecast",
            SignalSource::MonteCarlo => "Monte Carlo",
        };
        f.write_str(name)
    }
}

/// One line of the score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
    pub source: SignalSource,
    pub detail: String,
    pub points: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationLabel {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD / CONDITIONAL")]
    HoldConditional,
    #[serde(rename = "PASS")]
    Pass,
}

impl RecommendationLabel {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 2 => RecommendationLabel::StrongBuy,
            1 => RecommendationLabel::Buy,
            0 => RecommendationLabel::HoldConditional,
            _ => RecommendationLabel::Pass,
        }
    }
}

impl fmt::Display for RecommendationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecommendationLabel::StrongBuy => "STRONG BUY",
            RecommendationLabel::Buy => "BUY",
            RecommendationLabel::HoldConditional => "HOLD / CONDITIONAL",
            RecommendationLabel::Pass => "PASS",
        };
        f.write_str(label)
    }
}

/// Composite score, its label, and every contribution in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub score: i32,
    pub label: RecommendationLabel,
    pub signals: Vec<SignalContribution>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn irr_points(irr_pct: Decimal) -> i32 {
    if irr_pct >= IRR_STRONG_PCT {
        2
    } else if irr_pct >= IRR_GOOD_PCT {
        1
    } else if irr_pct < IRR_WEAK_PCT {
        -2
    } else {
        0
    }
}

fn dscr_points(dscr: Multiple) -> i32 {
    if dscr < DSCR_DEFAULT {
        -2
    } else if dscr < DSCR_THIN {
        -1
    } else {
        0
    }
}

fn valuation_points(assessment: ValuationAssessment) -> (i32, &'static str) {
    match assessment {
        ValuationAssessment::Undervalued => (1, "UNDERVALUED"),
        ValuationAssessment::FairValue => (0, "FAIR VALUE"),
        ValuationAssessment::Overvalued => (-1, "OVERVALUED"),
    }
}

fn forecast_points(avg_pct: Decimal) -> i32 {
    if avg_pct > FORECAST_STRONG_PCT {
        1
    } else if avg_pct < FORECAST_WEAK_PCT {
        -1
    } else {
        0
    }
}

fn monte_carlo_points(signal: MonteCarloSignal) -> i32 {
    match signal {
        MonteCarloSignal::Positive => 1,
        MonteCarloSignal::Warning => -1,
        MonteCarloSignal::Moderate | MonteCarloSignal::Neutral => 0,
    }
}

/// Unwrap a collaborator signal, noting a failure in `warnings`.
fn resolve<'a, T>(
    name: &str,
    signal: Option<&'a CollaboratorSignal<T>>,
    warnings: &mut Vec<String>,
) -> Option<&'a T> {
    let signal = signal?;
    if let Some(error) = signal.error() {
        warnings.push(format!("{name} signal absent: {error}"));
    }
    signal.available()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Combine deal metrics with whatever external signals are present into an
/// additive score. Rules run in a fixed order: IRR, DSCR, valuation, lease,
/// rent forecast, Monte Carlo. A missing or failed signal contributes
/// nothing and never prevents the others from scoring.
pub fn score_recommendation(
    metrics: &ReturnMetrics,
    signals: &ExternalSignals,
) -> UnderwriteResult<ComputationOutput<Recommendation>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let mut contributions: Vec<SignalContribution> = Vec::new();
    let mut push = |source, detail: String, points| {
        contributions.push(SignalContribution {
            source,
            detail,
            points,
        })
    };

    // IRR
    match metrics.levered_irr {
        Some(irr) => {
            let irr_pct = irr * Decimal::ONE_HUNDRED;
            push(
                SignalSource::Irr,
                format!("Levered IRR {:.1}%", irr_pct),
                irr_points(irr_pct),
            );
        }
        None => warnings.push("Levered IRR unavailable; IRR signal omitted".into()),
    }

    // DSCR
    push(
        SignalSource::Dscr,
        format!("Year 1 DSCR {:.2}x", metrics.dscr_yr1),
        dscr_points(metrics.dscr_yr1),
    );

    // Valuation
    if let Some(valuation) = resolve("Valuation", signals.valuation.as_ref(), &mut warnings) {
        let (points, label) = valuation_points(valuation.assessment);
        let detail = match valuation.premium_discount_pct {
            Some(pct) => format!("{label} ({:+.1}% vs. model value)", pct),
            None => label.to_string(),
        };
        push(SignalSource::Valuation, detail, points);
    }

    // Lease
    if let Some(lease) = resolve("Lease", signals.lease.as_ref(), &mut warnings) {
        let count = lease.risk_flags.len();
        let points = if count > MAX_LEASE_RISK_FLAGS { -1 } else { 0 };
        push(
            SignalSource::LeaseRisk,
            format!("{count} lease risk flag(s)"),
            points,
        );
        if lease.rent_mismatch {
            push(
                SignalSource::LeaseRent,
                "Lease rent does not match underwritten rent".into(),
                -1,
            );
        }
    }

    // Rent forecast
    if let Some(forecast) = resolve("Rent forecast", signals.rent_forecast.as_ref(), &mut warnings)
    {
        push(
            SignalSource::RentForecast,
            format!(
                "Average forecast rent growth {:.1}%",
                forecast.avg_predicted_growth
            ),
            forecast_points(forecast.avg_predicted_growth),
        );
    }

    // Monte Carlo
    if let Some(mc) = signals.monte_carlo {
        push(
            SignalSource::MonteCarlo,
            format!("Simulation signal {mc}"),
            monte_carlo_points(mc),
        );
    }

    let score: i32 = contributions.iter().map(|c| c.points).sum();
    let label = RecommendationLabel::from_score(score);
    tracing::debug!(score, %label, signals = contributions.len(), "recommendation scored");

    let output = Recommendation {
        score,
        label,
        signals: contributions,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Additive rule-table recommendation score",
        &serde_json::json!({
            "metrics": metrics,
            "signals": signals,
        }),
        warnings,
        elapsed,
        output,
    ))
}
