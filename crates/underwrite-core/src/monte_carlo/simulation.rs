use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::Uniform;
use std::time::Instant;

use crate::deal::DealInputs;
use crate::error::UnderwriteError;
use crate::pro_forma::engine::project;
use crate::types::{with_metadata_f64, ComputationOutput, MonteCarloSignal};
use crate::UnderwriteResult;

// ---------------------------------------------------------------------------
// Shock ranges
// ---------------------------------------------------------------------------

/// Relative shock to the revenue growth rate.
const GROWTH_SHOCK: (f64, f64) = (-0.30, 0.30);
/// Absolute shock to occupancy.
const OCCUPANCY_SHOCK: (f64, f64) = (-0.03, 0.03);
/// Absolute shock to the exit cap spread.
const EXIT_SPREAD_SHOCK: (f64, f64) = (-0.005, 0.005);
/// Relative shock to the expense growth rate.
const EXPENSE_SHOCK: (f64, f64) = (-0.25, 0.25);

const OCCUPANCY_FLOOR: f64 = 0.60;
const OCCUPANCY_CEILING: f64 = 0.99;

/// IRRs (percent) outside this band are treated as failed rebuilds.
const IRR_BAND: (f64, f64) = (-100.0, 200.0);

/// Fewer valid iterations than this and the distribution is not reported.
const MIN_VALID_ITERATIONS: usize = 10;

const HISTOGRAM_BINS: usize = 20;

/// (label, threshold in percent, true when counting IRRs above the threshold)
const THRESHOLDS: [(&str, f64, bool); 4] = [
    ("IRR > 8%", 8.0, true),
    ("IRR > 12%", 12.0, true),
    ("IRR > 15%", 15.0, true),
    ("IRR < 0% (Loss)", 0.0, false),
];

/// Probability cut-offs (percent) for the distribution signal.
const POSITIVE_CUTOFF: f64 = 70.0;
const MODERATE_CUTOFF: f64 = 70.0;
const WARNING_LOSS_CUTOFF: f64 = 20.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Simulation size and seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_iterations")]
    pub n_iterations: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_iterations() -> u32 {
    1_000
}

fn default_seed() -> u64 {
    42
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            n_iterations: default_iterations(),
            seed: default_seed(),
        }
    }
}

/// Percentile summary of simulated IRRs, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McPercentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// Share of valid iterations beyond an IRR threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProbability {
    pub label: String,
    pub threshold: f64,
    /// Percent of valid iterations
    pub probability: f64,
}

/// Equal-width histogram: `bin_edges` has one more entry than `counts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrHistogram {
    pub bin_edges: Vec<f64>,
    pub counts: Vec<u32>,
}

/// Distribution of levered IRR under randomized assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub n_iterations: u32,
    pub valid_iterations: u32,
    pub failed_iterations: u32,
    pub mean_irr: f64,
    pub std_irr: f64,
    pub min_irr: f64,
    pub max_irr: f64,
    pub mean_equity_multiple: f64,
    pub percentiles: McPercentiles,
    pub probabilities: Vec<ThresholdProbability>,
    pub histogram: IrrHistogram,
    pub summary: String,
    pub mc_signal: MonteCarloSignal,
    pub mc_detail: String,
}

/// Shocks drawn for one iteration, in draw order.
#[derive(Debug, Clone, Copy)]
struct IterationShocks {
    growth: f64,
    occupancy: f64,
    exit_spread: f64,
    expense: f64,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

fn uniform(range: (f64, f64)) -> UnderwriteResult<Uniform> {
    Uniform::new(range.0, range.1).map_err(|e| UnderwriteError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Invalid Uniform parameters: {e}"),
    })
}

fn draw_shocks(config: &MonteCarloConfig) -> UnderwriteResult<Vec<IterationShocks>> {
    let growth = uniform(GROWTH_SHOCK)?;
    let occupancy = uniform(OCCUPANCY_SHOCK)?;
    let exit_spread = uniform(EXIT_SPREAD_SHOCK)?;
    let expense = uniform(EXPENSE_SHOCK)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    Ok((0..config.n_iterations)
        .map(|_| IterationShocks {
            growth: rng.sample(growth),
            occupancy: rng.sample(occupancy),
            exit_spread: rng.sample(exit_spread),
            expense: rng.sample(expense),
        })
        .collect())
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Apply one iteration's shocks to the base deal.
fn perturb(deal: &DealInputs, shocks: &IterationShocks) -> DealInputs {
    let fin = &deal.financing;
    let growth = (fin.revenue_growth_rate * (Decimal::ONE + to_decimal(shocks.growth)))
        .max(Decimal::ZERO);
    let occupancy = (to_f64(deal.occupancy) + shocks.occupancy)
        .clamp(OCCUPANCY_FLOOR, OCCUPANCY_CEILING);
    let spread = (fin.exit_cap_rate_spread + to_decimal(shocks.exit_spread)).max(Decimal::ZERO);
    let expense_growth = (fin.expense_growth_rate * (Decimal::ONE + to_decimal(shocks.expense)))
        .max(Decimal::ZERO);

    deal.to_builder()
        .revenue_growth_rate(growth)
        .clear_yearly_growth()
        .occupancy(to_decimal(occupancy))
        .exit_cap_rate_spread(spread)
        .expense_growth_rate(expense_growth)
        .build()
}

/// Rebuild the pro forma under one set of shocks. Returns (IRR %, equity
/// multiple) when the levered IRR exists and is plausible.
fn evaluate(deal: &DealInputs, shocks: &IterationShocks) -> Option<(f64, f64)> {
    let shocked = perturb(deal, shocks);
    let mut scratch = Vec::new();
    let result = project(&shocked, &mut scratch);
    let irr_pct = to_f64(result.metrics.levered_irr?) * 100.0;
    if !(IRR_BAND.0..=IRR_BAND.1).contains(&irr_pct) {
        return None;
    }
    Some((irr_pct, to_f64(result.metrics.equity_multiple)))
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Percentile of a **sorted**, non-empty slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Equal-width bins between min and max; the last bin includes max.
/// A degenerate sample spans one unit centred on its value.
fn build_histogram(sorted: &[f64], num_bins: usize) -> IrrHistogram {
    let mut min_val = sorted[0];
    let mut max_val = sorted[sorted.len() - 1];
    if (max_val - min_val).abs() < f64::EPSILON {
        min_val -= 0.5;
        max_val += 0.5;
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let bin_edges: Vec<f64> = (0..=num_bins)
        .map(|i| {
            let edge = if i == num_bins {
                max_val
            } else {
                min_val + i as f64 * bin_width
            };
            round_to(edge, 1)
        })
        .collect();

    let mut counts = vec![0u32; num_bins];
    for &val in sorted {
        let idx = (((val - min_val) / bin_width).floor() as usize).min(num_bins - 1);
        counts[idx] += 1;
    }

    IrrHistogram { bin_edges, counts }
}

fn share_pct(values: &[f64], predicate: impl Fn(f64) -> bool) -> f64 {
    let hits = values.iter().filter(|v| predicate(**v)).count();
    round_to(hits as f64 / values.len() as f64 * 100.0, 1)
}

fn classify(prob_8: f64, prob_12: f64, prob_loss: f64, median: f64) -> (MonteCarloSignal, String) {
    if prob_12 >= POSITIVE_CUTOFF {
        (
            MonteCarloSignal::Positive,
            format!("{prob_12}% chance of exceeding 12% IRR"),
        )
    } else if prob_8 >= MODERATE_CUTOFF {
        (
            MonteCarloSignal::Moderate,
            format!("{prob_8}% chance of exceeding 8% IRR"),
        )
    } else if prob_loss > WARNING_LOSS_CUTOFF {
        (
            MonteCarloSignal::Warning,
            format!("{prob_loss}% chance of negative returns"),
        )
    } else {
        (
            MonteCarloSignal::Neutral,
            format!("Median IRR: {median:.1}%"),
        )
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Rebuild the pro forma `n_iterations` times under uniform shocks to
/// revenue growth, occupancy, exit cap spread and expense growth, and
/// summarize the resulting levered IRR distribution.
///
/// All shocks come from a single generator seeded with `config.seed`, so the
/// output is a pure function of the deal and the config.
pub fn run_monte_carlo(
    deal: &DealInputs,
    config: &MonteCarloConfig,
) -> UnderwriteResult<ComputationOutput<MonteCarloResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if config.n_iterations == 0 {
        return Err(UnderwriteError::InvalidInput {
            field: "n_iterations".into(),
            reason: "At least one iteration is required".into(),
        });
    }

    let shocks = draw_shocks(config)?;

    #[cfg(feature = "parallel")]
    let outcomes: Vec<Option<(f64, f64)>> =
        shocks.par_iter().map(|s| evaluate(deal, s)).collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Option<(f64, f64)>> = shocks.iter().map(|s| evaluate(deal, s)).collect();

    let mut irrs: Vec<f64> = Vec::with_capacity(outcomes.len());
    let mut ems: Vec<f64> = Vec::with_capacity(outcomes.len());
    for (idx, outcome) in outcomes.iter().enumerate() {
        match outcome {
            Some((irr, em)) => {
                irrs.push(*irr);
                ems.push(*em);
            }
            None => tracing::debug!(iteration = idx, "monte carlo iteration discarded"),
        }
    }

    let valid = irrs.len();
    let failed = config.n_iterations as usize - valid;
    if valid < MIN_VALID_ITERATIONS {
        return Err(UnderwriteError::InsufficientData(format!(
            "Only {valid} of {} iterations produced a valid IRR (minimum {MIN_VALID_ITERATIONS})",
            config.n_iterations
        )));
    }
    if failed > 0 {
        warnings.push(format!(
            "{failed} of {} iterations produced no usable IRR",
            config.n_iterations
        ));
    }

    let n = valid as f64;
    let mean = irrs.iter().sum::<f64>() / n;
    let variance = irrs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let mean_em = ems.iter().sum::<f64>() / n;

    let mut sorted = irrs.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let percentiles = McPercentiles {
        p5: round_to(percentile_sorted(&sorted, 5.0), 1),
        p10: round_to(percentile_sorted(&sorted, 10.0), 1),
        p25: round_to(percentile_sorted(&sorted, 25.0), 1),
        p50: round_to(percentile_sorted(&sorted, 50.0), 1),
        p75: round_to(percentile_sorted(&sorted, 75.0), 1),
        p90: round_to(percentile_sorted(&sorted, 90.0), 1),
        p95: round_to(percentile_sorted(&sorted, 95.0), 1),
    };

    let probabilities: Vec<ThresholdProbability> = THRESHOLDS
        .iter()
        .map(|(label, threshold, above)| ThresholdProbability {
            label: (*label).to_string(),
            threshold: *threshold,
            probability: if *above {
                share_pct(&irrs, |v| v > *threshold)
            } else {
                share_pct(&irrs, |v| v < *threshold)
            },
        })
        .collect();
    let prob_8 = probabilities[0].probability;
    let prob_12 = probabilities[1].probability;
    let prob_loss = probabilities[3].probability;

    let (mc_signal, mc_detail) = classify(prob_8, prob_12, prob_loss, percentiles.p50);
    let summary = format!(
        "{prob_12}% probability of IRR > 12%. Median IRR: {:.1}%. Range: {:.1}% (P5) to {:.1}% (P95).",
        percentiles.p50, percentiles.p5, percentiles.p95
    );

    tracing::debug!(
        valid,
        failed,
        mean_irr = mean,
        signal = %mc_signal,
        "monte carlo complete"
    );

    let output = MonteCarloResult {
        n_iterations: config.n_iterations,
        valid_iterations: valid as u32,
        failed_iterations: failed as u32,
        mean_irr: round_to(mean, 1),
        std_irr: round_to(variance.sqrt(), 1),
        min_irr: round_to(sorted[0], 1),
        max_irr: round_to(sorted[valid - 1], 1),
        mean_equity_multiple: round_to(mean_em, 2),
        percentiles,
        probabilities,
        histogram: build_histogram(&sorted, HISTOGRAM_BINS),
        summary,
        mc_signal,
        mc_detail,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo rebuild of the pro forma under uniform assumption shocks",
        config,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
