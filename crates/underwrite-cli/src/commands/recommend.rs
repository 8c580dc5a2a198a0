use clap::Args;
use serde_json::Value;

use underwrite_core::monte_carlo::{self, MonteCarloConfig};
use underwrite_core::pro_forma;
use underwrite_core::recommendation::{self, ExternalSignals, ReturnMetrics};

use super::load_deal;
use crate::input;

/// Arguments for the composite recommendation
#[derive(Args)]
pub struct RecommendArgs {
    /// Path to deal JSON/YAML file (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to collaborator signals (valuation, lease, rent forecast, monte_carlo)
    #[arg(long)]
    pub signals: Option<String>,

    /// Run the Monte Carlo simulation and score its signal
    #[arg(long)]
    pub simulate: bool,

    /// Iterations for --simulate
    #[arg(long, default_value_t = 1000)]
    pub iterations: u32,

    /// RNG seed for --simulate
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

pub fn run_recommend(args: RecommendArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = load_deal(args.input.as_deref(), "recommendation")?;
    let mut signals: ExternalSignals = match args.signals {
        Some(ref path) => input::file::read_input(path)?,
        None => ExternalSignals::default(),
    };

    let built = pro_forma::build_pro_forma(&deal)?;

    if args.simulate {
        let config = MonteCarloConfig {
            n_iterations: args.iterations,
            seed: args.seed,
        };
        // A failed simulation leaves the signal absent rather than aborting.
        match monte_carlo::run_monte_carlo(&deal, &config) {
            Ok(mc) => signals.monte_carlo = Some(mc.result.mc_signal),
            Err(e) => tracing::warn!(error = %e, "monte carlo signal unavailable"),
        }
    }

    let mut result =
        recommendation::score_recommendation(&ReturnMetrics::from(&built.result.metrics), &signals)?;
    result.warnings.splice(0..0, built.warnings);
    Ok(serde_json::to_value(result)?)
}
