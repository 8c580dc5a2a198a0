use clap::Args;
use serde_json::Value;

use underwrite_core::monte_carlo::{self, MonteCarloConfig};

use super::load_deal;

/// Arguments for the Monte Carlo IRR simulation
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to deal JSON/YAML file (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Number of randomized rebuilds
    #[arg(long, default_value_t = 1000)]
    pub iterations: u32,

    /// RNG seed; the same seed reproduces the same distribution
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl MonteCarloArgs {
    pub fn config(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            n_iterations: self.iterations,
            seed: self.seed,
        }
    }
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = load_deal(args.input.as_deref(), "Monte Carlo simulation")?;
    let result = monte_carlo::run_monte_carlo(&deal, &args.config())?;
    Ok(serde_json::to_value(result)?)
}
