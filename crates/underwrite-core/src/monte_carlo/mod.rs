pub mod simulation;

pub use simulation::{
    run_monte_carlo, IrrHistogram, McPercentiles, MonteCarloConfig, MonteCarloResult,
    ThresholdProbability,
};
