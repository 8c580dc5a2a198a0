use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use underwrite_core::scenarios::{self, SensitivityDriver};

use super::load_deal;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DriverArg {
    ExitCap,
    InterestRate,
    RentGrowth,
    NoiGrowth,
    PurchasePrice,
}

impl From<DriverArg> for SensitivityDriver {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::ExitCap => SensitivityDriver::ExitCap,
            DriverArg::InterestRate => SensitivityDriver::InterestRate,
            DriverArg::RentGrowth => SensitivityDriver::RentGrowth,
            DriverArg::NoiGrowth => SensitivityDriver::NoiGrowth,
            DriverArg::PurchasePrice => SensitivityDriver::PurchasePrice,
        }
    }
}

/// Arguments for sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to deal JSON/YAML file (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Input to flex; omit to run every standard table
    #[arg(long, value_enum)]
    pub driver: Option<DriverArg>,

    /// Custom deltas (comma-separated, e.g. "-0.01,0,0.01"); needs --driver
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub deltas: Option<Vec<Decimal>>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = load_deal(args.input.as_deref(), "sensitivity analysis")?;

    match args.driver {
        Some(driver) => {
            let result =
                scenarios::run_sensitivity(&deal, driver.into(), args.deltas.as_deref())?;
            Ok(serde_json::to_value(result)?)
        }
        None => {
            if args.deltas.is_some() {
                return Err("--deltas requires --driver".into());
            }
            let result = scenarios::run_all_sensitivities(&deal)?;
            Ok(serde_json::to_value(result)?)
        }
    }
}
