use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use underwrite_core::deal::{self, DealInputs};
use underwrite_core::pro_forma;

use super::load_deal;

/// Arguments for assumption derivation
#[derive(Args)]
pub struct DeriveArgs {
    /// Path to deal JSON/YAML file (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_derive(args: DeriveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = load_deal(args.input.as_deref(), "assumption derivation")?;
    let result = deal::derive_assumptions(&deal)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a full pro forma build
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to deal JSON/YAML file (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the hold period in years
    #[arg(long)]
    pub hold_years: Option<u32>,

    /// Override loan-to-value (e.g. 0.70)
    #[arg(long)]
    pub ltv: Option<Decimal>,

    /// Override the loan interest rate (e.g. 0.0625)
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Override the interest-only period in years
    #[arg(long)]
    pub io_years: Option<u32>,

    /// Override the exit cap spread over the going-in cap (e.g. 0.005)
    #[arg(long, allow_hyphen_values = true)]
    pub exit_cap_spread: Option<Decimal>,

    /// Override flat revenue growth and drop any predicted sequence
    #[arg(long, allow_hyphen_values = true)]
    pub revenue_growth: Option<Decimal>,

    /// Marginal income tax rate; enables the after-tax analysis
    #[arg(long)]
    pub tax_rate: Option<Decimal>,
}

impl AnalyzeArgs {
    fn apply_overrides(&self, deal: DealInputs) -> DealInputs {
        let mut builder = deal.to_builder();
        if let Some(years) = self.hold_years {
            builder = builder.hold_period_years(years);
        }
        if let Some(ltv) = self.ltv {
            builder = builder.ltv(ltv);
        }
        if let Some(rate) = self.interest_rate {
            builder = builder.interest_rate(rate);
        }
        if let Some(years) = self.io_years {
            builder = builder.io_period_years(years);
        }
        if let Some(spread) = self.exit_cap_spread {
            builder = builder.exit_cap_rate_spread(spread);
        }
        if let Some(growth) = self.revenue_growth {
            builder = builder.revenue_growth_rate(growth).clear_yearly_growth();
        }
        if let Some(rate) = self.tax_rate {
            builder = builder.tax_rate(rate);
        }
        builder.build()
    }
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = load_deal(args.input.as_deref(), "pro forma analysis")?;
    let deal = args.apply_overrides(deal);
    deal::validate_deal(&deal)?;
    let result = pro_forma::build_pro_forma(&deal)?;
    Ok(serde_json::to_value(result)?)
}
