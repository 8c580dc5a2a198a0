mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::recommend::RecommendArgs;
use commands::scenarios::SensitivityArgs;
use commands::simulation::MonteCarloArgs;
use commands::underwriting::{AnalyzeArgs, DeriveArgs};

/// Commercial real-estate acquisition underwriting
#[derive(Parser)]
#[command(
    name = "uw",
    version,
    about = "Commercial real-estate acquisition underwriting",
    long_about = "Underwrite a property acquisition with decimal precision: derive \
                  operating assumptions, build a 10-year pro forma with debt and exit, \
                  run sensitivity tables and a Monte Carlo IRR simulation, and score \
                  a composite recommendation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine diagnostics to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive revenue, expense and financing assumptions from deal inputs
    Derive(DeriveArgs),
    /// Build the full pro forma, debt schedule, exit and return metrics
    Analyze(AnalyzeArgs),
    /// One-way sensitivity tables on exit cap, rate, growth or price
    Sensitivity(SensitivityArgs),
    /// Monte Carlo distribution of levered IRR
    MonteCarlo(MonteCarloArgs),
    /// Composite BUY/HOLD/PASS recommendation from metrics and signals
    Recommend(RecommendArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Derive(args) => commands::underwriting::run_derive(args),
        Commands::Analyze(args) => commands::underwriting::run_analyze(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::MonteCarlo(args) => commands::simulation::run_monte_carlo(args),
        Commands::Recommend(args) => commands::recommend::run_recommend(args),
        Commands::Version => {
            println!("uw {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
