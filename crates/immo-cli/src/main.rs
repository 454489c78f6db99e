mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use commands::loan::{LoanScheduleArgs, LoanSensitivityArgs};
use commands::simulate::SimulateArgs;
use commands::sweep::SweepArgs;

/// Monthly financial simulation of a leveraged rental property purchase
#[derive(Parser)]
#[command(
    name = "immo",
    version,
    about = "Monthly financial simulation of a leveraged rental property purchase",
    long_about = "A CLI for simulating a rental property investment month by month \
                  with decimal precision. Produces loan schedules, P&L, cash flow and \
                  balance sheet statements, exit taxation, IRR/NPV and sensitivity grids."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log simulation stages to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full simulation and investment metrics for one lease type
    Simulate(SimulateArgs),
    /// Build a loan amortization schedule
    LoanSchedule(LoanScheduleArgs),
    /// Monthly payment over a rate x term grid
    LoanSensitivity(LoanSensitivityArgs),
    /// IRR/NPV grid over property growth x financing rate
    Sweep(SweepArgs),
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
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "immo_core=debug,immo=debug" } else { "warn" })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::LoanSchedule(args) => commands::loan::run_loan_schedule(args),
        Commands::LoanSensitivity(args) => commands::loan::run_loan_sensitivity(args),
        Commands::Sweep(args) => commands::sweep::run_sweep(args),
        Commands::Version => {
            println!("immo {}", env!("CARGO_PKG_VERSION"));
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
