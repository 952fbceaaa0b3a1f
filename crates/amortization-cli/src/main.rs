mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::loan::{CashFlowArgs, LoanArgs, RateArgs, TceaArgs};

/// Loan amortization schedules and cost-of-credit metrics
#[derive(Parser)]
#[command(
    name = "amort",
    version,
    about = "Loan amortization schedules and cost-of-credit metrics",
    long_about = "A CLI for French-method loan amortization with decimal precision. \
                  Builds payment schedules with total or partial grace periods and \
                  reports TCEA, IRR, duration and convexity."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Full loan calculation: installment, TCEA/IRR, duration, schedule
    Loan(LoanArgs),
    /// Payment schedule rows only
    Schedule(LoanArgs),
    /// Convert an annual nominal or effective rate to a monthly effective rate
    Rate(RateArgs),
    /// NPV, IRR, duration and convexity of a cash-flow vector
    Irr(CashFlowArgs),
    /// TCEA of a level-payment loan with up-front costs
    Tcea(TceaArgs),
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

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Loan(args) => commands::loan::run_loan(args),
        Commands::Schedule(args) => commands::loan::run_schedule(args),
        Commands::Rate(args) => commands::loan::run_rate(args),
        Commands::Irr(args) => commands::loan::run_cash_flows(args),
        Commands::Tcea(args) => commands::loan::run_tcea(args),
        Commands::Version => {
            println!("amort {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
