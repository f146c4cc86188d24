mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::lbo::LboArgs;

/// Leveraged buyout analysis with decimal precision
#[derive(Parser)]
#[command(
    name = "lbo",
    version,
    about = "Leveraged buyout financial analysis",
    long_about = "A CLI for running leveraged buyout analyses with decimal precision: \
                  sources & uses, unlevered cash flows, the debt waterfall, and \
                  sponsor returns."
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
    /// Run a full LBO analysis for one case in an input document
    Lbo(LboArgs),
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
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Lbo(args) => commands::lbo::run_lbo(args),
        Commands::Version => {
            println!("lbo {}", env!("CARGO_PKG_VERSION"));
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
