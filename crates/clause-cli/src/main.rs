//! Clause CLI - command-line interface for the Clause conformance checker
//!
//! Checks translation-unit dumps of C and C++ programs against MISRA,
//! AUTOSAR and CWE rules.

mod commands;
mod logging;
mod output;

use clap::Parser;
use commands::Commands;
use logging::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "clause",
    author,
    version,
    about = "Coding-standard conformance checker for C and C++",
    long_about = "Clause checks C and C++ translation units against MISRA, AUTOSAR and CWE rules.\n\n\
                  It reads JSON dumps (*.tu.json) produced by a compiler front end, runs\n\
                  structural pattern rules and path-sensitive symbolic rules, and reports\n\
                  each violation once per rule and source line."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level for diagnostics about the run itself (written to stderr)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    pub log_json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level, cli.log_json);

    match cli.command {
        Commands::Check(args) => args.run(),
        Commands::Init(args) => args.run(),
        Commands::Explain(args) => args.run(),
        Commands::Rules(args) => args.run(),
    }
}
