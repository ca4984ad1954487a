//! CLI command implementations

pub mod check;
pub mod explain;
pub mod init;
pub mod rules;

pub use check::CheckArgs;
pub use explain::ExplainArgs;
pub use init::InitArgs;
pub use rules::RulesArgs;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check translation-unit dumps for rule violations
    Check(CheckArgs),

    /// Write a default clause.toml
    Init(InitArgs),

    /// Show detailed explanation for a specific rule
    Explain(ExplainArgs),

    /// List the built-in rules
    Rules(RulesArgs),
}
