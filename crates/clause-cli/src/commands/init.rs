//! Init command - writes a default clause.toml

use anyhow::Result;
use clap::Args;
use clause_core::config::CONFIG_FILENAME;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r#"# Clause configuration file

# Path prefixes (relative to the checked directory) to restrict discovery to
# include = ["build/src"]

# Path prefixes or directory names to skip
# exclude = ["third_party"]

# Rule configuration
[rules]
# Run only these rules (all rules run by default)
# enabled = []

# Disable specific rules, by id or name
# disabled = ["misra-c2012-13.4"]

# Turn whole standards on or off
# misra = true
# autosar = true
# cwe = true

# Override rule severity
# [rules.severity]
# misra-c2012-11.4 = "error"

[analysis]
# Loop headers entered more often than this on one path are widened
# max_block_visits = 4
"#;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to write the configuration into (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(&self) -> Result<()> {
        let dir = self.dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let config_path = write_config(&dir, self.force)?;
        println!(
            "{} Created {} configuration file",
            "✓".green().bold(),
            config_path.display().to_string().cyan()
        );
        Ok(())
    }
}

fn write_config(dir: &Path, force: bool) -> Result<PathBuf> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let config_path = dir.join(CONFIG_FILENAME);
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file '{}' already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, DEFAULT_CONFIG)?;
    tracing::debug!(path = %config_path.display(), "wrote default configuration");
    Ok(config_path)
}
