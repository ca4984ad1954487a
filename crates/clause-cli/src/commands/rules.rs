//! Rules command - lists the built-in rules and whether they run

use anyhow::Result;
use clap::Args;
use clause_core::analysis::AnalysisEngine;
use clause_core::config::{RulesConfig, load_config_or_default_with_warnings};
use clause_core::rules::{RegisteredRule, RuleRegistry};
use colored::Colorize;
use std::env;
use std::fmt::Write;

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Only list rules of one standard (misra, autosar, cwe)
    #[arg(long, value_name = "STANDARD")]
    pub category: Option<String>,
}

impl RulesArgs {
    pub fn run(&self) -> Result<()> {
        let cwd = env::current_dir()?;
        let config = load_config_or_default_with_warnings(&cwd).config;
        let engine = AnalysisEngine::with_config(&config)?;

        print!("{}", self.render(engine.registry(), &config.rules)?);
        Ok(())
    }

    fn render(&self, registry: &RuleRegistry, config: &RulesConfig) -> Result<String> {
        if let Some(category) = self.category.as_deref() {
            if !["misra", "autosar", "cwe"].contains(&category) {
                anyhow::bail!(
                    "Invalid standard '{}'. Valid values: misra, autosar, cwe",
                    category
                );
            }
        }

        let selected: Vec<&RegisteredRule> = registry
            .rules()
            .filter(|rule| {
                self.category
                    .as_deref()
                    .is_none_or(|c| rule.metadata().category.as_str() == c)
            })
            .collect();

        let id_width = selected
            .iter()
            .map(|rule| rule.metadata().id.len())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for rule in &selected {
            let meta = rule.metadata();
            let marker = if registry.is_rule_enabled(meta.id, config) {
                "on ".green()
            } else {
                "off".red()
            };
            let _ = writeln!(
                out,
                "{} {:<width$}  {:<10}  {}",
                marker,
                meta.id,
                rule.kind().label(),
                meta.description,
                width = id_width
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{} rule(s)", selected.len());
        Ok(out)
    }
}
