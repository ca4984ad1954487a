//! Explain command - provides detailed explanation of a rule

use anyhow::Result;
use clap::Args;
use clause_core::analysis::AnalysisEngine;
use clause_core::config::load_config_or_default_with_warnings;
use clause_core::rules::{RegisteredRule, RuleRegistry, Severity};
use colored::Colorize;
use std::env;
use std::fmt::Write;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[arg(
        value_name = "RULE_ID",
        help = "Rule ID or name to explain (e.g., \"misra-c2012-11.4\", \"tainted-format-string\")"
    )]
    pub rule_id: String,
}

impl ExplainArgs {
    pub fn run(&self) -> Result<()> {
        let cwd = env::current_dir()?;
        let config = load_config_or_default_with_warnings(&cwd).config;
        let engine = AnalysisEngine::with_config(&config)?;
        let registry = engine.registry();

        match find_rule(registry, &self.rule_id) {
            Some(rule) => {
                let enabled = registry.is_rule_enabled(&self.rule_id, &config.rules);
                print!("{}", describe(rule, enabled));
                Ok(())
            }
            None => {
                eprintln!(
                    "{} unknown rule '{}'",
                    "error:".red().bold(),
                    self.rule_id
                );
                eprintln!();
                eprintln!("Available rules:");
                for rule in registry.rules() {
                    let meta = rule.metadata();
                    eprintln!("  {} ({})", meta.id, meta.name);
                }
                std::process::exit(1);
            }
        }
    }
}

fn find_rule<'r>(registry: &'r RuleRegistry, id_or_name: &str) -> Option<&'r RegisteredRule> {
    registry
        .get_rule(id_or_name)
        .or_else(|| registry.get_rule_by_name(id_or_name))
}

fn describe(rule: &RegisteredRule, enabled: bool) -> String {
    let metadata = rule.metadata();
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", format!("Rule {}", metadata.id).bold());
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}: {}", "Name".cyan(), metadata.name);
    let _ = writeln!(out, "  {}: {}", "Description".cyan(), metadata.description);
    let _ = writeln!(out, "  {}: {}", "Standard".cyan(), metadata.category.as_str());
    let _ = writeln!(out, "  {}: {}", "Kind".cyan(), rule.kind().label());
    let _ = writeln!(out, "  {}: {}", "Severity".cyan(), format_severity(metadata.severity));
    if let Some(kind) = metadata.error_kind {
        let _ = writeln!(out, "  {}: {}", "Error kind".cyan(), kind);
    }
    if let Some(url) = metadata.docs_url {
        let _ = writeln!(out, "  {}: {}", "Documentation".cyan(), url);
    }

    if let Some(examples) = metadata.examples {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {}:", "Examples".cyan());
        for line in examples.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }

    let _ = writeln!(out);
    let status = if enabled {
        "enabled".green()
    } else {
        "disabled".red()
    };
    let _ = writeln!(out, "  {}: {}", "Status".cyan(), status);
    let _ = writeln!(out);
    out
}

fn format_severity(severity: Severity) -> String {
    match severity {
        Severity::Error => "error".red().to_string(),
        Severity::Warning => "warning".yellow().to_string(),
        Severity::Info => "info".blue().to_string(),
    }
}
