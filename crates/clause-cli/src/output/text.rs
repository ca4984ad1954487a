//! Compiler-style text output, one line per diagnostic

use clause_core::diagnostic::{Diagnostic, Severity};
use colored::Colorize;
use std::fmt::Write;

#[derive(Debug, Default)]
pub struct TextFormatter;

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, diagnostics: &[Diagnostic]) -> String {
        let mut out = String::new();

        for diag in diagnostics {
            let severity = match diag.severity {
                Severity::Error => "error".red().bold(),
                Severity::Warning => "warning".yellow().bold(),
                Severity::Info => "info".blue().bold(),
            };

            // Multi-line messages (11.4 carries the operand types) are indented under the first line.
            let mut lines = diag.message.lines();
            let first = lines.next().unwrap_or_default();
            let _ = writeln!(
                out,
                "{}:{}:{}: {} [{}]: {}",
                diag.file,
                diag.line,
                diag.column,
                severity,
                diag.rule_id.dimmed(),
                first
            );
            for line in lines {
                let _ = writeln!(out, "    {}", line);
            }
        }

        if !diagnostics.is_empty() {
            let errors = diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Error)
                .count();
            let warnings = diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Warning)
                .count();
            let _ = writeln!(out);
            let _ = writeln!(out, "Found {} error(s) and {} warning(s)", errors, warnings);
        }

        out
    }
}
