//! JSON output formatter for programmatic integration

use clause_core::diagnostic::{Diagnostic, Severity};
use clause_core::rules::{RuleCategory, RuleRegistry};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Serialize)]
pub struct JsonOutput {
    pub version: &'static str,
    pub metadata: JsonMetadata,
    pub summary: JsonSummary,
    pub diagnostics: Vec<JsonDiagnostic>,
}

#[derive(Serialize)]
pub struct JsonMetadata {
    pub clause_version: &'static str,
    pub analyzed_path: String,
}

#[derive(Serialize)]
pub struct JsonSummary {
    pub total_files: usize,
    pub files_with_issues: usize,
    pub total_diagnostics: usize,
    pub by_severity: SeverityCounts,
    pub by_category: CategoryCounts,
}

#[derive(Serialize, Default)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

#[derive(Serialize, Default)]
pub struct CategoryCounts {
    pub misra: usize,
    pub autosar: usize,
    pub cwe: usize,
}

#[derive(Serialize)]
pub struct JsonDiagnostic {
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub message: String,
    pub location: JsonLocation,
}

#[derive(Serialize)]
pub struct JsonLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

pub struct JsonFormatter<'a> {
    registry: Option<&'a RuleRegistry>,
}

impl<'a> JsonFormatter<'a> {
    pub fn new() -> Self {
        Self { registry: None }
    }

    pub fn with_registry(registry: &'a RuleRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn format(&self, diagnostics: &[Diagnostic], total_files: usize, analyzed_path: &str) -> String {
        let output = self.build_output(diagnostics, total_files, analyzed_path);
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn build_output(&self, diagnostics: &[Diagnostic], total_files: usize, analyzed_path: &str) -> JsonOutput {
        JsonOutput {
            version: "1.0",
            metadata: JsonMetadata {
                clause_version: env!("CARGO_PKG_VERSION"),
                analyzed_path: analyzed_path.to_string(),
            },
            summary: self.build_summary(diagnostics, total_files),
            diagnostics: diagnostics.iter().map(|d| self.convert_diagnostic(d)).collect(),
        }
    }

    fn build_summary(&self, diagnostics: &[Diagnostic], total_files: usize) -> JsonSummary {
        let mut by_severity = SeverityCounts::default();
        let mut by_category = CategoryCounts::default();
        let mut files_with_issues = HashSet::new();

        for diag in diagnostics {
            match diag.severity {
                Severity::Error => by_severity.error += 1,
                Severity::Warning => by_severity.warning += 1,
                Severity::Info => by_severity.info += 1,
            }

            match self.category(&diag.rule_id) {
                Some(RuleCategory::Misra) => by_category.misra += 1,
                Some(RuleCategory::Autosar) => by_category.autosar += 1,
                Some(RuleCategory::Cwe) => by_category.cwe += 1,
                None => {}
            }

            files_with_issues.insert(diag.file.as_str());
        }

        JsonSummary {
            total_files,
            files_with_issues: files_with_issues.len(),
            total_diagnostics: diagnostics.len(),
            by_severity,
            by_category,
        }
    }

    fn convert_diagnostic(&self, diag: &Diagnostic) -> JsonDiagnostic {
        let rule = self.registry.and_then(|r| r.get_rule(&diag.rule_id));

        JsonDiagnostic {
            rule_id: diag.rule_id.clone(),
            rule_name: rule.map(|r| r.metadata().name.to_string()),
            category: rule.map(|r| r.metadata().category.as_str().to_string()),
            severity: diag.severity,
            error_kind: diag.error_kind.clone(),
            message: diag.message.clone(),
            location: JsonLocation {
                file: diag.file.clone(),
                line: diag.line,
                column: diag.column,
            },
        }
    }

    fn category(&self, rule_id: &str) -> Option<RuleCategory> {
        self.registry
            .and_then(|r| r.get_rule(rule_id))
            .map(|rule| rule.metadata().category)
    }
}

impl Default for JsonFormatter<'_> {
    fn default() -> Self {
        Self::new()
    }
}
