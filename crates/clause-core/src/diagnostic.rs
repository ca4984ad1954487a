//! Diagnostic records and the deduplicating reporter
//!
//! A [`Reporter`] lives for one translation-unit run. It resolves nodes to
//! file/line pairs, drops anything without a reportable location, and keeps a
//! run-local set of `(rule id, file, line)` keys so a violation reached along
//! several paths is reported once. Accepted diagnostics go to the shared
//! [`ResultsCollection`].

use std::collections::HashSet;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::location::{self, ResolvedLocation};
use crate::syntax::{NodeId, SourceLocation, SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl Diagnostic {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            file: file.into(),
            line,
            column,
            error_kind: None,
        }
    }

    pub fn with_error_kind(mut self, kind: impl Into<String>) -> Self {
        self.error_kind = Some(kind.into());
        self
    }
}

/// Insertion-ordered diagnostics shared by every run of one analysis.
#[derive(Debug, Default)]
pub struct ResultsCollection {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl ResultsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    /// A copy of everything appended so far, in arrival order.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }
}

/// Identity of the rule a report is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTag<'r> {
    pub id: &'r str,
    pub severity: Severity,
    pub error_kind: Option<&'r str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    rule_id: String,
    file: String,
    line: u32,
}

pub struct Reporter<'a> {
    tree: &'a SyntaxTree,
    results: &'a ResultsCollection,
    seen: HashSet<DedupKey>,
    suppressed: usize,
}

impl<'a> Reporter<'a> {
    pub fn new(tree: &'a SyntaxTree, results: &'a ResultsCollection) -> Self {
        Self {
            tree,
            results,
            seen: HashSet::new(),
            suppressed: 0,
        }
    }

    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    /// Reports at `node`. Returns whether a new diagnostic was appended.
    pub fn report(&mut self, tag: RuleTag<'_>, node: NodeId, message: impl Into<String>) -> bool {
        let location = self.tree.node(node).location;
        self.report_at(tag, location, message)
    }

    pub fn report_at(
        &mut self,
        tag: RuleTag<'_>,
        location: SourceLocation,
        message: impl Into<String>,
    ) -> bool {
        let Some(ResolvedLocation { file, line, column }) =
            location::resolve_location(self.tree, location)
        else {
            return false;
        };

        let key = DedupKey {
            rule_id: tag.id.to_string(),
            file,
            line,
        };
        if self.seen.contains(&key) {
            self.suppressed += 1;
            return false;
        }

        let mut diagnostic =
            Diagnostic::new(tag.id, tag.severity, message, key.file.clone(), line, column);
        if let Some(kind) = tag.error_kind {
            diagnostic = diagnostic.with_error_kind(kind);
        }
        self.results.push(diagnostic);
        self.seen.insert(key);
        true
    }

    pub fn scoped<'r>(&'r mut self, tag: RuleTag<'r>) -> RuleReporter<'r, 'a> {
        RuleReporter {
            reporter: self,
            tag,
        }
    }

    /// Number of reports dropped as duplicates in this run.
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    pub fn reported(&self) -> usize {
        self.seen.len()
    }
}

/// A [`Reporter`] bound to a single rule.
pub struct RuleReporter<'r, 'a> {
    reporter: &'r mut Reporter<'a>,
    tag: RuleTag<'r>,
}

impl<'a> RuleReporter<'_, 'a> {
    pub fn report(&mut self, node: NodeId, message: impl Into<String>) -> bool {
        self.reporter.report(self.tag, node, message)
    }

    pub fn tree(&self) -> &'a SyntaxTree {
        self.reporter.tree
    }

    pub fn rule_id(&self) -> &str {
        self.tag.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::TreeBuilder;

    const TAG: RuleTag<'static> = RuleTag {
        id: "misra-c2012-11.4",
        severity: Severity::Warning,
        error_kind: None,
    };

    fn tree() -> (SyntaxTree, NodeId, NodeId, NodeId) {
        let mut b = TreeBuilder::new();
        let user = b.add_file("main.c", false);
        let system = b.add_file("/usr/include/stdlib.h", true);
        b.at(user, 10);
        let first = b.int_literal(1);
        let same_line = b.int_literal(2);
        b.at(system, 3);
        let in_system = b.int_literal(3);
        (b.finish(), first, same_line, in_system)
    }

    #[test]
    fn same_rule_file_line_is_reported_once() {
        let (tree, first, same_line, _) = tree();
        let results = ResultsCollection::new();
        let mut reporter = Reporter::new(&tree, &results);

        assert!(reporter.report(TAG, first, "first"));
        assert!(!reporter.report(TAG, same_line, "second"));
        assert_eq!(reporter.suppressed(), 1);

        let diagnostics = results.snapshot();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "first");
        assert_eq!(diagnostics[0].line, 10);
    }

    #[test]
    fn different_rules_on_same_line_are_both_kept() {
        let (tree, first, _, _) = tree();
        let results = ResultsCollection::new();
        let mut reporter = Reporter::new(&tree, &results);
        let other = RuleTag {
            id: "misra-c2012-13.4",
            ..TAG
        };

        assert!(reporter.report(TAG, first, "a"));
        assert!(reporter.report(other, first, "b"));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn system_header_reports_are_dropped() {
        let (tree, _, _, in_system) = tree();
        let results = ResultsCollection::new();
        let mut reporter = Reporter::new(&tree, &results);

        assert!(!reporter.report(TAG, in_system, "ignored"));
        assert!(results.is_empty());
    }

    #[test]
    fn error_kind_is_carried() {
        let (tree, first, _, _) = tree();
        let results = ResultsCollection::new();
        let mut reporter = Reporter::new(&tree, &results);
        let tag = RuleTag {
            error_kind: Some("POINTER_COMPARISON"),
            ..TAG
        };

        reporter.scoped(tag).report(first, "msg");
        let diagnostics = results.into_inner();
        assert_eq!(diagnostics[0].error_kind.as_deref(), Some("POINTER_COMPARISON"));
    }

    #[test]
    fn diagnostic_serializes_without_empty_error_kind() {
        let diagnostic = Diagnostic::new("r", Severity::Error, "m", "f.c", 1, 2);
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["severity"], "error");
        assert!(json.get("error_kind").is_none());
    }
}
