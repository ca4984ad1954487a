//! misra-c2012-13.4: The result of an assignment operator should not be used

use super::assignment_operator;
use crate::declare_rule;
use crate::diagnostic::RuleReporter;
use crate::matcher::dsl::*;
use crate::matcher::{MatchResult, Matcher};
use crate::rules::{RuleError, StructuralRule};

declare_rule!(
    AssignmentAsValue,
    id = "misra-c2012-13.4",
    name = "assignment-as-value",
    description = "The result of an assignment operator should not be used",
    category = Misra,
    severity = Warning,
    error_kind = "MISRA_C_2012_RULE_13_4",
    examples = "// Bad\nif ((x = next()) != 0) { }\na = b = c;\n\n// Good\nx = next();\nif (x != 0) { }",
    fields { pattern: Matcher = pattern() }
);

// An assignment whose parent is a statement list, a case label, a
// full-expression wrapper or an if/for header stands alone.
fn pattern() -> Matcher {
    binary_operator([
        assignment_operator(),
        unless(has_parent(any_of([
            compound_stmt([]),
            case_stmt([]),
            default_stmt([]),
            expr_with_cleanups([]),
            if_stmt([]),
            for_stmt([]),
        ]))),
    ])
    .bind("assign")
}

impl StructuralRule for AssignmentAsValue {
    fn pattern(&self) -> &Matcher {
        &self.pattern
    }

    fn on_match(
        &self,
        result: &MatchResult<'_>,
        reporter: &mut RuleReporter<'_, '_>,
    ) -> Result<(), RuleError> {
        if let Some(assign) = result.get("assign") {
            reporter.report(
                assign,
                "[C1603][misra-c2012-13.4]: Result of assignment operator should not be used",
            );
        }
        Ok(())
    }
}
