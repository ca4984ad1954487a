//! misra-c2012-17.8: A function parameter should not be modified

use super::assignment_operator;
use crate::declare_rule;
use crate::diagnostic::RuleReporter;
use crate::matcher::dsl::*;
use crate::matcher::{MatchResult, Matcher};
use crate::rules::{RuleError, StructuralRule};

declare_rule!(
    ParameterModified,
    id = "misra-c2012-17.8",
    name = "parameter-modified",
    description = "A function parameter should not be modified",
    category = Misra,
    severity = Warning,
    error_kind = "MISRA_C_2012_RULE_17_8",
    examples = "// Bad\nvoid f(int n) { n = 0; n++; }\n\n// Good\nvoid f(int n) { int m = n; m++; }",
    fields { pattern: Matcher = pattern() }
);

fn pattern() -> Matcher {
    let parameter_ref = || decl_ref_expr([to(parm_var_decl([]))]);
    any_of([
        binary_operator([assignment_operator(), has_lhs(parameter_ref())]),
        unary_operator([
            has_any_operator_name(&["++", "--"]),
            has_unary_operand(parameter_ref()),
        ]),
    ])
    .bind("expr")
}

impl StructuralRule for ParameterModified {
    fn pattern(&self) -> &Matcher {
        &self.pattern
    }

    fn on_match(
        &self,
        result: &MatchResult<'_>,
        reporter: &mut RuleReporter<'_, '_>,
    ) -> Result<(), RuleError> {
        if let Some(expr) = result.get("expr") {
            reporter.report(expr, "[C1501][misra-c2012-17.8]: parameters should not be modified");
        }
        Ok(())
    }
}
