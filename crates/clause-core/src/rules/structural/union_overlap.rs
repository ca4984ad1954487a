//! misra-c2012-19.1: An object shall not be assigned or copied to an
//! overlapping object
//!
//! Flags `u.a = u.b` where both sides name different members of the same
//! union variable.

use crate::declare_rule;
use crate::diagnostic::RuleReporter;
use crate::matcher::dsl::*;
use crate::matcher::{MatchResult, Matcher};
use crate::rules::{RuleError, StructuralRule};
use crate::syntax::TypeClass;

declare_rule!(
    UnionOverlap,
    id = "misra-c2012-19.1",
    name = "union-overlap",
    description = "An object shall not be assigned or copied to an overlapping object",
    category = Misra,
    severity = Error,
    error_kind = "MISRA_C_2012_RULE_19_1",
    examples = "// Bad\nunion U { int i; float f; } u;\nu.i = u.f;",
    fields { pattern: Matcher = pattern() }
);

fn pattern() -> Matcher {
    binary_operator([
        has_operator_name("="),
        has_lhs(has_descendant(decl_ref_expr([
            to(var_decl([]).bind("object")),
            has_parent(member_expr([member(decl().bind("member"))])),
        ]))),
        has_rhs(has_descendant(decl_ref_expr([
            to(var_decl([equals_bound_node("object")])),
            unless(has_parent(member_expr([member(equals_bound_node("member"))]))),
        ]))),
    ])
    .bind("op")
}

impl StructuralRule for UnionOverlap {
    fn pattern(&self) -> &Matcher {
        &self.pattern
    }

    fn on_match(
        &self,
        result: &MatchResult<'_>,
        reporter: &mut RuleReporter<'_, '_>,
    ) -> Result<(), RuleError> {
        let (Some(op), Some(object)) = (result.get("op"), result.get("object")) else {
            return Ok(());
        };
        let is_union = result
            .tree
            .node(object)
            .ty()
            .is_some_and(|ty| ty.class == TypeClass::Union);
        if is_union {
            reporter.report(
                op,
                "[C0302][misra-c2012-19.1]: An object shall not be assigned or copied to an overlapping object",
            );
        }
        Ok(())
    }
}
