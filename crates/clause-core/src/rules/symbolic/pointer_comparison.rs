//! misra-c2012-18.3: The relational operators >, >=, < and <= shall not be
//! applied to objects of pointer type except where they point into the same
//! object
//!
//! Operands that do not resolve to a region, such as a null pointer, are
//! treated as pointing elsewhere.

use super::pointer_operands;
use crate::declare_rule;
use crate::rules::RuleError;
use crate::symbolic::{Checker, CheckerContext, ProgramPointKind};
use crate::syntax::NodeId;

const MESSAGE: &str = "[misrac-2012-18.3] Pointer compare violation of misra_c_2012: rule_18_3";

declare_rule!(
    PointerComparison,
    id = "misra-c2012-18.3",
    name = "pointer-comparison",
    description = "Relational operators shall not be applied to pointers except where they point into the same object",
    category = Misra,
    severity = Warning,
    error_kind = "MISRA_C_2012_RULE_18_3",
    examples = "// Bad\nint a[4], b[4];\nif (&a[0] < &b[0]) {}\n\n// Good\nif (&a[0] < &a[3]) {}"
);

impl PointerComparison {
    pub const POINTS: &'static [ProgramPointKind] = &[ProgramPointKind::PreBinary];
}

impl Checker for PointerComparison {
    fn check_pre_binary(&self, operator: NodeId, ctx: &mut CheckerContext<'_>) -> Result<(), RuleError> {
        let tree = ctx.tree();
        if !tree.node(operator).binary_op().is_some_and(|op| op.is_relational()) {
            return Ok(());
        }
        let Some((lhs, rhs)) = pointer_operands(ctx, operator)? else {
            return Ok(());
        };

        let canonical = |id| tree.node(id).ty().map(|ty| ty.canonical().to_string());
        if canonical(lhs) != canonical(rhs) {
            ctx.report(operator, MESSAGE);
            return Ok(());
        }

        let same_object = match (ctx.region_of(lhs), ctx.region_of(rhs)) {
            (Some(left), Some(right)) => left.base_region() == right.base_region(),
            _ => false,
        };
        if !same_object {
            ctx.report(operator, MESSAGE);
        }
        Ok(())
    }
}
