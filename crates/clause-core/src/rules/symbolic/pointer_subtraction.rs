//! misra-c2012-18.2: Subtraction between pointers shall only be applied to
//! pointers that address elements of the same array
//!
//! Within one array, an element index past one-beyond-the-end is also a
//! violation. Only constant indices into arrays of known length are checked.

use std::sync::LazyLock;

use regex::Regex;

use super::pointer_operands;
use crate::declare_rule;
use crate::rules::RuleError;
use crate::symbolic::{BaseRegion, Checker, CheckerContext, ElementIndex, ProgramPointKind, Region, SubRegion};
use crate::syntax::{BinaryOp, NodeId, SyntaxTree, TypeClass};

const MESSAGE: &str = "[misrac-2012-18.2] Pointer subtraction violation of misra_c_2012: rule_18_2";

static ARRAY_LENGTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]\s*$").expect("Invalid regex pattern"));

declare_rule!(
    PointerSubtraction,
    id = "misra-c2012-18.2",
    name = "pointer-subtraction",
    description = "Subtraction between pointers shall only be applied to pointers that address elements of the same array",
    category = Misra,
    severity = Warning,
    error_kind = "MISRA_C_2012_RULE_18_2",
    examples = "// Bad\nint a[4], b[4];\nlong d = &a[1] - &b[0];\n\n// Good\nlong d = &a[3] - &a[0];"
);

impl PointerSubtraction {
    pub const POINTS: &'static [ProgramPointKind] = &[ProgramPointKind::PreBinary];
}

/// Number of elements of the array a region's base denotes, when its type
/// spells a constant length.
fn array_length(tree: &SyntaxTree, base: BaseRegion) -> Option<i64> {
    let node = match base {
        BaseRegion::Var(decl) | BaseRegion::StringLiteral(decl) => tree.node(decl),
        BaseRegion::Symbolic(_) | BaseRegion::Temporary(_) => return None,
    };
    let ty = node.ty().filter(|ty| ty.class == TypeClass::Array)?;
    let captures = ARRAY_LENGTH.captures(ty.canonical())?;
    captures.get(1)?.as_str().parse().ok()
}

/// False only when the region is provably neither inside its array nor one
/// past its end.
fn within_bounds(tree: &SyntaxTree, region: &Region) -> bool {
    let [SubRegion::Element(ElementIndex::Const(index))] = region.path() else {
        return true;
    };
    match array_length(tree, region.base()) {
        Some(length) => (0..=length).contains(index),
        None => true,
    }
}

impl Checker for PointerSubtraction {
    fn check_pre_binary(&self, operator: NodeId, ctx: &mut CheckerContext<'_>) -> Result<(), RuleError> {
        let tree = ctx.tree();
        if tree.node(operator).binary_op() != Some(BinaryOp::Sub) {
            return Ok(());
        }
        let Some((lhs, rhs)) = pointer_operands(ctx, operator)? else {
            return Ok(());
        };
        let (Some(left), Some(right)) = (ctx.region_of(lhs), ctx.region_of(rhs)) else {
            ctx.report(operator, MESSAGE);
            return Ok(());
        };

        if matches!(right.path().last(), Some(SubRegion::Field(_))) {
            ctx.report(operator, MESSAGE);
            return Ok(());
        }

        let violation = if left.base_region() == right.base_region() {
            !within_bounds(tree, &left) || !within_bounds(tree, &right)
        } else {
            true
        };
        if violation {
            ctx.report(operator, MESSAGE);
        }
        Ok(())
    }
}
