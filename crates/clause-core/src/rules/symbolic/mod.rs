//! Rules run by the path-sensitive symbolic engine

pub mod pointer_cast;
pub mod pointer_comparison;
pub mod pointer_subtraction;
pub mod taint_argv;

pub use pointer_cast::PointerCastProvenance;
pub use pointer_comparison::PointerComparison;
pub use pointer_subtraction::PointerSubtraction;
pub use taint_argv::{TAINT, TaintedFormatString, is_tainted};

use crate::rules::RuleError;
use crate::symbolic::CheckerContext;
use crate::syntax::{ChildRole, NodeId};

/// Operands of a binary operator when both are pointer typed.
pub(crate) fn pointer_operands(
    ctx: &CheckerContext<'_>,
    operator: NodeId,
) -> Result<Option<(NodeId, NodeId)>, RuleError> {
    let tree = ctx.tree();
    let node = tree.node(operator);
    let (Some(lhs), Some(rhs)) = (node.child(ChildRole::Lhs), node.child(ChildRole::Rhs)) else {
        return Err(RuleError::UnexpectedShape {
            node: operator,
            message: "binary operator without two operands".to_string(),
        });
    };
    let is_pointer = |id| tree.node(id).ty().is_some_and(|ty| ty.is_pointer());
    Ok((is_pointer(lhs) && is_pointer(rhs)).then_some((lhs, rhs)))
}
