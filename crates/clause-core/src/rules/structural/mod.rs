//! Rules expressed as tree patterns

pub mod assignment_as_value;
pub mod parameter_modified;
pub mod pointer_integer_cast;
pub mod union_overlap;
pub mod virtual_member_pointer_compare;

pub use assignment_as_value::AssignmentAsValue;
pub use parameter_modified::ParameterModified;
pub use pointer_integer_cast::PointerIntegerCast;
pub use union_overlap::UnionOverlap;
pub use virtual_member_pointer_compare::VirtualMemberPointerCompare;

use crate::matcher::{Matcher, dsl};

/// Any assignment operator, simple or compound.
pub(crate) fn assignment_operator() -> Matcher {
    dsl::predicate(|tree, id| tree.node(id).binary_op().is_some_and(|op| op.is_assignment()))
}
