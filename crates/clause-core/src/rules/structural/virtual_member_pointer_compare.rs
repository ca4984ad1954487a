//! autosar-a5-10-1: A pointer to member virtual function shall only be
//! tested for equality with null-pointer-constant

use crate::declare_rule;
use crate::diagnostic::RuleReporter;
use crate::matcher::dsl::*;
use crate::matcher::{MatchResult, Matcher};
use crate::rules::{RuleError, StructuralRule};
use crate::syntax::{ChildRole, NodeId, NodeKind, SyntaxTree, TypeClass};

declare_rule!(
    VirtualMemberPointerCompare,
    id = "autosar-a5-10-1",
    name = "virtual-member-pointer-compare",
    description = "A pointer to member virtual function shall only be tested for equality with null-pointer-constant",
    category = Autosar,
    severity = Warning,
    examples = "// Bad\nbool b = (&A::f == &A::g);\n\n// Good\nbool b = (&A::f == nullptr);",
    fields { pattern: Matcher = binary_operator([has_any_operator_name(&["==", "!="])]).bind("stmt") }
);

/// The operand has member-function-pointer type and names a virtual method.
fn is_virtual_member_pointer(tree: &SyntaxTree, operand: NodeId) -> bool {
    let is_member_pointer = tree
        .node(operand)
        .ty()
        .is_some_and(|ty| ty.class == TypeClass::MemberFunctionPointer);
    if !is_member_pointer {
        return false;
    }
    tree.preorder(operand)
        .filter(|&id| tree.kind(id) == NodeKind::DeclRefExpr)
        .find_map(|id| tree.referenced_decl(id))
        .is_some_and(|decl| {
            let decl = tree.node(decl);
            decl.kind == NodeKind::MethodDecl && decl.has_flag("virtual")
        })
}

fn is_null_pointer_constant(tree: &SyntaxTree, operand: NodeId) -> bool {
    tree.kind(tree.ignore_paren_imp_casts(operand)) == NodeKind::NullPtrLiteral
}

impl StructuralRule for VirtualMemberPointerCompare {
    fn pattern(&self) -> &Matcher {
        &self.pattern
    }

    fn on_match(
        &self,
        result: &MatchResult<'_>,
        reporter: &mut RuleReporter<'_, '_>,
    ) -> Result<(), RuleError> {
        let tree = result.tree;
        let Some(stmt) = result.get("stmt") else {
            return Ok(());
        };
        let node = tree.node(stmt);
        let (Some(lhs), Some(rhs)) = (node.child(ChildRole::Lhs), node.child(ChildRole::Rhs)) else {
            return Err(RuleError::UnexpectedShape {
                node: stmt,
                message: "comparison without two operands".to_string(),
            });
        };

        for (operand, other) in [(lhs, rhs), (rhs, lhs)] {
            if is_virtual_member_pointer(tree, operand) {
                if !is_null_pointer_constant(tree, other) {
                    reporter.report(
                        stmt,
                        "A pointer to member virtual function shall only be tested for equality with null-pointer-constant.",
                    );
                }
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::check_structural;
    use crate::syntax::{BinaryOp, CastKind, TreeBuilder, TypeInfo, UnaryOp};

    fn member_pointer() -> TypeInfo {
        TypeInfo::new("void (A::*)()", TypeClass::MemberFunctionPointer)
    }

    // line 2: &A::f == &A::g   (f virtual)
    // line 3: &A::f == nullptr
    // line 4: &A::h != &A::g   (neither virtual)
    fn tree() -> SyntaxTree {
        let mut b = TreeBuilder::new();
        let file = b.add_file("pmf.cpp", false);
        b.at(file, 1);
        let void = TypeInfo::new("void", TypeClass::Void);
        let f = b.method("f", void.clone(), None);
        b.add_flag(f, "virtual");
        let g = b.method("g", void.clone(), None);
        let h = b.method("h", void, None);
        let boolean = TypeInfo::new("bool", TypeClass::Boolean);

        let address_of = |b: &mut TreeBuilder, method: NodeId| {
            let r = b.decl_ref(method);
            b.unary(UnaryOp::AddrOf, r, member_pointer())
        };

        b.line(2);
        let lhs = address_of(&mut b, f);
        let rhs = address_of(&mut b, g);
        b.binary(BinaryOp::Eq, lhs, rhs, boolean.clone());

        b.line(3);
        let lhs = address_of(&mut b, f);
        let null = b.null_ptr();
        let rhs = b.implicit_cast(CastKind::NullToPointer, null, member_pointer());
        b.binary(BinaryOp::Eq, lhs, rhs, boolean.clone());

        b.line(4);
        let lhs = address_of(&mut b, h);
        let rhs = address_of(&mut b, g);
        b.binary(BinaryOp::Ne, lhs, rhs, boolean);

        b.finish()
    }

    #[test]
    fn reports_virtual_member_pointer_compared_with_non_null() {
        let diagnostics = check_structural(VirtualMemberPointerCompare::new(), &tree());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(diagnostics[0].rule_id, "autosar-a5-10-1");
    }
}
