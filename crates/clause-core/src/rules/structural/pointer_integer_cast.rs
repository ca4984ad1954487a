//! misra-c2012-11.4: A conversion should not be performed between a pointer
//! to object and an integer type
//!
//! A null pointer constant written as the literal `0` is exempt.

use crate::declare_rule;
use crate::diagnostic::RuleReporter;
use crate::matcher::dsl::*;
use crate::matcher::{MatchResult, Matcher};
use crate::rules::{RuleError, StructuralRule};
use crate::syntax::{NodeKind, SyntaxTree, TypeClass, TypeInfo};

declare_rule!(
    PointerIntegerCast,
    id = "misra-c2012-11.4",
    name = "pointer-integer-cast",
    description = "A conversion should not be performed between a pointer to object and an integer type",
    category = Misra,
    severity = Warning,
    error_kind = "MISRA_C_2012_RULE_11_4",
    examples = "// Bad\nint *p = (int *)0x1000;\nlong addr = (long)p;\n\n// Good\nint *p = 0;",
    fields { pattern: Matcher = pattern() }
);

fn pattern() -> Matcher {
    each_of([
        cast_expr([
            has_type_class(TypeClass::Pointer),
            has_source_expression(expr_with([has_type_class(TypeClass::Integral)])),
        ])
        .bind("int_to_pointer"),
        cast_expr([
            has_type_class(TypeClass::Integral),
            has_source_expression(expr_with([has_type_class(TypeClass::Pointer)])),
        ])
        .bind("pointer_to_int"),
    ])
}

fn pointee(ty: &TypeInfo) -> &str {
    ty.spelling
        .strip_suffix('*')
        .map(str::trim_end)
        .unwrap_or(&ty.spelling)
}

fn is_zero_literal(tree: &SyntaxTree, expr: crate::syntax::NodeId) -> bool {
    let inner = tree.node(tree.ignore_paren_imp_casts(expr));
    inner.kind == NodeKind::IntegerLiteral && inner.attrs.value == Some(0)
}

impl StructuralRule for PointerIntegerCast {
    fn pattern(&self) -> &Matcher {
        &self.pattern
    }

    fn on_match(
        &self,
        result: &MatchResult<'_>,
        reporter: &mut RuleReporter<'_, '_>,
    ) -> Result<(), RuleError> {
        let tree = result.tree;
        let (cast, int_to_pointer) = match (result.get("int_to_pointer"), result.get("pointer_to_int")) {
            (Some(cast), _) => (cast, true),
            (None, Some(cast)) => (cast, false),
            (None, None) => return Ok(()),
        };

        let node = tree.node(cast);
        let shape_error = |message: &str| RuleError::UnexpectedShape {
            node: cast,
            message: message.to_string(),
        };
        let source = node
            .child(crate::syntax::ChildRole::SubExpr)
            .ok_or_else(|| shape_error("cast without operand"))?;
        let source_ty = tree.node(source).ty().ok_or_else(|| shape_error("untyped operand"))?;
        let dest_ty = node.ty().ok_or_else(|| shape_error("untyped cast"))?;

        let message = if int_to_pointer {
            if is_zero_literal(tree, source) {
                return Ok(());
            }
            format!(
                "[C1406][misra-c2012-11.4]: Conversions violation of misra-c2012-11.4\nsource type: {}\ndestination pointer object type: {}",
                source_ty.spelling,
                pointee(dest_ty)
            )
        } else {
            format!(
                "[C1406][misra-c2012-11.4]: Conversions violation of misra-c2012-11.4\nsource pointer object type: {}\ndestination type: {}",
                pointee(source_ty),
                dest_ty.spelling
            )
        };
        reporter.report(cast, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::check_structural;
    use crate::syntax::{CastKind, TreeBuilder};

    fn tree_with_casts() -> SyntaxTree {
        let mut b = TreeBuilder::new();
        let file = b.add_file("cast.c", false);
        b.at(file, 1);
        let p = b.var("p", TypeInfo::pointer("int"));
        b.line(2);
        let load = b.rvalue(p);
        b.c_cast(CastKind::PointerToIntegral, load, TypeInfo::integral("long"));
        b.line(3);
        let addr = b.int_literal(4096);
        b.c_cast(CastKind::IntegralToPointer, addr, TypeInfo::pointer("char"));
        b.line(4);
        let zero = b.int_literal(0);
        b.c_cast(CastKind::NullToPointer, zero, TypeInfo::pointer("int"));
        b.finish()
    }

    #[test]
    fn reports_both_directions() {
        let diagnostics = check_structural(PointerIntegerCast::new(), &tree_with_casts());

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].line, 2);
        assert!(diagnostics[0].message.contains("source pointer object type: int"));
        assert!(diagnostics[0].message.contains("destination type: long"));
        assert_eq!(diagnostics[1].line, 3);
        assert!(diagnostics[1].message.contains("destination pointer object type: char"));
        assert_eq!(
            diagnostics[1].error_kind.as_deref(),
            Some("MISRA_C_2012_RULE_11_4")
        );
    }

    #[test]
    fn zero_literal_is_exempt() {
        let diagnostics = check_structural(PointerIntegerCast::new(), &tree_with_casts());
        assert!(diagnostics.iter().all(|d| d.line != 4));
    }

    #[test]
    fn pointee_strips_star() {
        assert_eq!(pointee(&TypeInfo::pointer("unsigned char")), "unsigned char");
        assert_eq!(pointee(&TypeInfo::integral("int")), "int");
    }
}
