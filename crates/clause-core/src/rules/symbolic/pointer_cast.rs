//! misra-cpp2008-5.2.7: An object with pointer type shall not be converted to
//! an unrelated pointer type, either directly or indirectly
//!
//! A pointer cast to an integer records the pointer's type against its
//! region. Casting that integer back to a different pointer type is a
//! violation, as is any bit-cast of a pointer operand.

use crate::declare_rule;
use crate::rules::RuleError;
use crate::symbolic::{Checker, CheckerContext, Fact, FactMap, ProgramPointKind};
use crate::syntax::{CastKind, ChildRole, NodeId};

/// The pointer type a region's address had when it was turned into an integer.
pub const ORIGIN_TYPE: FactMap = FactMap::new("misra-cpp2008-5.2.7.origin-type");

const MESSAGE: &str = "[misracxx-2008-5.2.7] violation of misra_cxx_2008: rule_5_2_7";

declare_rule!(
    PointerCastProvenance,
    id = "misra-cpp2008-5.2.7",
    name = "pointer-cast-provenance",
    description = "An object with pointer type shall not be converted to an unrelated pointer type, either directly or indirectly",
    category = Misra,
    severity = Warning,
    error_kind = "MISRA_CPP_2008_RULE_5_2_7",
    examples = "// Bad\nlong l = (long)p;\nchar *q = (char *)l;\n\n// Good\nlong l = (long)p;\nint *q = (int *)l;"
);

impl PointerCastProvenance {
    pub const POINTS: &'static [ProgramPointKind] = &[ProgramPointKind::PostCast];
}

impl Checker for PointerCastProvenance {
    fn check_post_cast(&self, cast: NodeId, ctx: &mut CheckerContext<'_>) -> Result<(), RuleError> {
        let tree = ctx.tree();
        let node = tree.node(cast);
        let Some(kind) = node.attrs.cast_kind else {
            return Ok(());
        };
        if kind == CastKind::LValueToRValue {
            return Ok(());
        }
        let Some(operand) = node.child(ChildRole::SubExpr) else {
            return Err(RuleError::UnexpectedShape {
                node: cast,
                message: "cast without operand".to_string(),
            });
        };
        let operand_ty = tree.node(operand).ty();

        if kind == CastKind::BitCast && operand_ty.is_some_and(|ty| ty.is_pointer()) {
            ctx.report(cast, MESSAGE);
        }

        let Some(region) = ctx.region_of(operand) else {
            return Ok(());
        };

        match kind {
            CastKind::IntegralToPointer => {
                let recorded = ORIGIN_TYPE.get(ctx.state(), &region).and_then(Fact::as_type);
                let destination = node.ty().map(|ty| ty.spelling.as_str());
                let mismatch = matches!((recorded, destination), (Some(r), Some(d)) if r != d);
                if mismatch {
                    ctx.report(cast, MESSAGE);
                }
            }
            CastKind::PointerToIntegral => {
                if let Some(ty) = operand_ty {
                    let state = ORIGIN_TYPE.set(ctx.state(), region, Fact::Type(ty.spelling.clone()));
                    ctx.add_transition(state);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::check_symbolic;
    use crate::syntax::{SyntaxTree, TreeBuilder, TypeClass, TypeInfo};

    fn void() -> TypeInfo {
        TypeInfo::new("void", TypeClass::Void)
    }

    /// `void f(int n) { int *p; long l = (long)p; int y; if (n) { y = 1; } <dest> q = (<dest>)l; }`
    fn round_trip(destination: TypeInfo) -> SyntaxTree {
        let mut b = TreeBuilder::new();
        let file = b.add_file("cast.cpp", false);
        b.at(file, 1);
        let n = b.param("n", TypeInfo::integral("int"));
        b.line(2);
        let p = b.var("p", TypeInfo::pointer("int"));
        let decl_p = b.decl_stmt(&[p]);
        b.line(3);
        let p_value = b.rvalue(p);
        let to_int = b.c_cast(CastKind::PointerToIntegral, p_value, TypeInfo::integral("long"));
        let l = b.var_init("l", TypeInfo::integral("long"), to_int);
        let decl_l = b.decl_stmt(&[l]);
        b.line(4);
        let y = b.var("y", TypeInfo::integral("int"));
        let decl_y = b.decl_stmt(&[y]);
        let cond = b.rvalue(n);
        let y_ref = b.decl_ref(y);
        let one = b.int_literal(1);
        let assign = b.assign(y_ref, one);
        let then = b.compound(&[assign]);
        let branch = b.if_stmt(cond, then, None);
        b.line(6);
        let l_value = b.rvalue(l);
        let to_ptr = b.c_cast(CastKind::IntegralToPointer, l_value, destination.clone());
        let q = b.var_init("q", destination, to_ptr);
        let decl_q = b.decl_stmt(&[q]);
        let body = b.compound(&[decl_p, decl_l, decl_y, branch, decl_q]);
        b.line(1);
        b.function("f", void(), &[n], Some(body));
        b.finish()
    }

    fn run(tree: &SyntaxTree) -> Vec<crate::diagnostic::Diagnostic> {
        check_symbolic(PointerCastProvenance::new(), PointerCastProvenance::POINTS, tree)
    }

    #[test]
    fn same_type_round_trip_is_clean() {
        assert!(run(&round_trip(TypeInfo::pointer("int"))).is_empty());
    }

    #[test]
    fn different_type_reports_once_at_second_cast() {
        let diagnostics = run(&round_trip(TypeInfo::pointer("char")));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 6);
        assert_eq!(diagnostics[0].message, MESSAGE);
    }

    #[test]
    fn integer_without_recorded_type_is_ignored() {
        // char *q = (char *)4096;
        let mut b = TreeBuilder::new();
        let file = b.add_file("cast.cpp", false);
        b.at(file, 1);
        let addr = b.int_literal(4096);
        let cast = b.c_cast(CastKind::IntegralToPointer, addr, TypeInfo::pointer("char"));
        let q = b.var_init("q", TypeInfo::pointer("char"), cast);
        let decl = b.decl_stmt(&[q]);
        let body = b.compound(&[decl]);
        b.function("f", void(), &[], Some(body));

        assert!(run(&b.finish()).is_empty());
    }

    #[test]
    fn pointer_bit_cast_is_reported() {
        // char *c = (char *)p;
        let mut b = TreeBuilder::new();
        let file = b.add_file("cast.cpp", false);
        b.at(file, 1);
        let p = b.param("p", TypeInfo::pointer("int"));
        b.line(2);
        let p_value = b.rvalue(p);
        let cast = b.c_cast(CastKind::BitCast, p_value, TypeInfo::pointer("char"));
        let c = b.var_init("c", TypeInfo::pointer("char"), cast);
        let decl = b.decl_stmt(&[c]);
        let body = b.compound(&[decl]);
        b.line(1);
        b.function("f", void(), &[p], Some(body));

        let diagnostics = run(&b.finish());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 2);
    }
}
