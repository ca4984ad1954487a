//! Free functions for composing [`Matcher`]s.
//!
//! Node matchers take an array of inner matchers that must all hold, so a
//! pattern reads like the tree it describes:
//!
//! ```
//! use clause_core::matcher::dsl::*;
//!
//! let pattern = binary_operator([
//!     has_operator_name("="),
//!     has_lhs(decl_ref_expr([to(parm_var_decl([]))])),
//! ]);
//! # let _ = pattern;
//! ```

use std::sync::Arc;

use regex::Regex;

use super::Matcher;
use crate::syntax::{CastKind, ChildRole, NodeCategory, NodeId, NodeKind, SyntaxTree, TypeClass};

pub fn node(kind: NodeKind) -> Matcher {
    Matcher::Kind(kind)
}

fn kind_with<const N: usize>(kind: NodeKind, inner: [Matcher; N]) -> Matcher {
    if N == 0 {
        return Matcher::Kind(kind);
    }
    let mut all = Vec::with_capacity(N + 1);
    all.push(Matcher::Kind(kind));
    all.extend(inner);
    Matcher::AllOf(all)
}

fn category_with<const N: usize>(category: NodeCategory, inner: [Matcher; N]) -> Matcher {
    let mut all = Vec::with_capacity(N + 1);
    all.push(Matcher::Category(category));
    all.extend(inner);
    Matcher::AllOf(all)
}

macro_rules! node_matchers {
    ($($fn_name:ident => $kind:ident),* $(,)?) => {
        $(
            pub fn $fn_name<const N: usize>(inner: [Matcher; N]) -> Matcher {
                kind_with(NodeKind::$kind, inner)
            }
        )*
    };
}

node_matchers! {
    function_decl => FunctionDecl,
    method_decl => MethodDecl,
    parm_var_decl => ParmVarDecl,
    field_decl => FieldDecl,
    record_decl => RecordDecl,
    compound_stmt => CompoundStmt,
    if_stmt => IfStmt,
    while_stmt => WhileStmt,
    do_stmt => DoStmt,
    for_stmt => ForStmt,
    switch_stmt => SwitchStmt,
    case_stmt => CaseStmt,
    default_stmt => DefaultStmt,
    return_stmt => ReturnStmt,
    decl_ref_expr => DeclRefExpr,
    integer_literal => IntegerLiteral,
    string_literal => StringLiteral,
    null_ptr_literal => NullPtrLiteral,
    binary_operator => BinaryOperator,
    unary_operator => UnaryOperator,
    call_expr => CallExpr,
    array_subscript_expr => ArraySubscriptExpr,
    member_expr => MemberExpr,
    implicit_cast_expr => ImplicitCastExpr,
    c_style_cast_expr => CStyleCastExpr,
    paren_expr => ParenExpr,
    expr_with_cleanups => ExprWithCleanups,
}

/// Any variable declaration, parameters included.
pub fn var_decl<const N: usize>(inner: [Matcher; N]) -> Matcher {
    let kinds = Matcher::AnyOf(vec![
        Matcher::Kind(NodeKind::VarDecl),
        Matcher::Kind(NodeKind::ParmVarDecl),
    ]);
    let mut all = vec![kinds];
    all.extend(inner);
    Matcher::AllOf(all)
}

/// Implicit or explicit cast.
pub fn cast_expr<const N: usize>(inner: [Matcher; N]) -> Matcher {
    let kinds = Matcher::AnyOf(vec![
        Matcher::Kind(NodeKind::ImplicitCastExpr),
        Matcher::Kind(NodeKind::CStyleCastExpr),
    ]);
    let mut all = vec![kinds];
    all.extend(inner);
    Matcher::AllOf(all)
}

pub fn expr() -> Matcher {
    Matcher::Category(NodeCategory::Expression)
}

pub fn expr_with<const N: usize>(inner: [Matcher; N]) -> Matcher {
    category_with(NodeCategory::Expression, inner)
}

pub fn stmt() -> Matcher {
    Matcher::Category(NodeCategory::Statement)
}

pub fn decl() -> Matcher {
    Matcher::Category(NodeCategory::Declaration)
}

pub fn anything() -> Matcher {
    Matcher::Any
}

pub fn all_of(inner: impl IntoIterator<Item = Matcher>) -> Matcher {
    Matcher::AllOf(inner.into_iter().collect())
}

pub fn any_of(inner: impl IntoIterator<Item = Matcher>) -> Matcher {
    Matcher::AnyOf(inner.into_iter().collect())
}

pub fn each_of(inner: impl IntoIterator<Item = Matcher>) -> Matcher {
    Matcher::EachOf(inner.into_iter().collect())
}

pub fn unless(inner: Matcher) -> Matcher {
    Matcher::Unless(Box::new(inner))
}

pub fn has_name(name: &str) -> Matcher {
    Matcher::HasName(name.to_string())
}

pub fn matches_name(pattern: &str) -> Result<Matcher, regex::Error> {
    Ok(Matcher::NameMatches(Regex::new(pattern)?))
}

pub fn has_operator_name(name: &str) -> Matcher {
    Matcher::HasOperatorName(vec![name.to_string()])
}

pub fn has_any_operator_name(names: &[&str]) -> Matcher {
    Matcher::HasOperatorName(names.iter().map(|s| s.to_string()).collect())
}

pub fn has_cast_kind(kind: CastKind) -> Matcher {
    Matcher::HasCastKind(vec![kind])
}

pub fn has_any_cast_kind(kinds: &[CastKind]) -> Matcher {
    Matcher::HasCastKind(kinds.to_vec())
}

pub fn has_type_class(class: TypeClass) -> Matcher {
    Matcher::HasTypeClass(class)
}

pub fn has_type_name(name: &str) -> Matcher {
    Matcher::HasTypeName(name.to_string())
}

pub fn has_flag(flag: &str) -> Matcher {
    Matcher::HasFlag(flag.to_string())
}

pub fn has_child(role: ChildRole, inner: Matcher) -> Matcher {
    Matcher::HasChild(role, Box::new(inner))
}

pub fn has_lhs(inner: Matcher) -> Matcher {
    has_child(ChildRole::Lhs, inner)
}

pub fn has_rhs(inner: Matcher) -> Matcher {
    has_child(ChildRole::Rhs, inner)
}

/// Either operand of a binary operator.
pub fn has_either_operand(inner: Matcher) -> Matcher {
    any_of([has_lhs(inner.clone()), has_rhs(inner)])
}

pub fn has_unary_operand(inner: Matcher) -> Matcher {
    has_child(ChildRole::Operand, inner)
}

pub fn has_body(inner: Matcher) -> Matcher {
    has_child(ChildRole::Body, inner)
}

pub fn has_condition(inner: Matcher) -> Matcher {
    has_child(ChildRole::Condition, inner)
}

pub fn has_source_expression(inner: Matcher) -> Matcher {
    has_child(ChildRole::SubExpr, inner)
}

pub fn has_argument(inner: Matcher) -> Matcher {
    has_child(ChildRole::Argument, inner)
}

pub fn has_base(inner: Matcher) -> Matcher {
    has_child(ChildRole::Base, inner)
}

pub fn has_initializer(inner: Matcher) -> Matcher {
    has_child(ChildRole::Initializer, inner)
}

pub fn has(inner: Matcher) -> Matcher {
    Matcher::Has(Box::new(inner))
}

pub fn has_parent(inner: Matcher) -> Matcher {
    Matcher::HasParent(Box::new(inner))
}

pub fn has_ancestor(inner: Matcher) -> Matcher {
    Matcher::HasAncestor(Box::new(inner))
}

pub fn has_descendant(inner: Matcher) -> Matcher {
    Matcher::HasDescendant(Box::new(inner))
}

pub fn for_each_descendant(inner: Matcher) -> Matcher {
    Matcher::ForEachDescendant(Box::new(inner))
}

/// The declaration referenced by a `DeclRefExpr`, `MemberExpr` or call.
pub fn to(inner: Matcher) -> Matcher {
    Matcher::To(Box::new(inner))
}

/// The member declaration of a `MemberExpr`.
pub fn member(inner: Matcher) -> Matcher {
    to(inner)
}

pub fn equals_bound_node(name: &str) -> Matcher {
    Matcher::EqualsBoundNode(name.to_string())
}

pub fn ignoring_paren_imp_casts(inner: Matcher) -> Matcher {
    Matcher::IgnoringParenImpCasts(Box::new(inner))
}

pub fn predicate(f: impl Fn(&SyntaxTree, NodeId) -> bool + Send + Sync + 'static) -> Matcher {
    Matcher::Predicate(Arc::new(f))
}
