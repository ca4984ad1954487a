//! Declarative structural patterns over the syntax tree
//!
//! A [`Matcher`] is an immutable predicate tree. Evaluating it at a node yields
//! every way the pattern can hold there, each as a [`BoundNodes`] set; an
//! empty result means no match. Relations that look for a single related node
//! (`has`, `has_descendant`, `has_ancestor`, ...) keep the first related node
//! that matches, in tree order. `for_each_descendant` and `each_of` keep all.

pub mod dsl;
mod finder;

pub use finder::{MatchFinder, MatchResult};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::syntax::{CastKind, ChildRole, NodeCategory, NodeId, NodeKind, SyntaxTree, TypeClass};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundNodes {
    nodes: BTreeMap<String, NodeId>,
}

impl BoundNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, node: NodeId) {
        self.nodes.insert(name.into(), node);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub type NodePredicate = Arc<dyn Fn(&SyntaxTree, NodeId) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum Matcher {
    Any,
    Kind(NodeKind),
    Category(NodeCategory),
    AllOf(Vec<Matcher>),
    AnyOf(Vec<Matcher>),
    EachOf(Vec<Matcher>),
    Unless(Box<Matcher>),
    HasName(String),
    NameMatches(Regex),
    /// Binary or unary operator spelling; `++`/`--` cover both fixities.
    HasOperatorName(Vec<String>),
    HasCastKind(Vec<CastKind>),
    HasTypeClass(TypeClass),
    HasTypeName(String),
    HasFlag(String),
    HasChild(ChildRole, Box<Matcher>),
    Has(Box<Matcher>),
    HasParent(Box<Matcher>),
    HasAncestor(Box<Matcher>),
    HasDescendant(Box<Matcher>),
    ForEachDescendant(Box<Matcher>),
    To(Box<Matcher>),
    Bind(String, Box<Matcher>),
    /// Holds when the node is the one bound under the name earlier in the
    /// same pattern. An unbound name never matches.
    EqualsBoundNode(String),
    IgnoringParenImpCasts(Box<Matcher>),
    Predicate(NodePredicate),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Matcher::*;
        match self {
            Any => write!(f, "Any"),
            Kind(k) => write!(f, "Kind({k:?})"),
            Category(c) => write!(f, "Category({c:?})"),
            AllOf(ms) => f.debug_tuple("AllOf").field(ms).finish(),
            AnyOf(ms) => f.debug_tuple("AnyOf").field(ms).finish(),
            EachOf(ms) => f.debug_tuple("EachOf").field(ms).finish(),
            Unless(m) => f.debug_tuple("Unless").field(m).finish(),
            HasName(n) => write!(f, "HasName({n:?})"),
            NameMatches(r) => write!(f, "NameMatches({:?})", r.as_str()),
            HasOperatorName(ops) => write!(f, "HasOperatorName({ops:?})"),
            HasCastKind(kinds) => write!(f, "HasCastKind({kinds:?})"),
            HasTypeClass(c) => write!(f, "HasTypeClass({c:?})"),
            HasTypeName(n) => write!(f, "HasTypeName({n:?})"),
            HasFlag(n) => write!(f, "HasFlag({n:?})"),
            HasChild(role, m) => f.debug_tuple("HasChild").field(role).field(m).finish(),
            Has(m) => f.debug_tuple("Has").field(m).finish(),
            HasParent(m) => f.debug_tuple("HasParent").field(m).finish(),
            HasAncestor(m) => f.debug_tuple("HasAncestor").field(m).finish(),
            HasDescendant(m) => f.debug_tuple("HasDescendant").field(m).finish(),
            ForEachDescendant(m) => f.debug_tuple("ForEachDescendant").field(m).finish(),
            To(m) => f.debug_tuple("To").field(m).finish(),
            Bind(name, m) => f.debug_tuple("Bind").field(name).field(m).finish(),
            EqualsBoundNode(n) => write!(f, "EqualsBoundNode({n:?})"),
            IgnoringParenImpCasts(m) => f.debug_tuple("IgnoringParenImpCasts").field(m).finish(),
            Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

impl Matcher {
    pub fn bind(self, name: impl Into<String>) -> Matcher {
        Matcher::Bind(name.into(), Box::new(self))
    }

    /// Every binding set under which the pattern holds at `node`.
    pub fn match_node(&self, tree: &SyntaxTree, node: NodeId) -> Vec<BoundNodes> {
        self.matches(tree, node, &BoundNodes::new())
    }

    pub fn is_match(&self, tree: &SyntaxTree, node: NodeId) -> bool {
        !self.match_node(tree, node).is_empty()
    }

    fn matches(&self, tree: &SyntaxTree, node: NodeId, bound: &BoundNodes) -> Vec<BoundNodes> {
        let n = tree.node(node);
        let keep = |holds: bool| if holds { vec![bound.clone()] } else { Vec::new() };

        match self {
            Matcher::Any => vec![bound.clone()],
            Matcher::Kind(kind) => keep(n.kind == *kind),
            Matcher::Category(category) => keep(n.kind.category() == *category),
            Matcher::AllOf(matchers) => {
                let mut sets = vec![bound.clone()];
                for matcher in matchers {
                    sets = sets
                        .iter()
                        .flat_map(|set| matcher.matches(tree, node, set))
                        .collect();
                    if sets.is_empty() {
                        break;
                    }
                }
                sets
            }
            Matcher::AnyOf(matchers) => matchers
                .iter()
                .map(|m| m.matches(tree, node, bound))
                .find(|sets| !sets.is_empty())
                .unwrap_or_default(),
            Matcher::EachOf(matchers) => matchers
                .iter()
                .flat_map(|m| m.matches(tree, node, bound))
                .collect(),
            Matcher::Unless(inner) => keep(inner.matches(tree, node, bound).is_empty()),
            Matcher::HasName(name) => keep(n.name() == Some(name.as_str())),
            Matcher::NameMatches(regex) => keep(n.name().is_some_and(|s| regex.is_match(s))),
            Matcher::HasOperatorName(names) => {
                let spelling = match (n.binary_op(), n.unary_op()) {
                    (Some(op), _) => Some(op.spelling()),
                    (None, Some(op)) => Some(op.spelling()),
                    _ => None,
                };
                keep(spelling.is_some_and(|s| names.iter().any(|name| name == s)))
            }
            Matcher::HasCastKind(kinds) => {
                keep(n.attrs.cast_kind.is_some_and(|k| kinds.contains(&k)))
            }
            Matcher::HasTypeClass(class) => keep(n.ty().is_some_and(|t| t.class == *class)),
            Matcher::HasTypeName(name) => keep(
                n.ty()
                    .is_some_and(|t| t.spelling == *name || t.canonical() == name),
            ),
            Matcher::HasFlag(flag) => keep(n.has_flag(flag)),
            Matcher::HasChild(role, inner) => {
                first_match(tree, n.children_with(*role), inner, bound)
            }
            Matcher::Has(inner) => first_match(tree, n.child_ids(), inner, bound),
            Matcher::HasParent(inner) => first_match(tree, n.parent, inner, bound),
            Matcher::HasAncestor(inner) => first_match(tree, tree.ancestors(node), inner, bound),
            Matcher::HasDescendant(inner) => {
                first_match(tree, tree.descendants(node), inner, bound)
            }
            Matcher::ForEachDescendant(inner) => tree
                .descendants(node)
                .flat_map(|d| inner.matches(tree, d, bound))
                .collect(),
            Matcher::To(inner) => first_match(tree, tree.referenced_decl(node), inner, bound),
            Matcher::Bind(name, inner) => {
                let mut sets = inner.matches(tree, node, bound);
                for set in &mut sets {
                    set.insert(name.clone(), node);
                }
                sets
            }
            Matcher::EqualsBoundNode(name) => keep(bound.get(name) == Some(node)),
            Matcher::IgnoringParenImpCasts(inner) => {
                inner.matches(tree, tree.ignore_paren_imp_casts(node), bound)
            }
            Matcher::Predicate(predicate) => keep(predicate(tree, node)),
        }
    }
}

fn first_match(
    tree: &SyntaxTree,
    candidates: impl IntoIterator<Item = NodeId>,
    matcher: &Matcher,
    bound: &BoundNodes,
) -> Vec<BoundNodes> {
    candidates
        .into_iter()
        .map(|candidate| matcher.matches(tree, candidate, bound))
        .find(|sets| !sets.is_empty())
        .unwrap_or_default()
}
