use crate::location;
use crate::syntax::{Node, NodeId, SyntaxTree};

use super::{BoundNodes, Matcher};

/// One successful match handed to a callback.
#[derive(Debug, Clone)]
pub struct MatchResult<'t> {
    pub tree: &'t SyntaxTree,
    /// The node the pattern was evaluated at.
    pub node: NodeId,
    pub bindings: BoundNodes,
}

impl<'t> MatchResult<'t> {
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.bindings.get(name)
    }

    pub fn node(&self, name: &str) -> Option<&'t Node> {
        self.get(name).map(|id| self.tree.node(id))
    }
}

type Callback<'p, C> = Box<dyn FnMut(&MatchResult<'_>, &mut C) + 'p>;

/// Runs registered patterns over a tree in one depth-first pass.
///
/// `C` is the context handed to every callback, typically the run's
/// reporter.
pub struct MatchFinder<'p, C> {
    patterns: Vec<(&'p Matcher, Callback<'p, C>)>,
}

impl<'p, C> Default for MatchFinder<'p, C> {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }
}

impl<'p, C> MatchFinder<'p, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pattern(
        &mut self,
        matcher: &'p Matcher,
        callback: impl FnMut(&MatchResult<'_>, &mut C) + 'p,
    ) {
        self.patterns.push((matcher, Box::new(callback)));
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Evaluates every pattern at `node`; returns the number of callbacks run.
    ///
    /// Nodes in system headers or without a valid location never reach a
    /// callback.
    pub fn run_on_node(&mut self, tree: &SyntaxTree, node: NodeId, ctx: &mut C) -> usize {
        if !location::is_reportable(tree, node) {
            return 0;
        }

        let mut fired = 0;
        for (matcher, callback) in &mut self.patterns {
            for bindings in matcher.match_node(tree, node) {
                let result = MatchResult {
                    tree,
                    node,
                    bindings,
                };
                callback(&result, ctx);
                fired += 1;
            }
        }
        fired
    }

    pub fn match_tree(&mut self, tree: &SyntaxTree, ctx: &mut C) -> usize {
        let Some(root) = tree.root() else {
            return 0;
        };
        if self.patterns.is_empty() {
            return 0;
        }
        let mut fired = 0;
        for node in tree.preorder(root) {
            fired += self.run_on_node(tree, node, ctx);
        }
        tracing::debug!(patterns = self.patterns.len(), fired, "structural matching finished");
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::dsl::*;
    use crate::syntax::{CastKind, TreeBuilder, TypeInfo};

    fn casts_in_user_and_system() -> SyntaxTree {
        let mut b = TreeBuilder::new();
        let user = b.add_file("main.c", false);
        let system = b.add_file("/usr/include/sys.h", true);
        let ptr = TypeInfo::pointer("int");
        let long = TypeInfo::integral("long");

        b.at(system, 5);
        let p_sys = b.var("q", ptr.clone());
        let load_sys = b.rvalue(p_sys);
        b.c_cast(CastKind::PointerToIntegral, load_sys, long.clone());

        b.at(user, 3);
        let p = b.var("p", ptr);
        let load = b.rvalue(p);
        b.c_cast(CastKind::PointerToIntegral, load, long);
        b.finish()
    }

    #[test]
    fn callbacks_skip_system_headers() {
        let tree = casts_in_user_and_system();
        let pattern = c_style_cast_expr([has_cast_kind(CastKind::PointerToIntegral)]);
        let mut lines = Vec::new();

        let mut finder = MatchFinder::new();
        finder.register_pattern(&pattern, |m: &MatchResult<'_>, seen: &mut Vec<u32>| {
            seen.push(m.tree.node(m.node).location.line);
        });
        let fired = finder.match_tree(&tree, &mut lines);

        assert_eq!(fired, 1);
        assert_eq!(lines, vec![3]);
    }

    #[test]
    fn independent_patterns_fire_on_same_node() {
        let tree = casts_in_user_and_system();
        let first = c_style_cast_expr([]);
        let second = cast_expr([has_type_name("long")]);
        let mut count = 0usize;

        let mut finder = MatchFinder::new();
        finder.register_pattern(&first, |_: &MatchResult<'_>, n: &mut usize| *n += 1);
        finder.register_pattern(&second, |_: &MatchResult<'_>, n: &mut usize| *n += 10);
        finder.match_tree(&tree, &mut count);

        assert_eq!(count, 11);
    }

    #[test]
    fn bindings_are_exposed_by_name() {
        let tree = casts_in_user_and_system();
        let pattern = c_style_cast_expr([has_source_expression(
            ignoring_paren_imp_casts(decl_ref_expr([]).bind("ref")),
        )]);
        let mut names = Vec::new();

        let mut finder = MatchFinder::new();
        finder.register_pattern(&pattern, |m: &MatchResult<'_>, out: &mut Vec<String>| {
            if let Some(name) = m.node("ref").and_then(|n| n.name()) {
                out.push(name.to_string());
            }
        });
        finder.match_tree(&tree, &mut names);

        assert_eq!(names, vec!["p".to_string()]);
    }
}
