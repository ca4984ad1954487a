//! Control flow graph construction
//!
//! One graph per function body. Blocks hold the top-level statements and
//! expressions they evaluate, in order, and end in a [`Terminator`]:
//! - `Jump`: fall through to every successor (at most one in practice)
//! - `Branch`: successor 0 is taken when the condition holds, successor 1
//!   when it does not
//! - `Switch`: one successor per case label plus the default or exit edge

use std::collections::HashMap;

use id_arena::{Arena, Id};

use crate::syntax::{ChildRole, NodeCategory, NodeId, NodeKind, SyntaxTree};

pub type BasicBlockId = Id<BasicBlock>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicBlockKind {
    Entry,
    Exit,
    Normal,
    Condition,
    LoopHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Jump,
    Branch(NodeId),
    Switch(NodeId),
}

#[derive(Debug)]
pub struct BasicBlock {
    pub id: BasicBlockId,
    pub kind: BasicBlockKind,
    pub predecessors: Vec<BasicBlockId>,
    pub successors: Vec<BasicBlockId>,
    pub elements: Vec<NodeId>,
    pub terminator: Terminator,
}

#[derive(Debug)]
pub struct ControlFlowGraph {
    blocks: Arena<BasicBlock>,
    entry: BasicBlockId,
    exit: BasicBlockId,
    function: NodeId,
}

impl ControlFlowGraph {
    /// Builds the graph of `function`'s body; `None` for declarations
    /// without one.
    pub fn build(tree: &SyntaxTree, function: NodeId) -> Option<Self> {
        let body = tree.node(function).child(ChildRole::Body)?;

        let mut blocks = Arena::new();
        let entry = alloc(&mut blocks, BasicBlockKind::Entry);
        let exit = alloc(&mut blocks, BasicBlockKind::Exit);
        let mut builder = CfgBuilder {
            tree,
            graph: ControlFlowGraph {
                blocks,
                entry,
                exit,
                function,
            },
            breaks: Vec::new(),
            continues: Vec::new(),
            switches: Vec::new(),
            labels: HashMap::new(),
            gotos: Vec::new(),
        };

        let end = builder.build_stmt(body, entry);
        builder.graph.add_edge(end, exit);
        builder.resolve_gotos();
        Some(builder.graph)
    }

    fn create_block(&mut self, kind: BasicBlockKind) -> BasicBlockId {
        alloc(&mut self.blocks, kind)
    }

    fn add_edge(&mut self, from: BasicBlockId, to: BasicBlockId) {
        if !self.blocks[from].successors.contains(&to) {
            self.blocks[from].successors.push(to);
        }
        if !self.blocks[to].predecessors.contains(&from) {
            self.blocks[to].predecessors.push(from);
        }
    }

    pub fn entry(&self) -> BasicBlockId {
        self.entry
    }

    pub fn exit(&self) -> BasicBlockId {
        self.exit
    }

    pub fn function(&self) -> NodeId {
        self.function
    }

    pub fn get(&self, id: BasicBlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter().map(|(_, block)| block)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn successors(&self, id: BasicBlockId) -> impl Iterator<Item = &BasicBlock> {
        self.blocks[id]
            .successors
            .iter()
            .map(|&succ| &self.blocks[succ])
    }

    pub fn predecessors(&self, id: BasicBlockId) -> impl Iterator<Item = &BasicBlock> {
        self.blocks[id]
            .predecessors
            .iter()
            .map(|&pred| &self.blocks[pred])
    }

    pub fn has_back_edge(&self, from: BasicBlockId, to: BasicBlockId) -> bool {
        self.blocks[to].kind == BasicBlockKind::LoopHeader
            && self.blocks[from].successors.contains(&to)
    }
}

fn alloc(blocks: &mut Arena<BasicBlock>, kind: BasicBlockKind) -> BasicBlockId {
    blocks.alloc_with_id(|id| BasicBlock {
        id,
        kind,
        predecessors: Vec::new(),
        successors: Vec::new(),
        elements: Vec::new(),
        terminator: Terminator::Jump,
    })
}

struct SwitchScope {
    block: BasicBlockId,
    has_default: bool,
}

struct CfgBuilder<'t> {
    tree: &'t SyntaxTree,
    graph: ControlFlowGraph,
    breaks: Vec<BasicBlockId>,
    continues: Vec<BasicBlockId>,
    switches: Vec<SwitchScope>,
    labels: HashMap<NodeId, BasicBlockId>,
    gotos: Vec<(BasicBlockId, NodeId)>,
}

impl CfgBuilder<'_> {
    /// Lowers `stmt` starting in `current`; returns the block control falls
    /// out of.
    fn build_stmt(&mut self, stmt: NodeId, current: BasicBlockId) -> BasicBlockId {
        let node = self.tree.node(stmt);
        match node.kind {
            NodeKind::CompoundStmt => {
                let mut curr = current;
                for child in node.children_with(ChildRole::Statement) {
                    curr = self.build_stmt(child, curr);
                }
                curr
            }
            NodeKind::IfStmt => self.build_if_stmt(stmt, current),
            NodeKind::WhileStmt => self.build_while_stmt(stmt, current),
            NodeKind::DoStmt => self.build_do_stmt(stmt, current),
            NodeKind::ForStmt => self.build_for_stmt(stmt, current),
            NodeKind::SwitchStmt => self.build_switch_stmt(stmt, current),
            NodeKind::CaseStmt | NodeKind::DefaultStmt => self.build_case(stmt, current),
            NodeKind::LabelStmt => {
                let block = self.graph.create_block(BasicBlockKind::Normal);
                self.graph.add_edge(current, block);
                self.labels.insert(stmt, block);
                match node.child(ChildRole::Statement) {
                    Some(inner) => self.build_stmt(inner, block),
                    None => block,
                }
            }
            NodeKind::GotoStmt => {
                if let Some(label) = node.attrs.referenced {
                    self.gotos.push((current, label));
                }
                self.graph.create_block(BasicBlockKind::Normal)
            }
            NodeKind::ReturnStmt => {
                self.graph.blocks[current].elements.push(stmt);
                self.graph.add_edge(current, self.graph.exit);
                self.graph.create_block(BasicBlockKind::Normal)
            }
            NodeKind::BreakStmt => self.jump_to(self.breaks.last().copied(), current),
            NodeKind::ContinueStmt => self.jump_to(self.continues.last().copied(), current),
            NodeKind::NullStmt => current,
            NodeKind::DeclStmt => {
                self.graph.blocks[current].elements.push(stmt);
                current
            }
            _ if node.kind.category() == NodeCategory::Expression => {
                self.graph.blocks[current].elements.push(stmt);
                current
            }
            _ => current,
        }
    }

    fn jump_to(&mut self, target: Option<BasicBlockId>, current: BasicBlockId) -> BasicBlockId {
        if let Some(target) = target {
            self.graph.add_edge(current, target);
        }
        self.graph.create_block(BasicBlockKind::Normal)
    }

    fn condition_block(&mut self, condition: NodeId, from: BasicBlockId) -> BasicBlockId {
        let block = self.graph.create_block(BasicBlockKind::Condition);
        self.graph.blocks[block].terminator = Terminator::Branch(condition);
        self.graph.add_edge(from, block);
        block
    }

    fn build_if_stmt(&mut self, stmt: NodeId, current: BasicBlockId) -> BasicBlockId {
        let node = self.tree.node(stmt);
        let (Some(cond), Some(then)) = (node.child(ChildRole::Condition), node.child(ChildRole::Then))
        else {
            return current;
        };
        let otherwise = node.child(ChildRole::Else);

        let condition = self.condition_block(cond, current);

        let then_start = self.graph.create_block(BasicBlockKind::Normal);
        self.graph.add_edge(condition, then_start);

        let merge = match otherwise {
            Some(alt) => {
                let else_start = self.graph.create_block(BasicBlockKind::Normal);
                self.graph.add_edge(condition, else_start);
                let then_end = self.build_stmt(then, then_start);
                let else_end = self.build_stmt(alt, else_start);
                let merge = self.graph.create_block(BasicBlockKind::Normal);
                self.graph.add_edge(then_end, merge);
                self.graph.add_edge(else_end, merge);
                merge
            }
            None => {
                let merge = self.graph.create_block(BasicBlockKind::Normal);
                self.graph.add_edge(condition, merge);
                let then_end = self.build_stmt(then, then_start);
                self.graph.add_edge(then_end, merge);
                merge
            }
        };
        merge
    }

    fn build_while_stmt(&mut self, stmt: NodeId, current: BasicBlockId) -> BasicBlockId {
        let node = self.tree.node(stmt);
        let (Some(cond), Some(body)) = (node.child(ChildRole::Condition), node.child(ChildRole::Body))
        else {
            return current;
        };

        let header = self.graph.create_block(BasicBlockKind::LoopHeader);
        self.graph.add_edge(current, header);
        let condition = self.condition_block(cond, header);

        let body_start = self.graph.create_block(BasicBlockKind::Normal);
        self.graph.add_edge(condition, body_start);
        let after_loop = self.graph.create_block(BasicBlockKind::Normal);
        self.graph.add_edge(condition, after_loop);

        let body_end = self.in_loop(after_loop, header, |b| b.build_stmt(body, body_start));
        self.graph.add_edge(body_end, header);

        after_loop
    }

    fn build_do_stmt(&mut self, stmt: NodeId, current: BasicBlockId) -> BasicBlockId {
        let node = self.tree.node(stmt);
        let (Some(cond), Some(body)) = (node.child(ChildRole::Condition), node.child(ChildRole::Body))
        else {
            return current;
        };

        let header = self.graph.create_block(BasicBlockKind::LoopHeader);
        self.graph.add_edge(current, header);
        let body_start = self.graph.create_block(BasicBlockKind::Normal);
        self.graph.add_edge(header, body_start);

        let condition = self.graph.create_block(BasicBlockKind::Condition);
        self.graph.blocks[condition].terminator = Terminator::Branch(cond);
        let after_loop = self.graph.create_block(BasicBlockKind::Normal);

        let body_end = self.in_loop(after_loop, condition, |b| b.build_stmt(body, body_start));
        self.graph.add_edge(body_end, condition);
        self.graph.add_edge(condition, header);
        self.graph.add_edge(condition, after_loop);

        after_loop
    }

    fn build_for_stmt(&mut self, stmt: NodeId, current: BasicBlockId) -> BasicBlockId {
        let node = self.tree.node(stmt);
        let Some(body) = node.child(ChildRole::Body) else {
            return current;
        };
        let init = node.child(ChildRole::Init);
        let cond = node.child(ChildRole::Condition);
        let increment = node.child(ChildRole::Increment);

        let current = match init {
            Some(init) => self.build_stmt(init, current),
            None => current,
        };

        let header = self.graph.create_block(BasicBlockKind::LoopHeader);
        self.graph.add_edge(current, header);

        let body_start = self.graph.create_block(BasicBlockKind::Normal);
        let after_loop = self.graph.create_block(BasicBlockKind::Normal);
        match cond {
            Some(cond) => {
                let condition = self.condition_block(cond, header);
                self.graph.add_edge(condition, body_start);
                self.graph.add_edge(condition, after_loop);
            }
            None => self.graph.add_edge(header, body_start),
        }

        let update = self.graph.create_block(BasicBlockKind::Normal);
        if let Some(increment) = increment {
            self.graph.blocks[update].elements.push(increment);
        }

        let body_end = self.in_loop(after_loop, update, |b| b.build_stmt(body, body_start));
        self.graph.add_edge(body_end, update);
        self.graph.add_edge(update, header);

        after_loop
    }

    fn build_switch_stmt(&mut self, stmt: NodeId, current: BasicBlockId) -> BasicBlockId {
        let node = self.tree.node(stmt);
        let (Some(cond), Some(body)) = (node.child(ChildRole::Condition), node.child(ChildRole::Body))
        else {
            return current;
        };

        let dispatch = self.graph.create_block(BasicBlockKind::Condition);
        self.graph.blocks[dispatch].terminator = Terminator::Switch(cond);
        self.graph.add_edge(current, dispatch);
        let after_switch = self.graph.create_block(BasicBlockKind::Normal);

        self.switches.push(SwitchScope {
            block: dispatch,
            has_default: false,
        });
        self.breaks.push(after_switch);
        // Statements before the first label are unreachable.
        let orphan = self.graph.create_block(BasicBlockKind::Normal);
        let body_end = self.build_stmt(body, orphan);
        self.breaks.pop();
        let scope = self.switches.pop();

        if !scope.is_some_and(|s| s.has_default) {
            self.graph.add_edge(dispatch, after_switch);
        }
        self.graph.add_edge(body_end, after_switch);
        after_switch
    }

    fn build_case(&mut self, stmt: NodeId, current: BasicBlockId) -> BasicBlockId {
        let node = self.tree.node(stmt);
        let block = self.graph.create_block(BasicBlockKind::Normal);
        self.graph.add_edge(current, block);
        if let Some(scope) = self.switches.last_mut() {
            if node.kind == NodeKind::DefaultStmt {
                scope.has_default = true;
            }
            let dispatch = scope.block;
            self.graph.add_edge(dispatch, block);
        }
        match node.child(ChildRole::Statement) {
            Some(inner) => self.build_stmt(inner, block),
            None => block,
        }
    }

    fn in_loop(
        &mut self,
        break_target: BasicBlockId,
        continue_target: BasicBlockId,
        build: impl FnOnce(&mut Self) -> BasicBlockId,
    ) -> BasicBlockId {
        self.breaks.push(break_target);
        self.continues.push(continue_target);
        let end = build(self);
        self.continues.pop();
        self.breaks.pop();
        end
    }

    fn resolve_gotos(&mut self) {
        for (from, label) in std::mem::take(&mut self.gotos) {
            if let Some(&target) = self.labels.get(&label) {
                self.graph.add_edge(from, target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{BinaryOp, TreeBuilder, TypeClass, TypeInfo};

    fn int() -> TypeInfo {
        TypeInfo::integral("int")
    }

    fn build(make_body: impl FnOnce(&mut TreeBuilder, NodeId) -> NodeId) -> (SyntaxTree, NodeId) {
        let mut b = TreeBuilder::new();
        let file = b.add_file("f.c", false);
        b.at(file, 1);
        let param = b.param("n", int());
        let body = make_body(&mut b, param);
        let function = b.function("f", int(), &[param], Some(body));
        (b.finish(), function)
    }

    fn cond(b: &mut TreeBuilder, n: NodeId) -> NodeId {
        let load = b.rvalue(n);
        let zero = b.int_literal(0);
        b.binary(BinaryOp::Gt, load, zero, TypeInfo::new("int", TypeClass::Integral))
    }

    #[test]
    fn linear_body_has_entry_to_exit() {
        let (tree, function) = build(|b, n| {
            let e = b.rvalue(n);
            b.compound(&[e])
        });
        let cfg = ControlFlowGraph::build(&tree, function).unwrap();

        let entry = cfg.get(cfg.entry());
        assert_eq!(entry.elements.len(), 1);
        assert_eq!(entry.successors, vec![cfg.exit()]);
    }

    #[test]
    fn if_else_branches_and_merges() {
        let (tree, function) = build(|b, n| {
            let c = cond(b, n);
            let then = b.int_literal(1);
            let otherwise = b.int_literal(2);
            let stmt = b.if_stmt(c, then, Some(otherwise));
            b.compound(&[stmt])
        });
        let cfg = ControlFlowGraph::build(&tree, function).unwrap();

        let condition = cfg
            .blocks()
            .find(|b| b.kind == BasicBlockKind::Condition)
            .unwrap();
        assert!(matches!(condition.terminator, Terminator::Branch(_)));
        assert_eq!(condition.successors.len(), 2);

        let then_block = cfg.get(condition.successors[0]);
        let else_block = cfg.get(condition.successors[1]);
        assert_eq!(tree.node(then_block.elements[0]).attrs.value, Some(1));
        assert_eq!(tree.node(else_block.elements[0]).attrs.value, Some(2));
        assert_eq!(then_block.successors, else_block.successors);
    }

    #[test]
    fn while_loop_creates_back_edge() {
        let (tree, function) = build(|b, n| {
            let c = cond(b, n);
            let body = b.compound(&[]);
            let stmt = b.while_stmt(c, body);
            b.compound(&[stmt])
        });
        let cfg = ControlFlowGraph::build(&tree, function).unwrap();

        let header = cfg
            .blocks()
            .find(|b| b.kind == BasicBlockKind::LoopHeader)
            .unwrap();
        assert!(header.predecessors.len() >= 2);
        assert!(
            header
                .predecessors
                .iter()
                .any(|&p| cfg.has_back_edge(p, header.id))
        );
    }

    #[test]
    fn for_without_condition_loops_unconditionally() {
        let (tree, function) = build(|b, _| {
            let brk = b.break_stmt();
            let body = b.compound(&[brk]);
            let stmt = b.for_stmt(None, None, None, body);
            b.compound(&[stmt])
        });
        let cfg = ControlFlowGraph::build(&tree, function).unwrap();

        assert!(cfg.blocks().all(|b| b.kind != BasicBlockKind::Condition));
        // break leads to the block after the loop, which reaches exit
        let exit_preds: Vec<_> = cfg.predecessors(cfg.exit()).collect();
        assert_eq!(exit_preds.len(), 1);
        assert!(!exit_preds[0].predecessors.is_empty());
    }

    #[test]
    fn return_jumps_to_exit_and_leaves_dead_block() {
        let (tree, function) = build(|b, n| {
            let value = b.rvalue(n);
            let ret = b.return_stmt(Some(value));
            let dead = b.int_literal(9);
            b.compound(&[ret, dead])
        });
        let cfg = ControlFlowGraph::build(&tree, function).unwrap();

        let entry = cfg.get(cfg.entry());
        assert_eq!(entry.successors, vec![cfg.exit()]);
        let dead = cfg
            .blocks()
            .find(|b| b.elements.iter().any(|&e| tree.node(e).attrs.value == Some(9)))
            .unwrap();
        assert!(dead.predecessors.is_empty());
    }

    #[test]
    fn switch_edges_to_each_case_and_default() {
        let (tree, function) = build(|b, n| {
            let scrutinee = b.rvalue(n);
            let one = b.int_literal(1);
            let first = b.int_literal(10);
            let case = b.case_stmt(one, first);
            let brk = b.break_stmt();
            let second = b.int_literal(20);
            let default = b.default_stmt(second);
            let body = b.compound(&[case, brk, default]);
            let stmt = b.switch_stmt(scrutinee, body);
            b.compound(&[stmt])
        });
        let cfg = ControlFlowGraph::build(&tree, function).unwrap();

        let dispatch = cfg
            .blocks()
            .find(|b| matches!(b.terminator, Terminator::Switch(_)))
            .unwrap();
        // one edge per label; the default replaces the implicit exit edge
        assert_eq!(dispatch.successors.len(), 2);
    }

    #[test]
    fn declaration_without_body_has_no_graph() {
        let mut b = TreeBuilder::new();
        let f = b.function("g", int(), &[], None);
        let tree = b.finish();
        assert!(ControlFlowGraph::build(&tree, f).is_none());
    }
}
