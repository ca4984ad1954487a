//! Path-sensitive exploration of function bodies
//!
//! The engine walks each function's control flow graph with a depth-first
//! worklist of exploded nodes, each pairing a program point with a
//! [`ProgramState`]. Statements are evaluated into symbolic values; checkers
//! run at the points they subscribe to and may derive new states. At a
//! branch the state forks into one node per feasible successor. A
//! `(point, state)` pair seen before is not explored again, which bounds
//! loops that come back around with an unchanged state. A loop header
//! entered more than `max_block_visits` times on one path is entered once
//! more with a widened state: every region the loop changed is rebound to a
//! symbol, so the exit edge becomes feasible and further trips coalesce.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use super::checker::{CallEvent, Checker, CheckerContext, ProgramPointKind};
use super::region::{BaseRegion, ElementIndex, Region, SymbolManager};
use super::state::ProgramState;
use super::value::SVal;
use crate::cfg::{BasicBlockId, BasicBlockKind, ControlFlowGraph, Terminator};
use crate::diagnostic::{Reporter, RuleTag};
use crate::location;
use crate::rules::RuleError;
use crate::syntax::{
    BinaryOp, CastKind, ChildRole, Node, NodeCategory, NodeId, NodeKind, SyntaxTree, TypeClass,
    TypeInfo, UnaryOp,
};

pub const DEFAULT_MAX_BLOCK_VISITS: u32 = 4;
pub const DEFAULT_MAX_NODES: usize = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// A path entering a loop header more often than this widens its state
    /// there; any other block entered more often ends the path.
    pub max_block_visits: u32,
    /// Upper bound on exploded nodes per function.
    pub max_nodes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_block_visits: DEFAULT_MAX_BLOCK_VISITS,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramPoint {
    pub block: BasicBlockId,
    /// Index into the block's elements; `elements.len()` is the terminator.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplorationStats {
    pub functions: usize,
    pub nodes: usize,
    /// Successors dropped because their `(point, state)` was already seen.
    pub coalesced: usize,
    pub paths_completed: usize,
    pub loop_bound_hits: usize,
    /// Loop headers re-entered with a widened state.
    pub widenings: usize,
    pub infeasible_branches: usize,
    pub checker_failures: usize,
    pub budget_exhausted: usize,
}

impl ExplorationStats {
    pub fn absorb(&mut self, other: ExplorationStats) {
        self.functions += other.functions;
        self.nodes += other.nodes;
        self.coalesced += other.coalesced;
        self.paths_completed += other.paths_completed;
        self.loop_bound_hits += other.loop_bound_hits;
        self.widenings += other.widenings;
        self.infeasible_branches += other.infeasible_branches;
        self.checker_failures += other.checker_failures;
        self.budget_exhausted += other.budget_exhausted;
    }
}

pub struct RegisteredChecker<'r> {
    pub tag: RuleTag<'r>,
    pub points: Vec<ProgramPointKind>,
    pub checker: &'r dyn Checker,
}

pub struct SymbolicEngine<'r> {
    checkers: Vec<RegisteredChecker<'r>>,
    config: EngineConfig,
}

impl<'r> SymbolicEngine<'r> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            checkers: Vec::new(),
            config,
        }
    }

    /// Subscribes `checker` to `points`. Checkers sharing a point run in
    /// registration order, each seeing the state the previous one produced.
    pub fn register(&mut self, tag: RuleTag<'r>, points: &[ProgramPointKind], checker: &'r dyn Checker) {
        self.checkers.push(RegisteredChecker {
            tag,
            points: points.to_vec(),
            checker,
        });
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    /// Explores every function defined outside system headers.
    pub fn run(&self, tree: &SyntaxTree, reporter: &mut Reporter<'_>) -> ExplorationStats {
        let mut stats = ExplorationStats::default();
        if self.checkers.is_empty() {
            return stats;
        }
        let mut symbols = SymbolManager::new();
        for function in tree.functions() {
            if location::is_in_system_header(tree, function.location) {
                tracing::trace!(function = ?function.name(), "skipping function in system header");
                continue;
            }
            stats.absorb(self.run_function(tree, function.id, &mut symbols, reporter));
        }
        stats
    }

    pub fn run_function(
        &self,
        tree: &SyntaxTree,
        function: NodeId,
        symbols: &mut SymbolManager,
        reporter: &mut Reporter<'_>,
    ) -> ExplorationStats {
        let mut stats = ExplorationStats::default();
        let Some(cfg) = ControlFlowGraph::build(tree, function) else {
            return stats;
        };
        stats.functions = 1;

        let mut walker = Walker {
            tree,
            function,
            checkers: &self.checkers,
            symbols,
            reporter,
            failures: 0,
        };
        let entry_state = walker.dispatch(
            ProgramPointKind::BeginFunction,
            ProgramState::new(),
            |checker, ctx| checker.check_begin_function(function, ctx),
        );

        let mut graph = ExplodedGraph::default();
        let mut worklist = Vec::new();
        let entry = ProgramPoint {
            block: cfg.entry(),
            index: 0,
        };
        let path = PathInfo {
            visits: im::HashMap::new().update(cfg.entry(), 1u32),
            loop_entries: im::HashMap::new(),
        };
        if let Some(id) = graph.add(entry, entry_state, path) {
            worklist.push(id);
        }

        while let Some(id) = worklist.pop() {
            if graph.len() >= self.config.max_nodes {
                tracing::warn!(
                    function = ?tree.node(function).name(),
                    nodes = graph.len(),
                    "exploration budget exhausted"
                );
                stats.budget_exhausted += 1;
                break;
            }

            let node = &graph.nodes[id];
            let point = node.point;
            let state = node.state.clone();
            let path = node.path.clone();

            if point.block == cfg.exit() {
                stats.paths_completed += 1;
                continue;
            }

            let block = cfg.get(point.block);
            if let Some(&element) = block.elements.get(point.index) {
                let next = walker.eval_element(element, state);
                let next_point = ProgramPoint {
                    block: point.block,
                    index: point.index + 1,
                };
                match graph.add(next_point, next, path) {
                    Some(next_id) => worklist.push(next_id),
                    None => stats.coalesced += 1,
                }
                continue;
            }

            let (state, condition) = match block.terminator {
                Terminator::Jump => (state, None),
                Terminator::Branch(cond) | Terminator::Switch(cond) => {
                    let (value, state) = walker.eval(cond, state);
                    (state.clear_env(), Some(value))
                }
            };
            let branching = matches!(block.terminator, Terminator::Branch(_)) && block.successors.len() == 2;

            for (i, &succ) in block.successors.iter().enumerate() {
                let next_state = match (&condition, branching) {
                    (Some(value), true) => match state.assume(value, i == 0) {
                        Some(assumed) => assumed,
                        None => {
                            stats.infeasible_branches += 1;
                            continue;
                        }
                    },
                    _ => state.clone(),
                };

                let count = path.visits.get(&succ).copied().unwrap_or(0) + 1;
                let is_header = cfg.get(succ).kind == BasicBlockKind::LoopHeader;
                let (next_state, next_path) = if count <= self.config.max_block_visits {
                    let mut next_path = path.clone();
                    next_path.visits.insert(succ, count);
                    if is_header && count == 1 {
                        next_path.loop_entries.insert(succ, next_state.clone());
                    }
                    (next_state, next_path)
                } else if is_header {
                    stats.loop_bound_hits += 1;
                    stats.widenings += 1;
                    let entry = path.loop_entries.get(&succ).cloned().unwrap_or_default();
                    let widened = walker.widen(succ, &entry, &next_state);
                    (widened, path.after_widening(&cfg, succ, count))
                } else {
                    stats.loop_bound_hits += 1;
                    continue;
                };

                let next_point = ProgramPoint {
                    block: succ,
                    index: 0,
                };
                match graph.add(next_point, next_state, next_path) {
                    Some(next_id) => worklist.push(next_id),
                    None => stats.coalesced += 1,
                }
            }
        }

        stats.nodes = graph.len();
        stats.checker_failures = walker.failures;
        tracing::debug!(
            function = ?tree.node(function).name(),
            nodes = stats.nodes,
            paths = stats.paths_completed,
            coalesced = stats.coalesced,
            "explored function"
        );
        stats
    }
}

struct ExplodedNode {
    point: ProgramPoint,
    state: ProgramState,
    /// Not part of the node's identity.
    path: PathInfo,
}

/// Bookkeeping carried along one path.
#[derive(Clone)]
struct PathInfo {
    visits: im::HashMap<BasicBlockId, u32>,
    /// State on first entry to each loop header.
    loop_entries: im::HashMap<BasicBlockId, ProgramState>,
}

impl PathInfo {
    /// Counts restart for every block except loop headers, so the widened
    /// trip can walk the body and reach the exit edge.
    fn after_widening(&self, cfg: &ControlFlowGraph, header: BasicBlockId, count: u32) -> Self {
        let visits = self
            .visits
            .iter()
            .filter(|(block, _)| cfg.get(**block).kind == BasicBlockKind::LoopHeader)
            .map(|(block, visits)| (*block, *visits))
            .collect::<im::HashMap<_, _>>()
            .update(header, count);
        Self {
            visits,
            loop_entries: self.loop_entries.clone(),
        }
    }
}

#[derive(Default)]
struct ExplodedGraph {
    nodes: Vec<ExplodedNode>,
    seen: HashSet<(ProgramPoint, ProgramState)>,
}

impl ExplodedGraph {
    fn add(
        &mut self,
        point: ProgramPoint,
        state: ProgramState,
        path: PathInfo,
    ) -> Option<usize> {
        if !self.seen.insert((point, state.clone())) {
            return None;
        }
        self.nodes.push(ExplodedNode {
            point,
            state,
            path,
        });
        Some(self.nodes.len() - 1)
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Evaluates statements of one function and dispatches checker callbacks.
struct Walker<'x, 'p> {
    tree: &'x SyntaxTree,
    function: NodeId,
    checkers: &'x [RegisteredChecker<'x>],
    symbols: &'x mut SymbolManager,
    reporter: &'x mut Reporter<'p>,
    failures: usize,
}

impl Walker<'_, '_> {
    fn dispatch(
        &mut self,
        kind: ProgramPointKind,
        state: ProgramState,
        invoke: impl Fn(&dyn Checker, &mut CheckerContext<'_>) -> Result<(), RuleError>,
    ) -> ProgramState {
        let mut state = state;
        let checkers = self.checkers;
        for registered in checkers.iter().filter(|c| c.points.contains(&kind)) {
            let mut ctx = CheckerContext::new(self.tree, self.function, state.clone(), self.symbols);
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| invoke(registered.checker, &mut ctx)));
            let (transition, reports) = ctx.finish();

            match outcome {
                Ok(Ok(())) => {
                    if let Some(next) = transition {
                        state = next;
                    }
                    for (node, message) in reports {
                        self.reporter.report(registered.tag, node, message);
                    }
                }
                Ok(Err(err)) => {
                    self.failures += 1;
                    tracing::warn!(rule = registered.tag.id, error = %err, "checker failed, keeping previous state");
                }
                Err(_) => {
                    self.failures += 1;
                    tracing::warn!(rule = registered.tag.id, "checker panicked, keeping previous state");
                }
            }
        }
        state
    }

    /// Rebinds what changed since the loop was entered to symbols keyed by
    /// the header and region, so repeated widening yields the same state.
    fn widen(&mut self, header: BasicBlockId, entry: &ProgramState, state: &ProgramState) -> ProgramState {
        let function = self.function;
        let symbols = &mut *self.symbols;
        state.widen(entry, |region, value| {
            let symbol = symbols.widened(function, header.index(), region);
            match value {
                SVal::Loc(_) | SVal::Null => SVal::Loc(Region::symbolic(symbol)),
                SVal::LocAsInteger(_) => SVal::LocAsInteger(Region::symbolic(symbol)),
                _ => SVal::Symbol(symbol),
            }
        })
    }

    fn eval_element(&mut self, element: NodeId, state: ProgramState) -> ProgramState {
        let tree = self.tree;
        let node = tree.node(element);
        let state = match node.kind {
            NodeKind::DeclStmt => {
                let mut state = state;
                for decl in node.children_with(ChildRole::Declaration) {
                    state = self.eval_var_decl(decl, state);
                }
                state
            }
            NodeKind::ReturnStmt => self.eval_child(node, ChildRole::ReturnValue, state).1,
            _ => self.eval(element, state).1,
        };
        state.clear_env()
    }

    fn eval_var_decl(&mut self, decl: NodeId, state: ProgramState) -> ProgramState {
        let node = self.tree.node(decl);
        if node.kind != NodeKind::VarDecl {
            return state;
        }
        let region = Region::var(decl);
        match node.child(ChildRole::Initializer) {
            Some(init) => {
                let (value, state) = self.eval(init, state);
                state.bind(region, value)
            }
            // Re-entering a declaration forgets the previous iteration's value.
            None => state.unbind(&region),
        }
    }

    fn eval_child(&mut self, node: &Node, role: ChildRole, state: ProgramState) -> (SVal, ProgramState) {
        match node.child(role) {
            Some(child) => self.eval(child, state),
            None => (SVal::Unknown, state),
        }
    }

    /// Evaluates `expr`, recording its value in the state's environment.
    fn eval(&mut self, expr: NodeId, state: ProgramState) -> (SVal, ProgramState) {
        let tree = self.tree;
        let node = tree.node(expr);
        let (value, state) = match node.kind {
            NodeKind::IntegerLiteral | NodeKind::CharacterLiteral | NodeKind::BoolLiteral => {
                (SVal::Int(node.attrs.value.unwrap_or(0)), state)
            }
            NodeKind::NullPtrLiteral => (SVal::Null, state),
            NodeKind::StringLiteral => (
                SVal::Loc(Region::new(BaseRegion::StringLiteral(expr))),
                state,
            ),
            NodeKind::DeclRefExpr => (self.eval_decl_ref(node), state),
            NodeKind::ParenExpr | NodeKind::ExprWithCleanups => {
                self.eval_child(node, ChildRole::SubExpr, state)
            }
            NodeKind::ImplicitCastExpr | NodeKind::CStyleCastExpr => {
                return self.eval_cast(expr, state);
            }
            NodeKind::UnaryOperator => self.eval_unary(node, state),
            NodeKind::BinaryOperator => return self.eval_binary(expr, state),
            NodeKind::CallExpr => self.eval_call(expr, state),
            NodeKind::ArraySubscriptExpr => self.eval_subscript(node, state),
            NodeKind::MemberExpr => self.eval_member(node, state),
            NodeKind::ConditionalOperator => self.eval_conditional(node, state),
            _ => {
                let mut state = state;
                for child in node.child_ids() {
                    if tree.kind(child).category() == NodeCategory::Expression {
                        state = self.eval(child, state).1;
                    }
                }
                (SVal::Unknown, state)
            }
        };
        let state = state.bind_expr(expr, value.clone());
        (value, state)
    }

    fn eval_decl_ref(&self, node: &Node) -> SVal {
        let Some(decl) = node.attrs.referenced else {
            return SVal::Unknown;
        };
        match self.tree.kind(decl) {
            NodeKind::VarDecl | NodeKind::ParmVarDecl => SVal::Loc(Region::var(decl)),
            NodeKind::FunctionDecl | NodeKind::MethodDecl => SVal::Function(decl),
            _ => SVal::Unknown,
        }
    }

    /// Reads through a location. A region never written on this path holds
    /// its region-value symbol.
    fn load(&mut self, location: &SVal, ty: Option<&TypeInfo>, state: &ProgramState) -> SVal {
        let SVal::Loc(region) = location else {
            return location.clone();
        };
        if let Some(value) = state.binding(region) {
            return value.clone();
        }
        if ty.is_some_and(|t| t.class == TypeClass::Array) {
            return location.clone();
        }
        let symbol = self.symbols.region_value(region);
        if ty.is_some_and(|t| t.is_pointer()) {
            SVal::Loc(Region::symbolic(symbol))
        } else {
            SVal::Symbol(symbol)
        }
    }

    fn eval_cast(&mut self, expr: NodeId, state: ProgramState) -> (SVal, ProgramState) {
        let tree = self.tree;
        let node = tree.node(expr);
        let (operand, state) = self.eval_child(node, ChildRole::SubExpr, state);

        let value = match node.attrs.cast_kind.unwrap_or(CastKind::NoOp) {
            CastKind::LValueToRValue => self.load(&operand, node.ty(), &state),
            CastKind::ArrayToPointerDecay => match operand {
                SVal::Loc(region) => SVal::Loc(region.element(ElementIndex::Const(0))),
                other => other,
            },
            CastKind::PointerToIntegral => match operand {
                SVal::Loc(region) => SVal::LocAsInteger(region),
                SVal::Null => SVal::Int(0),
                other => other,
            },
            CastKind::IntegralToPointer => match operand {
                SVal::LocAsInteger(region) => SVal::Loc(region),
                SVal::Int(0) => SVal::Null,
                SVal::Symbol(symbol) => SVal::Loc(Region::symbolic(symbol)),
                other => other,
            },
            CastKind::NullToPointer => SVal::Null,
            CastKind::IntegralToBoolean | CastKind::PointerToBoolean => match operand.truth() {
                Some(truth) => SVal::Int(truth as i64),
                None => operand,
            },
            CastKind::ToVoid => SVal::Unknown,
            _ => operand,
        };

        let state = state.bind_expr(expr, value.clone());
        let state = self.dispatch(ProgramPointKind::PostCast, state, |checker, ctx| {
            checker.check_post_cast(expr, ctx)
        });
        (value, state)
    }

    fn eval_unary(&mut self, node: &Node, state: ProgramState) -> (SVal, ProgramState) {
        let (operand, state) = self.eval_child(node, ChildRole::Operand, state);
        let Some(op) = node.unary_op() else {
            return (SVal::Unknown, state);
        };

        match op {
            UnaryOp::AddrOf => (operand, state),
            UnaryOp::Deref => match operand {
                SVal::Loc(region) | SVal::LocAsInteger(region) => (SVal::Loc(region), state),
                _ => (SVal::Unknown, state),
            },
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                let SVal::Loc(region) = operand else {
                    return (SVal::Unknown, state);
                };
                let ty = node.child(ChildRole::Operand).and_then(|o| self.tree.node(o).ty());
                let old = self.load(&SVal::Loc(region.clone()), ty, &state);
                let delta = if matches!(op, UnaryOp::PreInc | UnaryOp::PostInc) { 1 } else { -1 };
                let new = offset(&old, delta);
                let state = state.bind(region, new.clone());
                let result = if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) { new } else { old };
                (result, state)
            }
            UnaryOp::Plus => (operand, state),
            UnaryOp::Minus => (
                operand.as_int().and_then(i64::checked_neg).map_or(SVal::Unknown, SVal::Int),
                state,
            ),
            UnaryOp::Not => (operand.as_int().map_or(SVal::Unknown, |v| SVal::Int(!v)), state),
            UnaryOp::LNot => (
                operand.truth().map_or(SVal::Unknown, |t| SVal::Int((!t) as i64)),
                state,
            ),
        }
    }

    fn eval_binary(&mut self, expr: NodeId, state: ProgramState) -> (SVal, ProgramState) {
        let tree = self.tree;
        let node = tree.node(expr);
        let (Some(op), Some(lhs_id), Some(rhs_id)) = (
            node.binary_op(),
            node.child(ChildRole::Lhs),
            node.child(ChildRole::Rhs),
        ) else {
            let state = state.bind_expr(expr, SVal::Unknown);
            return (SVal::Unknown, state);
        };

        let notify = |walker: &mut Self, state: ProgramState| {
            walker.dispatch(ProgramPointKind::PreBinary, state, |checker, ctx| {
                checker.check_pre_binary(expr, ctx)
            })
        };

        if op.is_assignment() {
            let (rhs, state) = self.eval(rhs_id, state);
            let (lhs, state) = self.eval(lhs_id, state);
            let state = notify(self, state);

            let value = match op.compound_base() {
                None => rhs,
                Some(base) => {
                    let old = self.load(&lhs, tree.node(lhs_id).ty(), &state);
                    arith(base, &old, &rhs)
                }
            };
            let state = match lhs {
                SVal::Loc(region) => state.bind(region, value.clone()),
                _ => state,
            };
            let state = state.bind_expr(expr, value.clone());
            return (value, state);
        }

        let (lhs, state) = self.eval(lhs_id, state);
        let (rhs, state) = self.eval(rhs_id, state);
        let state = notify(self, state);
        let value = arith(op, &lhs, &rhs);
        let state = state.bind_expr(expr, value.clone());
        (value, state)
    }

    fn eval_call(&mut self, expr: NodeId, state: ProgramState) -> (SVal, ProgramState) {
        let tree = self.tree;
        let node = tree.node(expr);
        let (callee_value, mut state) = self.eval_child(node, ChildRole::Callee, state);

        let mut args = Vec::new();
        for arg in node.children_with(ChildRole::Argument) {
            let (value, next) = self.eval(arg, state);
            state = next;
            args.push((arg, value));
        }

        let callee = node.attrs.referenced.or(match callee_value {
            SVal::Function(decl) => Some(decl),
            _ => None,
        });
        let callee_name = callee
            .and_then(|decl| tree.node(decl).name())
            .or(node.name())
            .map(str::to_string);
        let event = CallEvent {
            expr,
            callee,
            callee_name,
            args,
        };
        let state = self.dispatch(ProgramPointKind::PreCall, state, |checker, ctx| {
            checker.check_pre_call(&event, ctx)
        });

        let value = match node.ty() {
            Some(ty) if ty.class == TypeClass::Void => SVal::Unknown,
            Some(ty) if ty.is_pointer() => SVal::Loc(Region::symbolic(self.symbols.conjured(expr))),
            _ => SVal::Symbol(self.symbols.conjured(expr)),
        };
        (value, state)
    }

    fn eval_subscript(&mut self, node: &Node, state: ProgramState) -> (SVal, ProgramState) {
        let (base, state) = self.eval_child(node, ChildRole::Base, state);
        let (index, state) = self.eval_child(node, ChildRole::Index, state);
        let index = match index {
            SVal::Int(i) => ElementIndex::Const(i),
            SVal::Symbol(symbol) => ElementIndex::Symbol(symbol),
            _ => ElementIndex::Opaque(node.child(ChildRole::Index).unwrap_or(node.id)),
        };
        let value = match base {
            SVal::Loc(region) => SVal::Loc(region.element(index)),
            _ => SVal::Unknown,
        };
        (value, state)
    }

    fn eval_member(&mut self, node: &Node, state: ProgramState) -> (SVal, ProgramState) {
        let (base, state) = self.eval_child(node, ChildRole::Base, state);
        let value = match (base, node.attrs.referenced) {
            (SVal::Loc(region), Some(field)) => SVal::Loc(region.field(field)),
            _ => SVal::Unknown,
        };
        (value, state)
    }

    /// Only the arm the path allows is evaluated when the condition is
    /// concrete or already assumed. Otherwise both arms run in sequence on
    /// the current path; the engine does not fork inside expressions.
    fn eval_conditional(&mut self, node: &Node, state: ProgramState) -> (SVal, ProgramState) {
        let (cond, state) = self.eval_child(node, ChildRole::Condition, state);
        match (state.assume(&cond, true), state.assume(&cond, false)) {
            (Some(taken), None) => self.eval_child(node, ChildRole::TrueExpr, taken),
            (None, Some(taken)) => self.eval_child(node, ChildRole::FalseExpr, taken),
            _ => {
                let (yes, state) = self.eval_child(node, ChildRole::TrueExpr, state);
                let (no, state) = self.eval_child(node, ChildRole::FalseExpr, state);
                let value = if yes == no { yes } else { SVal::Unknown };
                (value, state)
            }
        }
    }
}

fn offset(value: &SVal, delta: i64) -> SVal {
    match value {
        SVal::Int(v) => v.checked_add(delta).map_or(SVal::Unknown, SVal::Int),
        SVal::Loc(region) => SVal::Loc(region.element(ElementIndex::Const(delta))),
        _ => SVal::Unknown,
    }
}

fn arith(op: BinaryOp, lhs: &SVal, rhs: &SVal) -> SVal {
    use BinaryOp::*;

    match (op, lhs, rhs) {
        (LogicalAnd, a, b) => match (a.truth(), b.truth()) {
            (Some(false), _) | (_, Some(false)) => SVal::Int(0),
            (Some(true), Some(true)) => SVal::Int(1),
            _ => SVal::Unknown,
        },
        (LogicalOr, a, b) => match (a.truth(), b.truth()) {
            (Some(true), _) | (_, Some(true)) => SVal::Int(1),
            (Some(false), Some(false)) => SVal::Int(0),
            _ => SVal::Unknown,
        },
        (Comma, _, b) => b.clone(),
        (_, SVal::Int(a), SVal::Int(b)) => int_op(op, *a, *b).map_or(SVal::Unknown, SVal::Int),
        (Add, SVal::Loc(region), SVal::Int(n)) | (Add, SVal::Int(n), SVal::Loc(region)) => {
            SVal::Loc(region.element(ElementIndex::Const(*n)))
        }
        (Sub, SVal::Loc(region), SVal::Int(n)) => {
            SVal::Loc(region.element(ElementIndex::Const(n.wrapping_neg())))
        }
        (Eq | Ne, a, b) => match same_location(a, b) {
            Some(equal) => SVal::Int((equal == (op == Eq)) as i64),
            None => SVal::Unknown,
        },
        _ => SVal::Unknown,
    }
}

fn same_location(a: &SVal, b: &SVal) -> Option<bool> {
    match (a, b) {
        (SVal::Null, SVal::Null) => Some(true),
        (SVal::Loc(x), SVal::Loc(y)) if x == y => Some(true),
        (SVal::Null, other) | (other, SVal::Null) if other.truth() == Some(true) => Some(false),
        _ => None,
    }
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    use BinaryOp::*;

    Some(match op {
        Mul => a.checked_mul(b)?,
        Div => a.checked_div(b)?,
        Rem => a.checked_rem(b)?,
        Add => a.checked_add(b)?,
        Sub => a.checked_sub(b)?,
        Shl => a.checked_shl(u32::try_from(b).ok()?)?,
        Shr => a.checked_shr(u32::try_from(b).ok()?)?,
        Lt => (a < b) as i64,
        Gt => (a > b) as i64,
        Le => (a <= b) as i64,
        Ge => (a >= b) as i64,
        Eq => (a == b) as i64,
        Ne => (a != b) as i64,
        BitAnd => a & b,
        BitXor => a ^ b,
        BitOr => a | b,
        LogicalAnd => (a != 0 && b != 0) as i64,
        LogicalOr => (a != 0 || b != 0) as i64,
        Comma => b,
        _ => return None,
    })
}
