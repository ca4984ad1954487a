//! The interface between path-sensitive rules and the engine.

use super::region::{Region, SymbolId, SymbolManager, SymbolOrigin};
use super::state::ProgramState;
use super::value::SVal;
use crate::rules::RuleError;
use crate::syntax::{NodeId, SyntaxTree};

/// Where during exploration a checker asks to be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramPointKind {
    /// Once per analyzed function, on the empty entry state.
    BeginFunction,
    /// After a call's arguments are evaluated, before the call.
    PreCall,
    /// After a cast's value is computed.
    PostCast,
    /// After both operands of a binary operator are evaluated.
    PreBinary,
}

#[derive(Debug, Clone)]
pub struct CallEvent {
    pub expr: NodeId,
    pub callee: Option<NodeId>,
    pub callee_name: Option<String>,
    /// Argument expressions paired with their values.
    pub args: Vec<(NodeId, SVal)>,
}

impl CallEvent {
    pub fn arg(&self, index: usize) -> Option<&(NodeId, SVal)> {
        self.args.get(index)
    }
}

pub trait Checker: Send + Sync {
    fn check_begin_function(
        &self,
        _function: NodeId,
        _ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RuleError> {
        Ok(())
    }

    fn check_pre_call(&self, _call: &CallEvent, _ctx: &mut CheckerContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn check_post_cast(&self, _cast: NodeId, _ctx: &mut CheckerContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn check_pre_binary(
        &self,
        _operator: NodeId,
        _ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RuleError> {
        Ok(())
    }
}

/// What a checker sees at a program point.
///
/// The state handed in is never modified. A checker that learns something
/// calls [`CheckerContext::add_transition`] with a derived state, which the
/// engine continues the path with.
pub struct CheckerContext<'c> {
    tree: &'c SyntaxTree,
    function: NodeId,
    state: ProgramState,
    transition: Option<ProgramState>,
    symbols: &'c mut SymbolManager,
    reports: Vec<(NodeId, String)>,
}

impl<'c> CheckerContext<'c> {
    pub(crate) fn new(
        tree: &'c SyntaxTree,
        function: NodeId,
        state: ProgramState,
        symbols: &'c mut SymbolManager,
    ) -> Self {
        Self {
            tree,
            function,
            state,
            transition: None,
            symbols,
            reports: Vec::new(),
        }
    }

    pub fn tree(&self) -> &'c SyntaxTree {
        self.tree
    }

    /// The function being explored.
    pub fn function(&self) -> NodeId {
        self.function
    }

    /// The latest state: the last transition added, or the incoming state.
    pub fn state(&self) -> &ProgramState {
        self.transition.as_ref().unwrap_or(&self.state)
    }

    pub fn sval(&self, expr: NodeId) -> SVal {
        self.state().expr_value(expr).cloned().unwrap_or_default()
    }

    /// The region an expression's value denotes; `None` for constants and
    /// values the engine could not resolve.
    pub fn region_of(&self, expr: NodeId) -> Option<Region> {
        self.sval(expr).as_region().cloned()
    }

    pub fn add_transition(&mut self, state: ProgramState) {
        self.transition = Some(state);
    }

    /// Requests a diagnostic at `node`. Exploration continues on this path.
    pub fn report(&mut self, node: NodeId, message: impl Into<String>) {
        self.reports.push((node, message.into()));
    }

    pub fn symbol_origin(&self, symbol: SymbolId) -> Option<&SymbolOrigin> {
        self.symbols.origin(symbol)
    }

    pub fn symbol_origin_region(&self, symbol: SymbolId) -> Option<&Region> {
        self.symbols.origin_region(symbol)
    }

    pub fn region_value_symbol(&mut self, region: &Region) -> SymbolId {
        self.symbols.region_value(region)
    }

    pub(crate) fn finish(self) -> (Option<ProgramState>, Vec<(NodeId, String)>) {
        (self.transition, self.reports)
    }
}
