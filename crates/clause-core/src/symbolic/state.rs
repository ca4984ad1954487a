//! Persistent per-path program state
//!
//! Every update returns a new [`ProgramState`]; the receiver is never
//! modified. The maps are `im` persistent maps, so a derived state shares all
//! untouched entries with its predecessor and cloning is constant time.
//! Forked paths therefore never observe each other's writes.

use im::OrdMap;

use super::region::{Region, SymbolId};
use super::value::SVal;
use crate::syntax::NodeId;

/// A flow-sensitive fact a checker keeps about a region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fact {
    Marker,
    Type(String),
    Int(i64),
}

impl Fact {
    pub fn as_type(&self) -> Option<&str> {
        match self {
            Fact::Type(name) => Some(name),
            _ => None,
        }
    }
}

/// A checker-owned partition of the fact store.
///
/// Facts written under one namespace are invisible to every other, so
/// unrelated checkers cannot collide on a region key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactMap(&'static str);

impl FactMap {
    pub const fn new(namespace: &'static str) -> Self {
        Self(namespace)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }

    pub fn get<'s>(&self, state: &'s ProgramState, region: &Region) -> Option<&'s Fact> {
        state.facts.get(self)?.get(region)
    }

    pub fn contains(&self, state: &ProgramState, region: &Region) -> bool {
        self.get(state, region).is_some()
    }

    #[must_use]
    pub fn set(&self, state: &ProgramState, region: Region, fact: Fact) -> ProgramState {
        let mut next = state.clone();
        let mut map = next.facts.get(self).cloned().unwrap_or_default();
        map.insert(region, fact);
        next.facts.insert(*self, map);
        next
    }

    #[must_use]
    pub fn remove(&self, state: &ProgramState, region: &Region) -> ProgramState {
        let mut next = state.clone();
        if let Some(map) = next.facts.get(self) {
            let map = map.without(region);
            if map.is_empty() {
                next.facts.remove(self);
            } else {
                next.facts.insert(*self, map);
            }
        }
        next
    }

    pub fn entries<'s>(&self, state: &'s ProgramState) -> impl Iterator<Item = (&'s Region, &'s Fact)> {
        state.facts.get(self).into_iter().flat_map(|map| map.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProgramState {
    store: OrdMap<Region, SVal>,
    env: OrdMap<NodeId, SVal>,
    constraints: OrdMap<SymbolId, bool>,
    facts: OrdMap<FactMap, OrdMap<Region, Fact>>,
}

impl ProgramState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binding(&self, region: &Region) -> Option<&SVal> {
        self.store.get(region)
    }

    #[must_use]
    pub fn bind(&self, region: Region, value: SVal) -> Self {
        let mut next = self.clone();
        next.store.insert(region, value);
        next
    }

    #[must_use]
    pub fn unbind(&self, region: &Region) -> Self {
        let mut next = self.clone();
        next.store.remove(region);
        next
    }

    /// Rebinds every region whose value differs from its value in `entry`
    /// to whatever `fresh` returns for it.
    #[must_use]
    pub fn widen(&self, entry: &ProgramState, mut fresh: impl FnMut(&Region, &SVal) -> SVal) -> Self {
        let mut next = self.clone();
        for (region, value) in &self.store {
            if entry.store.get(region) != Some(value) {
                next.store.insert(region.clone(), fresh(region, value));
            }
        }
        next
    }

    /// Value of an expression evaluated earlier in the current statement.
    pub fn expr_value(&self, expr: NodeId) -> Option<&SVal> {
        self.env.get(&expr)
    }

    #[must_use]
    pub fn bind_expr(&self, expr: NodeId, value: SVal) -> Self {
        let mut next = self.clone();
        next.env.insert(expr, value);
        next
    }

    /// Drops expression values once a statement is complete so states that
    /// differ only in dead temporaries compare equal.
    #[must_use]
    pub fn clear_env(&self) -> Self {
        if self.env.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        next.env = OrdMap::new();
        next
    }

    pub fn constraint(&self, symbol: SymbolId) -> Option<bool> {
        self.constraints.get(&symbol).copied()
    }

    /// Records that `value` is `truth` on this path. Returns `None` when
    /// that contradicts what the path already knows.
    pub fn assume(&self, value: &SVal, truth: bool) -> Option<Self> {
        if let Some(known) = value.truth() {
            return (known == truth).then(|| self.clone());
        }
        match value {
            SVal::Symbol(symbol) => match self.constraint(*symbol) {
                Some(known) if known != truth => None,
                Some(_) => Some(self.clone()),
                None => {
                    let mut next = self.clone();
                    next.constraints.insert(*symbol, truth);
                    Some(next)
                }
            },
            _ => Some(self.clone()),
        }
    }

    pub fn store_len(&self) -> usize {
        self.store.len()
    }
}
