//! Abstract memory regions and symbols.
//!
//! A [`Region`] is a small value: a base storage entity plus a path of
//! element/field steps. Two expressions denoting the same storage produce
//! equal regions, so regions can key persistent maps directly.

use std::collections::HashMap;
use std::fmt;

use crate::syntax::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$sym{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseRegion {
    /// A variable or parameter declaration.
    Var(NodeId),
    /// Memory reached through an unknown pointer value.
    Symbolic(SymbolId),
    StringLiteral(NodeId),
    /// Storage of an expression's temporary result.
    Temporary(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementIndex {
    Const(i64),
    Symbol(SymbolId),
    /// An index the engine could not evaluate, named by its expression.
    Opaque(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubRegion {
    Element(ElementIndex),
    Field(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region {
    base: BaseRegion,
    path: Vec<SubRegion>,
}

impl Region {
    pub fn new(base: BaseRegion) -> Self {
        Self {
            base,
            path: Vec::new(),
        }
    }

    pub fn var(decl: NodeId) -> Self {
        Self::new(BaseRegion::Var(decl))
    }

    pub fn symbolic(symbol: SymbolId) -> Self {
        Self::new(BaseRegion::Symbolic(symbol))
    }

    pub fn base(&self) -> BaseRegion {
        self.base
    }

    pub fn path(&self) -> &[SubRegion] {
        &self.path
    }

    /// The outermost region this one is part of.
    pub fn base_region(&self) -> Region {
        Region::new(self.base)
    }

    pub fn parent(&self) -> Option<Region> {
        let (_, rest) = self.path.split_last()?;
        Some(Region {
            base: self.base,
            path: rest.to_vec(),
        })
    }

    /// This region followed by its enclosing regions up to the base.
    pub fn ancestors_and_self(&self) -> impl Iterator<Item = Region> + '_ {
        (0..=self.path.len()).rev().map(move |len| Region {
            base: self.base,
            path: self.path[..len].to_vec(),
        })
    }

    pub fn field(&self, decl: NodeId) -> Region {
        let mut path = self.path.clone();
        path.push(SubRegion::Field(decl));
        Region {
            base: self.base,
            path,
        }
    }

    /// Indexes into this region. Indexing an element region moves within the
    /// same array, so `a[0]` indexed by 2 is `a[2]`, not `a[0][2]`.
    pub fn element(&self, index: ElementIndex) -> Region {
        let mut path = self.path.clone();
        let merged = match (path.last(), index) {
            (Some(SubRegion::Element(ElementIndex::Const(k))), ElementIndex::Const(c)) => {
                Some(ElementIndex::Const(k.wrapping_add(c)))
            }
            (Some(SubRegion::Element(ElementIndex::Const(0))), other) => Some(other),
            _ => None,
        };
        if merged.is_some() {
            path.pop();
        }
        path.push(SubRegion::Element(merged.unwrap_or(index)));
        Region {
            base: self.base,
            path,
        }
    }

    pub fn is_within(&self, other: &Region) -> bool {
        self.base == other.base && self.path.starts_with(&other.path)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            BaseRegion::Var(id) => write!(f, "var#{}", id.index())?,
            BaseRegion::Symbolic(sym) => write!(f, "SymRegion{{{sym}}}")?,
            BaseRegion::StringLiteral(id) => write!(f, "str#{}", id.index())?,
            BaseRegion::Temporary(id) => write!(f, "temp#{}", id.index())?,
        }
        for step in &self.path {
            match step {
                SubRegion::Element(ElementIndex::Const(i)) => write!(f, "[{i}]")?,
                SubRegion::Element(ElementIndex::Symbol(s)) => write!(f, "[{s}]")?,
                SubRegion::Element(ElementIndex::Opaque(id)) => write!(f, "[expr#{}]", id.index())?,
                SubRegion::Field(id) => write!(f, ".field#{}", id.index())?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolOrigin {
    /// The unknown initial contents of a region.
    RegionValue(Region),
    /// The unknown result of a call expression.
    Conjured(NodeId),
    /// Whatever a loop left in `region` after an unknown number of trips.
    /// `header` is the loop header's block index within `function`.
    Widened {
        function: NodeId,
        header: usize,
        region: Region,
    },
}

/// Interns symbols for one translation unit.
///
/// The same origin always yields the same symbol, so sibling paths that load
/// the same unknown value agree on it.
#[derive(Debug, Default)]
pub struct SymbolManager {
    origins: Vec<SymbolOrigin>,
    interned: HashMap<SymbolOrigin, SymbolId>,
}

impl SymbolManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, origin: SymbolOrigin) -> SymbolId {
        if let Some(&id) = self.interned.get(&origin) {
            return id;
        }
        let id = SymbolId(self.origins.len() as u32);
        self.origins.push(origin.clone());
        self.interned.insert(origin, id);
        id
    }

    pub fn region_value(&mut self, region: &Region) -> SymbolId {
        self.intern(SymbolOrigin::RegionValue(region.clone()))
    }

    pub fn conjured(&mut self, call: NodeId) -> SymbolId {
        self.intern(SymbolOrigin::Conjured(call))
    }

    pub fn widened(&mut self, function: NodeId, header: usize, region: &Region) -> SymbolId {
        self.intern(SymbolOrigin::Widened {
            function,
            header,
            region: region.clone(),
        })
    }

    pub fn origin(&self, symbol: SymbolId) -> Option<&SymbolOrigin> {
        self.origins.get(symbol.index())
    }

    /// The region whose initial contents `symbol` stands for, if any.
    pub fn origin_region(&self, symbol: SymbolId) -> Option<&Region> {
        match self.origin(symbol)? {
            SymbolOrigin::RegionValue(region) => Some(region),
            SymbolOrigin::Conjured(_) | SymbolOrigin::Widened { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}
