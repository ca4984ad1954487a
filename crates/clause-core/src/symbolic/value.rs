use std::fmt;

use super::region::{BaseRegion, Region, SymbolId};
use crate::syntax::NodeId;

/// A symbolic value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SVal {
    #[default]
    Unknown,
    Int(i64),
    Null,
    /// The address of a region.
    Loc(Region),
    /// A pointer value converted to an integer; keeps its region.
    LocAsInteger(Region),
    /// An unknown non-pointer value.
    Symbol(SymbolId),
    Function(NodeId),
}

impl SVal {
    /// The region a location value points to. Integers, symbols and null
    /// have none.
    pub fn as_region(&self) -> Option<&Region> {
        match self {
            SVal::Loc(region) | SVal::LocAsInteger(region) => Some(region),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SVal::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SVal::Unknown)
    }

    /// Known truth value, when the value alone decides it.
    pub fn truth(&self) -> Option<bool> {
        match self {
            SVal::Int(v) => Some(*v != 0),
            SVal::Null => Some(false),
            SVal::Function(_) => Some(true),
            SVal::Loc(region) | SVal::LocAsInteger(region) => match region.base() {
                BaseRegion::Symbolic(_) if region.path().is_empty() => None,
                _ => Some(true),
            },
            SVal::Unknown | SVal::Symbol(_) => None,
        }
    }
}

impl fmt::Display for SVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SVal::Unknown => write!(f, "Unknown"),
            SVal::Int(v) => write!(f, "{v}"),
            SVal::Null => write!(f, "null"),
            SVal::Loc(region) => write!(f, "&{region}"),
            SVal::LocAsInteger(region) => write!(f, "(int)&{region}"),
            SVal::Symbol(sym) => write!(f, "{sym}"),
            SVal::Function(id) => write!(f, "fn#{}", id.index()),
        }
    }
}
