//! Path-sensitive symbolic execution
//!
//! [`engine::SymbolicEngine`] explores each function's control flow graph,
//! forking a persistent [`state::ProgramState`] at every branch and calling
//! [`checker::Checker`] implementations at the program points they subscribe
//! to.

pub mod checker;
pub mod engine;
pub mod region;
pub mod state;
pub mod value;

pub use checker::{CallEvent, Checker, CheckerContext, ProgramPointKind};
pub use engine::{EngineConfig, ExplorationStats, ProgramPoint, SymbolicEngine};
pub use region::{BaseRegion, ElementIndex, Region, SubRegion, SymbolId, SymbolManager, SymbolOrigin};
pub use state::{Fact, FactMap, ProgramState};
pub use value::SVal;
