//! Clause core: conformance checking of C and C++ translation units
//!
//! A translation unit arrives as a [`syntax::SyntaxTree`] converted from a
//! front-end dump. Structural rules match tree patterns through
//! [`matcher::MatchFinder`]; symbolic rules run inside
//! [`symbolic::SymbolicEngine`], which explores each function path by path.
//! Both report through a deduplicating [`diagnostic::Reporter`].

pub mod analysis;
pub mod cfg;
pub mod config;
pub mod diagnostic;
pub mod location;
pub mod matcher;
pub mod rules;
pub mod symbolic;
pub mod syntax;

pub use analysis::{AnalysisEngine, RunSummary, run_rules};
pub use diagnostic::{Diagnostic, ResultsCollection, Severity};
