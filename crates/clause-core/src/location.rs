//! Resolving syntax nodes to reportable file/line pairs.
//!
//! Locations that are invalid, point into an unknown file, or sit inside a
//! system header are never reported. Every consumer goes through
//! [`resolve`] so the policy lives in one place.

use crate::syntax::{NodeId, SourceLocation, SyntaxTree};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// Normalizes `.` and `..` components. Returns `None` when `..` climbs past
/// the root of the path.
pub fn clean_path(path: &str) -> Option<String> {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    Some(if absolute { format!("/{joined}") } else { joined })
}

/// True for invalid locations and for locations in files the front end
/// flagged as system headers.
pub fn is_in_system_header(tree: &SyntaxTree, location: SourceLocation) -> bool {
    if !location.is_valid() {
        return true;
    }
    match location.file.and_then(|f| tree.file(f)) {
        Some(file) => file.is_system,
        None => true,
    }
}

pub fn resolve_location(tree: &SyntaxTree, location: SourceLocation) -> Option<ResolvedLocation> {
    if is_in_system_header(tree, location) {
        return None;
    }
    let file = tree.file(location.file?)?;
    let path = clean_path(&file.path)?;
    if path.is_empty() {
        return None;
    }
    Some(ResolvedLocation {
        file: path,
        line: location.line,
        column: location.column,
    })
}

/// Resolves `node` for reporting; `None` means the node must be skipped.
pub fn resolve(tree: &SyntaxTree, node: NodeId) -> Option<ResolvedLocation> {
    let resolved = resolve_location(tree, tree.node(node).location);
    if resolved.is_none() {
        tracing::trace!(?node, "skipping node without reportable location");
    }
    resolved
}

pub fn is_reportable(tree: &SyntaxTree, node: NodeId) -> bool {
    resolve_location(tree, tree.node(node).location).is_some()
}
