//! Serialized translation units.
//!
//! A front end that runs out of process writes the tree as JSON. Nodes nest
//! through `children`; cross references (a `DeclRefExpr` to its declaration,
//! a `MemberExpr` to its field) go through string labels. Nesting depth is
//! unbounded: parsing grows the stack on demand and lowering keeps its own.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    BinaryOp, CastKind, ChildRole, FileId, NodeAttrs, NodeId, NodeKind, Operator, SourceFile,
    SourceLocation, SyntaxTree, TreeBuilder, TypeInfo, UnaryOp,
};

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Failed to parse translation unit: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read translation unit: {0}")]
    Io(#[from] std::io::Error),

    #[error("Node refers to unknown label '{0}'")]
    UnresolvedReference(String),

    #[error("Label '{0}' is defined more than once")]
    DuplicateLabel(String),

    #[error("Location refers to unknown file index {0}")]
    UnknownFile(u32),

    #[error("Child node of kind {0:?} has no role")]
    MissingRole(NodeKind),

    #[error("Root node must be a translation unit, found {0:?}")]
    BadRoot(NodeKind),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationUnitDump {
    #[serde(default)]
    pub files: Vec<SourceFile>,
    pub root: NodeSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSpec {
    pub file: u32,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: NodeKind,
    /// Position under the parent; required on every node but the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ChildRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<LocationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_op: Option<BinaryOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unary_op: Option<UnaryOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast_kind: Option<CastKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refers_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl TranslationUnitDump {
    pub fn from_json(text: &str) -> Result<Self, DumpError> {
        let mut json = serde_json::Deserializer::from_str(text);
        json.disable_recursion_limit();
        let dump = Self::deserialize(serde_stacker::Deserializer::new(&mut json))?;
        json.end()?;
        Ok(dump)
    }

    pub fn into_tree(self) -> Result<SyntaxTree, DumpError> {
        if self.root.kind != NodeKind::TranslationUnit {
            return Err(DumpError::BadRoot(self.root.kind));
        }

        let mut lowering = Lowering {
            builder: TreeBuilder::new(),
            labels: HashMap::new(),
            pending: Vec::new(),
        };
        for file in self.files {
            lowering.builder.push_file(file);
        }

        let root = lowering.lower(self.root)?;
        for (node, label) in std::mem::take(&mut lowering.pending) {
            let target = lowering
                .labels
                .get(&label)
                .copied()
                .ok_or(DumpError::UnresolvedReference(label))?;
            lowering.builder.set_referenced(node, target);
        }

        let mut tree = lowering.builder.finish_unwrapped();
        tree.root = Some(root);
        Ok(tree)
    }
}

impl SyntaxTree {
    pub fn from_json(text: &str) -> Result<Self, DumpError> {
        TranslationUnitDump::from_json(text)?.into_tree()
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, DumpError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

struct Lowering {
    builder: TreeBuilder,
    labels: HashMap<String, NodeId>,
    pending: Vec<(NodeId, String)>,
}

/// A node whose children are still being lowered.
struct Frame {
    spec: NodeSpec,
    remaining: std::vec::IntoIter<NodeSpec>,
    lowered: Vec<(ChildRole, NodeId)>,
}

impl Frame {
    fn new(mut spec: NodeSpec) -> Self {
        let children = std::mem::take(&mut spec.children);
        Self {
            lowered: Vec::with_capacity(children.len()),
            remaining: children.into_iter(),
            spec,
        }
    }
}

impl Lowering {
    /// Post-order walk with an explicit stack; children get lower ids than
    /// their parent.
    fn lower(&mut self, root: NodeSpec) -> Result<NodeId, DumpError> {
        let mut root = Frame::new(root);
        let mut stack: Vec<(ChildRole, Frame)> = Vec::new();
        loop {
            let top = match stack.last_mut() {
                Some((_, frame)) => frame,
                None => &mut root,
            };
            if let Some(child) = top.remaining.next() {
                let role = child.role.ok_or(DumpError::MissingRole(child.kind))?;
                stack.push((role, Frame::new(child)));
                continue;
            }

            match stack.pop() {
                Some((role, frame)) => {
                    let id = self.add_node(frame)?;
                    let parent = match stack.last_mut() {
                        Some((_, frame)) => frame,
                        None => &mut root,
                    };
                    parent.lowered.push((role, id));
                }
                None => return self.add_node(root),
            }
        }
    }

    fn add_node(&mut self, frame: Frame) -> Result<NodeId, DumpError> {
        let Frame { spec, lowered, .. } = frame;
        let location = match &spec.loc {
            Some(loc) => {
                if loc.file as usize >= self.builder.file_count() {
                    return Err(DumpError::UnknownFile(loc.file));
                }
                SourceLocation::new(FileId(loc.file), loc.line, loc.column)
            }
            None => SourceLocation::invalid(),
        };

        let operator = spec
            .binary_op
            .map(Operator::Binary)
            .or(spec.unary_op.map(Operator::Unary));
        let attrs = NodeAttrs {
            name: spec.name,
            ty: spec.ty,
            operator,
            cast_kind: spec.cast_kind,
            value: spec.value,
            referenced: None,
            flags: spec.flags,
        };
        let id = self.builder.node_at(spec.kind, location, attrs, &lowered);

        if let Some(label) = spec.label {
            if self.labels.insert(label.clone(), id).is_some() {
                return Err(DumpError::DuplicateLabel(label));
            }
        }
        if let Some(target) = spec.refers_to {
            self.pending.push((id, target));
        }
        Ok(id)
    }
}
