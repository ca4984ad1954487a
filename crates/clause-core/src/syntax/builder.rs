//! Programmatic construction of a [`SyntaxTree`].
//!
//! Front-end adapters and tests build trees bottom-up: children are created
//! first and handed to their parent constructor, which records the parent link.
//! Every node takes its location from the builder's cursor.

use super::{
    BinaryOp, CastKind, Child, ChildRole, FileId, Node, NodeAttrs, NodeId, NodeKind, Operator,
    SourceFile, SourceLocation, SyntaxTree, TypeClass, TypeInfo, UnaryOp,
};

#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    files: Vec<SourceFile>,
    cursor: SourceLocation,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<String>, is_system: bool) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            path: path.into(),
            is_system,
        });
        id
    }

    /// Moves the cursor to `line` of `file`, column 1.
    pub fn at(&mut self, file: FileId, line: u32) -> &mut Self {
        self.cursor = SourceLocation::new(file, line, 1);
        self
    }

    pub fn at_column(&mut self, file: FileId, line: u32, column: u32) -> &mut Self {
        self.cursor = SourceLocation::new(file, line, column);
        self
    }

    /// Moves the cursor to another line of the current file.
    pub fn line(&mut self, line: u32) -> &mut Self {
        self.cursor.line = line;
        self.cursor.column = 1;
        self
    }

    pub fn without_location(&mut self) -> &mut Self {
        self.cursor = SourceLocation::invalid();
        self
    }

    pub fn location(&self) -> SourceLocation {
        self.cursor
    }

    pub fn node(&mut self, kind: NodeKind, attrs: NodeAttrs, children: &[(ChildRole, NodeId)]) -> NodeId {
        let location = self.cursor;
        self.node_at(kind, location, attrs, children)
    }

    pub(crate) fn node_at(
        &mut self,
        kind: NodeKind,
        location: SourceLocation,
        attrs: NodeAttrs,
        children: &[(ChildRole, NodeId)],
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for (_, child) in children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            id,
            kind,
            location,
            parent: None,
            children: children
                .iter()
                .map(|&(role, id)| Child { role, id })
                .collect(),
            attrs,
        });
        id
    }

    pub(crate) fn set_referenced(&mut self, id: NodeId, target: NodeId) {
        self.nodes[id.index()].attrs.referenced = Some(target);
    }

    pub(crate) fn push_file(&mut self, file: SourceFile) {
        self.files.push(file);
    }

    pub(crate) fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn add_flag(&mut self, id: NodeId, flag: impl Into<String>) -> NodeId {
        self.nodes[id.index()].attrs.flags.push(flag.into());
        id
    }

    pub fn ty_of(&self, id: NodeId) -> Option<TypeInfo> {
        self.nodes[id.index()].attrs.ty.clone()
    }

    /// Wraps every parentless node into a translation unit root.
    pub fn finish(mut self) -> SyntaxTree {
        let orphans: Vec<(ChildRole, NodeId)> = self
            .nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|n| (ChildRole::Declaration, n.id))
            .collect();
        let root = self.node_at(
            NodeKind::TranslationUnit,
            SourceLocation::invalid(),
            NodeAttrs::default(),
            &orphans,
        );
        SyntaxTree {
            nodes: self.nodes,
            files: self.files,
            root: Some(root),
        }
    }

    /// The tree as built, with no root assigned.
    pub(crate) fn finish_unwrapped(self) -> SyntaxTree {
        SyntaxTree {
            nodes: self.nodes,
            files: self.files,
            root: None,
        }
    }

    fn typed(ty: TypeInfo) -> NodeAttrs {
        NodeAttrs {
            ty: Some(ty),
            ..Default::default()
        }
    }

    fn named(name: &str, ty: TypeInfo) -> NodeAttrs {
        NodeAttrs {
            name: Some(name.to_string()),
            ty: Some(ty),
            ..Default::default()
        }
    }

    // ---- declarations ----

    pub fn var(&mut self, name: &str, ty: TypeInfo) -> NodeId {
        self.node(NodeKind::VarDecl, Self::named(name, ty), &[])
    }

    pub fn var_init(&mut self, name: &str, ty: TypeInfo, init: NodeId) -> NodeId {
        self.node(
            NodeKind::VarDecl,
            Self::named(name, ty),
            &[(ChildRole::Initializer, init)],
        )
    }

    pub fn param(&mut self, name: &str, ty: TypeInfo) -> NodeId {
        self.node(NodeKind::ParmVarDecl, Self::named(name, ty), &[])
    }

    pub fn field(&mut self, name: &str, ty: TypeInfo) -> NodeId {
        self.node(NodeKind::FieldDecl, Self::named(name, ty), &[])
    }

    pub fn record(&mut self, name: &str, is_union: bool, fields: &[NodeId]) -> NodeId {
        let class = if is_union {
            TypeClass::Union
        } else {
            TypeClass::Record
        };
        let keyword = if is_union { "union" } else { "struct" };
        let children: Vec<_> = fields.iter().map(|&f| (ChildRole::Declaration, f)).collect();
        self.node(
            NodeKind::RecordDecl,
            Self::named(name, TypeInfo::new(format!("{keyword} {name}"), class)),
            &children,
        )
    }

    /// A function declaration; `body` is `None` for external prototypes.
    pub fn function(
        &mut self,
        name: &str,
        return_ty: TypeInfo,
        params: &[NodeId],
        body: Option<NodeId>,
    ) -> NodeId {
        let mut children: Vec<_> = params.iter().map(|&p| (ChildRole::Parameter, p)).collect();
        if let Some(body) = body {
            children.push((ChildRole::Body, body));
        }
        let ty = TypeInfo::new(format!("{} ()", return_ty.spelling), TypeClass::Function);
        self.node(NodeKind::FunctionDecl, Self::named(name, ty), &children)
    }

    /// A method declaration; flags such as `virtual` go through [`Self::add_flag`].
    pub fn method(&mut self, name: &str, return_ty: TypeInfo, body: Option<NodeId>) -> NodeId {
        let children: Vec<_> = body.map(|b| (ChildRole::Body, b)).into_iter().collect();
        let ty = TypeInfo::new(format!("{} ()", return_ty.spelling), TypeClass::Function);
        self.node(NodeKind::MethodDecl, Self::named(name, ty), &children)
    }

    // ---- statements ----

    pub fn compound(&mut self, stmts: &[NodeId]) -> NodeId {
        let children: Vec<_> = stmts.iter().map(|&s| (ChildRole::Statement, s)).collect();
        self.node(NodeKind::CompoundStmt, NodeAttrs::default(), &children)
    }

    pub fn decl_stmt(&mut self, decls: &[NodeId]) -> NodeId {
        let children: Vec<_> = decls.iter().map(|&d| (ChildRole::Declaration, d)).collect();
        self.node(NodeKind::DeclStmt, NodeAttrs::default(), &children)
    }

    pub fn if_stmt(&mut self, cond: NodeId, then: NodeId, otherwise: Option<NodeId>) -> NodeId {
        let mut children = vec![(ChildRole::Condition, cond), (ChildRole::Then, then)];
        if let Some(e) = otherwise {
            children.push((ChildRole::Else, e));
        }
        self.node(NodeKind::IfStmt, NodeAttrs::default(), &children)
    }

    pub fn while_stmt(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.node(
            NodeKind::WhileStmt,
            NodeAttrs::default(),
            &[(ChildRole::Condition, cond), (ChildRole::Body, body)],
        )
    }

    pub fn do_stmt(&mut self, body: NodeId, cond: NodeId) -> NodeId {
        self.node(
            NodeKind::DoStmt,
            NodeAttrs::default(),
            &[(ChildRole::Body, body), (ChildRole::Condition, cond)],
        )
    }

    pub fn for_stmt(
        &mut self,
        init: Option<NodeId>,
        cond: Option<NodeId>,
        inc: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        let mut children = Vec::new();
        if let Some(i) = init {
            children.push((ChildRole::Init, i));
        }
        if let Some(c) = cond {
            children.push((ChildRole::Condition, c));
        }
        if let Some(i) = inc {
            children.push((ChildRole::Increment, i));
        }
        children.push((ChildRole::Body, body));
        self.node(NodeKind::ForStmt, NodeAttrs::default(), &children)
    }

    pub fn switch_stmt(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.node(
            NodeKind::SwitchStmt,
            NodeAttrs::default(),
            &[(ChildRole::Condition, cond), (ChildRole::Body, body)],
        )
    }

    pub fn case_stmt(&mut self, value: NodeId, body: NodeId) -> NodeId {
        self.node(
            NodeKind::CaseStmt,
            NodeAttrs::default(),
            &[(ChildRole::CaseValue, value), (ChildRole::Statement, body)],
        )
    }

    pub fn default_stmt(&mut self, body: NodeId) -> NodeId {
        self.node(
            NodeKind::DefaultStmt,
            NodeAttrs::default(),
            &[(ChildRole::Statement, body)],
        )
    }

    pub fn return_stmt(&mut self, value: Option<NodeId>) -> NodeId {
        let children: Vec<_> = value.map(|v| (ChildRole::ReturnValue, v)).into_iter().collect();
        self.node(NodeKind::ReturnStmt, NodeAttrs::default(), &children)
    }

    pub fn break_stmt(&mut self) -> NodeId {
        self.node(NodeKind::BreakStmt, NodeAttrs::default(), &[])
    }

    pub fn continue_stmt(&mut self) -> NodeId {
        self.node(NodeKind::ContinueStmt, NodeAttrs::default(), &[])
    }

    pub fn null_stmt(&mut self) -> NodeId {
        self.node(NodeKind::NullStmt, NodeAttrs::default(), &[])
    }

    pub fn label(&mut self, name: &str, stmt: NodeId) -> NodeId {
        self.node(
            NodeKind::LabelStmt,
            NodeAttrs {
                name: Some(name.to_string()),
                ..Default::default()
            },
            &[(ChildRole::Statement, stmt)],
        )
    }

    pub fn goto(&mut self, label: NodeId) -> NodeId {
        let name = self.nodes[label.index()].attrs.name.clone();
        self.node(
            NodeKind::GotoStmt,
            NodeAttrs {
                name,
                referenced: Some(label),
                ..Default::default()
            },
            &[],
        )
    }

    // ---- expressions ----

    pub fn int_literal(&mut self, value: i64) -> NodeId {
        self.node(
            NodeKind::IntegerLiteral,
            NodeAttrs {
                ty: Some(TypeInfo::integral("int")),
                value: Some(value),
                ..Default::default()
            },
            &[],
        )
    }

    pub fn string_literal(&mut self, text: &str) -> NodeId {
        self.node(
            NodeKind::StringLiteral,
            NodeAttrs {
                name: Some(text.to_string()),
                ty: Some(TypeInfo::new(
                    format!("char[{}]", text.len() + 1),
                    TypeClass::Array,
                )),
                ..Default::default()
            },
            &[],
        )
    }

    pub fn null_ptr(&mut self) -> NodeId {
        self.node(
            NodeKind::NullPtrLiteral,
            Self::typed(TypeInfo::new("std::nullptr_t", TypeClass::NullPointer)),
            &[],
        )
    }

    pub fn decl_ref(&mut self, decl: NodeId) -> NodeId {
        let target = &self.nodes[decl.index()];
        let attrs = NodeAttrs {
            name: target.attrs.name.clone(),
            ty: target.attrs.ty.clone(),
            referenced: Some(decl),
            ..Default::default()
        };
        self.node(NodeKind::DeclRefExpr, attrs, &[])
    }

    pub fn implicit_cast(&mut self, kind: CastKind, expr: NodeId, ty: TypeInfo) -> NodeId {
        self.node(
            NodeKind::ImplicitCastExpr,
            NodeAttrs {
                ty: Some(ty),
                cast_kind: Some(kind),
                ..Default::default()
            },
            &[(ChildRole::SubExpr, expr)],
        )
    }

    pub fn c_cast(&mut self, kind: CastKind, expr: NodeId, ty: TypeInfo) -> NodeId {
        self.node(
            NodeKind::CStyleCastExpr,
            NodeAttrs {
                ty: Some(ty),
                cast_kind: Some(kind),
                ..Default::default()
            },
            &[(ChildRole::SubExpr, expr)],
        )
    }

    /// Lvalue-to-rvalue conversion of `expr`, keeping its type.
    pub fn load(&mut self, expr: NodeId) -> NodeId {
        let ty = self
            .ty_of(expr)
            .unwrap_or_else(|| TypeInfo::new("int", TypeClass::Integral));
        self.implicit_cast(CastKind::LValueToRValue, expr, ty)
    }

    /// The rvalue of a variable: a loaded reference to `decl`.
    pub fn rvalue(&mut self, decl: NodeId) -> NodeId {
        let reference = self.decl_ref(decl);
        self.load(reference)
    }

    pub fn paren(&mut self, expr: NodeId) -> NodeId {
        let ty = self.ty_of(expr);
        self.node(
            NodeKind::ParenExpr,
            NodeAttrs {
                ty,
                ..Default::default()
            },
            &[(ChildRole::SubExpr, expr)],
        )
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId, ty: TypeInfo) -> NodeId {
        self.node(
            NodeKind::BinaryOperator,
            NodeAttrs {
                ty: Some(ty),
                operator: Some(Operator::Binary(op)),
                ..Default::default()
            },
            &[(ChildRole::Lhs, lhs), (ChildRole::Rhs, rhs)],
        )
    }

    pub fn assign(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        let ty = self
            .ty_of(lhs)
            .unwrap_or_else(|| TypeInfo::new("int", TypeClass::Integral));
        self.binary(BinaryOp::Assign, lhs, rhs, ty)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId, ty: TypeInfo) -> NodeId {
        self.node(
            NodeKind::UnaryOperator,
            NodeAttrs {
                ty: Some(ty),
                operator: Some(Operator::Unary(op)),
                ..Default::default()
            },
            &[(ChildRole::Operand, operand)],
        )
    }

    pub fn addr_of(&mut self, expr: NodeId) -> NodeId {
        let pointee = self
            .ty_of(expr)
            .map(|t| t.spelling)
            .unwrap_or_else(|| "void".to_string());
        self.unary(UnaryOp::AddrOf, expr, TypeInfo::pointer(&pointee))
    }

    pub fn subscript(&mut self, base: NodeId, index: NodeId, ty: TypeInfo) -> NodeId {
        self.node(
            NodeKind::ArraySubscriptExpr,
            Self::typed(ty),
            &[(ChildRole::Base, base), (ChildRole::Index, index)],
        )
    }

    pub fn member(&mut self, base: NodeId, field: NodeId, arrow: bool) -> NodeId {
        let target = &self.nodes[field.index()];
        let mut attrs = NodeAttrs {
            name: target.attrs.name.clone(),
            ty: target.attrs.ty.clone(),
            referenced: Some(field),
            ..Default::default()
        };
        if arrow {
            attrs.flags.push("arrow".to_string());
        }
        self.node(NodeKind::MemberExpr, attrs, &[(ChildRole::Base, base)])
    }

    /// A direct call; the callee reference decays to a function pointer.
    pub fn call(&mut self, callee: NodeId, args: &[NodeId], ty: TypeInfo) -> NodeId {
        let reference = self.decl_ref(callee);
        let callee_ty = self.ty_of(reference).unwrap_or_else(|| ty.clone());
        let decayed = self.implicit_cast(CastKind::FunctionToPointerDecay, reference, callee_ty);
        let mut children = vec![(ChildRole::Callee, decayed)];
        children.extend(args.iter().map(|&a| (ChildRole::Argument, a)));
        let name = self.nodes[callee.index()].attrs.name.clone();
        self.node(
            NodeKind::CallExpr,
            NodeAttrs {
                name,
                ty: Some(ty),
                referenced: Some(callee),
                ..Default::default()
            },
            &children,
        )
    }

    pub fn conditional(&mut self, cond: NodeId, yes: NodeId, no: NodeId, ty: TypeInfo) -> NodeId {
        self.node(
            NodeKind::ConditionalOperator,
            Self::typed(ty),
            &[
                (ChildRole::Condition, cond),
                (ChildRole::TrueExpr, yes),
                (ChildRole::FalseExpr, no),
            ],
        )
    }
}
