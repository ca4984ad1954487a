//! Syntax tree model consumed by the analysis engine
//!
//! The tree is produced by an external compiler front end, either through
//! [`TreeBuilder`] or from a serialized [`TranslationUnitDump`]. The engine only
//! ever holds [`NodeId`] handles into it.

pub mod builder;
pub mod dump;

pub use builder::TreeBuilder;
pub use dump::{DumpError, TranslationUnitDump};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    #[serde(default)]
    pub is_system: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub file: Option<FileId>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: FileId, line: u32, column: u32) -> Self {
        Self {
            file: Some(file),
            line,
            column,
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.file.is_some() && self.line > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    Declaration,
    Statement,
    Expression,
    Type,
    Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    TranslationUnit,

    FunctionDecl,
    MethodDecl,
    ParmVarDecl,
    VarDecl,
    FieldDecl,
    RecordDecl,
    TypedefDecl,

    CompoundStmt,
    DeclStmt,
    IfStmt,
    WhileStmt,
    DoStmt,
    ForStmt,
    SwitchStmt,
    CaseStmt,
    DefaultStmt,
    ReturnStmt,
    BreakStmt,
    ContinueStmt,
    GotoStmt,
    LabelStmt,
    NullStmt,

    DeclRefExpr,
    IntegerLiteral,
    FloatingLiteral,
    CharacterLiteral,
    StringLiteral,
    BoolLiteral,
    NullPtrLiteral,
    BinaryOperator,
    UnaryOperator,
    CallExpr,
    ArraySubscriptExpr,
    MemberExpr,
    ImplicitCastExpr,
    CStyleCastExpr,
    ParenExpr,
    ConditionalOperator,
    ExprWithCleanups,

    TypeRef,
}

impl NodeKind {
    pub fn category(self) -> NodeCategory {
        use NodeKind::*;
        match self {
            TranslationUnit => NodeCategory::Unit,
            FunctionDecl | MethodDecl | ParmVarDecl | VarDecl | FieldDecl | RecordDecl
            | TypedefDecl => NodeCategory::Declaration,
            CompoundStmt | DeclStmt | IfStmt | WhileStmt | DoStmt | ForStmt | SwitchStmt
            | CaseStmt | DefaultStmt | ReturnStmt | BreakStmt | ContinueStmt | GotoStmt
            | LabelStmt | NullStmt => NodeCategory::Statement,
            TypeRef => NodeCategory::Type,
            _ => NodeCategory::Expression,
        }
    }

    pub fn is_cast(self) -> bool {
        matches!(self, NodeKind::ImplicitCastExpr | NodeKind::CStyleCastExpr)
    }

    pub fn is_function(self) -> bool {
        matches!(self, NodeKind::FunctionDecl | NodeKind::MethodDecl)
    }

    pub fn is_var(self) -> bool {
        matches!(self, NodeKind::VarDecl | NodeKind::ParmVarDecl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildRole {
    Lhs,
    Rhs,
    Operand,
    Callee,
    Argument,
    Condition,
    Then,
    Else,
    Body,
    Init,
    Increment,
    SubExpr,
    Base,
    Index,
    Initializer,
    Parameter,
    Declaration,
    Statement,
    ReturnValue,
    Member,
    TrueExpr,
    FalseExpr,
    CaseValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeClass {
    Pointer,
    Integral,
    Floating,
    Boolean,
    Record,
    Union,
    Array,
    Void,
    NullPointer,
    Function,
    MemberFunctionPointer,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeInfo {
    pub spelling: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    pub class: TypeClass,
}

impl TypeInfo {
    pub fn new(spelling: impl Into<String>, class: TypeClass) -> Self {
        Self {
            spelling: spelling.into(),
            canonical: None,
            class,
        }
    }

    pub fn pointer(pointee: &str) -> Self {
        Self::new(format!("{pointee} *"), TypeClass::Pointer)
    }

    pub fn integral(name: &str) -> Self {
        Self::new(name, TypeClass::Integral)
    }

    pub fn with_canonical(mut self, canonical: impl Into<String>) -> Self {
        self.canonical = Some(canonical.into());
        self
    }

    pub fn canonical(&self) -> &str {
        self.canonical.as_deref().unwrap_or(&self.spelling)
    }

    pub fn is_pointer(&self) -> bool {
        self.class == TypeClass::Pointer
    }

    pub fn is_integral(&self) -> bool {
        matches!(self.class, TypeClass::Integral | TypeClass::Boolean)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Rem,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "&&")]
    LogicalAnd,
    #[serde(rename = "||")]
    LogicalOr,
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "%=")]
    RemAssign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "<<=")]
    ShlAssign,
    #[serde(rename = ">>=")]
    ShrAssign,
    #[serde(rename = "&=")]
    AndAssign,
    #[serde(rename = "^=")]
    XorAssign,
    #[serde(rename = "|=")]
    OrAssign,
    #[serde(rename = ",")]
    Comma,
}

impl BinaryOp {
    pub fn spelling(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Mul => "*",
            Div => "/",
            Rem => "%",
            Add => "+",
            Sub => "-",
            Shl => "<<",
            Shr => ">>",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            BitAnd => "&",
            BitXor => "^",
            BitOr => "|",
            LogicalAnd => "&&",
            LogicalOr => "||",
            Assign => "=",
            MulAssign => "*=",
            DivAssign => "/=",
            RemAssign => "%=",
            AddAssign => "+=",
            SubAssign => "-=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            AndAssign => "&=",
            XorAssign => "^=",
            OrAssign => "|=",
            Comma => ",",
        }
    }

    pub fn is_assignment(self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Assign
                | MulAssign
                | DivAssign
                | RemAssign
                | AddAssign
                | SubAssign
                | ShlAssign
                | ShrAssign
                | AndAssign
                | XorAssign
                | OrAssign
        )
    }

    pub fn is_relational(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    /// The arithmetic operator applied by a compound assignment.
    pub fn compound_base(self) -> Option<BinaryOp> {
        use BinaryOp::*;
        Some(match self {
            MulAssign => Mul,
            DivAssign => Div,
            RemAssign => Rem,
            AddAssign => Add,
            SubAssign => Sub,
            ShlAssign => Shl,
            ShrAssign => Shr,
            AndAssign => BitAnd,
            XorAssign => BitXor,
            OrAssign => BitOr,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "++pre")]
    PreInc,
    #[serde(rename = "--pre")]
    PreDec,
    #[serde(rename = "post++")]
    PostInc,
    #[serde(rename = "post--")]
    PostDec,
    #[serde(rename = "&")]
    AddrOf,
    #[serde(rename = "*")]
    Deref,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "~")]
    Not,
    #[serde(rename = "!")]
    LNot,
}

impl UnaryOp {
    pub fn spelling(self) -> &'static str {
        match self {
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
            UnaryOp::AddrOf => "&",
            UnaryOp::Deref => "*",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "~",
            UnaryOp::LNot => "!",
        }
    }

    pub fn is_increment_or_decrement(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastKind {
    LValueToRValue,
    NoOp,
    BitCast,
    IntegralCast,
    IntegralToBoolean,
    IntegralToFloating,
    FloatingToIntegral,
    PointerToIntegral,
    PointerToBoolean,
    IntegralToPointer,
    NullToPointer,
    ArrayToPointerDecay,
    FunctionToPointerDecay,
    ToVoid,
    Dependent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Binary(BinaryOp),
    Unary(UnaryOp),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeAttrs {
    pub name: Option<String>,
    pub ty: Option<TypeInfo>,
    pub operator: Option<Operator>,
    pub cast_kind: Option<CastKind>,
    pub value: Option<i64>,
    pub referenced: Option<NodeId>,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Child {
    pub role: ChildRole,
    pub id: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub location: SourceLocation,
    pub parent: Option<NodeId>,
    pub children: Vec<Child>,
    pub attrs: NodeAttrs,
}

impl Node {
    pub fn name(&self) -> Option<&str> {
        self.attrs.name.as_deref()
    }

    pub fn ty(&self) -> Option<&TypeInfo> {
        self.attrs.ty.as_ref()
    }

    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self.attrs.operator {
            Some(Operator::Binary(op)) => Some(op),
            _ => None,
        }
    }

    pub fn unary_op(&self) -> Option<UnaryOp> {
        match self.attrs.operator {
            Some(Operator::Unary(op)) => Some(op),
            _ => None,
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.attrs.flags.iter().any(|f| f == flag)
    }

    pub fn child(&self, role: ChildRole) -> Option<NodeId> {
        self.children.iter().find(|c| c.role == role).map(|c| c.id)
    }

    pub fn children_with(&self, role: ChildRole) -> impl Iterator<Item = NodeId> + '_ {
        self.children
            .iter()
            .filter(move |c| c.role == role)
            .map(|c| c.id)
    }

    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().map(|c| c.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    files: Vec<SourceFile>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Strict descendants of `id` in depth-first pre-order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.node(id).child_ids().collect();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// `id` followed by its descendants, depth-first pre-order.
    pub fn preorder(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Skips parentheses and implicit casts, like the front end's
    /// `IgnoreParenImpCasts`.
    pub fn ignore_paren_imp_casts(&self, mut id: NodeId) -> NodeId {
        loop {
            let node = self.node(id);
            match node.kind {
                NodeKind::ParenExpr | NodeKind::ImplicitCastExpr | NodeKind::ExprWithCleanups => {
                    match node.child(ChildRole::SubExpr) {
                        Some(inner) => id = inner,
                        None => return id,
                    }
                }
                _ => return id,
            }
        }
    }

    /// The declaration a reference expression points to.
    pub fn referenced_decl(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).attrs.referenced
    }

    pub fn functions(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| n.kind.is_function() && n.child(ChildRole::Body).is_some())
    }

    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.kind(*a).is_function())
    }

    /// Ordered parameter declarations of a function.
    pub fn parameters(&self, function: NodeId) -> Vec<NodeId> {
        self.node(function)
            .children_with(ChildRole::Parameter)
            .collect()
    }
}

pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        let node = self.tree.node(current);
        let before = self.stack.len();
        self.stack.extend(node.child_ids());
        self.stack[before..].reverse();
        Some(current)
    }
}
