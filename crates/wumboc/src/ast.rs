use serde::{Deserialize, Serialize};

use crate::sema::symbols::SymbolId;
use crate::span::Span;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Decl {
    Var(VarDecl),
    Fn(FnDecl),
    Struct(StructDecl),
}

/// An identifier occurrence. `sym` is filled in by name analysis with a
/// handle into the analysis' symbol table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
    #[serde(default)]
    pub sym: Option<SymbolId>,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
            sym: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: TypeRef,
    pub name: Ident,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FnDecl {
    pub ret: TypeRef,
    pub name: Ident,
    pub formals: Vec<FormalDecl>,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormalDecl {
    pub ty: TypeRef,
    pub name: Ident,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: Ident,
    pub fields: Vec<VarDecl>,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TypeRefKind {
    Int,
    Bool,
    Void,
    Struct(Ident),
}

impl TypeRef {
    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeRefKind::Void)
    }
}

/// Local declarations followed by statements: a function body or the body of
/// a compound statement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub decls: Vec<VarDecl>,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum StmtKind {
    Assign(Assign),
    PostInc(Expr),
    PostDec(Expr),
    Read(Expr),
    Write(Expr),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        block: Block,
    },
    Repeat {
        cond: Expr,
        block: Block,
    },
    Call(Call),
    Return(Option<Expr>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Ident(Ident),
    Dot(DotAccess),
    Assign(Assign),
    Call(Call),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assign {
    pub target: Box<Expr>,
    pub value: Box<Expr>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Call {
    pub callee: Ident,
    pub args: Vec<Expr>,
}

/// `base.field`. After analysis `resolved` holds the type name the access
/// yields: a struct name while the chain can continue, a scalar name at its
/// end.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DotAccess {
    pub base: Loc,
    pub field: Ident,
    #[serde(default)]
    pub resolved: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Loc {
    Ident(Ident),
    Dot(Box<DotAccess>),
}

impl Loc {
    pub fn span(&self) -> Span {
        match self {
            Loc::Ident(ident) => ident.span,
            Loc::Dot(dot) => dot.base.span().merge(dot.field.span),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Literal {
    Int(i32),
    /// Source text of the literal, quotes included.
    Str(String),
    Bool(bool),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
        }
    }
}
