use std::fmt;

use wumbo_rt::log;

use crate::ast::{
    Assign, Block, Call, Decl, DotAccess, Expr, ExprKind, FnDecl, Ident, Loc, Program, Stmt,
    StmtKind, StructDecl, TypeRef, TypeRefKind,
};
use crate::diag::Reporter;
use crate::span::Span;

use super::scope::{Scope, ScopeError, ScopeStack};
use super::symbols::{Symbol, SymbolId, SymbolKind, SymbolTable, TypeName};

pub const MULTIPLY_DECLARED: &str = "Multiply declared identifier";
pub const UNDECLARED: &str = "Undeclared identifier";
pub const VOID_NON_FUNCTION: &str = "Non-function declared void";
pub const INVALID_STRUCT_TYPE: &str = "Invalid name of struct type";
pub const INVALID_FIELD: &str = "Invalid struct field name";
pub const DOT_NON_STRUCT: &str = "Dot-access of non-struct type";

/// A broken invariant of the analyzer itself. Never caused by the program
/// being analyzed; aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    Scope(ScopeError),
    DanglingSymbol(SymbolId),
    NotAStruct(SymbolId),
    ScopeImbalance { expected: usize, found: usize },
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalError::Scope(err) => write!(f, "{err}"),
            InternalError::DanglingSymbol(id) => {
                write!(f, "symbol #{} is not in the symbol table", id.index())
            }
            InternalError::NotAStruct(id) => {
                write!(f, "symbol #{} was used as a struct type", id.index())
            }
            InternalError::ScopeImbalance { expected, found } => write!(
                f,
                "scope depth {found} after a construct that started at depth {expected}"
            ),
        }
    }
}

impl std::error::Error for InternalError {}

impl From<ScopeError> for InternalError {
    fn from(err: ScopeError) -> Self {
        InternalError::Scope(err)
    }
}

/// Where a dot access sits in its chain. Inner links must yield a struct so
/// the next link has a field table to look in.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Inner,
    Outermost,
}

enum Step {
    Struct(SymbolId),
    Scalar,
    Failed,
}

pub struct Checker<'a> {
    scopes: ScopeStack,
    diags: &'a mut dyn Reporter,
}

impl<'a> Checker<'a> {
    pub fn new(diags: &'a mut dyn Reporter) -> Self {
        Self {
            scopes: ScopeStack::new(),
            diags,
        }
    }

    pub fn check_program(&mut self, program: &mut Program) -> Result<(), InternalError> {
        let baseline = self.scopes.depth();
        for decl in &mut program.decls {
            match decl {
                Decl::Var(decl) => self.declare_binding(&mut decl.ty, &mut decl.name)?,
                Decl::Fn(decl) => self.check_fn_decl(decl)?,
                Decl::Struct(decl) => self.check_struct_decl(decl)?,
            }
            self.expect_depth(baseline)?;
        }
        Ok(())
    }

    /// Hands over the arena every `Ident::sym` in the checked tree points into.
    pub fn finish(self) -> SymbolTable {
        self.scopes.into_symbols()
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    fn check_fn_decl(&mut self, decl: &mut FnDecl) -> Result<(), InternalError> {
        if let TypeRefKind::Struct(name) = &mut decl.ret.kind {
            match self.struct_type(&name.name)? {
                Some(id) => name.sym = Some(id),
                None => self.error(name.span, INVALID_STRUCT_TYPE),
            }
        }
        if self.clashes_locally(&decl.name.name) {
            self.error(decl.name.span, MULTIPLY_DECLARED);
        } else {
            let params = decl
                .formals
                .iter()
                .map(|formal| TypeName::from_type_ref(&formal.ty))
                .collect();
            let ret = TypeName::from_type_ref(&decl.ret);
            let symbol = Symbol::new(
                decl.name.name.clone(),
                SymbolKind::Function { params, ret },
                decl.name.span,
            );
            decl.name.sym = self.declare(&decl.name, symbol)?;
        }

        let depth = self.scopes.depth();
        self.enter_scope();
        for formal in &mut decl.formals {
            self.declare_binding(&mut formal.ty, &mut formal.name)?;
        }
        self.check_block_contents(&mut decl.body)?;
        self.exit_scope()?;
        self.expect_depth(depth)
    }

    fn check_struct_decl(&mut self, decl: &mut StructDecl) -> Result<(), InternalError> {
        if self.clashes_locally(&decl.name.name) {
            self.error(decl.name.span, MULTIPLY_DECLARED);
            return Ok(());
        }
        let depth = self.scopes.depth();
        self.enter_scope();
        for field in &mut decl.fields {
            self.declare_binding(&mut field.ty, &mut field.name)?;
        }
        let fields = self.exit_scope()?.into_field_table();
        self.expect_depth(depth)?;
        let symbol = Symbol::new(
            decl.name.name.clone(),
            SymbolKind::Struct(fields),
            decl.name.span,
        );
        decl.name.sym = self.declare(&decl.name, symbol)?;
        Ok(())
    }

    /// Variables, formals and struct fields.
    fn declare_binding(&mut self, ty: &mut TypeRef, name: &mut Ident) -> Result<(), InternalError> {
        if ty.is_void() {
            self.error(name.span, VOID_NON_FUNCTION);
            if self.scopes.lookup_local(&name.name).is_some() {
                self.error(name.span, MULTIPLY_DECLARED);
            }
            return Ok(());
        }
        let declared = if let TypeRefKind::Struct(type_name) = &mut ty.kind {
            let Some(id) = self.struct_type(&type_name.name)? else {
                self.error(type_name.span, INVALID_STRUCT_TYPE);
                return Ok(());
            };
            type_name.sym = Some(id);
            TypeName::Struct(type_name.name.clone())
        } else {
            // A struct-typed binding may share its type's name; a plain one
            // may not.
            if self.scopes.lookup_struct_local(&name.name).is_some() {
                self.error(name.span, MULTIPLY_DECLARED);
                return Ok(());
            }
            TypeName::from_type_ref(ty)
        };
        let symbol = Symbol::new(name.name.clone(), SymbolKind::Scalar(declared), name.span);
        name.sym = self.declare(name, symbol)?;
        Ok(())
    }

    fn check_block_contents(&mut self, block: &mut Block) -> Result<(), InternalError> {
        for decl in &mut block.decls {
            self.declare_binding(&mut decl.ty, &mut decl.name)?;
        }
        for stmt in &mut block.stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_scoped_block(&mut self, block: &mut Block) -> Result<(), InternalError> {
        let depth = self.scopes.depth();
        self.enter_scope();
        self.check_block_contents(block)?;
        self.exit_scope()?;
        self.expect_depth(depth)
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) -> Result<(), InternalError> {
        match &mut stmt.kind {
            StmtKind::Assign(assign) => self.check_assign(assign),
            StmtKind::PostInc(expr)
            | StmtKind::PostDec(expr)
            | StmtKind::Read(expr)
            | StmtKind::Write(expr) => self.check_expr(expr),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.check_expr(cond)?;
                self.check_scoped_block(then_block)?;
                if let Some(else_block) = else_block {
                    self.check_scoped_block(else_block)?;
                }
                Ok(())
            }
            StmtKind::While { cond, block } | StmtKind::Repeat { cond, block } => {
                self.check_expr(cond)?;
                self.check_scoped_block(block)
            }
            StmtKind::Call(call) => self.check_call(call),
            StmtKind::Return(expr) => match expr {
                Some(expr) => self.check_expr(expr),
                None => Ok(()),
            },
        }
    }

    fn check_expr(&mut self, expr: &mut Expr) -> Result<(), InternalError> {
        match &mut expr.kind {
            ExprKind::Literal(_) => Ok(()),
            ExprKind::Ident(ident) => {
                self.resolve_ident(ident);
                Ok(())
            }
            ExprKind::Dot(dot) => self.resolve_dot(dot, Position::Outermost).map(|_| ()),
            ExprKind::Assign(assign) => self.check_assign(assign),
            ExprKind::Call(call) => self.check_call(call),
            ExprKind::Unary { expr, .. } => self.check_expr(expr),
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left)?;
                self.check_expr(right)
            }
        }
    }

    fn check_assign(&mut self, assign: &mut Assign) -> Result<(), InternalError> {
        self.check_expr(&mut assign.target)?;
        self.check_expr(&mut assign.value)
    }

    /// The callee must name a function. A missing name and a non-function
    /// name report the same diagnostic.
    fn check_call(&mut self, call: &mut Call) -> Result<(), InternalError> {
        let function = match self.scopes.lookup_global(&call.callee.name) {
            Some(id) => self.symbol(id)?.is_function().then_some(id),
            None => None,
        };
        match function {
            Some(id) => call.callee.sym = Some(id),
            None => self.error(call.callee.span, UNDECLARED),
        }
        for arg in &mut call.args {
            self.check_expr(arg)?;
        }
        Ok(())
    }

    fn resolve_ident(&mut self, ident: &mut Ident) {
        match self.scopes.lookup_global(&ident.name) {
            Some(id) => ident.sym = Some(id),
            None => self.error(ident.span, UNDECLARED),
        }
    }

    /// Resolves one link of `a.b.c`, innermost first. A failure is reported
    /// once, where it happens; the links above it return `Failed` silently.
    fn resolve_dot(&mut self, dot: &mut DotAccess, position: Position) -> Result<Step, InternalError> {
        let owner = match &mut dot.base {
            Loc::Ident(base) => match self.resolve_dot_base(base)? {
                Some(id) => id,
                None => return Ok(Step::Failed),
            },
            Loc::Dot(inner) => match self.resolve_dot(inner, Position::Inner)? {
                Step::Struct(id) => id,
                Step::Scalar | Step::Failed => return Ok(Step::Failed),
            },
        };
        self.resolve_field(owner, &mut dot.field, &mut dot.resolved, position)
    }

    /// The leftmost identifier of a chain; yields the struct type it holds.
    fn resolve_dot_base(&mut self, base: &mut Ident) -> Result<Option<SymbolId>, InternalError> {
        let Some(id) = self.scopes.lookup_global(&base.name) else {
            self.error(base.span, UNDECLARED);
            return Ok(None);
        };
        base.sym = Some(id);
        let struct_name = self
            .symbol(id)?
            .declared_type()
            .and_then(TypeName::struct_name)
            .map(str::to_string);
        let owner = match struct_name {
            Some(name) => self.struct_type(&name)?,
            None => None,
        };
        if owner.is_none() {
            self.error(base.span, DOT_NON_STRUCT);
        }
        Ok(owner)
    }

    fn resolve_field(
        &mut self,
        owner: SymbolId,
        field: &mut Ident,
        resolved: &mut Option<String>,
        position: Position,
    ) -> Result<Step, InternalError> {
        let fields = self
            .symbol(owner)?
            .fields()
            .ok_or(InternalError::NotAStruct(owner))?;
        let Some(field_id) = fields.get(&field.name) else {
            self.error(field.span, INVALID_FIELD);
            return Ok(Step::Failed);
        };
        field.sym = Some(field_id);

        let field_ty = self.symbol(field_id)?.declared_type().cloned();
        let next = match field_ty.as_ref().and_then(TypeName::struct_name) {
            Some(name) => self.struct_type(name)?,
            None => None,
        };
        *resolved = field_ty.map(|ty| ty.to_string());

        match (next, position) {
            (Some(id), _) => Ok(Step::Struct(id)),
            (None, Position::Outermost) => Ok(Step::Scalar),
            (None, Position::Inner) => {
                self.error(field.span, DOT_NON_STRUCT);
                Ok(Step::Failed)
            }
        }
    }

    /// The struct type visible as `name`, if any.
    fn struct_type(&self, name: &str) -> Result<Option<SymbolId>, InternalError> {
        let Some(id) = self.scopes.lookup_struct_global(name) else {
            return Ok(None);
        };
        Ok(self.symbol(id)?.is_struct_type().then_some(id))
    }

    fn clashes_locally(&self, name: &str) -> bool {
        self.scopes.lookup_local(name).is_some() || self.scopes.lookup_struct_local(name).is_some()
    }

    fn declare(&mut self, name: &Ident, symbol: Symbol) -> Result<Option<SymbolId>, InternalError> {
        match self.scopes.declare(&name.name, symbol) {
            Ok(id) => Ok(Some(id)),
            Err(ScopeError::DuplicateName { .. }) => {
                self.error(name.span, MULTIPLY_DECLARED);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn symbol(&self, id: SymbolId) -> Result<&Symbol, InternalError> {
        self.scopes
            .symbol(id)
            .ok_or(InternalError::DanglingSymbol(id))
    }

    fn enter_scope(&mut self) {
        self.scopes.enter_scope();
        if log::debug_enabled() {
            log::debug(&format!("enter scope (depth {})", self.scopes.depth()));
        }
    }

    fn exit_scope(&mut self) -> Result<Scope, InternalError> {
        let scope = self.scopes.exit_scope()?;
        if log::debug_enabled() {
            log::debug(&format!(
                "exit scope with {} binding(s) (depth {})",
                scope.len(),
                self.scopes.depth()
            ));
        }
        Ok(scope)
    }

    fn expect_depth(&self, expected: usize) -> Result<(), InternalError> {
        let found = self.scopes.depth();
        if found == expected {
            Ok(())
        } else {
            Err(InternalError::ScopeImbalance { expected, found })
        }
    }

    fn error(&mut self, span: Span, message: &str) {
        self.diags.report_error(span, message);
    }
}
