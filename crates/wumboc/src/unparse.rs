//! Source printer for analyzed or unanalyzed programs.
//!
//! Annotated output appends the resolved symbol to identifiers used inside
//! statements, e.g. `x(int) = (p(Point)).x(int);`. Declarations always print
//! as written.

use crate::ast::{
    Assign, Block, Call, Decl, DotAccess, Expr, ExprKind, FnDecl, FormalDecl, Ident, Literal,
    Loc, Program, Stmt, StmtKind, StructDecl, TypeRef, TypeRefKind, UnaryOp, VarDecl,
};
use crate::sema::symbols::SymbolTable;

const INDENT: usize = 4;

pub fn unparse(program: &Program) -> String {
    let mut printer = Printer::new(None);
    printer.program(program);
    printer.out
}

pub fn unparse_annotated(program: &Program, symbols: &SymbolTable) -> String {
    let mut printer = Printer::new(Some(symbols));
    printer.program(program);
    printer.out
}

struct Printer<'a> {
    out: String,
    symbols: Option<&'a SymbolTable>,
}

impl<'a> Printer<'a> {
    fn new(symbols: Option<&'a SymbolTable>) -> Self {
        Self {
            out: String::new(),
            symbols,
        }
    }

    fn annotating(&self) -> bool {
        self.symbols.is_some()
    }

    fn program(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Var(decl) => self.var_decl(decl, 0),
                Decl::Fn(decl) => self.fn_decl(decl),
                Decl::Struct(decl) => self.struct_decl(decl),
            }
        }
    }

    fn var_decl(&mut self, decl: &VarDecl, indent: usize) {
        self.pad(indent);
        self.type_ref(&decl.ty);
        self.out.push(' ');
        self.out.push_str(&decl.name.name);
        self.out.push_str(";\n");
    }

    fn fn_decl(&mut self, decl: &FnDecl) {
        self.type_ref(&decl.ret);
        self.out.push(' ');
        self.out.push_str(&decl.name.name);
        self.out.push('(');
        for (idx, formal) in decl.formals.iter().enumerate() {
            if idx > 0 {
                self.out.push_str(", ");
            }
            self.formal(formal);
        }
        self.out.push_str(") {\n");
        self.block_contents(&decl.body, INDENT);
        self.out.push_str("}\n\n");
    }

    fn formal(&mut self, formal: &FormalDecl) {
        self.type_ref(&formal.ty);
        self.out.push(' ');
        self.out.push_str(&formal.name.name);
    }

    fn struct_decl(&mut self, decl: &StructDecl) {
        self.out.push_str("struct ");
        self.out.push_str(&decl.name.name);
        self.out.push_str("{\n");
        for field in &decl.fields {
            self.var_decl(field, INDENT);
        }
        self.out.push_str("};\n\n");
    }

    fn type_ref(&mut self, ty: &TypeRef) {
        match &ty.kind {
            TypeRefKind::Int => self.out.push_str("int"),
            TypeRefKind::Bool => self.out.push_str("bool"),
            TypeRefKind::Void => self.out.push_str("void"),
            TypeRefKind::Struct(name) => {
                self.out.push_str("struct ");
                self.out.push_str(&name.name);
            }
        }
    }

    fn block_contents(&mut self, block: &Block, indent: usize) {
        for decl in &block.decls {
            self.var_decl(decl, indent);
        }
        for stmt in &block.stmts {
            self.stmt(stmt, indent);
        }
    }

    /// `head {` + body + `}` at `indent`, used by every compound statement.
    fn nested(&mut self, head: &str, cond: Option<&Expr>, block: &Block, indent: usize) {
        self.pad(indent);
        self.out.push_str(head);
        if let Some(cond) = cond {
            self.out.push_str(" (");
            self.expr(cond, self.annotating());
            self.out.push(')');
        }
        self.out.push_str(" {\n");
        self.block_contents(block, indent + INDENT);
        self.pad(indent);
        self.out.push_str("}\n");
    }

    fn stmt(&mut self, stmt: &Stmt, indent: usize) {
        let annotate = self.annotating();
        match &stmt.kind {
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.nested("if", Some(cond), then_block, indent);
                if let Some(else_block) = else_block {
                    self.nested("else", None, else_block, indent);
                }
                return;
            }
            StmtKind::While { cond, block } => {
                self.nested("while", Some(cond), block, indent);
                return;
            }
            StmtKind::Repeat { cond, block } => {
                self.nested("repeat", Some(cond), block, indent);
                return;
            }
            _ => {}
        }

        self.pad(indent);
        match &stmt.kind {
            StmtKind::Assign(assign) => self.assign(assign, annotate, false),
            StmtKind::PostInc(expr) => {
                self.expr(expr, annotate);
                self.out.push_str("++");
            }
            StmtKind::PostDec(expr) => {
                self.expr(expr, annotate);
                self.out.push_str("--");
            }
            StmtKind::Read(expr) => {
                self.out.push_str("cin >> ");
                self.expr(expr, annotate);
            }
            StmtKind::Write(expr) => {
                self.out.push_str("cout << ");
                self.expr(expr, annotate);
            }
            StmtKind::Call(call) => self.call(call, annotate),
            StmtKind::Return(expr) => {
                self.out.push_str("return");
                if let Some(expr) = expr {
                    self.out.push(' ');
                    self.expr(expr, annotate);
                }
            }
            StmtKind::If { .. } | StmtKind::While { .. } | StmtKind::Repeat { .. } => {}
        }
        self.out.push_str(";\n");
    }

    fn expr(&mut self, expr: &Expr, annotate: bool) {
        match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Int(value) => self.out.push_str(&value.to_string()),
                Literal::Str(raw) => self.out.push_str(raw),
                Literal::Bool(value) => self.out.push_str(if *value { "true" } else { "false" }),
            },
            ExprKind::Ident(ident) => self.ident(ident, annotate),
            ExprKind::Dot(dot) => self.dot(dot, annotate),
            ExprKind::Assign(assign) => self.assign(assign, annotate, true),
            ExprKind::Call(call) => self.call(call, annotate),
            ExprKind::Unary { op, expr } => {
                self.out.push('(');
                self.out.push(match op {
                    UnaryOp::Neg => '-',
                    UnaryOp::Not => '!',
                });
                self.expr(expr, annotate);
                self.out.push(')');
            }
            ExprKind::Binary { op, left, right } => {
                self.out.push('(');
                self.expr(left, annotate);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.expr(right, annotate);
                self.out.push(')');
            }
        }
    }

    fn assign(&mut self, assign: &Assign, annotate: bool, parens: bool) {
        if parens {
            self.out.push('(');
        }
        self.expr(&assign.target, annotate);
        self.out.push_str(" = ");
        self.expr(&assign.value, annotate);
        if parens {
            self.out.push(')');
        }
    }

    fn call(&mut self, call: &Call, annotate: bool) {
        self.ident(&call.callee, annotate);
        self.out.push('(');
        for (idx, arg) in call.args.iter().enumerate() {
            if idx > 0 {
                self.out.push_str(", ");
            }
            self.expr(arg, annotate);
        }
        self.out.push(')');
    }

    fn dot(&mut self, dot: &DotAccess, annotate: bool) {
        self.out.push('(');
        match &dot.base {
            Loc::Ident(base) => self.ident(base, annotate),
            Loc::Dot(inner) => self.dot(inner, annotate),
        }
        self.out.push_str(").");
        self.out.push_str(&dot.field.name);
        if annotate {
            if let Some(resolved) = &dot.resolved {
                self.out.push('(');
                self.out.push_str(resolved);
                self.out.push(')');
            }
        }
    }

    fn ident(&mut self, ident: &Ident, annotate: bool) {
        self.out.push_str(&ident.name);
        if !annotate {
            return;
        }
        let symbol = self
            .symbols
            .zip(ident.sym)
            .and_then(|(symbols, id)| symbols.get(id));
        if let Some(symbol) = symbol {
            self.out.push('(');
            self.out.push_str(&symbol.to_string());
            self.out.push(')');
        }
    }

    fn pad(&mut self, indent: usize) {
        self.out.extend(std::iter::repeat_n(' ', indent));
    }
}
