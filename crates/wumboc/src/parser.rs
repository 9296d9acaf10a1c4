use crate::ast::*;
use crate::diag::Diagnostics;
use crate::span::Span;
use crate::token::{Keyword, Punct, Token, TokenKind};

static EOF: TokenKind = TokenKind::Eof;

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    diags: &'a mut Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], diags: &'a mut Diagnostics) -> Self {
        Self {
            tokens,
            pos: 0,
            diags,
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut decls = Vec::new();
        while !self.at_eof() {
            match self.parse_decl() {
                Some(decl) => decls.push(decl),
                None => self.sync_past_terminator(),
            }
        }
        Program { decls }
    }

    fn parse_decl(&mut self) -> Option<Decl> {
        if self.at_keyword(Keyword::Struct)
            && matches!(self.peek_kind_n(1), TokenKind::Ident(_))
            && matches!(self.peek_kind_n(2), TokenKind::Punct(Punct::LBrace))
        {
            return Some(Decl::Struct(self.parse_struct_decl()));
        }
        if !self.starts_type() {
            self.error_here("expected a declaration");
            return None;
        }
        let start = self.peek_span();
        let ty = self.parse_type()?;
        let name = self.expect_ident();
        if self.at_punct(Punct::LParen) {
            return Some(Decl::Fn(self.parse_fn_decl(start, ty, name)));
        }
        self.expect_punct(Punct::Semicolon);
        Some(Decl::Var(VarDecl {
            ty,
            name,
            span: start.merge(self.prev_span()),
        }))
    }

    fn parse_struct_decl(&mut self) -> StructDecl {
        let start = self.peek_span();
        self.expect_keyword(Keyword::Struct);
        let name = self.expect_ident();
        self.expect_punct(Punct::LBrace);
        let mut fields = Vec::new();
        while !self.at_punct(Punct::RBrace) && !self.at_eof() {
            if self.starts_type() {
                if let Some(field) = self.parse_var_decl() {
                    fields.push(field);
                    continue;
                }
            } else {
                self.error_here("expected a field declaration");
            }
            self.sync_in_block();
        }
        self.expect_punct(Punct::RBrace);
        self.expect_punct(Punct::Semicolon);
        StructDecl {
            name,
            fields,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_fn_decl(&mut self, start: Span, ret: TypeRef, name: Ident) -> FnDecl {
        self.expect_punct(Punct::LParen);
        let mut formals = Vec::new();
        if !self.at_punct(Punct::RParen) {
            loop {
                match self.parse_formal() {
                    Some(formal) => formals.push(formal),
                    None => break,
                }
                if self.eat_punct(Punct::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen);
        let body = self.parse_block();
        FnDecl {
            ret,
            name,
            formals,
            body,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_formal(&mut self) -> Option<FormalDecl> {
        let start = self.peek_span();
        let ty = self.parse_type()?;
        let name = self.expect_ident();
        Some(FormalDecl {
            ty,
            name,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_var_decl(&mut self) -> Option<VarDecl> {
        let start = self.peek_span();
        let ty = self.parse_type()?;
        let name = self.expect_ident();
        self.expect_punct(Punct::Semicolon);
        Some(VarDecl {
            ty,
            name,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_type(&mut self) -> Option<TypeRef> {
        let span = self.peek_span();
        let kind = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Int) => TypeRefKind::Int,
            TokenKind::Keyword(Keyword::Bool) => TypeRefKind::Bool,
            TokenKind::Keyword(Keyword::Void) => TypeRefKind::Void,
            TokenKind::Keyword(Keyword::Struct) => {
                self.bump();
                let name = self.expect_ident();
                return Some(TypeRef {
                    kind: TypeRefKind::Struct(name),
                    span: span.merge(self.prev_span()),
                });
            }
            _ => {
                self.error_here("expected a type");
                return None;
            }
        };
        self.bump();
        Some(TypeRef { kind, span })
    }

    fn parse_block(&mut self) -> Block {
        let start = self.expect_punct(Punct::LBrace);
        let mut decls = Vec::new();
        while self.starts_type() {
            match self.parse_var_decl() {
                Some(decl) => decls.push(decl),
                None => self.sync_in_block(),
            }
        }
        let mut stmts = Vec::new();
        while !self.at_punct(Punct::RBrace) && !self.at_eof() {
            match self.parse_stmt() {
                Some(stmt) => stmts.push(stmt),
                None => self.sync_in_block(),
            }
        }
        self.expect_punct(Punct::RBrace);
        Block {
            decls,
            stmts,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_stmt(&mut self) -> Option<Stmt> {
        let start = self.peek_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Ident(_) => {
                if matches!(self.peek_kind_n(1), TokenKind::Punct(Punct::LParen)) {
                    let call = self.parse_call();
                    self.expect_punct(Punct::Semicolon);
                    StmtKind::Call(call)
                } else {
                    let target = self.parse_loc_expr();
                    let kind = if self.eat_punct(Punct::Assign).is_some() {
                        let value = self.parse_expr();
                        StmtKind::Assign(Assign {
                            target: Box::new(target),
                            value: Box::new(value),
                        })
                    } else if self.eat_punct(Punct::PlusPlus).is_some() {
                        StmtKind::PostInc(target)
                    } else if self.eat_punct(Punct::MinusMinus).is_some() {
                        StmtKind::PostDec(target)
                    } else {
                        self.error_here("expected '=', '++' or '--' after location");
                        return None;
                    };
                    self.expect_punct(Punct::Semicolon);
                    kind
                }
            }
            TokenKind::Keyword(Keyword::Cin) => {
                self.bump();
                self.expect_punct(Punct::ShiftRight);
                if !matches!(self.peek_kind(), TokenKind::Ident(_)) {
                    self.error_here("expected a location after '>>'");
                    return None;
                }
                let target = self.parse_loc_expr();
                self.expect_punct(Punct::Semicolon);
                StmtKind::Read(target)
            }
            TokenKind::Keyword(Keyword::Cout) => {
                self.bump();
                self.expect_punct(Punct::ShiftLeft);
                let expr = self.parse_expr();
                self.expect_punct(Punct::Semicolon);
                StmtKind::Write(expr)
            }
            TokenKind::Keyword(Keyword::If) => {
                self.bump();
                let cond = self.parse_paren_cond();
                let then_block = self.parse_block();
                let else_block = if self.eat_keyword(Keyword::Else).is_some() {
                    Some(self.parse_block())
                } else {
                    None
                };
                StmtKind::If {
                    cond,
                    then_block,
                    else_block,
                }
            }
            TokenKind::Keyword(Keyword::While) => {
                self.bump();
                let cond = self.parse_paren_cond();
                let block = self.parse_block();
                StmtKind::While { cond, block }
            }
            TokenKind::Keyword(Keyword::Repeat) => {
                self.bump();
                let cond = self.parse_paren_cond();
                let block = self.parse_block();
                StmtKind::Repeat { cond, block }
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                let expr = if self.at_punct(Punct::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr())
                };
                self.expect_punct(Punct::Semicolon);
                StmtKind::Return(expr)
            }
            _ if self.starts_type() => {
                self.error_here("declarations must come before statements");
                return None;
            }
            _ => {
                self.error_here("expected a statement");
                return None;
            }
        };
        Some(Stmt {
            kind,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_paren_cond(&mut self) -> Expr {
        self.expect_punct(Punct::LParen);
        let cond = self.parse_expr();
        self.expect_punct(Punct::RParen);
        cond
    }

    fn parse_expr(&mut self) -> Expr {
        let expr = self.parse_or();
        if !self.at_punct(Punct::Assign) {
            return expr;
        }
        if !matches!(expr.kind, ExprKind::Ident(_) | ExprKind::Dot(_)) {
            self.error_here("left side of assignment must be a location");
        }
        self.bump();
        let value = self.parse_expr();
        let span = expr.span.merge(value.span);
        Expr {
            kind: ExprKind::Assign(Assign {
                target: Box::new(expr),
                value: Box::new(value),
            }),
            span,
        }
    }

    fn parse_or(&mut self) -> Expr {
        let mut expr = self.parse_and();
        while self.eat_punct(Punct::OrOr).is_some() {
            let right = self.parse_and();
            expr = binary(BinaryOp::Or, expr, right);
        }
        expr
    }

    fn parse_and(&mut self) -> Expr {
        let mut expr = self.parse_cmp();
        while self.eat_punct(Punct::AndAnd).is_some() {
            let right = self.parse_cmp();
            expr = binary(BinaryOp::And, expr, right);
        }
        expr
    }

    fn parse_cmp(&mut self) -> Expr {
        let mut expr = self.parse_add();
        let mut chained = false;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Punct(Punct::EqEq) => BinaryOp::Eq,
                TokenKind::Punct(Punct::NotEq) => BinaryOp::NotEq,
                TokenKind::Punct(Punct::Lt) => BinaryOp::Lt,
                TokenKind::Punct(Punct::Gt) => BinaryOp::Gt,
                TokenKind::Punct(Punct::LtEq) => BinaryOp::LtEq,
                TokenKind::Punct(Punct::GtEq) => BinaryOp::GtEq,
                _ => break,
            };
            if chained {
                self.error_here("comparison operators cannot be chained");
            }
            self.bump();
            let right = self.parse_add();
            expr = binary(op, expr, right);
            chained = true;
        }
        expr
    }

    fn parse_add(&mut self) -> Expr {
        let mut expr = self.parse_mul();
        loop {
            let op = if self.eat_punct(Punct::Plus).is_some() {
                BinaryOp::Add
            } else if self.eat_punct(Punct::Minus).is_some() {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_mul();
            expr = binary(op, expr, right);
        }
        expr
    }

    fn parse_mul(&mut self) -> Expr {
        let mut expr = self.parse_unary();
        loop {
            let op = if self.eat_punct(Punct::Star).is_some() {
                BinaryOp::Mul
            } else if self.eat_punct(Punct::Slash).is_some() {
                BinaryOp::Div
            } else {
                break;
            };
            let right = self.parse_unary();
            expr = binary(op, expr, right);
        }
        expr
    }

    fn parse_unary(&mut self) -> Expr {
        let start = self.peek_span();
        let op = if self.eat_punct(Punct::Minus).is_some() {
            UnaryOp::Neg
        } else if self.eat_punct(Punct::Bang).is_some() {
            UnaryOp::Not
        } else {
            return self.parse_primary();
        };
        let expr = self.parse_unary();
        let span = start.merge(expr.span);
        Expr {
            kind: ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
            span,
        }
    }

    fn parse_primary(&mut self) -> Expr {
        let span = self.peek_span();
        let literal = match self.peek_kind().clone() {
            TokenKind::Int(value) => Literal::Int(value),
            TokenKind::String(raw) => Literal::Str(raw),
            TokenKind::Bool(value) => Literal::Bool(value),
            TokenKind::Punct(Punct::LParen) => {
                self.bump();
                let mut expr = self.parse_expr();
                let end = self.expect_punct(Punct::RParen);
                expr.span = span.merge(end);
                return expr;
            }
            TokenKind::Ident(_) => {
                if matches!(self.peek_kind_n(1), TokenKind::Punct(Punct::LParen)) {
                    let call = self.parse_call();
                    return Expr {
                        kind: ExprKind::Call(call),
                        span: span.merge(self.prev_span()),
                    };
                }
                return self.parse_loc_expr();
            }
            _ => {
                self.error_here("expected expression");
                return Expr {
                    kind: ExprKind::Literal(Literal::Int(0)),
                    span,
                };
            }
        };
        self.bump();
        Expr {
            kind: ExprKind::Literal(literal),
            span,
        }
    }

    fn parse_call(&mut self) -> Call {
        let callee = self.expect_ident();
        self.expect_punct(Punct::LParen);
        let mut args = Vec::new();
        if !self.at_punct(Punct::RParen) {
            loop {
                args.push(self.parse_expr());
                if self.eat_punct(Punct::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen);
        Call { callee, args }
    }

    /// `ID ('.' ID)*` as an identifier or dot-access expression.
    fn parse_loc_expr(&mut self) -> Expr {
        let first = self.expect_ident();
        let span = first.span;
        let mut loc = Loc::Ident(first);
        while self.eat_punct(Punct::Dot).is_some() {
            let field = self.expect_ident();
            loc = Loc::Dot(Box::new(DotAccess {
                base: loc,
                field,
                resolved: None,
            }));
        }
        let kind = match loc {
            Loc::Ident(ident) => ExprKind::Ident(ident),
            Loc::Dot(dot) => ExprKind::Dot(*dot),
        };
        Expr {
            kind,
            span: span.merge(self.prev_span()),
        }
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Keyword(Keyword::Int | Keyword::Bool | Keyword::Void | Keyword::Struct)
        )
    }

    /// Skips to just past the next `;` or `}` at the current nesting level.
    fn sync_past_terminator(&mut self) {
        while !self.at_eof() {
            match self.bump().kind {
                TokenKind::Punct(Punct::Semicolon) | TokenKind::Punct(Punct::RBrace) => break,
                _ => {}
            }
        }
    }

    /// Like `sync_past_terminator` but stops in front of a closing `}` so the
    /// enclosing block can consume it.
    fn sync_in_block(&mut self) {
        while !self.at_eof() && !self.at_punct(Punct::RBrace) {
            if self.bump().kind == TokenKind::Punct(Punct::Semicolon) {
                break;
            }
        }
    }

    fn expect_ident(&mut self) -> Ident {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Ident::new(name, self.prev_span())
            }
            _ => {
                self.error_here("expected identifier");
                Ident::new("_", self.peek_span())
            }
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) {
        if self.eat_keyword(kw).is_none() {
            self.error_here(&format!("expected '{}'", kw.as_str()));
        }
    }

    fn expect_punct(&mut self, punct: Punct) -> Span {
        if self.eat_punct(punct).is_some() {
            self.prev_span()
        } else {
            self.error_here(&format!("expected '{}'", punct.as_str()));
            self.peek_span()
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> Option<Token> {
        if self.at_keyword(kw) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn eat_punct(&mut self, punct: Punct) -> Option<Token> {
        if self.at_punct(punct) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn at_punct(&self, punct: Punct) -> bool {
        matches!(self.peek_kind(), TokenKind::Punct(p) if *p == punct)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn error_here(&mut self, message: &str) {
        let span = self.peek_span();
        self.diags.error(span, message);
    }

    fn peek_kind(&self) -> &TokenKind {
        self.peek_kind_n(0)
    }

    fn peek_kind_n(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .or_else(|| self.tokens.last())
            .map(|t| &t.kind)
            .unwrap_or(&EOF)
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or_else(|| Token {
            kind: TokenKind::Eof,
            span: self.peek_span(),
        });
        if !self.at_eof() {
            self.pos += 1;
        }
        tok
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            self.peek_span()
        } else {
            self.tokens[self.pos - 1].span
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr {
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    }
}
