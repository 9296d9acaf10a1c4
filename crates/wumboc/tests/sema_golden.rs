use wumboc::ast::{
    Block, Decl, DotAccess, Expr, ExprKind, Ident, Loc, Program, StmtKind, TypeRef, TypeRefKind,
};
use wumboc::diag::Diagnostics;
use wumboc::sema::check::Checker;
use wumboc::sema::scope::{ScopeError, ScopeStack};
use wumboc::sema::symbols::{SymbolKind, TypeName};
use wumboc::sema::{self, InternalError};
use wumboc::parse_source;

fn src(lines: &[&str]) -> String {
    lines.join("\n")
}

fn parse(src: &str) -> Program {
    let (program, parse_diags) = parse_source(src);
    if !parse_diags.is_empty() {
        let mut out = String::new();
        for diag in parse_diags {
            out.push_str(&format!("{diag}\n"));
        }
        panic!("expected parse success, got diagnostics:\n{out}");
    }
    program
}

fn analyze(src: &str) -> Vec<String> {
    let mut program = parse(src);
    let (_analysis, diags) = match sema::analyze_program(&mut program) {
        Ok(result) => result,
        Err(err) => panic!("internal error: {err}"),
    };
    let mut out: Vec<String> = diags
        .into_iter()
        .map(|diag| format!("{}:{}: {}", diag.span.line, diag.span.col, diag.message))
        .collect();
    out.sort();
    out
}

fn assert_diags(src: &str, expected: &[&str]) {
    let actual = analyze(src);
    let mut expected_sorted: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected_sorted.sort();
    assert_eq!(actual, expected_sorted);
}

/// Names of identifier occurrences that analysis left without a symbol.
fn unresolved(program: &Program) -> Vec<String> {
    let mut out = Vec::new();
    for decl in &program.decls {
        match decl {
            Decl::Var(decl) => {
                visit_type(&decl.ty, &mut out);
                visit_ident(&decl.name, &mut out);
            }
            Decl::Fn(decl) => {
                visit_type(&decl.ret, &mut out);
                visit_ident(&decl.name, &mut out);
                for formal in &decl.formals {
                    visit_type(&formal.ty, &mut out);
                    visit_ident(&formal.name, &mut out);
                }
                visit_block(&decl.body, &mut out);
            }
            Decl::Struct(decl) => {
                visit_ident(&decl.name, &mut out);
                for field in &decl.fields {
                    visit_type(&field.ty, &mut out);
                    visit_ident(&field.name, &mut out);
                }
            }
        }
    }
    out
}

fn visit_ident(ident: &Ident, out: &mut Vec<String>) {
    if ident.sym.is_none() {
        out.push(ident.name.clone());
    }
}

fn visit_type(ty: &TypeRef, out: &mut Vec<String>) {
    if let TypeRefKind::Struct(name) = &ty.kind {
        visit_ident(name, out);
    }
}

fn visit_block(block: &Block, out: &mut Vec<String>) {
    for decl in &block.decls {
        visit_type(&decl.ty, out);
        visit_ident(&decl.name, out);
    }
    for stmt in &block.stmts {
        match &stmt.kind {
            StmtKind::Assign(assign) => {
                visit_expr(&assign.target, out);
                visit_expr(&assign.value, out);
            }
            StmtKind::PostInc(expr)
            | StmtKind::PostDec(expr)
            | StmtKind::Read(expr)
            | StmtKind::Write(expr) => visit_expr(expr, out),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                visit_expr(cond, out);
                visit_block(then_block, out);
                if let Some(else_block) = else_block {
                    visit_block(else_block, out);
                }
            }
            StmtKind::While { cond, block } | StmtKind::Repeat { cond, block } => {
                visit_expr(cond, out);
                visit_block(block, out);
            }
            StmtKind::Call(call) => {
                visit_ident(&call.callee, out);
                for arg in &call.args {
                    visit_expr(arg, out);
                }
            }
            StmtKind::Return(expr) => {
                if let Some(expr) = expr {
                    visit_expr(expr, out);
                }
            }
        }
    }
}

fn visit_expr(expr: &Expr, out: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::Literal(_) => {}
        ExprKind::Ident(ident) => visit_ident(ident, out),
        ExprKind::Dot(dot) => visit_dot(dot, out),
        ExprKind::Assign(assign) => {
            visit_expr(&assign.target, out);
            visit_expr(&assign.value, out);
        }
        ExprKind::Call(call) => {
            visit_ident(&call.callee, out);
            for arg in &call.args {
                visit_expr(arg, out);
            }
        }
        ExprKind::Unary { expr, .. } => visit_expr(expr, out),
        ExprKind::Binary { left, right, .. } => {
            visit_expr(left, out);
            visit_expr(right, out);
        }
    }
}

fn visit_dot(dot: &DotAccess, out: &mut Vec<String>) {
    match &dot.base {
        Loc::Ident(base) => visit_ident(base, out),
        Loc::Dot(inner) => visit_dot(inner, out),
    }
    visit_ident(&dot.field, out);
    if dot.resolved.is_none() {
        out.push(format!("{} (unresolved type)", dot.field.name));
    }
}

fn first_stmt_dot(program: &Program, fn_name: &str) -> DotAccess {
    let body = program.decls.iter().find_map(|decl| match decl {
        Decl::Fn(decl) if decl.name.name == fn_name => Some(&decl.body),
        _ => None,
    });
    let Some(body) = body else {
        panic!("no function {fn_name}");
    };
    match body.stmts.first().map(|stmt| &stmt.kind) {
        Some(StmtKind::Assign(assign)) => match &assign.target.kind {
            ExprKind::Dot(dot) => dot.clone(),
            other => panic!("expected a dot access target, got {other:?}"),
        },
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[test]
fn resolves_every_identifier_in_a_valid_program() {
    let src = src(&[
        "struct Point{ int x; int y; };",
        "struct Line{ struct Point a; struct Point b; };",
        "int count;",
        "int add(int a, int b) {",
        "    int sum;",
        "    sum = a + b;",
        "    return sum;",
        "}",
        "void main() {",
        "    struct Line l;",
        "    l.a.x = add(1, 2);",
        "    cin >> l.b.y;",
        "    count++;",
        "    if (l.a.x < 3) { cout << \"small\"; } else { count--; }",
        "    while (count > 0) { count = count - 1; }",
        "    repeat (count) { cout << count; }",
        "    main();",
        "}",
    ]);
    let mut program = parse(&src);
    let (analysis, diags) = match sema::analyze_program(&mut program) {
        Ok(result) => result,
        Err(err) => panic!("internal error: {err}"),
    };
    assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    assert_eq!(unresolved(&program), Vec::<String>::new());
    // 2 struct types, 4 fields, 1 global, 2 functions, 2 formals, 2 locals.
    assert_eq!(analysis.symbols.len(), 13);
}

#[test]
fn annotates_dot_chains_with_field_types() {
    let src = src(&[
        "struct Inner{ int v; };",
        "struct Outer{ struct Inner i; };",
        "struct Outer o;",
        "void f() {",
        "    o.i.v = 1;",
        "}",
    ]);
    let mut program = parse(&src);
    let (analysis, diags) = match sema::analyze_program(&mut program) {
        Ok(result) => result,
        Err(err) => panic!("internal error: {err}"),
    };
    assert!(diags.is_empty());

    let outer = first_stmt_dot(&program, "f");
    assert_eq!(outer.resolved.as_deref(), Some("int"));
    let Loc::Dot(inner) = &outer.base else {
        panic!("expected a nested dot access");
    };
    assert_eq!(inner.resolved.as_deref(), Some("Inner"));
    let Loc::Ident(base) = &inner.base else {
        panic!("expected the chain to start at an identifier");
    };
    let base_sym = base.sym.and_then(|id| analysis.symbols.get(id));
    assert_eq!(
        base_sym.map(|sym| sym.kind.clone()),
        Some(SymbolKind::Scalar(TypeName::Struct("Outer".to_string())))
    );
    let field_sym = outer.field.sym.and_then(|id| analysis.symbols.get(id));
    assert_eq!(field_sym.map(|sym| sym.name.as_str()), Some("v"));
}

#[test]
fn rejects_duplicate_globals() {
    assert_diags("int x;\nbool x;", &["2:6: Multiply declared identifier"]);
}

#[test]
fn inner_scopes_shadow_outer_declarations() {
    let src = src(&[
        "int x;",
        "void f() {",
        "    bool x;",
        "    if (x) {",
        "        int x;",
        "        x = 1;",
        "    }",
        "}",
    ]);
    assert_diags(&src, &[]);
}

#[test]
fn formals_share_the_body_scope() {
    let src = src(&["int x;", "void f(int x) {", "    bool x;", "}"]);
    assert_diags(&src, &["3:10: Multiply declared identifier"]);
}

#[test]
fn block_locals_do_not_outlive_the_block() {
    let src = src(&[
        "void f() {",
        "    if (true) { int t; }",
        "    t = 1;",
        "}",
    ]);
    assert_diags(&src, &["3:5: Undeclared identifier"]);
}

#[test]
fn conditions_resolve_in_the_enclosing_scope() {
    assert_diags(
        "void f() { if (x) { bool x; } }",
        &["1:16: Undeclared identifier"],
    );
}

#[test]
fn reports_undeclared_uses() {
    assert_diags("void f() { y = 1; }", &["1:12: Undeclared identifier"]);
}

#[test]
fn rejects_void_variables_and_formals() {
    assert_diags("void v;", &["1:6: Non-function declared void"]);
    assert_diags("void f(void a) { }", &["1:13: Non-function declared void"]);
    assert_diags(
        "int v;\nvoid v;",
        &[
            "2:6: Multiply declared identifier",
            "2:6: Non-function declared void",
        ],
    );
}

#[test]
fn struct_variables_need_a_declared_struct_type() {
    let src = src(&["struct Nope n;", "void f() { n = 1; }"]);
    assert_diags(
        &src,
        &[
            "1:8: Invalid name of struct type",
            "2:12: Undeclared identifier",
        ],
    );
}

#[test]
fn struct_types_and_variables_use_separate_namespaces() {
    let src = src(&[
        "struct Point{ int x; };",
        "struct Point Point;",
        "void f() { Point.x = 1; }",
    ]);
    assert_diags(&src, &[]);
}

#[test]
fn plain_names_clash_with_struct_types_in_one_scope() {
    assert_diags(
        "struct Point{ int x; };\nint Point;",
        &["2:5: Multiply declared identifier"],
    );
    assert_diags(
        "int Point;\nstruct Point{ int x; };",
        &["2:8: Multiply declared identifier"],
    );
    assert_diags(
        "struct P{ int x; };\nvoid P() { }",
        &["2:6: Multiply declared identifier"],
    );
}

#[test]
fn checks_struct_bodies_like_scopes() {
    assert_diags(
        "struct S{ int a; bool a; };",
        &["1:23: Multiply declared identifier"],
    );
    assert_diags(
        "struct S{ void a; };",
        &["1:16: Non-function declared void"],
    );
    assert_diags(
        "struct S{ struct S next; };",
        &["1:18: Invalid name of struct type"],
    );
}

#[test]
fn reports_each_broken_dot_chain_once() {
    let src = src(&[
        "struct Inner{ int v; };",
        "struct Outer{ struct Inner i; int n; };",
        "struct Outer o;",
        "int k;",
        "void f() {",
        "    o.i.v = 1;",
        "    o.i.missing = 2;",
        "    o.missing.v = 3;",
        "    o.n.v = 4;",
        "    k.v = 5;",
        "    z.v = 6;",
        "}",
    ]);
    assert_diags(
        &src,
        &[
            "7:9: Invalid struct field name",
            "8:7: Invalid struct field name",
            "9:7: Dot-access of non-struct type",
            "10:5: Dot-access of non-struct type",
            "11:5: Undeclared identifier",
        ],
    );
}

#[test]
fn only_functions_can_be_called() {
    assert_diags(
        "int g;\nvoid f() { g(); }",
        &["2:12: Undeclared identifier"],
    );
    assert_diags(
        "void f() { h(q); }",
        &["1:12: Undeclared identifier", "1:14: Undeclared identifier"],
    );
}

#[test]
fn functions_are_visible_inside_their_own_body() {
    assert_diags("int f(int n) { return f(n - 1); }", &[]);
}

#[test]
fn duplicate_functions_still_have_their_bodies_checked() {
    assert_diags(
        "void f() { }\nint f() { return y; }",
        &[
            "2:5: Multiply declared identifier",
            "2:18: Undeclared identifier",
        ],
    );
}

#[test]
fn invalid_struct_return_types_keep_the_function() {
    assert_diags(
        "struct Nope f() { }\nvoid g() { f(); }",
        &["1:8: Invalid name of struct type"],
    );
}

#[test]
fn scope_depth_returns_to_global_after_analysis() {
    let src = src(&[
        "struct S{ int a; };",
        "void f(int p) {",
        "    if (p) { int q; } else { bool q; }",
        "    while (p) { repeat (p) { undeclared = 1; } }",
        "}",
    ]);
    let mut program = parse(&src);
    let mut diags = Diagnostics::default();
    let mut checker = Checker::new(&mut diags);
    assert_eq!(checker.check_program(&mut program), Ok(()));
    assert_eq!(checker.scopes().depth(), 1);
    drop(checker);
    assert_eq!(diags.len(), 1);
}

#[test]
fn popping_the_global_scope_is_an_internal_error() {
    let mut stack = ScopeStack::new();
    let err = match stack.exit_scope() {
        Ok(_) => panic!("global scope was popped"),
        Err(err) => err,
    };
    assert_eq!(err, ScopeError::EmptyStack);
    let internal = InternalError::from(err);
    assert_eq!(internal, InternalError::Scope(ScopeError::EmptyStack));
    assert!(internal.to_string().contains("no removable scope"));
}
