use std::fs;

use wumbo_rt::{config, log};

use crate::diag::{Diag, Level, with_path};
use crate::parse_source;
use crate::sema::analyze_program;
use crate::unparse::{unparse, unparse_annotated};

const USAGE: &str = "usage: wumboc [--dump-ast] [--check] [--unparse] [--annotate] <file>";

pub fn run<I>(args: I) -> i32
where
    I: IntoIterator<Item = String>,
{
    let mut dump_ast = false;
    let mut check = false;
    let mut print = false;
    let mut annotate = config::env_flag("unparse", "annotate").unwrap_or(false);
    let mut path = None;

    for arg in args {
        match arg.as_str() {
            "--dump-ast" => dump_ast = true,
            "--check" => check = true,
            "--unparse" => print = true,
            "--annotate" => annotate = true,
            _ if arg.starts_with("--") => {
                eprintln!("unknown option: {arg}");
                eprintln!("{USAGE}");
                return 1;
            }
            _ if path.is_none() => path = Some(arg),
            _ => {
                eprintln!("unexpected argument: {arg}");
                eprintln!("{USAGE}");
                return 1;
            }
        }
    }

    let path = match path {
        Some(p) => p,
        None => {
            eprintln!("{USAGE}");
            return 1;
        }
    };

    let src = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("failed to read {path}: {err}");
            return 1;
        }
    };

    log::info(&format!("parsing {path}"));
    let (mut program, diags) = parse_source(&src);
    if report(with_path(diags, &path)) {
        return 1;
    }

    // Unparse without --annotate shows the tree exactly as parsed.
    let analyze = check || (print && annotate);
    let mut symbols = None;
    if analyze {
        let (analysis, diags) = match analyze_program(&mut program) {
            Ok(result) => result,
            Err(err) => {
                eprintln!("internal error: {err}");
                return 101;
            }
        };
        if report(with_path(diags, &path)) {
            return 1;
        }
        symbols = Some(analysis.symbols);
    }

    if dump_ast {
        println!("{:#?}", program);
    }
    if print {
        let text = match &symbols {
            Some(symbols) if annotate => unparse_annotated(&program, symbols),
            _ => unparse(&program),
        };
        print!("{text}");
    }
    0
}

/// Prints every diagnostic; true when any of them is an error.
fn report(diags: Vec<Diag>) -> bool {
    let mut failed = false;
    for diag in diags {
        failed |= diag.level == Level::Error;
        eprintln!("{diag}");
    }
    failed
}
