pub mod check;
pub mod scope;
pub mod symbols;

use wumbo_rt::log;

use crate::ast::Program;
use crate::diag::{Diag, Diagnostics};

pub use check::InternalError;

pub struct Analysis {
    pub symbols: symbols::SymbolTable,
}

/// Resolves every identifier in `program`, writing symbol ids into the tree.
/// User errors come back as diagnostics; `Err` means the analyzer itself
/// broke an invariant and the tree must not be used.
pub fn analyze_program(program: &mut Program) -> Result<(Analysis, Vec<Diag>), InternalError> {
    let mut diags = Diagnostics::default();
    let mut checker = check::Checker::new(&mut diags);
    checker.check_program(program)?;
    let symbols = checker.finish();
    if log::enabled() {
        log::info(&format!(
            "name analysis: {} declaration(s), {} symbol(s), {} diagnostic(s)",
            program.decls.len(),
            symbols.len(),
            diags.len()
        ));
    }
    Ok((Analysis { symbols }, diags.into_vec()))
}
