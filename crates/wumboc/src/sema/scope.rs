use std::collections::HashMap;
use std::fmt;

use super::symbols::{FieldTable, Symbol, SymbolId, SymbolKind, SymbolTable};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeError {
    /// Only the global scope is left; it can't be popped or bypassed.
    EmptyStack,
    DuplicateName { name: String },
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::EmptyStack => f.write_str("scope stack holds no removable scope"),
            ScopeError::DuplicateName { name } => write!(f, "duplicate name in scope: {name}"),
        }
    }
}

impl std::error::Error for ScopeError {}

/// One lexical scope. Plain identifiers and struct type names live in
/// separate maps, so `p` the variable and `p` the struct type never collide
/// by key.
#[derive(Debug, Default)]
pub struct Scope {
    idents: HashMap<String, SymbolId>,
    struct_types: HashMap<String, SymbolId>,
}

impl Scope {
    pub fn ident(&self, name: &str) -> Option<SymbolId> {
        self.idents.get(name).copied()
    }

    pub fn struct_type(&self, name: &str) -> Option<SymbolId> {
        self.struct_types.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.idents.len() + self.struct_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The plain bindings of a finished struct body.
    pub fn into_field_table(self) -> FieldTable {
        self.idents.into_iter().collect()
    }
}

/// Innermost-last stack of scopes over a symbol arena. Index 0 is the global
/// scope, created with the stack and never popped.
#[derive(Debug)]
pub struct ScopeStack {
    symbols: SymbolTable,
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            scopes: vec![Scope::default()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn exit_scope(&mut self) -> Result<Scope, ScopeError> {
        if self.scopes.len() <= 1 {
            return Err(ScopeError::EmptyStack);
        }
        self.scopes.pop().ok_or(ScopeError::EmptyStack)
    }

    /// Binds `name` in the innermost scope. Struct symbols go to the struct
    /// type namespace, everything else to the plain one; only a clash within
    /// that namespace is a `DuplicateName`.
    pub fn declare(&mut self, name: &str, symbol: Symbol) -> Result<SymbolId, ScopeError> {
        let is_struct = matches!(symbol.kind, SymbolKind::Struct(_));
        let scope = self.scopes.last().ok_or(ScopeError::EmptyStack)?;
        let taken = if is_struct {
            scope.struct_types.contains_key(name)
        } else {
            scope.idents.contains_key(name)
        };
        if taken {
            return Err(ScopeError::DuplicateName {
                name: name.to_string(),
            });
        }
        let id = self.symbols.alloc(symbol);
        let scope = self.scopes.last_mut().ok_or(ScopeError::EmptyStack)?;
        let namespace = if is_struct {
            &mut scope.struct_types
        } else {
            &mut scope.idents
        };
        namespace.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn lookup_local(&self, name: &str) -> Option<SymbolId> {
        self.scopes.last().and_then(|scope| scope.ident(name))
    }

    pub fn lookup_global(&self, name: &str) -> Option<SymbolId> {
        self.scopes.iter().rev().find_map(|scope| scope.ident(name))
    }

    pub fn lookup_struct_local(&self, name: &str) -> Option<SymbolId> {
        self.scopes.last().and_then(|scope| scope.struct_type(name))
    }

    pub fn lookup_struct_global(&self, name: &str) -> Option<SymbolId> {
        self.scopes.iter().rev().find_map(|scope| scope.struct_type(name))
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }
}
