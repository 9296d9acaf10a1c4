//! Declared names and their meanings.
//!
//! Every [`Symbol`] produced during analysis lives in one [`SymbolTable`]
//! arena and is referred to by [`SymbolId`]. Scopes and AST identifiers only
//! hold ids, so popping a scope never invalidates an annotation written into
//! the tree.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{TypeRef, TypeRefKind};
use crate::span::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The type a declaration names, as written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeName {
    Int,
    Bool,
    Void,
    Struct(String),
}

impl TypeName {
    pub fn from_type_ref(ty: &TypeRef) -> Self {
        match &ty.kind {
            TypeRefKind::Int => TypeName::Int,
            TypeRefKind::Bool => TypeName::Bool,
            TypeRefKind::Void => TypeName::Void,
            TypeRefKind::Struct(name) => TypeName::Struct(name.name.clone()),
        }
    }

    pub fn struct_name(&self) -> Option<&str> {
        match self {
            TypeName::Struct(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Int => f.write_str("int"),
            TypeName::Bool => f.write_str("bool"),
            TypeName::Void => f.write_str("void"),
            TypeName::Struct(name) => f.write_str(name),
        }
    }
}

/// Fields of a struct type, closed once the struct body has been analyzed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTable {
    fields: BTreeMap<String, SymbolId>,
}

impl FieldTable {
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.fields.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

impl FromIterator<(String, SymbolId)> for FieldTable {
    fn from_iter<I: IntoIterator<Item = (String, SymbolId)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    /// A variable, formal or field. Struct-typed bindings carry the struct's
    /// name in their `TypeName`.
    Scalar(TypeName),
    Function {
        params: Vec<TypeName>,
        ret: TypeName,
    },
    Struct(FieldTable),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }

    pub fn is_struct_type(&self) -> bool {
        matches!(self.kind, SymbolKind::Struct(_))
    }

    /// Declared type of a scalar binding.
    pub fn declared_type(&self) -> Option<&TypeName> {
        match &self.kind {
            SymbolKind::Scalar(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&FieldTable> {
        match &self.kind {
            SymbolKind::Struct(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Renders the way annotated output shows a resolved identifier:
/// `int`, `Point`, `int,bool->void`, `struct`.
impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SymbolKind::Scalar(ty) => write!(f, "{ty}"),
            SymbolKind::Function { params, ret } => {
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "{}->{ret}", params.join(","))
            }
            SymbolKind::Struct(_) => f.write_str("struct"),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(idx, sym)| (SymbolId(idx as u32), sym))
    }
}
