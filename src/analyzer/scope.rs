//! The analyzer's symbol table — a stack of lexical scopes (`spec.md` §3).

use crate::diagnostic::Position;
use crate::parser::ast::Type;
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
    pub is_function: bool,
    pub declared_at: Position,
}

#[derive(Default)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
        debug!("pushed scope, depth now {}", self.scopes.len());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        debug!("popped scope, depth now {}", self.scopes.len());
        debug_assert!(!self.scopes.is_empty(), "popped the global scope");
    }

    /// Defines `symbol` in the current (innermost) scope. Returns `false`
    /// (and does not overwrite the existing binding) if the name is already
    /// defined in that same scope — the first definition wins.
    pub fn define(&mut self, symbol: Symbol) -> bool {
        let scope = self.scopes.last_mut().expect("at least one scope");
        if scope.contains_key(&symbol.name) {
            return false;
        }
        scope.insert(symbol.name.clone(), symbol);
        true
    }

    /// Resolves `name` by walking from the current scope outward.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Refines the recorded type of an already-defined symbol, e.g. once an
    /// initializer's inferred type is known. No-op if `name` isn't bound.
    pub fn update_type(&mut self, name: &str, ty: Type) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(sym) = scope.get_mut(name) {
                sym.ty = ty;
                return;
            }
        }
    }

    pub fn is_defined_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .map(|scope| scope.contains_key(name))
            .unwrap_or(false)
    }
}
