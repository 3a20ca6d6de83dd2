use std::{collections::HashMap, mem};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SymbolScope {
    Global,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// Bindings of one lexical scope, chained to the scope enclosing it.
///
/// The global table is the one without an outer table. Every table nested
/// inside it hands out `Local` symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    num_definitions: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Bind `name` to the next free index of this table. Redefining a name
    /// shadows the earlier binding.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_some() {
            SymbolScope::Local
        } else {
            SymbolScope::Global
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    /// Look `name` up here first, then in each enclosing table in turn.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        match self.store.get(name) {
            Some(symbol) => Some(symbol),
            None => self.outer.as_ref()?.resolve(name),
        }
    }

    pub fn outer(&self) -> Option<&SymbolTable> {
        self.outer.as_deref()
    }

    /// Detach and return the enclosing table, leaving this one without an
    /// outer table. Used when leaving a function scope.
    pub fn take_outer(&mut self) -> Option<SymbolTable> {
        self.outer.take().map(|outer| *outer)
    }

    /// Number of indices handed out so far, shadowed ones included. For a
    /// function scope this is the number of local slots the VM must reserve.
    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }

    /// Swap in a fresh table enclosed by the current one.
    pub(crate) fn enclose(&mut self) {
        let outer = mem::take(self);
        *self = SymbolTable::new_enclosed(outer);
    }

    /// Discard the current table and resume with its enclosing one.
    pub(crate) fn unenclose(&mut self) -> SymbolTable {
        let outer = self.take_outer().unwrap_or_default();
        mem::replace(self, outer)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn symbol(name: &str, scope: SymbolScope, index: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            scope,
            index,
        }
    }

    #[test]
    fn define() {
        let mut global = SymbolTable::new();
        assert_eq!(global.define("a"), symbol("a", SymbolScope::Global, 0));
        assert_eq!(global.define("b"), symbol("b", SymbolScope::Global, 1));

        let mut first_local = SymbolTable::new_enclosed(global);
        assert_eq!(first_local.define("c"), symbol("c", SymbolScope::Local, 0));
        assert_eq!(first_local.define("d"), symbol("d", SymbolScope::Local, 1));

        let mut second_local = SymbolTable::new_enclosed(first_local);
        assert_eq!(second_local.define("e"), symbol("e", SymbolScope::Local, 0));
        assert_eq!(second_local.define("f"), symbol("f", SymbolScope::Local, 1));
    }

    #[test]
    fn resolve_global() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");

        assert_eq!(global.resolve("a"), Some(&symbol("a", SymbolScope::Global, 0)));
        assert_eq!(global.resolve("b"), Some(&symbol("b", SymbolScope::Global, 1)));
        assert_eq!(global.resolve("c"), None);
    }

    #[test]
    fn resolve_nested_local() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");

        let mut first_local = SymbolTable::new_enclosed(global);
        first_local.define("c");
        first_local.define("d");

        let mut second_local = SymbolTable::new_enclosed(first_local.clone());
        second_local.define("e");
        second_local.define("f");

        let expected = [
            symbol("a", SymbolScope::Global, 0),
            symbol("b", SymbolScope::Global, 1),
            symbol("c", SymbolScope::Local, 0),
            symbol("d", SymbolScope::Local, 1),
        ];
        for sym in &expected {
            assert_eq!(first_local.resolve(&sym.name), Some(sym));
        }

        let expected = [
            symbol("a", SymbolScope::Global, 0),
            symbol("b", SymbolScope::Global, 1),
            symbol("e", SymbolScope::Local, 0),
            symbol("f", SymbolScope::Local, 1),
        ];
        for sym in &expected {
            assert_eq!(second_local.resolve(&sym.name), Some(sym));
        }
    }

    #[test]
    fn inner_definition_shadows_outer() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut local = SymbolTable::new_enclosed(global);
        local.define("a");

        assert_eq!(local.resolve("a"), Some(&symbol("a", SymbolScope::Local, 0)));
        assert_eq!(
            local.outer().unwrap().resolve("a"),
            Some(&symbol("a", SymbolScope::Global, 0))
        );
    }

    #[test]
    fn redefinition_rebinds_to_new_index() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");
        let redefined = global.define("a");

        assert_eq!(redefined, symbol("a", SymbolScope::Global, 2));
        assert_eq!(global.resolve("a"), Some(&redefined));
        assert_eq!(global.num_definitions(), 3);
    }

    #[test]
    fn enclose_and_unenclose_restore_outer() {
        let mut table = SymbolTable::new();
        table.define("a");
        let global = table.clone();

        table.enclose();
        assert_eq!(table.outer(), Some(&global));
        table.define("b");
        assert_eq!(table.resolve("b"), Some(&symbol("b", SymbolScope::Local, 0)));

        let inner = table.unenclose();
        assert_eq!(inner.num_definitions(), 1);
        assert_eq!(table, global);
        assert_eq!(table.outer(), None);
        assert_eq!(table.resolve("b"), None);
    }
}
