use std::collections::HashMap;

use novalang_util::{DefId, Idx, IndexVec, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RibId(pub u32);

impl Idx for RibId {
    fn from_usize(idx: usize) -> Self {
        RibId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RibKind {
    Module,
    Class,
    Function,
    Block,
    Loop(Option<Symbol>),
    Lambda,
}

#[derive(Debug)]
pub struct Rib {
    pub bindings: HashMap<Symbol, DefId>,
    pub parent: Option<RibId>,
    pub kind: RibKind,
}

/// Lexical scope chain used by `AstToHir` to resolve identifiers to
/// `DefId`s. A name resolves to the nearest enclosing rib that binds it;
/// lambda ribs are walked through like any other rib — the closure/capture
/// analyzer in `novalang-mir` is what later decides which of those outer
/// bindings become captures.
pub struct ScopeTree {
    pub ribs: IndexVec<RibId, Rib>,
    pub current_rib: RibId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut ribs = IndexVec::new();
        let root = ribs.push(Rib {
            bindings: HashMap::new(),
            parent: None,
            kind: RibKind::Module,
        });
        ScopeTree {
            ribs,
            current_rib: root,
        }
    }

    pub fn enter_scope(&mut self, kind: RibKind) -> RibId {
        let new_rib = self.ribs.push(Rib {
            bindings: HashMap::new(),
            parent: Some(self.current_rib),
            kind,
        });
        self.current_rib = new_rib;
        new_rib
    }

    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.ribs[self.current_rib].parent {
            self.current_rib = parent;
        }
    }

    pub fn add_binding(&mut self, name: Symbol, def_id: DefId) {
        self.ribs[self.current_rib].bindings.insert(name, def_id);
    }

    pub fn resolve(&self, name: Symbol) -> Option<DefId> {
        let mut rib_id = self.current_rib;
        loop {
            let rib = &self.ribs[rib_id];
            if let Some(&def_id) = rib.bindings.get(&name) {
                return Some(def_id);
            }
            match rib.parent {
                Some(parent) => rib_id = parent,
                None => return None,
            }
        }
    }

    /// Nearest enclosing loop rib, for resolving unlabeled `break`/`continue`.
    pub fn innermost_loop(&self) -> Option<RibId> {
        let mut rib_id = self.current_rib;
        loop {
            if matches!(self.ribs[rib_id].kind, RibKind::Loop(_)) {
                return Some(rib_id);
            }
            rib_id = self.ribs[rib_id].parent?;
        }
    }

    /// Loop rib matching `label`, for resolving labeled `break`/`continue`.
    pub fn labeled_loop(&self, label: Symbol) -> Option<RibId> {
        let mut rib_id = self.current_rib;
        loop {
            if let RibKind::Loop(Some(rib_label)) = self.ribs[rib_id].kind {
                if rib_label == label {
                    return Some(rib_id);
                }
            }
            rib_id = self.ribs[rib_id].parent?;
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_through_nested_scopes() {
        let mut tree = ScopeTree::new();
        let outer_id = DefId(0);
        tree.add_binding(Symbol::intern("x"), outer_id);
        tree.enter_scope(RibKind::Block);
        assert_eq!(tree.resolve(Symbol::intern("x")), Some(outer_id));
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let mut tree = ScopeTree::new();
        tree.add_binding(Symbol::intern("x"), DefId(0));
        tree.enter_scope(RibKind::Block);
        tree.add_binding(Symbol::intern("x"), DefId(1));
        assert_eq!(tree.resolve(Symbol::intern("x")), Some(DefId(1)));
        tree.exit_scope();
        assert_eq!(tree.resolve(Symbol::intern("x")), Some(DefId(0)));
    }

    #[test]
    fn labeled_loop_is_found_across_nested_blocks() {
        let mut tree = ScopeTree::new();
        let label = Symbol::intern("outer");
        tree.enter_scope(RibKind::Loop(Some(label)));
        let loop_rib = tree.current_rib;
        tree.enter_scope(RibKind::Block);
        assert_eq!(tree.labeled_loop(label), Some(loop_rib));
    }
}
