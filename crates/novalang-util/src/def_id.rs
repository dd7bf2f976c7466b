use std::sync::atomic::{AtomicU32, Ordering};

use crate::index_vec::Idx;

/// Globally unique id assigned to every declaration (class, function,
/// property, parameter...) as `AstToHir` walks the tree. `DefId`s are never
/// reused within a module, so they double as a stable cross-reference key
/// between HIR and MIR tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefId(pub u32);

impl DefId {
    pub const DUMMY: DefId = DefId(u32::MAX);

    pub fn is_dummy(self) -> bool {
        self == DefId::DUMMY
    }
}

impl Idx for DefId {
    fn from_usize(index: usize) -> Self {
        DefId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Issues monotonically increasing `DefId`s. One generator is shared across
/// the whole `AstToHir` pass for a module so every declaration — including
/// ones synthesized later by `HirToMir` (closure classes, accessor methods)
/// — gets a distinct id.
pub struct DefIdGenerator {
    counter: AtomicU32,
}

impl DefIdGenerator {
    pub fn new() -> Self {
        DefIdGenerator {
            counter: AtomicU32::new(0),
        }
    }

    pub fn next(&self) -> DefId {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        if id == u32::MAX {
            panic!("DefId overflow! Compiler reached maximum number of definitions.");
        }
        DefId(id)
    }
}

impl Default for DefIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_distinct() {
        let gen = DefIdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert_ne!(a, b);
        assert_eq!(b.0, a.0 + 1);
    }

    #[test]
    fn dummy_is_not_produced_by_normal_generation() {
        let gen = DefIdGenerator::new();
        assert!(!gen.next().is_dummy());
        assert!(DefId::DUMMY.is_dummy());
    }
}
