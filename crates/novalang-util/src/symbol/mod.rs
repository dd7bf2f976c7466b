mod interner;

pub use interner::STRING_TABLE;

/// Snapshot of the global string table's load, used to sanity-check memory
/// behaviour in tests and to decide when a manual `reset_stats` is useful
/// in benchmarking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternerStats {
    pub count: usize,
    pub capacity: usize,
    pub collisions: usize,
    pub hits: usize,
    pub misses: usize,
}

impl InternerStats {
    pub fn new(count: usize, capacity: usize, collisions: usize, hits: usize, misses: usize) -> Self {
        InternerStats {
            count,
            capacity,
            collisions,
            hits,
            misses,
        }
    }

    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.count as f64 / self.capacity as f64
        }
    }

    pub fn is_near_capacity(&self) -> bool {
        self.load_factor() > 0.85
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.total_operations();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn total_operations(&self) -> usize {
        self.hits + self.misses
    }

    pub fn memory_efficiency(&self) -> f64 {
        if self.total_operations() == 0 {
            1.0
        } else {
            1.0 - (self.collisions as f64 / self.total_operations() as f64)
        }
    }
}

/// An interned identifier. Two `Symbol`s compare equal iff the strings they
/// name are equal, in O(1), because every unique string is interned exactly
/// once into the global [`STRING_TABLE`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    pub(crate) index: u32,
}

// Keywords, operator-method names and frequently-reused identifiers are
// pre-interned at fixed indices below `RESERVED_SYMBOLS_END` so they never
// need a hash-table insert at runtime. Order here MUST match
// `interner::initialize_known_symbols`.
impl Symbol {
    pub const RESERVED_SYMBOLS_END: u32 = 128;

    // Declaration keywords
    pub const KW_CLASS: Symbol = Symbol { index: 0 };
    pub const KW_INTERFACE: Symbol = Symbol { index: 1 };
    pub const KW_OBJECT: Symbol = Symbol { index: 2 };
    pub const KW_ENUM: Symbol = Symbol { index: 3 };
    pub const KW_FUN: Symbol = Symbol { index: 4 };
    pub const KW_VAL: Symbol = Symbol { index: 5 };
    pub const KW_VAR: Symbol = Symbol { index: 6 };

    // Control flow keywords
    pub const KW_IF: Symbol = Symbol { index: 7 };
    pub const KW_ELSE: Symbol = Symbol { index: 8 };
    pub const KW_WHILE: Symbol = Symbol { index: 9 };
    pub const KW_DO: Symbol = Symbol { index: 10 };
    pub const KW_FOR: Symbol = Symbol { index: 11 };
    pub const KW_RETURN: Symbol = Symbol { index: 12 };
    pub const KW_BREAK: Symbol = Symbol { index: 13 };
    pub const KW_CONTINUE: Symbol = Symbol { index: 14 };
    pub const KW_WHEN: Symbol = Symbol { index: 15 };

    // Pattern / type-test keywords
    pub const KW_IS: Symbol = Symbol { index: 16 };
    pub const KW_AS: Symbol = Symbol { index: 17 };
    pub const KW_IN: Symbol = Symbol { index: 18 };
    pub const KW_OUT: Symbol = Symbol { index: 19 };

    // Exception keywords
    pub const KW_TRY: Symbol = Symbol { index: 20 };
    pub const KW_CATCH: Symbol = Symbol { index: 21 };
    pub const KW_FINALLY: Symbol = Symbol { index: 22 };

    // Reference keywords
    pub const KW_THIS: Symbol = Symbol { index: 23 };
    pub const KW_SUPER: Symbol = Symbol { index: 24 };

    // Literals
    pub const KW_NULL: Symbol = Symbol { index: 25 };
    pub const KW_TRUE: Symbol = Symbol { index: 26 };
    pub const KW_FALSE: Symbol = Symbol { index: 27 };

    // Lambda
    pub const KW_IT: Symbol = Symbol { index: 28 };

    // Class-member keywords
    pub const KW_COMPANION: Symbol = Symbol { index: 29 };
    pub const KW_INIT: Symbol = Symbol { index: 30 };
    pub const KW_CONSTRUCTOR: Symbol = Symbol { index: 31 };
    pub const KW_DATA: Symbol = Symbol { index: 32 };
    pub const KW_OVERRIDE: Symbol = Symbol { index: 33 };
    pub const KW_OPEN: Symbol = Symbol { index: 34 };
    pub const KW_ABSTRACT: Symbol = Symbol { index: 35 };
    pub const KW_SEALED: Symbol = Symbol { index: 36 };

    // Visibility modifiers
    pub const KW_PRIVATE: Symbol = Symbol { index: 37 };
    pub const KW_PROTECTED: Symbol = Symbol { index: 38 };
    pub const KW_INTERNAL: Symbol = Symbol { index: 39 };
    pub const KW_PUBLIC: Symbol = Symbol { index: 40 };

    // Extended declaration keywords
    pub const KW_OPERATOR: Symbol = Symbol { index: 41 };
    pub const KW_INLINE: Symbol = Symbol { index: 42 };
    pub const KW_REIFIED: Symbol = Symbol { index: 43 };
    pub const KW_SUSPEND: Symbol = Symbol { index: 44 };
    pub const KW_VARARG: Symbol = Symbol { index: 45 };

    // Primitive/builtin type names
    pub const TY_INT: Symbol = Symbol { index: 46 };
    pub const TY_LONG: Symbol = Symbol { index: 47 };
    pub const TY_SHORT: Symbol = Symbol { index: 48 };
    pub const TY_BYTE: Symbol = Symbol { index: 49 };
    pub const TY_FLOAT: Symbol = Symbol { index: 50 };
    pub const TY_DOUBLE: Symbol = Symbol { index: 51 };
    pub const TY_BOOLEAN: Symbol = Symbol { index: 52 };
    pub const TY_CHAR: Symbol = Symbol { index: 53 };
    pub const TY_STRING: Symbol = Symbol { index: 54 };
    pub const TY_UNIT: Symbol = Symbol { index: 55 };
    pub const TY_ANY: Symbol = Symbol { index: 56 };
    pub const TY_NOTHING: Symbol = Symbol { index: 57 };

    // Operator-method names (spec §4.3.11)
    pub const OP_PLUS: Symbol = Symbol { index: 58 };
    pub const OP_MINUS: Symbol = Symbol { index: 59 };
    pub const OP_TIMES: Symbol = Symbol { index: 60 };
    pub const OP_DIV: Symbol = Symbol { index: 61 };
    pub const OP_REM: Symbol = Symbol { index: 62 };
    pub const OP_COMPARE_TO: Symbol = Symbol { index: 63 };
    pub const OP_EQUALS: Symbol = Symbol { index: 64 };
    pub const OP_HASH_CODE: Symbol = Symbol { index: 65 };
    pub const OP_TO_STRING: Symbol = Symbol { index: 66 };
    pub const OP_UNARY_MINUS: Symbol = Symbol { index: 67 };
    pub const OP_UNARY_PLUS: Symbol = Symbol { index: 68 };
    pub const OP_INC: Symbol = Symbol { index: 69 };
    pub const OP_DEC: Symbol = Symbol { index: 70 };
    pub const OP_GET: Symbol = Symbol { index: 71 };
    pub const OP_SET: Symbol = Symbol { index: 72 };
    pub const OP_INVOKE: Symbol = Symbol { index: 73 };
    pub const OP_ITERATOR: Symbol = Symbol { index: 74 };
    pub const OP_CONTAINS: Symbol = Symbol { index: 75 };

    // Common identifiers referenced by synthetic method generation (§4.4)
    pub const ID_MAIN: Symbol = Symbol { index: 76 };
    pub const ID_COPY: Symbol = Symbol { index: 77 };
    pub const ID_COMPONENT1: Symbol = Symbol { index: 78 };
    pub const ID_COMPONENT2: Symbol = Symbol { index: 79 };
    pub const ID_COMPONENT3: Symbol = Symbol { index: 80 };
    pub const ID_NAME: Symbol = Symbol { index: 81 };
    pub const ID_ORDINAL: Symbol = Symbol { index: 82 };
    pub const ID_VALUES: Symbol = Symbol { index: 83 };
    pub const ID_VALUE_OF: Symbol = Symbol { index: 84 };
    pub const ID_CLINIT: Symbol = Symbol { index: 85 };

    pub fn intern(string: &str) -> Symbol {
        STRING_TABLE.intern(string)
    }

    pub fn as_str(self) -> &'static str {
        STRING_TABLE.get(self).unwrap_or("<invalid symbol>")
    }

    pub fn is_empty(self) -> bool {
        self.as_str().is_empty()
    }

    pub fn len(self) -> usize {
        self.as_str().len()
    }

    pub fn starts_with(self, prefix: &str) -> bool {
        self.as_str().starts_with(prefix)
    }

    pub fn ends_with(self, suffix: &str) -> bool {
        self.as_str().ends_with(suffix)
    }

    pub fn eq_str(self, other: &str) -> bool {
        self.as_str() == other
    }

    pub fn is_known(self) -> bool {
        self.index < Symbol::RESERVED_SYMBOLS_END
    }

    pub fn as_u32(self) -> u32 {
        self.index
    }

    /// # Safety
    /// `index` must refer to a symbol previously returned by `intern`.
    pub unsafe fn from_u32_unchecked(index: u32) -> Symbol {
        Symbol { index }
    }

    pub fn stats() -> InternerStats {
        STRING_TABLE.stats()
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static_assertions::assert_impl_all!(Symbol: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keywords_round_trip() {
        assert_eq!(Symbol::KW_CLASS.as_str(), "class");
        assert_eq!(Symbol::KW_FUN.as_str(), "fun");
        assert_eq!(Symbol::OP_COMPARE_TO.as_str(), "compareTo");
    }

    #[test]
    fn interning_the_same_string_returns_the_same_symbol() {
        let a = Symbol::intern("myVariable");
        let b = Symbol::intern("myVariable");
        assert_eq!(a, b);
    }

    #[test]
    fn interning_distinct_strings_gives_distinct_symbols() {
        let a = Symbol::intern("foo_unique_1");
        let b = Symbol::intern("foo_unique_2");
        assert_ne!(a, b);
    }

    #[test]
    fn known_symbol_reports_is_known() {
        assert!(Symbol::KW_VAL.is_known());
        let fresh = Symbol::intern("not_a_keyword_xyz");
        assert!(!fresh.is_known());
    }
}
