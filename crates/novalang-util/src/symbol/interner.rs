use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::LazyLock;

use ahash::AHasher;
use dashmap::DashMap;
use std::hash::{Hash, Hasher};

use super::{InternerStats, Symbol};

const PROBE_PRIME: u64 = 0x9e3779b97f4a7c15;
const MAX_PROBES: usize = 32;

/// Must list every pre-interned constant in `Symbol` in index order; the
/// position in this array is the symbol's index.
const KNOWN_SYMBOLS: &[&str] = &[
    "class", "interface", "object", "enum", "fun", "val", "var", "if", "else", "while", "do",
    "for", "return", "break", "continue", "when", "is", "as", "in", "out", "try", "catch",
    "finally", "this", "super", "null", "true", "false", "it", "companion", "init",
    "constructor", "data", "override", "open", "abstract", "sealed", "private", "protected",
    "internal", "public", "operator", "inline", "reified", "suspend", "vararg", "Int", "Long",
    "Short", "Byte", "Float", "Double", "Boolean", "Char", "String", "Unit", "Any", "Nothing",
    "plus", "minus", "times", "div", "rem", "compareTo", "equals", "hashCode", "toString",
    "unaryMinus", "unaryPlus", "inc", "dec", "get", "set", "invoke", "iterator", "contains",
    "main", "copy", "component1", "component2", "component3", "name", "ordinal", "values",
    "valueOf", "<clinit>",
];

pub static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(|| {
    let table = StringTable::new();
    table.initialize_known_symbols();
    table
});

fn hash_string(string: &str) -> u64 {
    let mut hasher = AHasher::default();
    string.hash(&mut hasher);
    hasher.finish()
}

/// Global, thread-safe string interner. Strings are leaked into `'static`
/// storage once per unique value, so `Symbol::as_str` can hand back a
/// `&'static str` without holding any lock.
pub struct StringTable {
    map: DashMap<u64, (&'static str, u32)>,
    next_index: AtomicU32,
    collisions: AtomicUsize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl StringTable {
    pub fn new() -> Self {
        StringTable {
            map: DashMap::with_capacity(256),
            next_index: AtomicU32::new(Symbol::RESERVED_SYMBOLS_END),
            collisions: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn initialize_known_symbols(&self) {
        for (index, string) in KNOWN_SYMBOLS.iter().enumerate() {
            let leaked: &'static str = Box::leak(string.to_string().into_boxed_str());
            let hash = hash_string(leaked);
            self.map.insert(hash, (leaked, index as u32));
        }
    }

    pub fn intern(&self, string: &str) -> Symbol {
        let hash = hash_string(string);
        if let Some(entry) = self.map.get(&hash) {
            if entry.0 == string {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Symbol { index: entry.1 };
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.insert_or_probe(hash, string)
    }

    fn insert_or_probe(&self, hash: u64, string: &str) -> Symbol {
        let mut probe_hash = hash;
        for attempt in 0..MAX_PROBES {
            match self.map.entry(probe_hash) {
                dashmap::mapref::entry::Entry::Occupied(entry) => {
                    if entry.get().0 == string {
                        return Symbol { index: entry.get().1 };
                    }
                    if attempt > 0 {
                        self.collisions.fetch_add(1, Ordering::Relaxed);
                    }
                    probe_hash = probe_hash.wrapping_add(PROBE_PRIME);
                }
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    let leaked: &'static str = Box::leak(string.to_string().into_boxed_str());
                    let index = self.next_index.fetch_add(1, Ordering::Relaxed);
                    entry.insert((leaked, index));
                    return Symbol { index };
                }
            }
        }
        panic!("string interner exceeded max probe count for {:?}", string);
    }

    pub fn get(&self, symbol: Symbol) -> Option<&'static str> {
        self.map
            .iter()
            .find(|entry| entry.value().1 == symbol.index)
            .map(|entry| entry.value().0)
    }

    pub fn stats(&self) -> InternerStats {
        InternerStats::new(
            self.map.len(),
            self.map.capacity(),
            self.collisions.load(Ordering::Relaxed),
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    #[cfg(test)]
    fn reset_stats(&self) {
        self.collisions.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_symbols_are_preinterned_in_declared_order() {
        let table = StringTable::new();
        table.initialize_known_symbols();
        assert_eq!(table.get(Symbol::KW_CLASS), Some("class"));
        assert_eq!(table.get(Symbol { index: 0 }), Some("class"));
    }

    #[test]
    fn concurrent_interning_of_the_same_string_converges() {
        use std::sync::Arc;
        use std::thread;

        let table = Arc::new(StringTable::new());
        table.initialize_known_symbols();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || table.intern("sharedIdentifier")));
        }
        let symbols: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let first = symbols[0];
        assert!(symbols.iter().all(|s| *s == first));
    }

    #[test]
    fn stats_reflect_hits_and_misses() {
        let table = StringTable::new();
        table.initialize_known_symbols();
        table.reset_stats();
        table.intern("freshOne");
        table.intern("freshOne");
        let stats = table.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }
}
