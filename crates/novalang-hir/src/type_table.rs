use std::cell::RefCell;
use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::types::{method_descriptor, Type};

/// Registry of every declared and externally-registered class (spec §4.1).
/// Order-preserving maps back every table so iteration over a module's
/// classes is deterministic and tests can assert on it directly.
#[derive(Default)]
pub struct TypeTable {
    pub class_names: IndexSet<String>,
    pub object_names: IndexSet<String>,
    pub interface_names: IndexSet<String>,
    pub enum_names: IndexSet<String>,
    pub data_classes: IndexSet<String>,
    pub fields: IndexMap<String, IndexSet<String>>,
    pub methods: IndexMap<String, IndexMap<String, String>>,
    pub super_class: IndexMap<String, String>,
    pub interfaces: IndexMap<String, Vec<String>>,
    pub annotations: IndexMap<String, Vec<String>>,
    external_classes: IndexSet<String>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_class(&mut self, internal_name: &str) {
        self.class_names.insert(internal_name.to_string());
    }

    pub fn register_object(&mut self, internal_name: &str) {
        self.object_names.insert(internal_name.to_string());
        self.class_names.insert(internal_name.to_string());
    }

    pub fn register_interface(&mut self, internal_name: &str) {
        self.interface_names.insert(internal_name.to_string());
    }

    pub fn register_enum(&mut self, internal_name: &str) {
        self.enum_names.insert(internal_name.to_string());
        self.class_names.insert(internal_name.to_string());
    }

    pub fn mark_data_class(&mut self, internal_name: &str) {
        self.data_classes.insert(internal_name.to_string());
    }

    pub fn set_super_class(&mut self, internal_name: &str, super_name: &str) {
        self.super_class.insert(internal_name.to_string(), super_name.to_string());
    }

    pub fn add_field(&mut self, internal_name: &str, field_name: &str) {
        self.fields
            .entry(internal_name.to_string())
            .or_default()
            .insert(field_name.to_string());
    }

    pub fn has_field(&self, internal_name: &str, field_name: &str) -> bool {
        self.fields
            .get(internal_name)
            .map(|set| set.contains(field_name))
            .unwrap_or(false)
    }

    pub fn add_method(&mut self, internal_name: &str, method_name: &str, descriptor: String) {
        self.methods
            .entry(internal_name.to_string())
            .or_default()
            .insert(method_name.to_string(), descriptor);
    }

    pub fn method_descriptor(&self, internal_name: &str, method_name: &str) -> Option<&str> {
        self.methods
            .get(internal_name)
            .and_then(|methods| methods.get(method_name))
            .map(String::as_str)
    }

    /// Installs external class/interface names (spec §5 "cross-module state").
    /// A subsequent `register_external_class` does not also add fields/methods
    /// — those come from the host's reflection data, out of this crate's scope.
    pub fn register_external_class(&mut self, internal_name: &str) {
        self.external_classes.insert(internal_name.to_string());
        self.class_names.insert(internal_name.to_string());
    }

    pub fn is_external(&self, internal_name: &str) -> bool {
        self.external_classes.contains(internal_name)
    }
}

/// Walks inheritance chains to resolve a method's effective descriptor,
/// honoring override propagation (spec §4.1).
pub struct DescriptorResolver<'a> {
    table: &'a TypeTable,
    cache: RefCell<HashMap<(String, String), Option<String>>>,
}

const FALLBACK_PREFIX_UNIT: &str = "Ljava/lang/Object;";

impl<'a> DescriptorResolver<'a> {
    pub fn new(table: &'a TypeTable) -> Self {
        DescriptorResolver {
            table,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves `owner#method_name`, searching the class chain first (child
    /// then ancestors via `super_class`), then interfaces if the chain
    /// yields nothing (spec §4.1 "Ordering/tie-breaks").
    pub fn resolve(&self, owner: &str, method_name: &str) -> Option<String> {
        let key = (owner.to_string(), method_name.to_string());
        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached.clone();
        }
        let resolved = self.resolve_uncached(owner, method_name);
        self.cache.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, owner: &str, method_name: &str) -> Option<String> {
        let mut current = Some(owner.to_string());
        let mut visited = IndexSet::new();
        while let Some(class_name) = current {
            if !visited.insert(class_name.clone()) {
                break;
            }
            if let Some(desc) = self.table.method_descriptor(&class_name, method_name) {
                return Some(desc.to_string());
            }
            current = self.table.super_class.get(&class_name).cloned();
        }

        if let Some(interfaces) = self.table.interfaces.get(owner) {
            for iface in interfaces {
                if let Some(desc) = self.table.method_descriptor(iface, method_name) {
                    return Some(desc.to_string());
                }
            }
        }
        None
    }

    /// Rewrites `owner#method_name`'s descriptor to the nearest ancestor's,
    /// if one declares the same name (the "override propagation" pass).
    pub fn propagate_override(&self, owner: &str, method_name: &str) -> Option<String> {
        let mut current = self.table.super_class.get(owner).cloned();
        while let Some(ancestor) = current {
            if let Some(desc) = self.table.method_descriptor(&ancestor, method_name) {
                return Some(desc.to_string());
            }
            if self.table.is_external(&ancestor) {
                break;
            }
            current = self.table.super_class.get(&ancestor).cloned();
        }
        None
    }

    /// Fallback descriptor for a method name that resolves nowhere: an
    /// all-object descriptor matching the call site's arity (spec §4.1,
    /// §7 "unknown method descriptor").
    pub fn fallback_descriptor(arity: usize) -> String {
        let params = std::iter::repeat(FALLBACK_PREFIX_UNIT).take(arity).collect::<Vec<_>>().join("");
        format!("({}){}", params, FALLBACK_PREFIX_UNIT)
    }
}

pub use crate::types::Type as DescriptorType;

pub fn build_descriptor(params: &[Type], ret: &Type) -> String {
    method_descriptor(params, ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Primitive, Type};

    fn sample_table() -> TypeTable {
        let mut table = TypeTable::new();
        table.register_class("nova/Animal");
        table.register_class("nova/Dog");
        table.set_super_class("nova/Dog", "nova/Animal");
        table.add_method("nova/Animal", "speak", "()Ljava/lang/String;".to_string());
        table
    }

    #[test]
    fn resolves_method_from_ancestor_when_not_overridden() {
        let table = sample_table();
        let resolver = DescriptorResolver::new(&table);
        assert_eq!(
            resolver.resolve("nova/Dog", "speak"),
            Some("()Ljava/lang/String;".to_string())
        );
    }

    #[test]
    fn unresolvable_method_returns_none_not_panic() {
        let table = sample_table();
        let resolver = DescriptorResolver::new(&table);
        assert_eq!(resolver.resolve("nova/Dog", "fly"), None);
    }

    #[test]
    fn fallback_descriptor_matches_requested_arity() {
        assert_eq!(
            DescriptorResolver::fallback_descriptor(2),
            "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;"
        );
        assert_eq!(
            DescriptorResolver::fallback_descriptor(0),
            "()Ljava/lang/Object;"
        );
    }

    #[test]
    fn override_propagation_finds_nearest_ancestor_descriptor() {
        let table = sample_table();
        let resolver = DescriptorResolver::new(&table);
        assert_eq!(
            resolver.propagate_override("nova/Dog", "speak"),
            Some("()Ljava/lang/String;".to_string())
        );
    }

    #[test]
    fn build_descriptor_matches_method_descriptor_helper() {
        let params = vec![Type::Primitive(Primitive::Int)];
        assert_eq!(build_descriptor(&params, &Type::Primitive(Primitive::Int)), "(I)I");
    }
}
