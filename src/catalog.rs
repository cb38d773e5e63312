//! Catalog of component types known to the configuration loaders.

use std::collections::HashMap;

use crate::component::ComponentType;

/// Maps type aliases and full Rust type paths to component types.
///
/// Configuration documents name a component's type by alias or by path;
/// the scanner walks the catalog for marked types.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    /// Registration order, for deterministic scanning
    types: Vec<ComponentType>,
    by_alias: HashMap<String, usize>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type reachable by `alias`, its simple name and its full path.
    pub fn register(&mut self, alias: &str, ty: ComponentType) -> &mut Self {
        let index = match self.types.iter().position(|t| t.type_id() == ty.type_id()) {
            Some(index) => {
                self.types[index] = ty.clone();
                index
            }
            None => {
                self.types.push(ty.clone());
                self.types.len() - 1
            }
        };
        self.by_alias.insert(alias.to_string(), index);
        self.by_alias.entry(ty.simple_name().to_string()).or_insert(index);
        self.by_alias.insert(ty.type_name().to_string(), index);
        self
    }

    /// Adds a type under its simple name.
    pub fn add(&mut self, ty: ComponentType) -> &mut Self {
        let alias = ty.simple_name().to_string();
        self.register(&alias, ty)
    }

    pub fn resolve(&self, alias: &str) -> Option<&ComponentType> {
        self.by_alias.get(alias).map(|&i| &self.types[i])
    }

    pub fn types(&self) -> impl Iterator<Item = &ComponentType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Default component name for a type: its simple name with a lowercase first
/// letter.
pub fn default_component_name(ty: &ComponentType) -> String {
    let simple = ty.simple_name();
    let mut chars = simple.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
