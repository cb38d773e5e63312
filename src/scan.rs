//! Component scanning over a [`TypeCatalog`].

use crate::autowire::AutowiredProcessor;
use crate::blueprint::Blueprint;
use crate::catalog::{default_component_name, TypeCatalog};
use crate::engine::LifecycleEngine;
use crate::error::ContainerResult;

/// Registers a blueprint for every marked catalog type inside the given
/// namespaces, and installs the autowiring hook.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ComponentMarker, ComponentScanner, ComponentType, LifecycleEngine, TypeCatalog};
///
/// #[derive(Default)]
/// struct Greeter;
///
/// let mut catalog = TypeCatalog::new();
/// catalog.add(ComponentType::builder::<Greeter>().component(ComponentMarker::default()).build());
///
/// let engine = LifecycleEngine::new();
/// let namespace = std::any::type_name::<Greeter>().rsplit_once("::").unwrap().0;
/// let found = ComponentScanner::new(&engine, &catalog).scan(&[namespace]).unwrap();
///
/// assert_eq!(found, 1);
/// assert!(engine.contains_blueprint("greeter"));
/// ```
pub struct ComponentScanner<'a> {
    engine: &'a LifecycleEngine,
    catalog: &'a TypeCatalog,
}

impl<'a> ComponentScanner<'a> {
    pub fn new(engine: &'a LifecycleEngine, catalog: &'a TypeCatalog) -> Self {
        Self { engine, catalog }
    }

    /// Scans the namespaces and returns the number of blueprints registered.
    ///
    /// A type matched by several overlapping namespaces is registered once.
    pub fn scan(&self, namespaces: &[&str]) -> ContainerResult<usize> {
        let mut registered = 0;
        for ty in self.catalog.types() {
            let Some(marker) = ty.marker() else { continue };
            let Some(namespace) = namespaces.iter().find(|ns| in_namespace(ty.type_name(), ns)) else {
                continue;
            };
            let name = marker.name.clone().unwrap_or_else(|| default_component_name(ty));
            tracing::debug!(component = %name, namespace = *namespace, "scanned component");
            self.engine
                .register(&name, Blueprint::new(ty.clone()).with_scope(marker.scope))?;
            registered += 1;
        }
        self.engine.add_hook(AutowiredProcessor::hook());
        Ok(registered)
    }
}

fn in_namespace(type_name: &str, namespace: &str) -> bool {
    let namespace = namespace.trim_end_matches("::");
    namespace.is_empty()
        || type_name
            .strip_prefix(namespace)
            .map(|rest| rest.starts_with("::"))
            .unwrap_or(false)
}
