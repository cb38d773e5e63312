//! Factory indirection: lookups of a factory component observe its product.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::blueprint::Blueprint;
use crate::component::Instance;
use crate::error::{ContainerError, ContainerResult};

/// Prefix requesting the factory object itself rather than its product.
pub const FACTORY_PREFIX: char = '&';

/// Strips every leading `&` from a requested name.
pub fn transformed_name(name: &str) -> &str {
    name.trim_start_matches(FACTORY_PREFIX)
}

pub fn is_factory_dereference(name: &str) -> bool {
    name.starts_with(FACTORY_PREFIX)
}

/// Cache of products from singleton-cardinality factories.
///
/// The factory object itself stays in the singleton cache under its own name.
#[derive(Default)]
pub struct FactoryIndirection {
    products: Mutex<HashMap<String, Instance>>,
}

impl FactoryIndirection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the object cached or built for `name` to what the caller observes.
    ///
    /// A `&`-prefixed request returns the factory itself; a non-factory
    /// object is returned unchanged.
    pub fn object_for_instance(
        &self,
        instance: Instance,
        requested: &str,
        name: &str,
        blueprint: Option<&Blueprint>,
    ) -> ContainerResult<Instance> {
        let view = blueprint.and_then(|bp| bp.component_type().factory_view(&instance));

        if is_factory_dereference(requested) {
            return match view {
                Some(_) => Ok(instance),
                None => Err(ContainerError::NotAFactory(name.to_string())),
            };
        }

        let Some(view) = view else {
            return Ok(instance);
        };

        let produce = || {
            (view.produce)().map_err(|source| ContainerError::Operation {
                component: name.to_string(),
                operation: "get_object".to_string(),
                source,
            })
        };

        if !view.singleton {
            return produce();
        }

        if let Some(product) = self.products.lock().get(name) {
            return Ok(product.clone());
        }
        let product = produce()?;
        let mut products = self.products.lock();
        // A product cached while `produce` ran wins
        let cached = products.entry(name.to_string()).or_insert(product);
        tracing::trace!(component = name, "factory product cached");
        Ok(cached.clone())
    }

    pub fn cached_product(&self, name: &str) -> Option<Instance> {
        self.products.lock().get(name).cloned()
    }

    pub fn clear(&self) {
        self.products.lock().clear();
    }
}

impl std::fmt::Debug for FactoryIndirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryIndirection")
            .field("products", &self.products.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_handling() {
        assert_eq!(transformed_name("&&car"), "car");
        assert_eq!(transformed_name("car"), "car");
        assert!(is_factory_dereference("&car"));
        assert!(!is_factory_dereference("car"));
    }

    #[test]
    fn plain_objects_pass_through() {
        let indirection = FactoryIndirection::new();
        let instance: Instance = std::sync::Arc::new(3u8);
        let out = indirection.object_for_instance(instance.clone(), "n", "n", None).unwrap();
        assert!(std::sync::Arc::ptr_eq(&out, &instance));

        let err = indirection.object_for_instance(instance, "&n", "n", None).unwrap_err();
        assert!(matches!(err, ContainerError::NotAFactory(_)));
    }
}
