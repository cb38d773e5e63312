//! Resolver traits for component lookup.

use std::any::Any;
use std::sync::Arc;

use crate::component::{downcast_shared, Instance, Shared};
use crate::error::{ContainerError, ContainerResult};

/// Object-safe component lookup by name.
///
/// Implemented by [`LifecycleEngine`](crate::LifecycleEngine) and
/// [`ContainerHandle`](crate::ContainerHandle). Most callers use the typed
/// methods of [`Resolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Returns the instance observed under `name`, building it if needed.
    ///
    /// A factory component yields its product; `&name` yields the factory.
    fn resolve_any(&self, name: &str) -> ContainerResult<Instance>;
}

/// Typed lookups built on [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{Blueprint, ComponentType, LifecycleEngine, Resolver};
///
/// #[derive(Default)]
/// struct Config { url: String }
///
/// let engine = LifecycleEngine::new();
/// let ty = ComponentType::builder::<Config>()
///     .property("url", |c: &mut Config, v: String| c.url = v)
///     .build();
/// engine.register("config", Blueprint::new(ty).with_literal("url", "postgres://localhost")).unwrap();
///
/// let config = engine.get_bean_as::<Config>("config").unwrap();
/// assert_eq!(config.read().url, "postgres://localhost");
/// assert!(engine.get_bean_as::<String>("config").is_err());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a component built from a blueprint of type `T`.
    fn get_bean_as<T: Send + Sync + 'static>(&self, name: &str) -> ContainerResult<Shared<T>> {
        let instance = self.resolve_any(name)?;
        downcast_shared::<T>(&instance).ok_or_else(|| ContainerError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Resolves an instance stored as a plain `Arc<U>`, such as a manually
    /// registered singleton or a factory product.
    fn get_bean_arc<U: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<U>> {
        let instance = self.resolve_any(name)?;
        instance.downcast::<U>().map_err(|_| ContainerError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<U>(),
        })
    }

    /// Like [`get_bean_as`](Self::get_bean_as), panicking on failure.
    fn get_required_as<T: Send + Sync + 'static>(&self, name: &str) -> Shared<T> {
        match self.get_bean_as::<T>(name) {
            Ok(component) => component,
            Err(e) => panic!("failed to resolve '{}': {}", name, e),
        }
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
