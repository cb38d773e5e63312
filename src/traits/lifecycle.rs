//! Structural contracts components and collaborators can opt into.

use crate::component::Instance;
use crate::engine::{ContainerHandle, LifecycleEngine};
use crate::error::{BoxError, ContainerResult};

/// Init contract run after population, before the declared init operation.
///
/// Opted into with [`TypeBuilder::initializing`](crate::TypeBuilder::initializing).
/// A declared init operation named `after_properties_set` is not run a second
/// time.
pub trait InitializingComponent {
    fn after_properties_set(&mut self) -> Result<(), BoxError>;
}

/// Teardown contract run at container shutdown, singletons only.
///
/// Opted into with [`TypeBuilder::disposable`](crate::TypeBuilder::disposable).
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{BoxError, Blueprint, ComponentType, DisposableComponent, LifecycleEngine};
///
/// #[derive(Default)]
/// struct Pool { open: bool }
///
/// impl DisposableComponent for Pool {
///     fn destroy(&mut self) -> Result<(), BoxError> {
///         self.open = false;
///         Ok(())
///     }
/// }
///
/// let engine = LifecycleEngine::new();
/// let ty = ComponentType::builder::<Pool>().disposable().build();
/// engine.register("pool", Blueprint::new(ty)).unwrap();
/// engine.get_bean("pool").unwrap();
/// engine.destroy_singletons().unwrap();
/// ```
pub trait DisposableComponent {
    fn destroy(&mut self) -> Result<(), BoxError>;
}

/// A component that produces another object.
///
/// Lookups by the factory's name observe the produced object. The factory
/// itself stays reachable under `&name`.
pub trait FactoryComponent {
    fn get_object(&self) -> Result<Instance, BoxError>;

    /// Whether the produced object is cached after the first lookup.
    fn is_singleton(&self) -> bool {
        true
    }
}

/// A component that receives a handle to its container before init.
pub trait ContainerAware {
    fn set_container(&mut self, container: ContainerHandle);
}

/// Rewrites blueprints after loading, before any component is built.
pub trait BlueprintPostProcessor: Send + Sync {
    fn post_process(&self, engine: &LifecycleEngine) -> ContainerResult<()>;
}

/// One link in the string resolution chain.
pub trait StringValueResolver: Send + Sync {
    fn resolve(&self, value: &str) -> ContainerResult<String>;
}

impl<F> StringValueResolver for F
where
    F: Fn(&str) -> ContainerResult<String> + Send + Sync,
{
    fn resolve(&self, value: &str) -> ContainerResult<String> {
        self(value)
    }
}
