//! Component types: the typed assignment tables and contracts behind a blueprint.
//!
//! A [`ComponentType`] is built once, at configuration time, from a
//! [`TypeBuilder`]. It replaces runtime reflection with explicit closures:
//! a zero-argument constructor, one setter per writable property, named
//! operations usable as init/teardown methods, and the structural contracts
//! from [`crate::traits`] the type opts into.
//!
//! Instances of a component of Rust type `T` are stored as [`Shared<T>`] so
//! that properties can be written after an early reference to the instance
//! has already been handed to a dependent.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_lifecycle::{ComponentType, Shared};
//!
//! #[derive(Default)]
//! struct Engine { cylinders: i64 }
//!
//! #[derive(Default)]
//! struct Car { brand: String, engine: Option<Shared<Engine>> }
//!
//! let engine = ComponentType::builder::<Engine>()
//!     .property("cylinders", |e: &mut Engine, v: i64| e.cylinders = v)
//!     .build();
//!
//! let car = ComponentType::builder::<Car>()
//!     .property("brand", |c: &mut Car, v: String| c.brand = v)
//!     .reference("engine", |c: &mut Car, e: Shared<Engine>| c.engine = Some(e))
//!     .build();
//!
//! assert_eq!(car.simple_name(), "Car");
//! assert!(car.has_property("engine"));
//! assert!(!engine.has_property("brand"));
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::conversion::ConversionService;
use crate::engine::ContainerHandle;
use crate::error::{BoxError, ContainerError, ContainerResult};
use crate::scope::Scope;
use crate::traits::{ContainerAware, DisposableComponent, FactoryComponent, InitializingComponent};
use crate::value::Literal;

/// Type-erased component instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Storage form of a component of Rust type `T`.
pub type Shared<T> = Arc<RwLock<T>>;

/// Wraps a value in its storage form.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Erases a shared component into an [`Instance`].
pub fn into_instance<T: Send + Sync + 'static>(value: Shared<T>) -> Instance {
    value
}

/// Recovers the typed storage form of an instance, if it has type `T`.
pub fn downcast_shared<T: Send + Sync + 'static>(instance: &Instance) -> Option<Shared<T>> {
    instance.clone().downcast::<RwLock<T>>().ok()
}

/// Value handed to a property setter.
pub(crate) enum Assignment<'a> {
    Literal(&'a Literal, Option<&'a dyn ConversionService>),
    Instance(Instance),
}

type SetterFn = dyn Fn(&Instance, Assignment<'_>) -> ContainerResult<()> + Send + Sync;
type OperationFn = dyn Fn(&Instance) -> Option<Result<(), BoxError>> + Send + Sync;
type CastFn = dyn Fn(&Instance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync;

/// Capability produced by a factory check: `(is_singleton, produce)`.
pub(crate) struct FactoryView {
    pub(crate) singleton: bool,
    pub(crate) produce: Box<dyn Fn() -> Result<Instance, BoxError> + Send + Sync>,
}

type FactoryFn = dyn Fn(&Instance) -> Option<FactoryView> + Send + Sync;
type AwareFn = dyn Fn(&Instance, ContainerHandle) -> bool + Send + Sync;

/// A declared capability: a type the component can be retrieved as.
#[derive(Clone)]
pub(crate) struct Capability {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) cast: Arc<CastFn>,
}

/// How an injection point obtains its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionKind {
    /// Resolve the single blueprint carrying the capability.
    ByType { type_id: TypeId, type_name: &'static str },
    /// Resolve the blueprint with the given name.
    Qualified(String),
    /// Resolve a `${...}` expression through the string resolution chain.
    Value(String),
}

/// A field the autowiring hook fills before population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionPoint {
    pub field: String,
    pub kind: InjectionKind,
}

/// Declarative marker picked up by the component scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMarker {
    /// Explicit component name; defaults to the lower-camel simple type name
    pub name: Option<String>,
    pub scope: Scope,
}

struct TypeInner {
    type_id: TypeId,
    storage_type_id: TypeId,
    type_name: &'static str,
    constructor: Arc<dyn Fn() -> Result<Instance, BoxError> + Send + Sync>,
    setters: AHashMap<String, Arc<SetterFn>>,
    operations: AHashMap<String, Arc<OperationFn>>,
    init_contract: Option<Arc<OperationFn>>,
    destroy_contract: Option<Arc<OperationFn>>,
    factory: Option<Arc<FactoryFn>>,
    aware: Option<Arc<AwareFn>>,
    capabilities: Vec<Capability>,
    injections: Vec<InjectionPoint>,
    marker: Option<ComponentMarker>,
}

/// Erased description of a component's Rust type.
///
/// Cheap to clone; every clone shares the same tables.
#[derive(Clone)]
pub struct ComponentType {
    inner: Arc<TypeInner>,
}

impl ComponentType {
    /// Starts a builder for a type constructed through `Default`.
    pub fn builder<T: Default + Send + Sync + 'static>() -> TypeBuilder<T> {
        TypeBuilder::new(T::default)
    }

    /// Starts a builder for a type with an explicit zero-argument constructor.
    pub fn builder_with<T, F>(constructor: F) -> TypeBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        TypeBuilder::new(constructor)
    }

    /// Shorthand for a `Default` type with no properties or contracts.
    pub fn of<T: Default + Send + Sync + 'static>() -> Self {
        Self::builder::<T>().build()
    }

    pub fn type_id(&self) -> TypeId {
        self.inner.type_id
    }

    /// Full Rust path of the type.
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    /// Last path segment of the type name, without generic arguments.
    pub fn simple_name(&self) -> &'static str {
        let name = self.inner.type_name;
        let name = name.split('<').next().unwrap_or(name);
        name.rsplit("::").next().unwrap_or(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.inner.setters.contains_key(name)
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.inner.operations.contains_key(name)
    }

    pub fn is_factory(&self) -> bool {
        self.inner.factory.is_some()
    }

    pub fn is_disposable(&self) -> bool {
        self.inner.destroy_contract.is_some()
    }

    pub fn is_initializing(&self) -> bool {
        self.inner.init_contract.is_some()
    }

    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.inner.injections
    }

    pub fn marker(&self) -> Option<&ComponentMarker> {
        self.inner.marker.as_ref()
    }

    /// Whether the type can be retrieved as the type with id `type_id`:
    /// its own type or a declared capability.
    pub fn satisfies(&self, type_id: TypeId) -> bool {
        self.inner.type_id == type_id || self.inner.capabilities.iter().any(|c| c.type_id == type_id)
    }

    /// Whether `instance` is an instance of this type.
    pub fn is_instance(&self, instance: &Instance) -> bool {
        (**instance).type_id() == self.inner.storage_type_id
    }

    pub(crate) fn instantiate(&self) -> Result<Instance, BoxError> {
        (self.inner.constructor)()
    }

    pub(crate) fn assign(
        &self,
        component: &str,
        instance: &Instance,
        property: &str,
        value: Assignment<'_>,
    ) -> ContainerResult<()> {
        let setter = self
            .inner
            .setters
            .get(property)
            .ok_or_else(|| ContainerError::UnknownProperty {
                component: component.to_string(),
                property: property.to_string(),
            })?;
        setter(instance, value)
    }

    /// Runs a named operation. An instance of another type is a mismatch.
    pub(crate) fn invoke(&self, component: &str, instance: &Instance, operation: &str) -> ContainerResult<()> {
        let op = self
            .inner
            .operations
            .get(operation)
            .ok_or_else(|| ContainerError::UnknownOperation {
                component: component.to_string(),
                operation: operation.to_string(),
            })?;
        match op(instance) {
            Some(result) => result.map_err(|source| ContainerError::Operation {
                component: component.to_string(),
                operation: operation.to_string(),
                source,
            }),
            None => Err(ContainerError::TypeMismatch {
                name: component.to_string(),
                expected: self.inner.type_name,
            }),
        }
    }

    /// Runs `after_properties_set` if the type declares it and `instance` is of
    /// this type. Returns whether it ran.
    pub(crate) fn run_init_contract(&self, component: &str, instance: &Instance) -> ContainerResult<bool> {
        Self::run_contract(&self.inner.init_contract, component, instance, "after_properties_set")
    }

    pub(crate) fn run_destroy_contract(&self, component: &str, instance: &Instance) -> ContainerResult<bool> {
        Self::run_contract(&self.inner.destroy_contract, component, instance, "destroy")
    }

    fn run_contract(
        contract: &Option<Arc<OperationFn>>,
        component: &str,
        instance: &Instance,
        operation: &str,
    ) -> ContainerResult<bool> {
        let Some(contract) = contract else {
            return Ok(false);
        };
        match contract(instance) {
            Some(Ok(())) => Ok(true),
            Some(Err(source)) => Err(ContainerError::Operation {
                component: component.to_string(),
                operation: operation.to_string(),
                source,
            }),
            None => Ok(false),
        }
    }

    /// Hands the container handle to a `ContainerAware` instance.
    pub(crate) fn make_aware(&self, instance: &Instance, handle: ContainerHandle) -> bool {
        match &self.inner.aware {
            Some(aware) => aware(instance, handle),
            None => false,
        }
    }

    pub(crate) fn factory_view(&self, instance: &Instance) -> Option<FactoryView> {
        self.inner.factory.as_ref().and_then(|f| f(instance))
    }

    /// Casts `instance` to `Arc<C>` through a declared capability.
    pub(crate) fn cast<C: ?Sized + Send + Sync + 'static>(&self, instance: &Instance) -> Option<Arc<C>> {
        let wanted = TypeId::of::<C>();
        self.inner
            .capabilities
            .iter()
            .find(|c| c.type_id == wanted)
            .and_then(|c| (c.cast)(instance))
            .and_then(|boxed| boxed.downcast::<Arc<C>>().ok())
            .map(|arc| *arc)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut properties: Vec<_> = self.inner.setters.keys().collect();
        properties.sort();
        f.debug_struct("ComponentType")
            .field("type_name", &self.inner.type_name)
            .field("properties", &properties)
            .field("factory", &self.is_factory())
            .finish()
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Typed builder for a [`ComponentType`].
pub struct TypeBuilder<T> {
    inner: TypeInner,
    _marker: std::marker::PhantomData<fn() -> T>,
}

fn with_write<T, R>(instance: &Instance, f: impl FnOnce(&mut T) -> R) -> Option<R>
where
    T: Send + Sync + 'static,
{
    let lock = (**instance).downcast_ref::<RwLock<T>>()?;
    let mut guard = lock.write();
    Some(f(&mut guard))
}

impl<T: Send + Sync + 'static> TypeBuilder<T> {
    fn new<F>(constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: TypeInner {
                type_id: TypeId::of::<T>(),
                storage_type_id: TypeId::of::<RwLock<T>>(),
                type_name: std::any::type_name::<T>(),
                constructor: Arc::new(move || Ok(into_instance(shared(constructor())))),
                setters: AHashMap::new(),
                operations: AHashMap::new(),
                init_contract: None,
                destroy_contract: None,
                factory: None,
                aware: None,
                capabilities: Vec::new(),
                injections: Vec::new(),
                marker: None,
            },
            _marker: std::marker::PhantomData,
        }
    }

    /// Registers a literal-valued property.
    ///
    /// Literals of another type than `V` go through the conversion service.
    pub fn property<V, F>(mut self, name: &str, setter: F) -> Self
    where
        V: Any,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let component = self.inner.type_name;
        let property = name.to_string();
        let setter = move |instance: &Instance, value: Assignment<'_>| -> ContainerResult<()> {
            let value: V = match value {
                Assignment::Literal(literal, conversion) => literal.coerce::<V>(conversion)?,
                Assignment::Instance(_) => {
                    return Err(ContainerError::TypeMismatch {
                        name: format!("{}.{}", component, property),
                        expected: std::any::type_name::<V>(),
                    })
                }
            };
            with_write::<T, _>(instance, |target| setter(target, value)).ok_or(ContainerError::TypeMismatch {
                name: component.to_string(),
                expected: component,
            })
        };
        self.inner.setters.insert(name.to_string(), Arc::new(setter));
        self
    }

    /// Registers a property holding a reference to another component of type `U`.
    pub fn reference<U, F>(mut self, name: &str, setter: F) -> Self
    where
        U: Send + Sync + 'static,
        F: Fn(&mut T, Shared<U>) + Send + Sync + 'static,
    {
        let component = self.inner.type_name;
        let property = name.to_string();
        self.inner.setters.insert(
            name.to_string(),
            Arc::new(move |instance: &Instance, value: Assignment<'_>| {
                let mismatch = || ContainerError::TypeMismatch {
                    name: format!("{}.{}", component, property),
                    expected: std::any::type_name::<U>(),
                };
                let target = match value {
                    Assignment::Instance(target) => downcast_shared::<U>(&target).ok_or_else(mismatch)?,
                    Assignment::Literal(..) => return Err(mismatch()),
                };
                with_write::<T, _>(instance, |this| setter(this, target)).ok_or_else(mismatch)
            }),
        );
        self
    }

    /// Registers a property accepting any instance, e.g. a hook-wrapped one.
    pub fn instance_property<F>(mut self, name: &str, setter: F) -> Self
    where
        F: Fn(&mut T, Instance) + Send + Sync + 'static,
    {
        let component = self.inner.type_name;
        let property = name.to_string();
        self.inner.setters.insert(
            name.to_string(),
            Arc::new(move |instance: &Instance, value: Assignment<'_>| {
                let mismatch = || ContainerError::TypeMismatch {
                    name: format!("{}.{}", component, property),
                    expected: "component instance",
                };
                let target = match value {
                    Assignment::Instance(target) => target,
                    Assignment::Literal(..) => return Err(mismatch()),
                };
                with_write::<T, _>(instance, |this| setter(this, target)).ok_or_else(mismatch)
            }),
        );
        self
    }

    /// Registers a named operation usable as an init or teardown method.
    pub fn operation<F>(mut self, name: &str, op: F) -> Self
    where
        F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner
            .operations
            .insert(name.to_string(), Arc::new(move |instance: &Instance| with_write::<T, _>(instance, &op)));
        self
    }

    /// Declares a retrieval capability: the component is also visible as `C`.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use ferrous_lifecycle::{ComponentType, Shared};
    ///
    /// trait Greeter: Send + Sync { fn greet(&self) -> String; }
    ///
    /// #[derive(Default)]
    /// struct English;
    ///
    /// struct View(Shared<English>);
    /// impl Greeter for View { fn greet(&self) -> String { "hello".into() } }
    ///
    /// let ty = ComponentType::builder::<English>()
    ///     .capability::<dyn Greeter, _>(|s| Arc::new(View(s)) as Arc<dyn Greeter>)
    ///     .build();
    /// assert!(ty.satisfies(std::any::TypeId::of::<dyn Greeter>()));
    /// ```
    pub fn capability<C, F>(mut self, cast: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Shared<T>) -> Arc<C> + Send + Sync + 'static,
    {
        self.inner.capabilities.push(Capability {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            cast: Arc::new(move |instance: &Instance| {
                downcast_shared::<T>(instance).map(|s| Box::new(cast(s)) as Box<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    /// Field filled with the single component carrying capability `U`.
    pub fn autowired<U, F>(mut self, field: &str, setter: F) -> Self
    where
        U: Send + Sync + 'static,
        F: Fn(&mut T, Shared<U>) + Send + Sync + 'static,
    {
        self.inner.injections.push(InjectionPoint {
            field: field.to_string(),
            kind: InjectionKind::ByType {
                type_id: TypeId::of::<U>(),
                type_name: std::any::type_name::<U>(),
            },
        });
        self.reference(field, setter)
    }

    /// Field filled with the component named `qualifier`.
    pub fn qualified<U, F>(mut self, field: &str, qualifier: &str, setter: F) -> Self
    where
        U: Send + Sync + 'static,
        F: Fn(&mut T, Shared<U>) + Send + Sync + 'static,
    {
        self.inner.injections.push(InjectionPoint {
            field: field.to_string(),
            kind: InjectionKind::Qualified(qualifier.to_string()),
        });
        self.reference(field, setter)
    }

    /// Field filled with a resolved `${...}` expression.
    pub fn value<V, F>(mut self, field: &str, expression: &str, setter: F) -> Self
    where
        V: Any,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.inner.injections.push(InjectionPoint {
            field: field.to_string(),
            kind: InjectionKind::Value(expression.to_string()),
        });
        self.property(field, setter)
    }

    /// Marks the type for the component scanner.
    pub fn component(mut self, marker: ComponentMarker) -> Self {
        self.inner.marker = Some(marker);
        self
    }

    pub fn build(self) -> ComponentType {
        ComponentType {
            inner: Arc::new(self.inner),
        }
    }
}

impl<T: InitializingComponent + Send + Sync + 'static> TypeBuilder<T> {
    pub fn initializing(mut self) -> Self {
        self.inner.init_contract = Some(Arc::new(|instance: &Instance| {
            with_write::<T, _>(instance, |this| this.after_properties_set())
        }));
        self
    }
}

impl<T: DisposableComponent + Send + Sync + 'static> TypeBuilder<T> {
    pub fn disposable(mut self) -> Self {
        self.inner.destroy_contract = Some(Arc::new(|instance: &Instance| {
            with_write::<T, _>(instance, |this| this.destroy())
        }));
        self
    }
}

impl<T: FactoryComponent + Send + Sync + 'static> TypeBuilder<T> {
    pub fn factory(mut self) -> Self {
        self.inner.factory = Some(Arc::new(|instance: &Instance| {
            let this = downcast_shared::<T>(instance)?;
            let singleton = this.read().is_singleton();
            Some(FactoryView {
                singleton,
                produce: Box::new(move || this.read().get_object()),
            })
        }));
        self
    }
}

impl<T: ContainerAware + Send + Sync + 'static> TypeBuilder<T> {
    pub fn container_aware(mut self) -> Self {
        self.inner.aware = Some(Arc::new(|instance: &Instance, handle: ContainerHandle| {
            with_write::<T, _>(instance, |this| this.set_container(handle)).is_some()
        }));
        self
    }
}
