//! The lifecycle engine: staged construction over the blueprint registry,
//! the three-tier singleton cache and the extension pipeline.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::blueprint::Blueprint;
use crate::component::{downcast_shared, Assignment, Instance, Shared};
use crate::config::{ContainerSettings, DuplicatePolicy};
use crate::conversion::ConversionService;
use crate::destruction::{ComponentTeardown, DestructionRegistry};
use crate::error::{ContainerError, ContainerResult, DestructionError};
use crate::factory::{transformed_name, FactoryIndirection, FACTORY_PREFIX};
use crate::internal::CreationGuard;
use crate::observer::{LifecycleObserver, Observers};
use crate::pipeline::{ExtensionPipeline, LifecycleHook};
use crate::registry::BlueprintRegistry;
use crate::singleton_cache::SingletonCache;
use crate::traits::{ResolverCore, StringValueResolver};
use crate::value::{PropertyValue, PropertyValues};

mod handle;

pub use handle::ContainerHandle;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Builds, wires and tears down components described by blueprints.
///
/// The engine is cheap to clone; clones share one container. Construction
/// of a not-yet-built singleton is expected to happen on a single thread
/// (cycle resolution relies on same-thread re-entrancy). Once built,
/// singletons can be read concurrently.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{Blueprint, ComponentType, LifecycleEngine, Resolver, Shared};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct A { b: Option<Shared<B>> }
/// #[derive(Default)]
/// struct B { a: Option<Shared<A>> }
///
/// let a = ComponentType::builder::<A>()
///     .reference("b", |a: &mut A, b: Shared<B>| a.b = Some(b))
///     .build();
/// let b = ComponentType::builder::<B>()
///     .reference("a", |b: &mut B, a: Shared<A>| b.a = Some(a))
///     .build();
///
/// let engine = LifecycleEngine::new();
/// engine.register("a", Blueprint::new(a).with_reference("b", "b")).unwrap();
/// engine.register("b", Blueprint::new(b).with_reference("a", "a")).unwrap();
///
/// let a = engine.get_bean_as::<A>("a").unwrap();
/// let b = a.read().b.clone().unwrap();
/// let back = b.read().a.clone().unwrap();
/// assert!(Arc::ptr_eq(&a, &back));
/// ```
#[derive(Clone)]
pub struct LifecycleEngine {
    pub(crate) inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    id: u64,
    settings: ContainerSettings,
    registry: BlueprintRegistry,
    cache: SingletonCache,
    destruction: DestructionRegistry,
    pipeline: ExtensionPipeline,
    factories: FactoryIndirection,
    conversion: RwLock<Option<Arc<dyn ConversionService>>>,
    resolvers: RwLock<Vec<Arc<dyn StringValueResolver>>>,
    observers: Observers,
}

impl LifecycleEngine {
    pub fn new() -> Self {
        Self::with_settings(ContainerSettings::default())
    }

    pub fn with_settings(settings: ContainerSettings) -> Self {
        let id = NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(container = id, ?settings, "creating lifecycle engine");
        Self {
            inner: Arc::new(EngineInner {
                id,
                registry: BlueprintRegistry::new(settings.duplicate_policy),
                settings,
                cache: SingletonCache::new(),
                destruction: DestructionRegistry::new(),
                pipeline: ExtensionPipeline::new(),
                factories: FactoryIndirection::new(),
                conversion: RwLock::new(None),
                resolvers: RwLock::new(Vec::new()),
                observers: Observers::default(),
            }),
        }
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.inner.settings
    }

    /// Non-owning handle to this engine.
    pub fn handle(&self) -> ContainerHandle {
        ContainerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ----- Blueprints -----

    /// Registers a blueprint under `name`, subject to the duplicate policy.
    pub fn register(&self, name: &str, blueprint: Blueprint) -> ContainerResult<()> {
        self.inner.registry.register(name, blueprint)
    }

    pub fn contains_blueprint(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }

    pub fn blueprint(&self, name: &str) -> ContainerResult<Arc<Blueprint>> {
        self.inner.registry.lookup(name)
    }

    /// Blueprint names in registration order.
    pub fn blueprint_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    /// Rewrites a registered blueprint. Components already built keep the
    /// blueprint they were built from.
    pub fn update_blueprint<R>(&self, name: &str, f: impl FnOnce(&mut Blueprint) -> R) -> ContainerResult<R> {
        self.inner.registry.update(name, f)
    }

    /// Names of blueprints whose type is, or declares the capability, `type_id`.
    pub fn names_for_type_id(&self, type_id: TypeId) -> Vec<String> {
        self.inner
            .registry
            .lookup_by_capability(type_id)
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    // ----- Collaborators -----

    /// Appends a hook; a hook with the same name is moved to the end.
    pub fn add_hook(&self, hook: LifecycleHook) {
        tracing::debug!(hook = hook.name(), "hook registered");
        self.inner.pipeline.add(hook);
    }

    pub fn hook_names(&self) -> Vec<String> {
        self.inner.pipeline.names()
    }

    pub fn set_conversion_service(&self, service: Arc<dyn ConversionService>) {
        *self.inner.conversion.write() = Some(service);
    }

    pub fn conversion_service(&self) -> Option<Arc<dyn ConversionService>> {
        self.inner.conversion.read().clone()
    }

    pub fn add_embedded_value_resolver(&self, resolver: Arc<dyn StringValueResolver>) {
        self.inner.resolvers.write().push(resolver);
    }

    /// Folds `value` through the string resolution chain in registration order.
    pub fn resolve_embedded_value(&self, value: &str) -> ContainerResult<String> {
        let resolvers = self.inner.resolvers.read().clone();
        let mut result = value.to_string();
        for resolver in resolvers {
            result = resolver.resolve(&result)?;
        }
        Ok(result)
    }

    pub fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        self.inner.observers.add(observer);
    }

    // ----- Lookup -----

    /// Returns the instance observed under `name`, building it if needed.
    ///
    /// A factory component yields its product; `&name` yields the factory.
    pub fn get_bean(&self, requested: &str) -> ContainerResult<Instance> {
        let name = transformed_name(requested);

        if let Some(instance) = self.inner.cache.get_if_present(name)? {
            let blueprint = self.inner.registry.lookup(name).ok();
            return self
                .inner
                .factories
                .object_for_instance(instance, requested, name, blueprint.as_deref());
        }

        let blueprint = self.inner.registry.lookup(name)?;
        let instance = self.create(name, &blueprint)?;
        self.inner
            .factories
            .object_for_instance(instance, requested, name, Some(&blueprint))
    }

    /// Registers an externally built singleton directly as fully built.
    ///
    /// A name already cached is never replaced. Under
    /// [`DuplicatePolicy::Reject`] a name with a blueprint is refused too.
    pub fn register_singleton(&self, name: &str, instance: Instance) -> ContainerResult<()> {
        if self.inner.registry.policy() == DuplicatePolicy::Reject && self.inner.registry.contains(name) {
            return Err(ContainerError::DuplicateName(name.to_string()));
        }
        self.inner.cache.register_singleton(name, instance)?;
        tracing::debug!(component = name, "singleton registered");
        Ok(())
    }

    /// Whether a fully built singleton is cached under `name`.
    pub fn contains_singleton(&self, name: &str) -> bool {
        self.inner.cache.get_built(name).is_some()
    }

    /// Every component whose blueprint type is `T`, by name.
    ///
    /// Builds every matching blueprint, ignoring laziness. Factory
    /// blueprints contribute the factory object itself.
    pub fn get_beans_of_type<T: Send + Sync + 'static>(&self) -> ContainerResult<HashMap<String, Shared<T>>> {
        let mut found = HashMap::new();
        for name in self.names_of_own_type::<T>() {
            let instance = self.get_bean(&self.type_lookup_name(&name)?)?;
            let component = downcast_shared::<T>(&instance).ok_or_else(|| ContainerError::TypeMismatch {
                name: name.clone(),
                expected: std::any::type_name::<T>(),
            })?;
            found.insert(name, component);
        }
        Ok(found)
    }

    /// The single component whose blueprint type is `T`.
    pub fn get_bean_of_type<T: Send + Sync + 'static>(&self) -> ContainerResult<Shared<T>> {
        let names = self.names_of_own_type::<T>();
        let name = single_candidate(names, std::any::type_name::<T>())?;
        let instance = self.get_bean(&self.type_lookup_name(&name)?)?;
        downcast_shared::<T>(&instance).ok_or(ContainerError::TypeMismatch {
            name,
            expected: std::any::type_name::<T>(),
        })
    }

    /// Every component declaring capability `C`, viewed as `Arc<C>`.
    pub fn get_beans_of_capability<C>(&self) -> ContainerResult<HashMap<String, Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let mut found = HashMap::new();
        for (name, blueprint) in self.inner.registry.lookup_by_capability(TypeId::of::<C>()) {
            let view = self.capability_view::<C>(&name, &blueprint)?;
            found.insert(name, view);
        }
        Ok(found)
    }

    /// The single component declaring capability `C`.
    pub fn get_bean_by_capability<C>(&self) -> ContainerResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let names = self.names_for_type_id(TypeId::of::<C>());
        let name = single_candidate(names, std::any::type_name::<C>())?;
        let blueprint = self.inner.registry.lookup(&name)?;
        self.capability_view::<C>(&name, &blueprint)
    }

    /// The component `name` viewed through its declared capability `C`.
    pub fn get_capability<C>(&self, name: &str) -> ContainerResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let blueprint = self.inner.registry.lookup(name)?;
        self.capability_view::<C>(name, &blueprint)
    }

    fn capability_view<C>(&self, name: &str, blueprint: &Blueprint) -> ContainerResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let instance = self.get_bean(&self.type_lookup_name(name)?)?;
        blueprint
            .component_type()
            .cast::<C>(&instance)
            .ok_or_else(|| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<C>(),
            })
    }

    fn names_of_own_type<T: 'static>(&self) -> Vec<String> {
        let wanted = TypeId::of::<T>();
        self.inner
            .registry
            .lookup_by_capability(wanted)
            .into_iter()
            .filter(|(_, bp)| bp.component_type().type_id() == wanted)
            .map(|(name, _)| name)
            .collect()
    }

    /// Type lookups observe the blueprint's own object, so factories are
    /// dereferenced.
    fn type_lookup_name(&self, name: &str) -> ContainerResult<String> {
        let blueprint = self.inner.registry.lookup(name)?;
        Ok(if blueprint.is_factory() {
            format!("{}{}", FACTORY_PREFIX, name)
        } else {
            name.to_string()
        })
    }

    /// Builds every non-lazy singleton blueprint, in registration order.
    pub fn pre_instantiate_singletons(&self) -> ContainerResult<()> {
        for name in self.inner.registry.names() {
            let blueprint = self.inner.registry.lookup(&name)?;
            if blueprint.is_singleton() && !blueprint.is_lazy() {
                self.get_bean(&name)?;
            }
        }
        Ok(())
    }

    /// Runs every registered teardown, then empties the singleton caches.
    pub fn destroy_singletons(&self) -> Result<(), DestructionError> {
        let result = self.inner.destruction.destroy_all();
        self.inner.cache.clear();
        self.inner.factories.clear();
        result
    }

    // ----- Construction -----

    fn create(&self, name: &str, blueprint: &Arc<Blueprint>) -> ContainerResult<Instance> {
        let _guard = CreationGuard::enter(self.inner.id, name, self.inner.settings.max_creation_depth)?;

        let observed = self.inner.observers.has_observers();
        let started = Instant::now();
        if observed {
            self.inner.observers.building(name);
        }
        tracing::debug!(component = name, scope = %blueprint.scope(), "creating component");

        match self.do_create(name, blueprint) {
            Ok(instance) => {
                if observed {
                    self.inner.observers.built(name, started.elapsed());
                }
                Ok(instance)
            }
            Err(e) => {
                self.inner.cache.discard(name);
                if observed {
                    self.inner.observers.build_failed(name, &e);
                }
                Err(ContainerError::build(name, e))
            }
        }
    }

    fn do_create(&self, name: &str, blueprint: &Arc<Blueprint>) -> ContainerResult<Instance> {
        let pipeline = &self.inner.pipeline;
        let ty = blueprint.component_type();

        if let Some(replacement) = pipeline.before_instantiation(self, ty, name)? {
            let wrapped = pipeline.after_init(self, replacement, name)?;
            return Ok(self.finish(name, blueprint, wrapped));
        }

        let raw = ty.instantiate().map_err(|source| ContainerError::Operation {
            component: name.to_string(),
            operation: "instantiate".to_string(),
            source,
        })?;

        if blueprint.is_singleton() && self.inner.settings.allow_circular_references {
            let engine = Arc::downgrade(&self.inner);
            let early = raw.clone();
            let early_name = name.to_string();
            self.inner.cache.register_early_factory(
                name,
                Box::new(move || {
                    let inner = engine.upgrade().ok_or(ContainerError::ContainerDropped)?;
                    let engine = LifecycleEngine { inner };
                    engine.inner.pipeline.early_reference(&engine, early, &early_name)
                }),
            );
        }

        if pipeline.after_instantiation(self, &raw, name)? {
            let values = pipeline.before_population(self, blueprint.properties().clone(), &raw, name)?;
            self.populate(name, blueprint, &raw, &values)?;
        }

        let wrapped = self.initialize(name, blueprint, raw)?;
        Ok(self.finish(name, blueprint, wrapped))
    }

    fn populate(
        &self,
        name: &str,
        blueprint: &Blueprint,
        raw: &Instance,
        values: &PropertyValues,
    ) -> ContainerResult<()> {
        let ty = blueprint.component_type();
        let conversion = self.conversion_service();
        for spec in values {
            match &spec.value {
                PropertyValue::Reference(target) => {
                    // No lock on `raw` is held across the recursive lookup
                    let dependency = self.get_bean(target)?;
                    ty.assign(name, raw, &spec.name, Assignment::Instance(dependency))?;
                }
                PropertyValue::Literal(literal) => {
                    ty.assign(name, raw, &spec.name, Assignment::Literal(literal, conversion.as_deref()))?;
                }
            }
        }
        tracing::trace!(component = name, properties = values.len(), "populated");
        Ok(())
    }

    fn initialize(&self, name: &str, blueprint: &Blueprint, instance: Instance) -> ContainerResult<Instance> {
        let ty = blueprint.component_type();
        if ty.make_aware(&instance, self.handle()) {
            tracing::trace!(component = name, "container handle injected");
        }

        let wrapped = self.inner.pipeline.before_init(self, instance, name)?;

        let ran_contract = ty.run_init_contract(name, &wrapped)?;
        if let Some(operation) = blueprint.init_operation() {
            if !(ran_contract && operation == "after_properties_set") {
                ty.invoke(name, &wrapped, operation)?;
            }
        }

        self.inner.pipeline.after_init(self, wrapped, name)
    }

    /// Registers the teardown and promotes singletons.
    fn finish(&self, name: &str, blueprint: &Arc<Blueprint>, wrapped: Instance) -> Instance {
        let ty = blueprint.component_type();

        if blueprint.is_singleton()
            && (blueprint.teardown_operation().is_some() || (ty.is_disposable() && ty.is_instance(&wrapped)))
        {
            self.inner.destruction.register(
                name,
                Box::new(ComponentTeardown {
                    name: name.to_string(),
                    ty: ty.clone(),
                    instance: wrapped.clone(),
                    operation: blueprint.teardown_operation().map(str::to_string),
                }),
            );
        }

        if blueprint.is_prototype() {
            return wrapped;
        }

        let exposed = match self.inner.cache.exposed_early(name) {
            Some(early) => {
                if !Arc::ptr_eq(&early, &wrapped) {
                    tracing::warn!(
                        component = name,
                        "early reference handed to dependents differs from the initialized instance; keeping the early reference"
                    );
                }
                early
            }
            None => wrapped,
        };
        self.inner.cache.promote(name, exposed.clone());
        exposed
    }
}

fn single_candidate(mut names: Vec<String>, type_name: &'static str) -> ContainerResult<String> {
    match names.len() {
        0 => Err(ContainerError::NotFound(type_name.to_string())),
        1 => Ok(names.remove(0)),
        _ => Err(ContainerError::NoUniqueComponent {
            capability: type_name,
            candidates: names,
        }),
    }
}

impl Default for LifecycleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverCore for LifecycleEngine {
    fn resolve_any(&self, name: &str) -> ContainerResult<Instance> {
        self.get_bean(name)
    }
}

impl fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("id", &self.inner.id)
            .field("registry", &self.inner.registry)
            .field("cache", &self.inner.cache)
            .field("hooks", &self.inner.pipeline)
            .finish()
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if !self.destruction.is_empty() {
            tracing::warn!(
                container = self.id,
                pending = self.destruction.len(),
                "container dropped with teardowns that never ran"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentType;
    use crate::traits::Resolver;

    #[derive(Default)]
    struct Leaf {
        label: String,
    }

    #[test]
    fn failed_build_leaves_no_trace() {
        let engine = LifecycleEngine::new();
        let ty = ComponentType::builder::<Leaf>()
            .property("label", |l: &mut Leaf, v: String| l.label = v)
            .build();
        engine
            .register("leaf", Blueprint::new(ty).with_literal("label", 5))
            .unwrap();

        assert!(engine.get_bean("leaf").is_err());
        assert!(!engine.inner.cache.contains("leaf"));
        assert!(engine.get_bean("leaf").is_err());
    }

    #[test]
    fn handle_resolves_through_engine() {
        let engine = LifecycleEngine::new();
        engine.register("leaf", Blueprint::new(ComponentType::of::<Leaf>())).unwrap();
        let handle = engine.handle();
        assert!(handle.same_container(&engine));
        assert!(handle.get_bean_as::<Leaf>("leaf").is_ok());

        drop(engine);
        assert!(matches!(handle.resolve_any("leaf"), Err(ContainerError::ContainerDropped)));
    }

    #[test]
    fn single_candidate_errors() {
        assert!(matches!(single_candidate(vec![], "T"), Err(ContainerError::NotFound(_))));
        let err = single_candidate(vec!["a".into(), "b".into()], "T").unwrap_err();
        assert!(matches!(err, ContainerError::NoUniqueComponent { candidates, .. } if candidates.len() == 2));
    }
}
