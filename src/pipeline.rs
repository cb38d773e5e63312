//! Extension pipeline: ordered lifecycle hooks invoked at each build stage.
//!
//! A [`LifecycleHook`] is a named struct of optional stage functions. Hooks
//! run in registration order at every stage; the pipeline checks whether a
//! hook implements a stage before invoking it. Every stage function receives
//! the engine as an explicit context argument.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_lifecycle::{ComponentType, LifecycleEngine, LifecycleHook, Blueprint};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Service;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//!
//! let engine = LifecycleEngine::new();
//! engine.add_hook(LifecycleHook::new("counter").after_init(move |_, instance, _| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(instance)
//! }));
//! engine.register("service", Blueprint::new(ComponentType::of::<Service>())).unwrap();
//!
//! engine.get_bean("service").unwrap();
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::component::{ComponentType, Instance};
use crate::engine::LifecycleEngine;
use crate::error::{BoxError, ContainerError, ContainerResult};
use crate::value::PropertyValues;

/// Lifecycle stage a hook runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    BeforeInstantiation,
    AfterInstantiation,
    BeforePopulation,
    EarlyReference,
    BeforeInit,
    AfterInit,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::BeforeInstantiation => "before-instantiation",
            HookStage::AfterInstantiation => "after-instantiation",
            HookStage::BeforePopulation => "before-population",
            HookStage::EarlyReference => "early-reference",
            HookStage::BeforeInit => "before-init",
            HookStage::AfterInit => "after-init",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BeforeInstantiationFn =
    dyn Fn(&LifecycleEngine, &ComponentType, &str) -> Result<Option<Instance>, BoxError> + Send + Sync;
type AfterInstantiationFn = dyn Fn(&LifecycleEngine, &Instance, &str) -> Result<bool, BoxError> + Send + Sync;
type BeforePopulationFn =
    dyn Fn(&LifecycleEngine, PropertyValues, &Instance, &str) -> Result<PropertyValues, BoxError> + Send + Sync;
type ReplaceFn = dyn Fn(&LifecycleEngine, Instance, &str) -> Result<Instance, BoxError> + Send + Sync;

/// A named set of optional stage functions.
///
/// Hook identity is its name: adding a hook whose name is already present
/// removes the old one and appends the new one at the end.
#[derive(Clone)]
pub struct LifecycleHook {
    name: String,
    before_instantiation: Option<Arc<BeforeInstantiationFn>>,
    after_instantiation: Option<Arc<AfterInstantiationFn>>,
    before_population: Option<Arc<BeforePopulationFn>>,
    early_reference: Option<Arc<ReplaceFn>>,
    before_init: Option<Arc<ReplaceFn>>,
    after_init: Option<Arc<ReplaceFn>>,
}

impl LifecycleHook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before_instantiation: None,
            after_instantiation: None,
            before_population: None,
            early_reference: None,
            before_init: None,
            after_init: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returning `Some` replaces the whole build: only `after_init` hooks run
    /// on the replacement.
    pub fn before_instantiation<F>(mut self, f: F) -> Self
    where
        F: Fn(&LifecycleEngine, &ComponentType, &str) -> Result<Option<Instance>, BoxError> + Send + Sync + 'static,
    {
        self.before_instantiation = Some(Arc::new(f));
        self
    }

    /// Returning `false` skips population; init still runs.
    pub fn after_instantiation<F>(mut self, f: F) -> Self
    where
        F: Fn(&LifecycleEngine, &Instance, &str) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.after_instantiation = Some(Arc::new(f));
        self
    }

    pub fn before_population<F>(mut self, f: F) -> Self
    where
        F: Fn(&LifecycleEngine, PropertyValues, &Instance, &str) -> Result<PropertyValues, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.before_population = Some(Arc::new(f));
        self
    }

    /// Runs once, when a dependent first demands the early reference.
    pub fn early_reference<F>(mut self, f: F) -> Self
    where
        F: Fn(&LifecycleEngine, Instance, &str) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        self.early_reference = Some(Arc::new(f));
        self
    }

    pub fn before_init<F>(mut self, f: F) -> Self
    where
        F: Fn(&LifecycleEngine, Instance, &str) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        self.before_init = Some(Arc::new(f));
        self
    }

    pub fn after_init<F>(mut self, f: F) -> Self
    where
        F: Fn(&LifecycleEngine, Instance, &str) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        self.after_init = Some(Arc::new(f));
        self
    }

    fn replace_fn(&self, stage: HookStage) -> Option<&Arc<ReplaceFn>> {
        match stage {
            HookStage::EarlyReference => self.early_reference.as_ref(),
            HookStage::BeforeInit => self.before_init.as_ref(),
            HookStage::AfterInit => self.after_init.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<&str> = [
            (HookStage::BeforeInstantiation, self.before_instantiation.is_some()),
            (HookStage::AfterInstantiation, self.after_instantiation.is_some()),
            (HookStage::BeforePopulation, self.before_population.is_some()),
            (HookStage::EarlyReference, self.early_reference.is_some()),
            (HookStage::BeforeInit, self.before_init.is_some()),
            (HookStage::AfterInit, self.after_init.is_some()),
        ]
        .iter()
        .filter(|(_, present)| *present)
        .map(|(stage, _)| stage.as_str())
        .collect();
        f.debug_struct("LifecycleHook")
            .field("name", &self.name)
            .field("stages", &stages)
            .finish()
    }
}

/// Ordered list of lifecycle hooks.
///
/// Stage invocations iterate over a snapshot of the list, so a hook may
/// register further hooks without deadlocking; those take effect from the
/// next stage invocation.
#[derive(Default)]
pub struct ExtensionPipeline {
    hooks: RwLock<Vec<Arc<LifecycleHook>>>,
}

fn processing(hook: &LifecycleHook, stage: HookStage, component: &str, source: BoxError) -> ContainerError {
    ContainerError::Processing {
        hook: hook.name.clone(),
        stage,
        component: component.to_string(),
        source,
    }
}

impl ExtensionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook, removing any earlier hook with the same name first.
    pub fn add(&self, hook: LifecycleHook) {
        let mut hooks = self.hooks.write();
        hooks.retain(|existing| existing.name != hook.name);
        hooks.push(Arc::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.hooks.read().iter().map(|h| h.name.clone()).collect()
    }

    fn snapshot(&self) -> Vec<Arc<LifecycleHook>> {
        self.hooks.read().clone()
    }

    /// First non-empty replacement wins.
    pub(crate) fn before_instantiation(
        &self,
        engine: &LifecycleEngine,
        ty: &ComponentType,
        name: &str,
    ) -> ContainerResult<Option<Instance>> {
        for hook in self.snapshot() {
            if let Some(f) = &hook.before_instantiation {
                let replacement = f(engine, ty, name)
                    .map_err(|e| processing(&hook, HookStage::BeforeInstantiation, name, e))?;
                if replacement.is_some() {
                    tracing::debug!(component = name, hook = %hook.name, "instantiation short-circuited");
                    return Ok(replacement);
                }
            }
        }
        Ok(None)
    }

    /// Stops at the first hook returning `false`.
    pub(crate) fn after_instantiation(
        &self,
        engine: &LifecycleEngine,
        instance: &Instance,
        name: &str,
    ) -> ContainerResult<bool> {
        for hook in self.snapshot() {
            if let Some(f) = &hook.after_instantiation {
                let proceed =
                    f(engine, instance, name).map_err(|e| processing(&hook, HookStage::AfterInstantiation, name, e))?;
                if !proceed {
                    tracing::debug!(component = name, hook = %hook.name, "population skipped");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Threads the property values through every hook.
    pub(crate) fn before_population(
        &self,
        engine: &LifecycleEngine,
        mut values: PropertyValues,
        instance: &Instance,
        name: &str,
    ) -> ContainerResult<PropertyValues> {
        for hook in self.snapshot() {
            if let Some(f) = &hook.before_population {
                values = f(engine, values, instance, name)
                    .map_err(|e| processing(&hook, HookStage::BeforePopulation, name, e))?;
            }
        }
        Ok(values)
    }

    pub(crate) fn early_reference(
        &self,
        engine: &LifecycleEngine,
        instance: Instance,
        name: &str,
    ) -> ContainerResult<Instance> {
        self.chain(HookStage::EarlyReference, engine, instance, name)
    }

    pub(crate) fn before_init(&self, engine: &LifecycleEngine, instance: Instance, name: &str) -> ContainerResult<Instance> {
        self.chain(HookStage::BeforeInit, engine, instance, name)
    }

    pub(crate) fn after_init(&self, engine: &LifecycleEngine, instance: Instance, name: &str) -> ContainerResult<Instance> {
        self.chain(HookStage::AfterInit, engine, instance, name)
    }

    /// Each hook wraps the previous hook's output.
    fn chain(
        &self,
        stage: HookStage,
        engine: &LifecycleEngine,
        mut instance: Instance,
        name: &str,
    ) -> ContainerResult<Instance> {
        for hook in self.snapshot() {
            if let Some(f) = hook.replace_fn(stage) {
                instance = f(engine, instance, name).map_err(|e| processing(&hook, stage, name, e))?;
            }
        }
        Ok(instance)
    }
}

impl fmt::Debug for ExtensionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.hooks.read().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_moves_to_end() {
        let pipeline = ExtensionPipeline::new();
        pipeline.add(LifecycleHook::new("a"));
        pipeline.add(LifecycleHook::new("b"));
        pipeline.add(LifecycleHook::new("a"));
        assert_eq!(pipeline.names(), vec!["b", "a"]);
    }

    #[test]
    fn debug_lists_present_stages() {
        let hook = LifecycleHook::new("tracer").after_init(|_, i, _| Ok(i));
        let rendered = format!("{:?}", hook);
        assert!(rendered.contains("after-init"));
        assert!(!rendered.contains("before-init"));
    }

    #[test]
    fn stage_display() {
        assert_eq!(HookStage::EarlyReference.to_string(), "early-reference");
    }
}
