//! Application context: an engine plus the startup and shutdown sequence
//! around it.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::blueprint::Blueprint;
use crate::catalog::TypeCatalog;
use crate::component::{Instance, Shared};
use crate::config::ContainerSettings;
use crate::conversion::{ConversionService, DefaultConversionService};
use crate::engine::LifecycleEngine;
use crate::error::{ContainerError, ContainerResult};
use crate::observer::LifecycleObserver;
use crate::pipeline::LifecycleHook;
use crate::placeholder::{PlaceholderConfigurer, Properties};
use crate::traits::{BlueprintPostProcessor, ResolverCore};

/// Component name under which a conversion service is looked up on refresh.
pub const CONVERSION_SERVICE_NAME: &str = "conversionService";

/// What happened to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
pub enum ContextEventKind {
    Refreshed,
    Closed,
}

/// Event published to listeners on refresh and close.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
pub struct ContextEvent {
    pub kind: ContextEventKind,
    pub timestamp: DateTime<Utc>,
}

impl ContextEvent {
    fn now(kind: ContextEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Receives context events.
///
/// Components declaring the `dyn EventListener` capability are picked up on
/// refresh.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &ContextEvent);
}

impl<F> EventListener for F
where
    F: Fn(&ContextEvent) + Send + Sync,
{
    fn on_event(&self, event: &ContextEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextState {
    Created,
    Active,
    Closed,
}

enum Source {
    Blueprint(String, Blueprint),
    #[cfg(feature = "config")]
    Json(String),
    #[cfg(feature = "config")]
    Yaml(String),
    #[cfg(feature = "config")]
    Path(std::path::PathBuf),
}

/// Collects everything an [`ApplicationContext`] starts from.
#[derive(Default)]
pub struct ContextBuilder {
    settings: ContainerSettings,
    catalog: TypeCatalog,
    sources: Vec<Source>,
    post_processors: Vec<Arc<dyn BlueprintPostProcessor>>,
    hooks: Vec<LifecycleHook>,
    listeners: Vec<Arc<dyn EventListener>>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl ContextBuilder {
    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Types that blueprint documents and component scanning can name.
    pub fn catalog(mut self, catalog: TypeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn blueprint(mut self, name: &str, blueprint: Blueprint) -> Self {
        self.sources.push(Source::Blueprint(name.to_string(), blueprint));
        self
    }

    #[cfg(feature = "config")]
    pub fn json(mut self, document: impl Into<String>) -> Self {
        self.sources.push(Source::Json(document.into()));
        self
    }

    #[cfg(feature = "config")]
    pub fn yaml(mut self, document: impl Into<String>) -> Self {
        self.sources.push(Source::Yaml(document.into()));
        self
    }

    /// A blueprint document file; `.json`, `.yaml` or `.yml`.
    #[cfg(feature = "config")]
    pub fn document_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.sources.push(Source::Path(path.into()));
        self
    }

    pub fn post_processor(mut self, processor: Arc<dyn BlueprintPostProcessor>) -> Self {
        self.post_processors.push(processor);
        self
    }

    /// Shorthand for a [`PlaceholderConfigurer`] over `properties`.
    pub fn properties(self, properties: Properties) -> Self {
        self.post_processor(Arc::new(PlaceholderConfigurer::new(properties)))
    }

    pub fn hook(mut self, hook: LifecycleHook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Creates the engine and loads every blueprint source, in the order
    /// they were added. Nothing is built until [`ApplicationContext::refresh`].
    pub fn build(self) -> ContainerResult<ApplicationContext> {
        let engine = LifecycleEngine::with_settings(self.settings);
        for observer in self.observers {
            engine.add_observer(observer);
        }
        for hook in self.hooks {
            engine.add_hook(hook);
        }

        for source in self.sources {
            match source {
                Source::Blueprint(name, blueprint) => engine.register(&name, blueprint)?,
                #[cfg(feature = "config")]
                Source::Json(document) => {
                    crate::reader::BlueprintReader::new(&engine, &self.catalog).load_json_str(&document)?;
                }
                #[cfg(feature = "config")]
                Source::Yaml(document) => {
                    crate::reader::BlueprintReader::new(&engine, &self.catalog).load_yaml_str(&document)?;
                }
                #[cfg(feature = "config")]
                Source::Path(path) => {
                    crate::reader::BlueprintReader::new(&engine, &self.catalog).load_path(&path)?;
                }
            }
        }

        Ok(ApplicationContext {
            engine,
            catalog: self.catalog,
            post_processors: self.post_processors,
            listeners: RwLock::new(self.listeners),
            state: Mutex::new(ContextState::Created),
        })
    }
}

/// A lifecycle engine with a one-shot startup (`refresh`) and shutdown
/// (`close`).
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ApplicationContext, Blueprint, ComponentType, Properties, Resolver};
///
/// #[derive(Default)]
/// struct Car { brand: String }
///
/// let car = ComponentType::builder::<Car>()
///     .property("brand", |c: &mut Car, v: String| c.brand = v)
///     .build();
///
/// let mut props = Properties::new();
/// props.set("brand", "lamborghini");
///
/// let context = ApplicationContext::builder()
///     .blueprint("car", Blueprint::new(car).with_literal("brand", "${brand}"))
///     .properties(props)
///     .build()
///     .unwrap();
/// context.refresh().unwrap();
///
/// assert_eq!(context.get_bean_as::<Car>("car").unwrap().read().brand, "lamborghini");
/// context.close().unwrap();
/// ```
pub struct ApplicationContext {
    engine: LifecycleEngine,
    catalog: TypeCatalog,
    post_processors: Vec<Arc<dyn BlueprintPostProcessor>>,
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    state: Mutex<ContextState>,
}

impl ApplicationContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Runs the startup sequence:
    ///
    /// 1. blueprint post-processors, in order;
    /// 2. hooks exposed by components declaring the `LifecycleHook` capability;
    /// 3. the conversion service named `conversionService`, else the default one;
    /// 4. listeners exposed by components declaring `dyn EventListener`;
    /// 5. every non-lazy singleton;
    /// 6. a `Refreshed` event.
    ///
    /// A context refreshes once. Any failure tears down what was built so
    /// far and leaves the context closed.
    pub fn refresh(&self) -> ContainerResult<()> {
        let mut state = self.state.lock();
        if *state != ContextState::Created {
            return Err(ContainerError::Config(format!(
                "context cannot be refreshed in state {:?}",
                *state
            )));
        }

        if let Err(e) = self.start() {
            tracing::warn!(error = %e, "refresh failed; destroying singletons built so far");
            if let Err(teardown) = self.engine.destroy_singletons() {
                tracing::warn!(error = %teardown, "teardown after failed refresh");
            }
            *state = ContextState::Closed;
            return Err(e);
        }

        *state = ContextState::Active;
        drop(state);
        tracing::info!(components = self.engine.blueprint_names().len(), "context refreshed");
        self.publish_event(&ContextEvent::now(ContextEventKind::Refreshed));
        Ok(())
    }

    fn start(&self) -> ContainerResult<()> {
        for processor in &self.post_processors {
            processor.post_process(&self.engine)?;
        }

        for name in self.engine.names_for_type_id(TypeId::of::<LifecycleHook>()) {
            let hook = self.engine.get_capability::<LifecycleHook>(&name)?;
            self.engine.add_hook((*hook).clone());
        }

        let conversion: Arc<dyn ConversionService> = if self.engine.contains_blueprint(CONVERSION_SERVICE_NAME) {
            self.engine.get_capability::<dyn ConversionService>(CONVERSION_SERVICE_NAME)?
        } else {
            Arc::new(DefaultConversionService::new())
        };
        self.engine.set_conversion_service(conversion);

        let discovered = self
            .engine
            .names_for_type_id(TypeId::of::<dyn EventListener>())
            .into_iter()
            .map(|name| self.engine.get_capability::<dyn EventListener>(&name))
            .collect::<ContainerResult<Vec<_>>>()?;
        self.listeners.write().extend(discovered);

        self.engine.pre_instantiate_singletons()
    }

    /// Publishes `Closed`, then runs every teardown and resets the caches.
    /// Closing a context that is not active does nothing.
    pub fn close(&self) -> ContainerResult<()> {
        {
            let mut state = self.state.lock();
            if *state != ContextState::Active {
                return Ok(());
            }
            *state = ContextState::Closed;
        }
        self.publish_event(&ContextEvent::now(ContextEventKind::Closed));
        self.engine.destroy_singletons()?;
        tracing::info!("context closed");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        *self.state.lock() == ContextState::Active
    }

    /// Delivers `event` to every listener.
    pub fn publish_event(&self, event: &ContextEvent) {
        let listeners = self.listeners.read().clone();
        tracing::debug!(kind = ?event.kind, listeners = listeners.len(), "publishing context event");
        for listener in listeners {
            listener.on_event(event);
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().push(listener);
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn get_bean(&self, name: &str) -> ContainerResult<Instance> {
        self.engine.get_bean(name)
    }

    pub fn contains_blueprint(&self, name: &str) -> bool {
        self.engine.contains_blueprint(name)
    }

    pub fn get_beans_of_type<T: Send + Sync + 'static>(&self) -> ContainerResult<HashMap<String, Shared<T>>> {
        self.engine.get_beans_of_type::<T>()
    }

    pub fn get_bean_of_type<T: Send + Sync + 'static>(&self) -> ContainerResult<Shared<T>> {
        self.engine.get_bean_of_type::<T>()
    }

    pub fn get_beans_of_capability<C>(&self) -> ContainerResult<HashMap<String, Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.engine.get_beans_of_capability::<C>()
    }

    pub fn get_bean_by_capability<C>(&self) -> ContainerResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.engine.get_bean_by_capability::<C>()
    }
}

impl ResolverCore for ApplicationContext {
    fn resolve_any(&self, name: &str) -> ContainerResult<Instance> {
        self.engine.get_bean(name)
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("engine", &self.engine)
            .field("state", &*self.state.lock())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}
