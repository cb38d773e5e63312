//! # ferrous-lifecycle
//!
//! Blueprint-driven component container: named blueprints describe how to
//! build components, and the engine builds, wires, initializes and tears
//! them down.
//!
//! ## Features
//!
//! - **Blueprints**: a component type, scope, laziness, property values and
//!   optional init/teardown operation names, registered under a name
//! - **Singleton and prototype scopes**: one shared instance per container, or
//!   a fresh one per lookup
//! - **Circular references**: singleton cycles wired through properties
//!   resolve through a three-tier singleton cache that exposes early references
//! - **Extension hooks**: ordered hooks at six points of construction that may
//!   replace, skip or wrap instances
//! - **Factory components**: a lookup returns the factory's product; `&name`
//!   returns the factory itself
//! - **Ordered teardown**: singletons are torn down in the order their teardowns
//!   were registered, and every failure is reported
//! - **Application context**: placeholder resolution, type conversion,
//!   autowiring, component scanning and JSON/YAML blueprint documents
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_lifecycle::{Blueprint, ComponentType, LifecycleEngine, Resolver, Scope, Shared};
//!
//! #[derive(Default)]
//! struct Engine { cylinders: i64 }
//!
//! #[derive(Default)]
//! struct Car { brand: String, engine: Option<Shared<Engine>> }
//!
//! let engine_type = ComponentType::builder::<Engine>()
//!     .property("cylinders", |e: &mut Engine, v: i64| e.cylinders = v)
//!     .build();
//! let car_type = ComponentType::builder::<Car>()
//!     .property("brand", |c: &mut Car, v: String| c.brand = v)
//!     .reference("engine", |c: &mut Car, e: Shared<Engine>| c.engine = Some(e))
//!     .build();
//!
//! let container = LifecycleEngine::new();
//! container.register("engine", Blueprint::new(engine_type).with_literal("cylinders", 12)).unwrap();
//! container.register(
//!     "car",
//!     Blueprint::new(car_type)
//!         .with_scope(Scope::Prototype)
//!         .with_literal("brand", "lamborghini")
//!         .with_reference("engine", "engine"),
//! ).unwrap();
//!
//! let first = container.get_bean_as::<Car>("car").unwrap();
//! let second = container.get_bean_as::<Car>("car").unwrap();
//! assert!(!std::sync::Arc::ptr_eq(&first, &second));
//!
//! let shared_engine = first.read().engine.clone().unwrap();
//! assert_eq!(shared_engine.read().cylinders, 12);
//! assert!(std::sync::Arc::ptr_eq(&shared_engine, &second.read().engine.clone().unwrap()));
//! ```
//!
//! ## Extension Hooks
//!
//! ```rust
//! use ferrous_lifecycle::{Blueprint, ComponentType, LifecycleEngine, LifecycleHook};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Service;
//!
//! let initialized = Arc::new(AtomicUsize::new(0));
//! let counter = initialized.clone();
//!
//! let engine = LifecycleEngine::new();
//! engine.add_hook(LifecycleHook::new("counter").after_init(move |_, instance, _| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(instance)
//! }));
//! engine.register("service", Blueprint::new(ComponentType::of::<Service>())).unwrap();
//! engine.pre_instantiate_singletons().unwrap();
//!
//! assert_eq!(initialized.load(Ordering::SeqCst), 1);
//! ```

pub mod autowire;
pub mod blueprint;
pub mod catalog;
pub mod component;
pub mod config;
pub mod context;
pub mod conversion;
pub mod destruction;
pub mod engine;
pub mod error;
pub mod factory;
pub mod observer;
pub mod pipeline;
pub mod placeholder;
#[cfg(feature = "config")]
pub mod reader;
pub mod registry;
pub mod scan;
pub mod scope;
pub mod singleton_cache;
pub mod traits;
pub mod value;

// Internal modules
mod internal;

pub use autowire::{AutowiredProcessor, AUTOWIRED_PROCESSOR};
pub use blueprint::Blueprint;
pub use catalog::{default_component_name, TypeCatalog};
pub use component::{
    downcast_shared, into_instance, shared, ComponentMarker, ComponentType, InjectionKind, InjectionPoint, Instance,
    Shared, TypeBuilder,
};
pub use config::{ContainerSettings, DuplicatePolicy, EnvironmentSource, SettingsSource};
pub use context::{
    ApplicationContext, ContextBuilder, ContextEvent, ContextEventKind, EventListener, CONVERSION_SERVICE_NAME,
};
pub use conversion::{ConversionService, DefaultConversionService};
pub use destruction::{DestructionRegistry, Teardown};
pub use engine::{ContainerHandle, LifecycleEngine};
pub use error::{BoxError, ContainerError, ContainerResult, DestructionError, TeardownFailure};
pub use factory::{FactoryIndirection, FACTORY_PREFIX};
pub use observer::{BuildStatsObserver, LifecycleObserver, LoggingObserver};
pub use pipeline::{ExtensionPipeline, HookStage, LifecycleHook};
pub use placeholder::{resolve_placeholders, PlaceholderConfigurer, Properties};
#[cfg(feature = "config")]
pub use reader::BlueprintReader;
pub use registry::BlueprintRegistry;
pub use scan::ComponentScanner;
pub use scope::Scope;
pub use singleton_cache::SingletonCache;
pub use traits::{
    BlueprintPostProcessor, ContainerAware, DisposableComponent, FactoryComponent, InitializingComponent, Resolver,
    ResolverCore, StringValueResolver,
};
pub use value::{Literal, PropertySpec, PropertyValue, PropertyValues};
