//! Observers for component build events.
//!
//! Observers are notified synchronously on the building thread. Keep
//! implementations cheap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::ContainerError;

/// Observer of component builds.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ContainerError, LifecycleEngine, LifecycleObserver};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct Printer;
///
/// impl LifecycleObserver for Printer {
///     fn building(&self, name: &str) {
///         println!("building {}", name);
///     }
///
///     fn built(&self, name: &str, duration: Duration) {
///         println!("built {} in {:?}", name, duration);
///     }
///
///     fn build_failed(&self, name: &str, error: &ContainerError) {
///         println!("{} failed: {}", name, error);
///     }
/// }
///
/// let engine = LifecycleEngine::new();
/// engine.add_observer(Arc::new(Printer));
/// ```
pub trait LifecycleObserver: Send + Sync {
    /// Called before a component's build starts. Cache hits are not builds.
    fn building(&self, name: &str);

    /// Called after a component is fully built, including prototypes.
    fn built(&self, name: &str, duration: Duration);

    /// Called when a build fails, before the error reaches the caller.
    fn build_failed(&self, name: &str, error: &ContainerError);
}

/// Registered observers.
#[derive(Default)]
pub(crate) struct Observers {
    observers: RwLock<Vec<Arc<dyn LifecycleObserver>>>,
}

impl Observers {
    pub(crate) fn add(&self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.write().push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn LifecycleObserver>> {
        self.observers.read().clone()
    }

    pub(crate) fn building(&self, name: &str) {
        for observer in self.snapshot() {
            observer.building(name);
        }
    }

    pub(crate) fn built(&self, name: &str, duration: Duration) {
        for observer in self.snapshot() {
            observer.built(name, duration);
        }
    }

    pub(crate) fn build_failed(&self, name: &str, error: &ContainerError) {
        for observer in self.snapshot() {
            observer.build_failed(name, error);
        }
    }
}

/// Observer forwarding build events to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LoggingObserver {
    prefix: Option<String>,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or("ferrous-lifecycle")
    }
}

impl LifecycleObserver for LoggingObserver {
    fn building(&self, name: &str) {
        tracing::debug!(target: "ferrous_lifecycle::observer", prefix = self.prefix(), component = name, "building");
    }

    fn built(&self, name: &str, duration: Duration) {
        tracing::info!(
            target: "ferrous_lifecycle::observer",
            prefix = self.prefix(),
            component = name,
            elapsed_us = duration.as_micros() as u64,
            "built"
        );
    }

    fn build_failed(&self, name: &str, error: &ContainerError) {
        tracing::error!(
            target: "ferrous_lifecycle::observer",
            prefix = self.prefix(),
            component = name,
            error = %error,
            "build failed"
        );
    }
}

/// Observer counting builds and failures.
#[derive(Debug, Default)]
pub struct BuildStatsObserver {
    builds: AtomicU64,
    failures: AtomicU64,
    total_build_time: AtomicU64,
    per_component: RwLock<std::collections::HashMap<String, u64>>,
}

impl BuildStatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed builds across all components.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Completed builds of one component.
    pub fn builds_of(&self, name: &str) -> u64 {
        self.per_component.read().get(name).copied().unwrap_or(0)
    }

    pub fn average_build_time(&self) -> Option<Duration> {
        let count = self.builds();
        if count == 0 {
            None
        } else {
            Some(Duration::from_nanos(self.total_build_time.load(Ordering::Relaxed) / count))
        }
    }

    pub fn reset(&self) {
        self.builds.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.total_build_time.store(0, Ordering::Relaxed);
        self.per_component.write().clear();
    }
}

impl LifecycleObserver for BuildStatsObserver {
    fn building(&self, _name: &str) {}

    fn built(&self, name: &str, duration: Duration) {
        self.builds.fetch_add(1, Ordering::Relaxed);
        self.total_build_time
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        *self.per_component.write().entry(name.to_string()).or_insert(0) += 1;
    }

    fn build_failed(&self, _name: &str, _error: &ContainerError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}
