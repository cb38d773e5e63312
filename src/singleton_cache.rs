//! Three-tier singleton cache.
//!
//! - Tier-1 holds fully built singletons.
//! - Tier-2 holds early references: instances handed to a dependent while
//!   still being built further up the same call chain.
//! - Tier-3 holds construction promises: thunks that produce the early
//!   reference on first demand.
//!
//! A name occupies at most one tier at a time. Entries only move upward
//! (Tier-3 to Tier-2 to Tier-1), and Tier-1 entries are only removed by
//! [`SingletonCache::clear`] at shutdown.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};

use crate::component::Instance;
use crate::error::{ContainerError, ContainerResult};

/// Zero-argument thunk producing an early reference.
pub type EarlyFactory = Box<dyn FnOnce() -> ContainerResult<Instance> + Send>;

#[derive(Default)]
pub struct SingletonCache {
    built: RwLock<HashMap<String, Instance>>,
    early: Mutex<HashMap<String, Instance>>,
    promises: Mutex<HashMap<String, EarlyFactory>>,
}

impl SingletonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks the name up tier by tier.
    ///
    /// A Tier-3 hit removes the promise, invokes it exactly once and stores
    /// the result in Tier-2. No lock is held while the promise runs.
    pub fn get_if_present(&self, name: &str) -> ContainerResult<Option<Instance>> {
        if let Some(instance) = self.built.read().get(name) {
            return Ok(Some(instance.clone()));
        }
        if let Some(instance) = self.early.lock().get(name) {
            return Ok(Some(instance.clone()));
        }

        let promise = self.promises.lock().remove(name);
        match promise {
            Some(promise) => {
                tracing::trace!(component = name, "resolving construction promise");
                let instance = promise()?;
                self.early.lock().insert(name.to_string(), instance.clone());
                Ok(Some(instance))
            }
            None => Ok(None),
        }
    }

    /// Tier-1 lookup only.
    pub fn get_built(&self, name: &str) -> Option<Instance> {
        self.built.read().get(name).cloned()
    }

    /// Installs a Tier-3 promise unless the name is already fully built.
    pub fn register_early_factory(&self, name: &str, factory: EarlyFactory) {
        if self.built.read().contains_key(name) {
            return;
        }
        tracing::trace!(component = name, "construction promise registered");
        self.early.lock().remove(name);
        self.promises.lock().insert(name.to_string(), factory);
    }

    /// Returns the Tier-2 early reference, if a dependent forced one.
    pub fn exposed_early(&self, name: &str) -> Option<Instance> {
        self.early.lock().get(name).cloned()
    }

    /// Writes Tier-1 and clears Tier-2 and Tier-3 for the name.
    pub fn promote(&self, name: &str, instance: Instance) {
        self.built.write().insert(name.to_string(), instance);
        self.early.lock().remove(name);
        self.promises.lock().remove(name);
        tracing::trace!(component = name, "promoted to fully built");
    }

    /// Drops every unfinished trace of a name after a failed build.
    ///
    /// Tier-1 is left untouched.
    pub fn discard(&self, name: &str) {
        let early = self.early.lock().remove(name).is_some();
        let promise = self.promises.lock().remove(name).is_some();
        if early || promise {
            tracing::trace!(component = name, "discarded unfinished singleton");
        }
    }

    /// Registers an externally built singleton directly in Tier-1.
    ///
    /// Fails if the name is already cached in any tier.
    pub fn register_singleton(&self, name: &str, instance: Instance) -> ContainerResult<()> {
        let mut built = self.built.write();
        if built.contains_key(name) || self.early.lock().contains_key(name) || self.promises.lock().contains_key(name) {
            return Err(ContainerError::DuplicateName(name.to_string()));
        }
        built.insert(name.to_string(), instance);
        tracing::trace!(component = name, "registered as fully built");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.built.read().contains_key(name)
            || self.early.lock().contains_key(name)
            || self.promises.lock().contains_key(name)
    }

    /// Names of fully built singletons.
    pub fn built_names(&self) -> Vec<String> {
        self.built.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.built.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.read().is_empty()
    }

    /// Empties every tier. Shutdown only.
    pub fn clear(&self) {
        self.built.write().clear();
        self.early.lock().clear();
        self.promises.lock().clear();
    }
}

impl std::fmt::Debug for SingletonCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonCache")
            .field("built", &self.built.read().len())
            .field("early", &self.early.lock().len())
            .field("promises", &self.promises.lock().len())
            .finish()
    }
}
