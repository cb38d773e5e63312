//! Explicit container handle passed to container-aware components.

use std::fmt;
use std::sync::{Arc, Weak};

use super::{EngineInner, LifecycleEngine};
use crate::component::Instance;
use crate::error::{ContainerError, ContainerResult};
use crate::traits::ResolverCore;

/// Non-owning handle to a [`LifecycleEngine`].
///
/// Components receive one through
/// [`ContainerAware`](crate::ContainerAware). The handle does not keep the
/// container alive, so a component holding it creates no reference cycle.
#[derive(Clone)]
pub struct ContainerHandle {
    pub(super) inner: Weak<EngineInner>,
}

impl ContainerHandle {
    /// Upgrades to the engine, failing once the engine is gone.
    pub fn engine(&self) -> ContainerResult<LifecycleEngine> {
        self.inner
            .upgrade()
            .map(|inner| LifecycleEngine { inner })
            .ok_or(ContainerError::ContainerDropped)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Whether both handles point at the same container.
    pub fn same_container(&self, engine: &LifecycleEngine) -> bool {
        self.inner
            .upgrade()
            .map(|inner| Arc::ptr_eq(&inner, &engine.inner))
            .unwrap_or(false)
    }
}

impl ResolverCore for ContainerHandle {
    fn resolve_any(&self, name: &str) -> ContainerResult<Instance> {
        self.engine()?.get_bean(name)
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
