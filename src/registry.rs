//! Named blueprint storage.

use std::any::TypeId;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::blueprint::Blueprint;
use crate::config::DuplicatePolicy;
use crate::error::{ContainerError, ContainerResult};

#[derive(Default)]
struct Entries {
    /// Registration order
    order: Vec<String>,
    by_name: AHashMap<String, Arc<Blueprint>>,
}

/// Stores named blueprints in registration order.
///
/// Reads take a shared lock; registration takes an exclusive one. Overwriting
/// an existing name keeps its original position.
pub struct BlueprintRegistry {
    entries: RwLock<Entries>,
    policy: DuplicatePolicy,
}

impl BlueprintRegistry {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Inserts a blueprint, or overwrites it when the policy allows.
    pub fn register(&self, name: &str, blueprint: Blueprint) -> ContainerResult<()> {
        let mut entries = self.entries.write();
        if entries.by_name.contains_key(name) {
            if self.policy == DuplicatePolicy::Reject {
                return Err(ContainerError::DuplicateName(name.to_string()));
            }
            tracing::debug!(component = name, "overwriting blueprint");
        } else {
            entries.order.push(name.to_string());
        }
        entries.by_name.insert(name.to_string(), Arc::new(blueprint));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> ContainerResult<Arc<Blueprint>> {
        self.entries
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().by_name.contains_key(name)
    }

    /// Every blueprint whose type satisfies the capability, in registration order.
    pub fn lookup_by_capability(&self, type_id: TypeId) -> Vec<(String, Arc<Blueprint>)> {
        let entries = self.entries.read();
        entries
            .order
            .iter()
            .filter_map(|name| entries.by_name.get(name).map(|bp| (name, bp)))
            .filter(|(_, bp)| bp.component_type().satisfies(type_id))
            .map(|(name, bp)| (name.clone(), bp.clone()))
            .collect()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().order.clone()
    }

    /// Rewrites a blueprint in place. The closure works on a copy when the
    /// blueprint is shared with an in-flight build.
    pub fn update<R>(&self, name: &str, f: impl FnOnce(&mut Blueprint) -> R) -> ContainerResult<R> {
        let mut entries = self.entries.write();
        let blueprint = entries
            .by_name
            .get_mut(name)
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))?;
        Ok(f(Arc::make_mut(blueprint)))
    }

    pub fn len(&self) -> usize {
        self.entries.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().order.is_empty()
    }
}

impl Default for BlueprintRegistry {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl std::fmt::Debug for BlueprintRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlueprintRegistry")
            .field("names", &self.entries.read().order)
            .field("policy", &self.policy)
            .finish()
    }
}
