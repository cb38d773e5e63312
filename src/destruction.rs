//! Teardown tracking for singletons.

use parking_lot::Mutex;

use crate::component::{ComponentType, Instance};
use crate::error::{BoxError, DestructionError};

/// A registered shutdown operation.
pub trait Teardown: Send {
    fn destroy(self: Box<Self>) -> Result<(), BoxError>;
}

impl<F> Teardown for F
where
    F: FnOnce() -> Result<(), BoxError> + Send,
{
    fn destroy(self: Box<Self>) -> Result<(), BoxError> {
        (*self)()
    }
}

/// Teardown of a built component: the structural `destroy` contract, then
/// the declared teardown operation unless it names that same contract.
pub(crate) struct ComponentTeardown {
    pub(crate) name: String,
    pub(crate) ty: ComponentType,
    pub(crate) instance: Instance,
    pub(crate) operation: Option<String>,
}

impl Teardown for ComponentTeardown {
    fn destroy(self: Box<Self>) -> Result<(), BoxError> {
        let ran_contract = self.ty.run_destroy_contract(&self.name, &self.instance)?;
        if let Some(operation) = &self.operation {
            if !(ran_contract && operation == "destroy") {
                self.ty.invoke(&self.name, &self.instance, operation)?;
            }
        }
        Ok(())
    }
}

/// Ordered registry of teardowns, drained once at shutdown.
///
/// Registering a name twice replaces the earlier teardown in place.
#[derive(Default)]
pub struct DestructionRegistry {
    entries: Mutex<Vec<(String, Box<dyn Teardown>)>>,
}

impl DestructionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, teardown: Box<dyn Teardown>) {
        let name = name.into();
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = teardown,
            None => entries.push((name, teardown)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Runs every teardown in registration order.
    ///
    /// Each entry leaves the registry before it runs, so a re-entrant call
    /// cannot invoke it twice. Failures are collected; the remaining
    /// teardowns still run.
    pub fn destroy_all(&self) -> Result<(), DestructionError> {
        let mut errors = DestructionError::default();
        loop {
            let next = {
                let mut entries = self.entries.lock();
                if entries.is_empty() {
                    None
                } else {
                    Some(entries.remove(0))
                }
            };
            let Some((name, teardown)) = next else { break };

            tracing::debug!(component = %name, "running teardown");
            if let Err(e) = teardown.destroy() {
                tracing::warn!(component = %name, error = %e, "teardown failed");
                errors.push(name, e.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl std::fmt::Debug for DestructionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.entries.lock().iter().map(|(n, _)| n.clone()).collect();
        f.debug_struct("DestructionRegistry").field("pending", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str, fail: bool) -> Box<dyn Teardown> {
        let log = log.clone();
        Box::new(move || -> Result<(), BoxError> {
            log.lock().push(tag);
            if fail {
                Err(format!("{} exploded", tag).into())
            } else {
                Ok(())
            }
        })
    }

    #[test]
    fn runs_in_registration_order_and_collects_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = DestructionRegistry::new();
        registry.register("a", recorder(&log, "a", false));
        registry.register("b", recorder(&log, "b", true));
        registry.register("c", recorder(&log, "c", false));

        let err = registry.destroy_all().unwrap_err();
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].name, "b");
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistration_replaces_in_place() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = DestructionRegistry::new();
        registry.register("a", recorder(&log, "a1", false));
        registry.register("b", recorder(&log, "b", false));
        registry.register("a", recorder(&log, "a2", false));

        registry.destroy_all().unwrap();
        assert_eq!(*log.lock(), vec!["a2", "b"]);
    }

    #[test]
    fn second_drain_is_a_no_op() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = DestructionRegistry::new();
        registry.register("a", recorder(&log, "a", false));
        registry.destroy_all().unwrap();
        registry.destroy_all().unwrap();
        assert_eq!(log.lock().len(), 1);
    }
}
