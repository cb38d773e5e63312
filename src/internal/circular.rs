//! Re-entrancy detection for component creation.

use std::cell::RefCell;

use crate::error::{ContainerError, ContainerResult};

// Thread-local creation state, keyed by container id
thread_local! {
    static CREATION_TLS: RefCell<CreationTls> = RefCell::new(CreationTls::default());
}

#[derive(Default)]
struct CreationTls {
    stack: Vec<(u64, String)>,
}

/// Marks a component as under construction on the current thread.
///
/// Creation that re-enters a name still on the stack, without having been
/// satisfied by an early reference, is a cycle the cache cannot break.
pub(crate) struct CreationGuard {
    container: u64,
}

impl CreationGuard {
    pub(crate) fn enter(container: u64, name: &str, max_depth: usize) -> ContainerResult<Self> {
        CREATION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();
            let mut own = tls.stack.iter().filter(|(c, _)| *c == container);

            // Circular detection BEFORE pushing the new name
            if own.clone().any(|(_, n)| n == name) {
                let mut path: Vec<String> = own
                    .by_ref()
                    .map(|(_, n)| n.clone())
                    .skip_while(|n| n != name)
                    .collect();
                path.push(name.to_string());
                return Err(ContainerError::Circular(path));
            }

            let depth = own.count();
            if depth >= max_depth {
                return Err(ContainerError::DepthExceeded(depth));
            }

            tls.stack.push((container, name.to_string()));
            Ok(Self { container })
        })
    }

    /// Names under construction in `container`, outermost first.
    #[cfg(test)]
    pub(crate) fn current_path(container: u64) -> Vec<String> {
        CREATION_TLS.with(|tls| {
            tls.borrow()
                .stack
                .iter()
                .filter(|(c, _)| *c == container)
                .map(|(_, n)| n.clone())
                .collect()
        })
    }
}

impl Drop for CreationGuard {
    fn drop(&mut self) {
        CREATION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();
            if let Some(pos) = tls.stack.iter().rposition(|(c, _)| *c == self.container) {
                tls.stack.remove(pos);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentry_reports_cycle_path() {
        let _a = CreationGuard::enter(1, "a", 8).unwrap();
        let _b = CreationGuard::enter(1, "b", 8).unwrap();
        let err = CreationGuard::enter(1, "a", 8).err().unwrap();
        assert!(matches!(err, ContainerError::Circular(path) if path == vec!["a", "b", "a"]));
    }

    #[test]
    fn containers_are_isolated() {
        let _a = CreationGuard::enter(1, "a", 8).unwrap();
        let _other = CreationGuard::enter(2, "a", 8).unwrap();
        assert_eq!(CreationGuard::current_path(2), vec!["a"]);
    }

    #[test]
    fn guard_pops_on_drop() {
        {
            let _a = CreationGuard::enter(3, "a", 8).unwrap();
            assert_eq!(CreationGuard::current_path(3), vec!["a"]);
        }
        assert!(CreationGuard::current_path(3).is_empty());
    }

    #[test]
    fn depth_limit() {
        let _a = CreationGuard::enter(4, "a", 2).unwrap();
        let _b = CreationGuard::enter(4, "b", 2).unwrap();
        assert!(matches!(CreationGuard::enter(4, "c", 2), Err(ContainerError::DepthExceeded(2))));
    }
}
