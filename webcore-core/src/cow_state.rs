//! Copy-on-write registries
//!
//! Every registry in webcore (plugins, applications, modules, endpoint items,
//! the endpoint directory and the sitemap index) is read while handling
//! requests and written by lifecycle events. A write clones the current value,
//! mutates the clone and swaps it in under a short write lock; a read clones
//! an `Arc`. Readers therefore observe either the state before a write or the
//! state after it.
//!
//! ```rust
//! use webcore_core::cow_state::CowState;
//!
//! let state = CowState::new(vec!["a", "b"]);
//! let before = state.snapshot();
//!
//! state.update(|v| v.push("c"));
//!
//! assert_eq!(before.len(), 2);
//! assert_eq!(state.snapshot().len(), 3);
//! assert!(state.snapshot().version() > before.version());
//! ```

use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::Arc;

/// A published value together with the version it was published as.
#[derive(Debug)]
pub struct Snapshot<T> {
    value: Arc<T>,
    version: u64,
}

impl<T> Snapshot<T> {
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether both snapshots were taken from the same publication.
    pub fn same_source(&self, other: &Snapshot<T>) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    fn publish(&mut self, value: T) {
        self.value = Arc::new(value);
        self.version += 1;
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            version: self.version,
        }
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Holder of the current snapshot. Writers are serialized.
pub struct CowState<T> {
    current: RwLock<Snapshot<T>>,
}

impl<T> CowState<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Snapshot {
                value: Arc::new(value),
                version: 1,
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.current.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Publish `value` without looking at the current one.
    pub fn replace(&self, value: T) {
        self.current.write().publish(value);
    }
}

impl<T: Clone> CowState<T> {
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.update_with(f)
    }

    /// Publish a modified copy and return what the closure computed.
    pub fn update_with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut current = self.current.write();
        let mut next = T::clone(&current.value);
        let result = f(&mut next);
        current.publish(next);
        result
    }

    /// Like [`update_with`](Self::update_with), but `None` discards the copy:
    /// nothing is published and the version stays the same.
    pub fn try_update<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> Option<R>,
    {
        let mut current = self.current.write();
        let mut next = T::clone(&current.value);
        let result = f(&mut next)?;
        current.publish(next);
        Some(result)
    }
}

impl<T: Default> Default for CowState<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CowState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.read();
        f.debug_struct("CowState")
            .field("value", &*current.value)
            .field("version", &current.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_old_snapshot_survives_update() {
        let state = CowState::new(BTreeMap::from([("aca", 1)]));
        let before = state.snapshot();

        state.update(|m| {
            m.insert("acb", 2);
        });

        assert_eq!(before.len(), 1);
        assert_eq!(state.snapshot().len(), 2);
        assert_eq!(state.version(), before.version() + 1);
    }

    #[test]
    fn test_replace_bumps_version() {
        let state = CowState::new("old");
        state.replace("new");
        let snapshot = state.snapshot();
        assert_eq!(*snapshot, "new");
        assert_eq!(snapshot.version(), 2);
    }

    #[test]
    fn test_try_update_none_publishes_nothing() {
        let state = CowState::new(vec![1]);
        let before = state.snapshot();

        let result: Option<()> = state.try_update(|v| {
            v.push(2);
            None
        });

        assert!(result.is_none());
        assert!(state.snapshot().same_source(&before));
        assert_eq!(state.version(), 1);
    }

    #[test]
    fn test_update_with_returns_closure_result() {
        let state = CowState::new(Vec::<u32>::new());
        let len = state.update_with(|v| {
            v.extend([1, 2, 3]);
            v.len()
        });
        assert_eq!(len, 3);
        assert_eq!(state.version(), 2);
    }

    #[test]
    fn test_readers_never_see_partial_writes() {
        let state = Arc::new(CowState::new(vec![0u32; 16]));

        let writer = {
            let state = state.clone();
            std::thread::spawn(move || {
                for i in 1..200u32 {
                    state.update(|v| v.iter_mut().for_each(|x| *x = i));
                }
            })
        };

        for _ in 0..200 {
            let snapshot = state.snapshot();
            assert!(snapshot.iter().all(|x| *x == snapshot[0]));
            assert_eq!(snapshot.version(), u64::from(snapshot[0]) + 1);
        }

        writer.join().unwrap();
    }
}
