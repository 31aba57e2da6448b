// Instance counting for endpoint constructors

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use webcore_core::{Activation, Error};

/// Counts how often endpoint constructors run.
///
/// Clones share their counters, so a counter can be handed to a plugin and
/// inspected from the test.
#[derive(Clone, Default)]
pub struct InstanceCounter {
    created: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
}

impl InstanceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a constructor so each successful call is counted.
    pub fn counting<T, F>(&self, ctor: F) -> impl Fn(&Activation<'_>) -> Result<T, Error> + Send + Sync + 'static
    where
        T: 'static,
        F: Fn(&Activation<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        let counter = self.clone();
        move |activation: &Activation<'_>| match ctor(activation) {
            Ok(instance) => {
                counter.created.fetch_add(1, Ordering::SeqCst);
                Ok(instance)
            }
            Err(error) => {
                counter.failed.fetch_add(1, Ordering::SeqCst);
                Err(error)
            }
        }
    }

    /// Successful constructions
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Constructions that returned an error
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.created.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for InstanceCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCounter")
            .field("created", &self.created())
            .field("failed", &self.failed())
            .finish()
    }
}
