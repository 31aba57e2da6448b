//! Synchronous event bus

use crate::event::{DynEventHandler, Event, EventHandler, EventHandlerError, TypedEventHandler};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Identifies one subscription so it can be cancelled on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscribers = Vec<(SubscriptionId, Arc<dyn DynEventHandler>)>;

/// In-process publish/subscribe keyed by event type.
///
/// `publish` runs every subscriber of the event type on the caller's thread,
/// in subscription order. The subscriber list is cloned out of the map first,
/// so a handler may subscribe or publish without deadlocking; a subscriber
/// added during a publish sees the next event, not the current one.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<DashMap<TypeId, Subscribers>>,
    next_id: Arc<AtomicU64>,
    config: EventBusConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct EventBusConfig {
    /// Keep dispatching to later subscribers after one fails
    pub continue_on_error: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            continue_on_error: true,
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            config,
        }
    }

    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// Subscribe a closure to events of type `E`.
    ///
    /// ```rust,ignore
    /// bus.subscribe(|event: &ModuleAdded| {
    ///     println!("module {} added", event.module.id);
    ///     Ok(())
    /// });
    /// ```
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(&E) -> Result<(), EventHandlerError> + Send + Sync + 'static,
    {
        self.subscribe_handler::<E, F>(handler)
    }

    pub fn subscribe_handler<E, H>(&self, handler: H) -> SubscriptionId
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: Arc<dyn DynEventHandler> = Arc::new(TypedEventHandler::new(handler));
        self.subscribers
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, handler));

        debug!(event_type = std::any::type_name::<E>(), subscription = id.0, "subscribed");
        id
    }

    /// Deliver `event` to its subscribers.
    ///
    /// With `continue_on_error` every subscriber runs and failures are only
    /// logged. Otherwise dispatch stops at the first failure, which is returned.
    pub fn publish<E: Event>(&self, event: &E) -> Result<(), EventBusError> {
        let Some(subscribers) = self
            .subscribers
            .get(&TypeId::of::<E>())
            .map(|entry| entry.value().clone())
        else {
            trace!(event = event.event_name(), "no subscribers");
            return Ok(());
        };

        trace!(event = event.event_name(), subscribers = subscribers.len(), "publishing");
        for (id, handler) in &subscribers {
            if let Err(e) = handler.handle_dyn(event) {
                warn!(event = event.event_name(), subscription = id.0, error = %e, "subscriber failed");
                if !self.config.continue_on_error {
                    return Err(EventBusError::HandlerFailed {
                        subscription: *id,
                        source: e,
                    });
                }
            }
        }
        Ok(())
    }

    /// Cancel one subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut found = false;
        self.subscribers.retain(|_, subscribers| {
            let before = subscribers.len();
            subscribers.retain(|(candidate, _)| *candidate != id);
            found |= subscribers.len() != before;
            !subscribers.is_empty()
        });
        found
    }

    /// Number of live subscriptions for `E`
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.subscribers
            .get(&TypeId::of::<E>())
            .map_or(0, |entry| entry.len())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.subscribers.len())
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("subscriber {subscription:?} failed: {source}")]
    HandlerFailed {
        subscription: SubscriptionId,
        #[source]
        source: EventHandlerError,
    },
}

#[derive(Debug, Default)]
pub struct EventBusBuilder {
    config: EventBusConfig,
}

impl EventBusBuilder {
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.config.continue_on_error = enabled;
        self
    }

    pub fn build(self) -> EventBus {
        EventBus::with_config(self.config)
    }
}
