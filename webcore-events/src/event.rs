//! Event trait and handler plumbing

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;
use uuid::Uuid;

/// Anything that can travel over an [`EventBus`](crate::EventBus).
pub trait Event: Send + Sync + Debug + 'static {
    /// Stable name used in log records
    fn event_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Identity and creation time of one published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    pub id: Uuid,
    pub name: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl EventMetadata {
    pub fn new(name: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            timestamp: Utc::now(),
        }
    }
}

/// Receives events of one type, synchronously.
pub trait EventHandler<E: Event>: Send + Sync {
    fn handle(&self, event: &E) -> Result<(), EventHandlerError>;
}

impl<E, F> EventHandler<E> for F
where
    E: Event,
    F: Fn(&E) -> Result<(), EventHandlerError> + Send + Sync,
{
    fn handle(&self, event: &E) -> Result<(), EventHandlerError> {
        self(event)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventHandlerError {
    #[error("handler failed: {0}")]
    HandlerFailed(String),

    /// The handler was reached with an event of another type
    #[error("unexpected event {0}")]
    TypeMismatch(String),
}

/// Handler with its event type erased, as stored by the bus
pub trait DynEventHandler: Send + Sync {
    fn handle_dyn(&self, event: &dyn Event) -> Result<(), EventHandlerError>;
}

/// Adapts an [`EventHandler<E>`] to [`DynEventHandler`] by downcasting.
pub struct TypedEventHandler<E: Event, H: EventHandler<E>> {
    handler: H,
    _event: PhantomData<fn(&E)>,
}

impl<E: Event, H: EventHandler<E>> TypedEventHandler<E, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _event: PhantomData,
        }
    }
}

impl<E: Event, H: EventHandler<E>> DynEventHandler for TypedEventHandler<E, H> {
    fn handle_dyn(&self, event: &dyn Event) -> Result<(), EventHandlerError> {
        let typed = event
            .as_any()
            .downcast_ref::<E>()
            .ok_or_else(|| EventHandlerError::TypeMismatch(event.event_name().to_string()))?;
        self.handler.handle(typed)
    }
}
