//! In-process event bus for webcore
//!
//! The component hub wires its managers together through this crate. Each
//! manager publishes what it registered or removed, and every manager that
//! depends on it subscribes to that event type. Dispatch is synchronous and
//! ordered, so by the time `publish` returns all dependents have caught up.
//!
//! ```rust
//! use std::any::Any;
//! use webcore_events::*;
//!
//! #[derive(Debug)]
//! struct ModuleAttached {
//!     metadata: EventMetadata,
//!     module_id: String,
//! }
//!
//! impl Event for ModuleAttached {
//!     fn event_name(&self) -> &str {
//!         self.metadata.name
//!     }
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(|event: &ModuleAttached| {
//!     println!("attached {}", event.module_id);
//!     Ok(())
//! });
//!
//! bus.publish(&ModuleAttached {
//!     metadata: EventMetadata::new("module_attached"),
//!     module_id: "webcore.test.module".to_string(),
//! })
//! .unwrap();
//!
//! assert!(bus.unsubscribe(subscription));
//! ```

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventBusBuilder, EventBusConfig, EventBusError, SubscriptionId};
pub use event::{
    DynEventHandler, Event, EventHandler, EventHandlerError, EventMetadata, TypedEventHandler,
};
