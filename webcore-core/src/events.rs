// Lifecycle events exchanged between the managers

use crate::application::ApplicationContext;
use crate::endpoint::EndpointContext;
use crate::module::ModuleContext;
use crate::plugin::PluginContext;
use std::any::Any;
use std::sync::Arc;
use tracing::warn;
use webcore_events::{Event, EventBus, EventMetadata};

/// Publish an event after the publishing manager's state is swapped in.
///
/// A failing subscriber never rolls back the registration that caused the event.
pub(crate) fn publish<E: Event>(bus: &EventBus, event: E) {
    if let Err(e) = bus.publish(&event) {
        warn!(event = event.event_name(), error = %e, "Lifecycle event handlers failed");
    }
}

macro_rules! lifecycle_event {
    ($(#[$doc:meta])* $name:ident, $label:literal, $field:ident: $ty:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pub metadata: EventMetadata,
            pub $field: $ty,
        }

        impl $name {
            pub fn new($field: $ty) -> Self {
                Self {
                    metadata: EventMetadata::new($label),
                    $field,
                }
            }
        }

        impl Event for $name {
            fn event_name(&self) -> &str {
                self.metadata.name
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

lifecycle_event!(
    /// A plugin was registered with the plugin manager.
    PluginAdded, "plugin_added", plugin: Arc<PluginContext>
);
lifecycle_event!(
    /// A plugin was removed. Its dependents are still registered when this fires.
    PluginRemoved, "plugin_removed", plugin: Arc<PluginContext>
);
lifecycle_event!(ApplicationAdded, "application_added", application: Arc<ApplicationContext>);
lifecycle_event!(ApplicationRemoved, "application_removed", application: Arc<ApplicationContext>);
lifecycle_event!(
    /// One (module, application) context was created.
    ModuleAdded, "module_added", module: Arc<ModuleContext>
);
lifecycle_event!(ModuleRemoved, "module_removed", module: Arc<ModuleContext>);
lifecycle_event!(
    /// An endpoint context was attached to a module, for any family.
    EndpointAdded, "endpoint_added", context: Arc<EndpointContext>
);
lifecycle_event!(EndpointRemoved, "endpoint_removed", context: Arc<EndpointContext>);
