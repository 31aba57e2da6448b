// webcore - a plugin-based web framework core
//
// Plugins declare applications, modules and endpoints; the component hub
// registers them and resolves request URIs through a sitemap that is rebuilt
// and swapped atomically whenever registrations change.

// Re-export core functionality
pub use webcore_core::*;

// The event bus the hub wires its managers with
pub use webcore_events as events;

pub use serde_json;

// Re-export optional crates
#[cfg(feature = "config")]
pub use webcore_config;

#[cfg(feature = "testing")]
pub use webcore_testing;

// Prelude for common imports
pub mod prelude {
    pub use webcore_core::prelude::*;

    pub use crate::{
        ApplicationId, EndpointFamily, EndpointId, ModuleId, PluginId, events::EventBus,
        serde_json::{Value, json},
    };

    #[cfg(feature = "config")]
    pub use webcore_config::{ConfigManager, Validate};
}
