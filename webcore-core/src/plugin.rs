// Plugin registry

use crate::cow_state::CowState;
use crate::descriptor::{Plugin, PluginManifest};
use crate::events::{self, PluginAdded, PluginRemoved};
use crate::ids::PluginId;
use crate::metadata::EndpointKind;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webcore_events::EventBus;

/// A loaded plugin.
pub struct PluginContext {
    pub id: PluginId,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub version: String,
    pub plugin: Arc<dyn Plugin>,
}

impl PluginContext {
    pub fn new(manifest: PluginManifest, plugin: Arc<dyn Plugin>) -> Self {
        Self {
            id: manifest.id,
            name: manifest.name,
            description: manifest.description,
            icon: manifest.icon,
            version: manifest.version,
            plugin,
        }
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

/// Tracks loaded plugins and announces them on the bus.
pub struct PluginManager {
    plugins: CowState<BTreeMap<PluginId, Arc<PluginContext>>>,
    bus: EventBus,
}

impl PluginManager {
    pub fn new(bus: EventBus) -> Self {
        Self {
            plugins: CowState::default(),
            bus,
        }
    }

    /// Register a plugin and fire [`PluginAdded`].
    ///
    /// Returns `None` when a plugin with the same id is already registered or
    /// the manifest has no id.
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> Option<Arc<PluginContext>> {
        let manifest = plugin.manifest();
        if manifest.id.is_empty() {
            warn!(name = %manifest.name, "Plugin without id skipped");
            return None;
        }

        let context = Arc::new(PluginContext::new(manifest, plugin));
        let added = self.plugins.try_update(|plugins| {
            if plugins.contains_key(&context.id) {
                return None;
            }
            plugins.insert(context.id.clone(), Arc::clone(&context));
            Some(Arc::clone(&context))
        });

        let Some(context) = added else {
            debug!(plugin = %context.id, "Plugin already registered");
            return None;
        };

        info!(plugin = %context.id, version = %context.version, "Plugin registered");
        for descriptor in context.plugin.endpoints() {
            if !EndpointKind::ALL.iter().any(|kind| kind.accepts(&descriptor.markers)) {
                warn!(
                    plugin = %context.id,
                    endpoint = %descriptor.id,
                    markers = ?descriptor.markers,
                    "Endpoint matches no family, skipped"
                );
            }
        }
        events::publish(&self.bus, PluginAdded::new(Arc::clone(&context)));
        Some(context)
    }

    /// Remove a plugin and fire [`PluginRemoved`]. Unknown ids are ignored.
    pub fn remove(&self, id: &PluginId) -> Option<Arc<PluginContext>> {
        let removed = self.plugins.try_update(|plugins| plugins.remove(id))?;

        info!(plugin = %removed.id, "Plugin removed");
        events::publish(&self.bus, PluginRemoved::new(Arc::clone(&removed)));
        Some(removed)
    }

    pub fn get_plugin(&self, id: &PluginId) -> Option<Arc<PluginContext>> {
        self.plugins.snapshot().get(id).cloned()
    }

    pub fn plugins(&self) -> Vec<Arc<PluginContext>> {
        self.plugins.snapshot().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.snapshot().is_empty()
    }
}
