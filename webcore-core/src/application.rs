// Application registry

use crate::config::HubConfig;
use crate::cow_state::CowState;
use crate::descriptor::ApplicationDescriptor;
use crate::events::{self, ApplicationAdded, ApplicationRemoved};
use crate::ids::{ApplicationId, PluginId};
use crate::plugin::PluginContext;
use crate::uri::UriResource;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webcore_events::EventBus;

/// A registered application.
#[derive(Debug)]
pub struct ApplicationContext {
    pub id: ApplicationId,
    pub plugin: Arc<PluginContext>,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    /// Hub context path combined with the declared path
    pub context_path: UriResource,
    pub asset_path: PathBuf,
    pub data_path: PathBuf,
}

impl ApplicationContext {
    fn new(descriptor: ApplicationDescriptor, plugin: &Arc<PluginContext>, config: &HubConfig) -> Self {
        let root = UriResource::from_path(&config.context_path);
        let asset_path = config
            .asset_path
            .join(descriptor.asset_path.as_deref().unwrap_or(descriptor.id.as_str()));
        let data_path = config
            .data_path
            .join(descriptor.data_path.as_deref().unwrap_or(descriptor.id.as_str()));

        Self {
            context_path: root.combine(&descriptor.context_path),
            id: descriptor.id,
            plugin: Arc::clone(plugin),
            name: descriptor.name,
            description: descriptor.description,
            icon: descriptor.icon,
            asset_path,
            data_path,
        }
    }
}

/// Tracks applications declared by plugins.
pub struct ApplicationManager {
    config: Arc<HubConfig>,
    applications: CowState<BTreeMap<ApplicationId, Arc<ApplicationContext>>>,
    bus: EventBus,
}

impl ApplicationManager {
    pub fn new(config: Arc<HubConfig>, bus: EventBus) -> Self {
        Self {
            config,
            applications: CowState::default(),
            bus,
        }
    }

    /// Register every application the plugin declares.
    ///
    /// Application ids are global: an id already taken by another plugin is
    /// skipped with a warning.
    pub fn register(&self, plugin: &Arc<PluginContext>) -> Vec<Arc<ApplicationContext>> {
        let descriptors = plugin.plugin.applications();

        let added = self.applications.update_with(|applications| {
            let mut added = Vec::new();
            for descriptor in descriptors {
                if descriptor.id.is_empty() {
                    warn!(plugin = %plugin.id, "Application without id skipped");
                    continue;
                }
                if let Some(existing) = applications.get(&descriptor.id) {
                    if existing.plugin.id != plugin.id {
                        warn!(
                            application = %descriptor.id,
                            plugin = %plugin.id,
                            owner = %existing.plugin.id,
                            "Duplicate application id, keeping the first registration"
                        );
                    }
                    continue;
                }

                let context = Arc::new(ApplicationContext::new(descriptor, plugin, &self.config));
                applications.insert(context.id.clone(), Arc::clone(&context));
                added.push(context);
            }
            added
        });

        for context in &added {
            info!(
                application = %context.id,
                context_path = %context.context_path,
                "Application registered"
            );
            events::publish(&self.bus, ApplicationAdded::new(Arc::clone(context)));
        }
        added
    }

    /// Remove all applications of the plugin.
    pub fn remove(&self, plugin: &PluginId) -> Vec<Arc<ApplicationContext>> {
        let removed = self.applications.try_update(|applications| {
            let ids: Vec<ApplicationId> = applications
                .values()
                .filter(|app| &app.plugin.id == plugin)
                .map(|app| app.id.clone())
                .collect();
            if ids.is_empty() {
                return None;
            }
            Some(
                ids.iter()
                    .filter_map(|id| applications.remove(id))
                    .collect::<Vec<_>>(),
            )
        });

        let Some(removed) = removed else {
            debug!(plugin = %plugin, "No applications to remove");
            return Vec::new();
        };

        for context in &removed {
            info!(application = %context.id, "Application removed");
            events::publish(&self.bus, ApplicationRemoved::new(Arc::clone(context)));
        }
        removed
    }

    pub fn get_application(&self, id: &ApplicationId) -> Option<Arc<ApplicationContext>> {
        self.applications.snapshot().get(id).cloned()
    }

    pub fn applications(&self) -> Vec<Arc<ApplicationContext>> {
        self.applications.snapshot().values().cloned().collect()
    }

    pub fn applications_of(&self, plugin: &PluginId) -> Vec<Arc<ApplicationContext>> {
        self.applications
            .snapshot()
            .values()
            .filter(|app| &app.plugin.id == plugin)
            .cloned()
            .collect()
    }
}
