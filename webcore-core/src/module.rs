//! Module registry
//!
//! Modules group endpoints below an application. A module type may declare
//! several applications; the manager keeps one [`ModuleContext`] per
//! (application, module) pair that is currently resolvable, and attaches or
//! detaches contexts as applications come and go.
//!
//! ## Context paths
//!
//! A module's effective context path is the application's context path
//! followed by the module's own path:
//!
//! ```text
//! application /aca  +  module /mca  =>  /aca/mca
//! ```

use crate::application::{ApplicationContext, ApplicationManager};
use crate::cow_state::CowState;
use crate::descriptor::ModuleDescriptor;
use crate::events::{self, ModuleAdded, ModuleRemoved};
use crate::ids::{ApplicationId, ModuleId, PluginId};
use crate::plugin::PluginContext;
use crate::uri::UriResource;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webcore_events::EventBus;

/// Identifies one module context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey {
    pub application: ApplicationId,
    pub module: ModuleId,
}

impl std::fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.application, self.module)
    }
}

/// A module attached to one application.
#[derive(Debug)]
pub struct ModuleContext {
    pub id: ModuleId,
    pub application: Arc<ApplicationContext>,
    /// Plugin declaring the module
    pub plugin: Arc<PluginContext>,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    /// The module's own path, relative to the application
    pub module_path: UriResource,
    pub asset_path: PathBuf,
    pub data_path: PathBuf,
}

impl ModuleContext {
    fn new(
        descriptor: &ModuleDescriptor,
        application: &Arc<ApplicationContext>,
        plugin: &Arc<PluginContext>,
    ) -> Self {
        let id = descriptor.id.clone();
        let asset_path = application
            .asset_path
            .join(descriptor.asset_path.as_deref().unwrap_or(id.as_str()));
        let data_path = application
            .data_path
            .join(descriptor.data_path.as_deref().unwrap_or(id.as_str()));

        Self {
            id,
            application: Arc::clone(application),
            plugin: Arc::clone(plugin),
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            icon: descriptor.icon.clone(),
            module_path: descriptor.context_path.clone(),
            asset_path,
            data_path,
        }
    }

    /// Effective context path: application path followed by the module path.
    pub fn context_path(&self) -> UriResource {
        self.application.context_path.combine(&self.module_path)
    }

    pub fn application_id(&self) -> &ApplicationId {
        &self.application.id
    }

    pub fn key(&self) -> ModuleKey {
        ModuleKey {
            application: self.application.id.clone(),
            module: self.id.clone(),
        }
    }
}

#[derive(Clone)]
struct ModuleItem {
    descriptor: ModuleDescriptor,
    plugin: Arc<PluginContext>,
}

#[derive(Clone, Default)]
struct ModuleState {
    items: BTreeMap<ModuleId, ModuleItem>,
    contexts: BTreeMap<ModuleKey, Arc<ModuleContext>>,
}

impl ModuleState {
    /// Create the missing contexts of `item`, restricted to `only` if given.
    fn attach(
        &mut self,
        item: &ModuleItem,
        applications: &ApplicationManager,
        only: Option<&ApplicationId>,
    ) -> Vec<Arc<ModuleContext>> {
        let mut added = Vec::new();
        for application_id in &item.descriptor.applications {
            if only.is_some_and(|only| only != application_id) {
                continue;
            }
            let key = ModuleKey {
                application: application_id.clone(),
                module: item.descriptor.id.clone(),
            };
            if self.contexts.contains_key(&key) {
                continue;
            }
            let Some(application) = applications.get_application(application_id) else {
                debug!(
                    module = %item.descriptor.id,
                    application = %application_id,
                    "Application not registered yet, module waits"
                );
                continue;
            };

            let context = Arc::new(ModuleContext::new(&item.descriptor, &application, &item.plugin));
            self.contexts.insert(key, Arc::clone(&context));
            added.push(context);
        }
        added
    }
}

/// Tracks modules declared by plugins and their attachment to applications.
pub struct ModuleManager {
    applications: Arc<ApplicationManager>,
    state: CowState<ModuleState>,
    bus: EventBus,
}

impl ModuleManager {
    pub fn new(applications: Arc<ApplicationManager>, bus: EventBus) -> Self {
        Self {
            applications,
            state: CowState::default(),
            bus,
        }
    }

    /// Register the plugin's modules and attach them to known applications.
    pub fn register(&self, plugin: &Arc<PluginContext>) -> Vec<Arc<ModuleContext>> {
        let descriptors = plugin.plugin.modules();

        let added = self.state.update_with(|state| {
            let mut added = Vec::new();
            for descriptor in descriptors {
                if descriptor.id.is_empty() {
                    warn!(plugin = %plugin.id, "Module without id skipped");
                    continue;
                }
                if descriptor.applications.is_empty() {
                    warn!(
                        plugin = %plugin.id,
                        module = %descriptor.id,
                        "Module without application skipped"
                    );
                    continue;
                }
                if let Some(existing) = state.items.get(&descriptor.id) {
                    if existing.plugin.id != plugin.id {
                        warn!(
                            module = %descriptor.id,
                            plugin = %plugin.id,
                            owner = %existing.plugin.id,
                            "Duplicate module id, keeping the first registration"
                        );
                    }
                    continue;
                }

                let item = ModuleItem {
                    descriptor,
                    plugin: Arc::clone(plugin),
                };
                added.extend(state.attach(&item, &self.applications, None));
                state.items.insert(item.descriptor.id.clone(), item);
            }
            added
        });

        self.announce_added(&added);
        added
    }

    /// Attach every registered module that declares this application.
    pub fn assign_to_application(&self, application: &Arc<ApplicationContext>) -> Vec<Arc<ModuleContext>> {
        let added = self
            .state
            .try_update(|state| {
                let items: Vec<ModuleItem> = state.items.values().cloned().collect();
                let added: Vec<_> = items
                    .iter()
                    .flat_map(|item| state.attach(item, &self.applications, Some(&application.id)))
                    .collect();
                (!added.is_empty()).then_some(added)
            })
            .unwrap_or_default();

        self.announce_added(&added);
        added
    }

    /// Remove every module context of this application.
    pub fn detach_from_application(&self, application: &ApplicationContext) -> Vec<Arc<ModuleContext>> {
        let removed = self
            .state
            .try_update(|state| {
                let keys: Vec<ModuleKey> = state
                    .contexts
                    .keys()
                    .filter(|key| key.application == application.id)
                    .cloned()
                    .collect();
                if keys.is_empty() {
                    return None;
                }
                Some(keys.iter().filter_map(|key| state.contexts.remove(key)).collect::<Vec<_>>())
            })
            .unwrap_or_default();

        self.announce_removed(&removed);
        removed
    }

    /// Remove every module of the plugin together with its contexts.
    pub fn remove(&self, plugin: &PluginId) -> Vec<Arc<ModuleContext>> {
        let removed = self
            .state
            .try_update(|state| {
                let ids: Vec<ModuleId> = state
                    .items
                    .values()
                    .filter(|item| &item.plugin.id == plugin)
                    .map(|item| item.descriptor.id.clone())
                    .collect();
                if ids.is_empty() {
                    return None;
                }
                for id in &ids {
                    state.items.remove(id);
                }
                let keys: Vec<ModuleKey> = state
                    .contexts
                    .keys()
                    .filter(|key| ids.contains(&key.module))
                    .cloned()
                    .collect();
                Some(keys.iter().filter_map(|key| state.contexts.remove(key)).collect::<Vec<_>>())
            })
            .unwrap_or_default();

        self.announce_removed(&removed);
        removed
    }

    pub fn get_module(&self, application: &ApplicationId, module: &ModuleId) -> Option<Arc<ModuleContext>> {
        let key = ModuleKey {
            application: application.clone(),
            module: module.clone(),
        };
        self.state.snapshot().contexts.get(&key).cloned()
    }

    pub fn modules(&self) -> Vec<Arc<ModuleContext>> {
        self.state.snapshot().contexts.values().cloned().collect()
    }

    pub fn modules_of_application(&self, application: &ApplicationId) -> Vec<Arc<ModuleContext>> {
        self.state
            .snapshot()
            .contexts
            .values()
            .filter(|module| module.application_id() == application)
            .cloned()
            .collect()
    }

    /// Contexts of one module type across all applications
    pub fn modules_by_id(&self, module: &ModuleId) -> Vec<Arc<ModuleContext>> {
        self.state
            .snapshot()
            .contexts
            .values()
            .filter(|context| &context.id == module)
            .cloned()
            .collect()
    }

    fn announce_added(&self, added: &[Arc<ModuleContext>]) {
        for module in added {
            info!(
                module = %module.id,
                application = %module.application.id,
                context_path = %module.context_path(),
                "Module attached"
            );
            events::publish(&self.bus, ModuleAdded::new(Arc::clone(module)));
        }
    }

    fn announce_removed(&self, removed: &[Arc<ModuleContext>]) {
        for module in removed {
            info!(
                module = %module.id,
                application = %module.application.id,
                "Module detached"
            );
            events::publish(&self.bus, ModuleRemoved::new(Arc::clone(module)));
        }
    }
}
