//! Endpoint managers
//!
//! One [`EndpointManager`] exists per endpoint family. It scans plugins for
//! the family's endpoint descriptors, keeps the resulting [`EndpointItem`]s,
//! and attaches them to modules as modules appear. The contexts themselves
//! live in the shared [`EndpointDirectory`].
//!
//! # Registration rules
//!
//! - a descriptor belongs to the family if [`EndpointKind::accepts`] its markers
//! - a descriptor without a module is skipped with a warning
//! - the first descriptor of an id wins, later ones are skipped with a warning
//! - an endpoint id or type belongs to one family; the family that registers
//!   it first keeps it
//! - registering the same plugin twice is a no-op

use crate::config::HubConfig;
use crate::cow_state::CowState;
use crate::descriptor::ErasedInstance;
use crate::directory::EndpointDirectory;
use crate::endpoint::{ContextKey, EndpointContext, EndpointItem};
use crate::events::{self, EndpointAdded, EndpointRemoved};
use crate::family::EndpointFamily;
use crate::http::{Request, Response};
use crate::ids::{ApplicationId, EndpointId, ModuleId, PluginId};
use crate::metadata::EndpointKind;
use crate::module::{ModuleContext, ModuleManager};
use crate::plugin::PluginContext;
use crate::sitemap::EndpointRegistration;
use crate::uri::UriResource;
use crate::Error;
use futures_util::future::BoxFuture;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webcore_events::EventBus;

#[derive(Clone, Default)]
struct EndpointState {
    items: BTreeMap<EndpointId, Arc<EndpointItem>>,
    by_plugin: BTreeMap<PluginId, Vec<EndpointId>>,
    by_type: HashMap<TypeId, EndpointId>,
}

/// Registry of one endpoint family.
pub struct EndpointManager<F: EndpointFamily> {
    modules: Arc<ModuleManager>,
    directory: Arc<EndpointDirectory>,
    config: Arc<HubConfig>,
    state: CowState<EndpointState>,
    bus: EventBus,
    _family: PhantomData<fn() -> F>,
}

impl<F: EndpointFamily> EndpointManager<F> {
    pub fn new(
        modules: Arc<ModuleManager>,
        directory: Arc<EndpointDirectory>,
        config: Arc<HubConfig>,
        bus: EventBus,
    ) -> Self {
        Self {
            modules,
            directory,
            config,
            state: CowState::default(),
            bus,
            _family: PhantomData,
        }
    }

    pub fn kind(&self) -> EndpointKind {
        F::KIND
    }

    /// Register the plugin's endpoints of this family and attach them to the
    /// modules that are already known.
    pub fn register(&self, plugin: &Arc<PluginContext>) -> Vec<Arc<EndpointItem>> {
        let descriptors: Vec<_> = plugin
            .plugin
            .endpoints()
            .into_iter()
            .filter(|descriptor| F::KIND.accepts(&descriptor.markers))
            .collect();

        let items = self.state.try_update(|state| {
            if state.by_plugin.contains_key(&plugin.id) {
                return None;
            }

            let mut items: Vec<Arc<EndpointItem>> = Vec::new();
            for descriptor in descriptors {
                if descriptor.metadata.module_ref().is_none() {
                    warn!(
                        plugin = %plugin.id,
                        endpoint = %descriptor.id,
                        family = %F::KIND,
                        "Endpoint without module skipped"
                    );
                    continue;
                }
                if items.iter().any(|item| item.id == descriptor.id) {
                    warn!(
                        plugin = %plugin.id,
                        endpoint = %descriptor.id,
                        "Duplicate endpoint id, keeping the first registration"
                    );
                    continue;
                }
                if let Some(existing) = state.items.get(&descriptor.id) {
                    warn!(
                        plugin = %plugin.id,
                        endpoint = %descriptor.id,
                        owner = %existing.plugin.id,
                        "Endpoint id already registered by another plugin"
                    );
                    continue;
                }
                if let Err(owner) = self.directory.claim(&descriptor.id, descriptor.type_id, F::KIND) {
                    warn!(
                        plugin = %plugin.id,
                        endpoint = %descriptor.id,
                        family = %F::KIND,
                        owner = %owner,
                        "Endpoint already belongs to another family"
                    );
                    continue;
                }

                let item = Arc::new(EndpointItem::from_descriptor(F::KIND, descriptor, plugin));
                state.items.insert(item.id.clone(), Arc::clone(&item));
                state.by_type.insert(item.type_id, item.id.clone());
                items.push(item);
            }

            state
                .by_plugin
                .insert(plugin.id.clone(), items.iter().map(|item| item.id.clone()).collect());
            Some(items)
        });

        let Some(items) = items else {
            debug!(plugin = %plugin.id, family = %F::KIND, "Plugin already registered");
            return Vec::new();
        };

        for item in &items {
            debug!(
                endpoint = %item.id,
                family = %F::KIND,
                module = ?item.module_id(),
                "Endpoint registered"
            );
        }

        let contexts = items
            .iter()
            .flat_map(|item| {
                let modules = item
                    .module_id()
                    .map(|id| self.modules.modules_by_id(id))
                    .unwrap_or_default();
                modules.into_iter().map(move |module| self.create_context(item, module))
            })
            .collect();
        let added = self.directory.insert_all(contexts);
        self.announce_added(&added);

        info!(
            plugin = %plugin.id,
            family = %F::KIND,
            items = items.len(),
            contexts = added.len(),
            "Endpoints registered"
        );
        items
    }

    /// Attach every item declaring this module that is not attached yet.
    pub fn assign_to_module(&self, module: &Arc<ModuleContext>) -> Vec<Arc<EndpointContext>> {
        let state = self.state.snapshot();
        let contexts: Vec<_> = state
            .items
            .values()
            .filter(|item| item.module_id() == Some(&module.id))
            .filter(|item| !self.is_associated_with_module(&item.id, module))
            .map(|item| self.create_context(item, Arc::clone(module)))
            .collect();

        let added = self.directory.insert_all(contexts);
        self.announce_added(&added);
        added
    }

    /// Drop this family's contexts inside the module.
    pub fn detach_from_module(&self, module: &ModuleContext) -> Vec<Arc<EndpointContext>> {
        let key = module.key();
        let removed = self
            .directory
            .remove_where(|context| context.kind() == F::KIND && context.module_key() == key);
        self.announce_removed(&removed);
        removed
    }

    /// Remove all items of the plugin and their contexts. Cached instances
    /// are released with the contexts.
    pub fn remove(&self, plugin: &PluginId) -> Vec<Arc<EndpointItem>> {
        let removed = self.state.try_update(|state| {
            let ids = state.by_plugin.remove(plugin)?;
            let items: Vec<Arc<EndpointItem>> =
                ids.iter().filter_map(|id| state.items.remove(id)).collect();
            for item in &items {
                state.by_type.remove(&item.type_id);
            }
            Some(items)
        });

        let Some(items) = removed else {
            return Vec::new();
        };
        for item in &items {
            self.directory.release(&item.id, item.type_id, F::KIND);
        }

        let contexts = self.directory.remove_where(|context| {
            context.kind() == F::KIND && items.iter().any(|item| Arc::ptr_eq(item, context.item()))
        });
        self.announce_removed(&contexts);

        info!(
            plugin = %plugin,
            family = %F::KIND,
            items = items.len(),
            contexts = contexts.len(),
            "Endpoints removed"
        );
        items
    }

    /// Whether the item already has a context in this module.
    pub fn is_associated_with_module(&self, endpoint: &EndpointId, module: &ModuleContext) -> bool {
        self.directory.contains(&ContextKey {
            endpoint: endpoint.clone(),
            application: module.application.id.clone(),
            module: module.id.clone(),
        })
    }

    pub fn get_endpoint_items(&self, plugin: &PluginId) -> Vec<Arc<EndpointItem>> {
        let state = self.state.snapshot();
        state
            .by_plugin
            .get(plugin)
            .into_iter()
            .flatten()
            .filter_map(|id| state.items.get(id).cloned())
            .collect()
    }

    pub fn get_endpoint_item(&self, endpoint: &EndpointId) -> Option<Arc<EndpointItem>> {
        self.state.snapshot().items.get(endpoint).cloned()
    }

    pub fn items(&self) -> Vec<Arc<EndpointItem>> {
        self.state.snapshot().items.values().cloned().collect()
    }

    pub fn get_contexts_of<T: 'static>(&self) -> Vec<Arc<EndpointContext>> {
        self.get_contexts_by_type(TypeId::of::<T>(), None)
    }

    /// Contexts of a type, optionally restricted to one module context
    pub fn get_contexts_by_type(
        &self,
        type_id: TypeId,
        module: Option<&ModuleContext>,
    ) -> Vec<Arc<EndpointContext>> {
        let Some(endpoint) = self.state.snapshot().by_type.get(&type_id).cloned() else {
            return Vec::new();
        };
        let contexts = self.get_contexts_by_id(&endpoint);
        match module {
            Some(module) => {
                let key = module.key();
                contexts
                    .into_iter()
                    .filter(|context| context.module_key() == key)
                    .collect()
            }
            None => contexts,
        }
    }

    pub fn get_contexts_by_id(&self, endpoint: &EndpointId) -> Vec<Arc<EndpointContext>> {
        self.directory
            .contexts_of_endpoint(endpoint)
            .into_iter()
            .filter(|context| context.kind() == F::KIND)
            .collect()
    }

    pub fn get_context(
        &self,
        application: &ApplicationId,
        module: &ModuleId,
        endpoint: &EndpointId,
    ) -> Option<Arc<EndpointContext>> {
        self.directory
            .get(&ContextKey {
                endpoint: endpoint.clone(),
                application: application.clone(),
                module: module.clone(),
            })
            .filter(|context| context.kind() == F::KIND)
    }

    /// All contexts of this family.
    pub fn contexts(&self) -> Vec<Arc<EndpointContext>> {
        self.directory.contexts_of_kind(F::KIND)
    }

    /// Create (or reuse, if cached) an instance and recover its family type.
    pub fn create_instance(
        &self,
        context: &Arc<EndpointContext>,
        uri: &UriResource,
        culture: &str,
    ) -> Result<Arc<F::Instance>, Error> {
        let erased = context.instance(uri, culture)?;
        F::downcast(erased).ok_or_else(|| {
            Error::instantiation(
                context.endpoint_id().to_string(),
                format!("instance does not implement the {} contract", F::KIND),
            )
        })
    }

    /// The callbacks the sitemap uses for this family.
    pub fn registration(self: &Arc<Self>) -> EndpointRegistration {
        let resolver = Arc::clone(self);
        let endpoints = Arc::clone(self);

        EndpointRegistration {
            kind: F::KIND,
            addressable: F::ADDRESSABLE,
            factory: Arc::new(
                |context: &Arc<EndpointContext>, uri: &UriResource, culture: &str| {
                    context.instance(uri, culture)
                },
            ),
            context_resolver: Arc::new(move |type_id: TypeId, module: Option<&ModuleContext>| {
                resolver.get_contexts_by_type(type_id, module)
            }),
            endpoint_resolver: Arc::new(move || endpoints.contexts()),
            request_handler: Arc::new(
                |instance: ErasedInstance,
                 context: Arc<EndpointContext>,
                 request: Request|
                 -> BoxFuture<'static, Result<Response, Error>> {
                    Box::pin(async move {
                        let typed = F::downcast(instance).ok_or_else(|| {
                            Error::instantiation(
                                context.endpoint_id().to_string(),
                                format!("instance does not implement the {} contract", F::KIND),
                            )
                        })?;
                        F::handle(typed, context, &request).await
                    })
                },
            ),
        }
    }

    fn create_context(&self, item: &Arc<EndpointItem>, module: Arc<ModuleContext>) -> Arc<EndpointContext> {
        item.create_context(module, &self.directory, self.config.max_parent_depth)
    }

    fn announce_added(&self, added: &[Arc<EndpointContext>]) {
        for context in added {
            debug!(
                endpoint = %context.endpoint_id(),
                family = %F::KIND,
                module = %context.module_key(),
                "Endpoint attached"
            );
            events::publish(&self.bus, EndpointAdded::new(Arc::clone(context)));
        }
    }

    fn announce_removed(&self, removed: &[Arc<EndpointContext>]) {
        for context in removed {
            debug!(
                endpoint = %context.endpoint_id(),
                family = %F::KIND,
                module = %context.module_key(),
                "Endpoint detached"
            );
            events::publish(&self.bus, EndpointRemoved::new(Arc::clone(context)));
        }
    }
}
