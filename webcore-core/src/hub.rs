//! Component hub
//!
//! The composition root. It builds the event bus and every manager in
//! dependency order, registers the endpoint families with the sitemap and
//! wires the lifecycle events:
//!
//! ```text
//! PluginAdded         -> applications, modules, resources, pages, rest apis, status pages
//! PluginRemoved       -> resources, pages, rest apis, status pages, modules, applications
//! ApplicationAdded    -> modules attach
//! ApplicationRemoved  -> modules detach
//! ModuleAdded         -> endpoint managers attach
//! ModuleRemoved       -> endpoint managers detach
//! EndpointAdded/Removed -> sitemap marked stale
//! ```
//!
//! # Example
//!
//! ```rust
//! use webcore_core::prelude::*;
//!
//! struct EmptyPlugin;
//!
//! impl Plugin for EmptyPlugin {
//!     fn manifest(&self) -> PluginManifest {
//!         PluginManifest::new("empty")
//!     }
//! }
//!
//! let hub = ComponentHub::new(HubConfig::default());
//! hub.register_plugin(std::sync::Arc::new(EmptyPlugin));
//!
//! let result = hub.search(&UriResource::from_path("/uri/does/not/exist"), &SearchContext::new());
//! assert!(!result.is_found());
//! ```

use crate::application::ApplicationManager;
use crate::config::HubConfig;
use crate::descriptor::Plugin;
use crate::directory::EndpointDirectory;
use crate::events::{
    ApplicationAdded, ApplicationRemoved, EndpointAdded, EndpointRemoved, ModuleAdded,
    ModuleRemoved, PluginAdded, PluginRemoved,
};
use crate::family::{EndpointFamily, PageFamily, ResourceFamily, RestApiFamily, StatusPageFamily};
use crate::http::{Request, Response};
use crate::ids::{ApplicationId, PluginId};
use crate::manager::EndpointManager;
use crate::module::ModuleManager;
use crate::plugin::{PluginContext, PluginManager};
use crate::sitemap::{SearchContext, SearchResult, SitemapManager};
use crate::uri::UriResource;
use crate::HttpStatus;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};
use webcore_events::{EventBus, EventHandlerError, SubscriptionId};

/// Composition root of all registries.
pub struct ComponentHub {
    config: Arc<HubConfig>,
    bus: EventBus,
    plugins: Arc<PluginManager>,
    applications: Arc<ApplicationManager>,
    modules: Arc<ModuleManager>,
    directory: Arc<EndpointDirectory>,
    resources: Arc<EndpointManager<ResourceFamily>>,
    pages: Arc<EndpointManager<PageFamily>>,
    rest_apis: Arc<EndpointManager<RestApiFamily>>,
    status_pages: Arc<EndpointManager<StatusPageFamily>>,
    sitemap: Arc<SitemapManager>,
    subscriptions: Vec<SubscriptionId>,
}

impl ComponentHub {
    pub fn new(config: HubConfig) -> Self {
        let config = Arc::new(config);
        let bus = EventBus::new();

        let plugins = Arc::new(PluginManager::new(bus.clone()));
        let applications = Arc::new(ApplicationManager::new(config.clone(), bus.clone()));
        let modules = Arc::new(ModuleManager::new(applications.clone(), bus.clone()));
        let directory = Arc::new(EndpointDirectory::new());

        let resources = endpoint_manager::<ResourceFamily>(&modules, &directory, &config, &bus);
        let pages = endpoint_manager::<PageFamily>(&modules, &directory, &config, &bus);
        let rest_apis = endpoint_manager::<RestApiFamily>(&modules, &directory, &config, &bus);
        let status_pages = endpoint_manager::<StatusPageFamily>(&modules, &directory, &config, &bus);

        let sitemap = Arc::new(SitemapManager::new());
        sitemap.register(resources.registration());
        sitemap.register(pages.registration());
        sitemap.register(rest_apis.registration());
        sitemap.register(status_pages.registration());

        let mut hub = Self {
            config,
            bus,
            plugins,
            applications,
            modules,
            directory,
            resources,
            pages,
            rest_apis,
            status_pages,
            sitemap,
            subscriptions: Vec::new(),
        };
        hub.subscriptions = hub.wire();
        hub.sitemap.refresh();

        info!(context_path = %hub.config.context_path, "Component hub ready");
        hub
    }

    /// Subscribe the managers to each other, in dependency order.
    fn wire(&self) -> Vec<SubscriptionId> {
        let bus = &self.bus;
        let mut ids = Vec::new();

        let applications = Arc::downgrade(&self.applications);
        ids.push(bus.subscribe(move |event: &PluginAdded| {
            with(&applications, |m| {
                m.register(&event.plugin);
            })
        }));
        let modules = Arc::downgrade(&self.modules);
        ids.push(bus.subscribe(move |event: &PluginAdded| {
            with(&modules, |m| {
                m.register(&event.plugin);
            })
        }));
        ids.extend(subscribe_family(bus, &self.resources));
        ids.extend(subscribe_family(bus, &self.pages));
        ids.extend(subscribe_family(bus, &self.rest_apis));
        ids.extend(subscribe_family(bus, &self.status_pages));

        // endpoint managers subscribed above run first on removal
        let modules = Arc::downgrade(&self.modules);
        ids.push(bus.subscribe(move |event: &PluginRemoved| {
            with(&modules, |m| {
                m.remove(&event.plugin.id);
            })
        }));
        let applications = Arc::downgrade(&self.applications);
        ids.push(bus.subscribe(move |event: &PluginRemoved| {
            with(&applications, |m| {
                m.remove(&event.plugin.id);
            })
        }));

        let modules = Arc::downgrade(&self.modules);
        ids.push(bus.subscribe(move |event: &ApplicationAdded| {
            with(&modules, |m| {
                m.assign_to_application(&event.application);
            })
        }));
        let modules = Arc::downgrade(&self.modules);
        ids.push(bus.subscribe(move |event: &ApplicationRemoved| {
            with(&modules, |m| {
                m.detach_from_application(&event.application);
            })
        }));

        let sitemap = Arc::downgrade(&self.sitemap);
        ids.push(bus.subscribe(move |_: &EndpointAdded| with(&sitemap, |s| s.mark_stale())));
        let sitemap = Arc::downgrade(&self.sitemap);
        ids.push(bus.subscribe(move |_: &EndpointRemoved| with(&sitemap, |s| s.mark_stale())));

        ids
    }

    /// Load a plugin; its applications, modules and endpoints cascade in.
    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) -> Option<Arc<PluginContext>> {
        let context = self.plugins.register(plugin);
        self.refresh_if_stale();
        context
    }

    /// Unload a plugin and everything it declared. Returns whether it was known.
    pub fn remove_plugin(&self, id: &PluginId) -> bool {
        let removed = self.plugins.remove(id).is_some();
        self.refresh_if_stale();
        removed
    }

    /// Rebuild the sitemap now.
    pub fn refresh(&self) {
        self.sitemap.refresh();
    }

    fn refresh_if_stale(&self) {
        if self.config.auto_refresh && self.sitemap.is_stale() {
            self.sitemap.refresh();
        }
    }

    pub fn search(&self, uri: &UriResource, context: &SearchContext) -> SearchResult {
        self.refresh_if_stale();
        self.sitemap.search(uri, context)
    }

    pub fn uri_of<T: 'static>(&self) -> Option<UriResource> {
        self.sitemap.uri_of::<T>()
    }

    /// The search context of a request, with the configured culture as fallback.
    pub fn search_context(&self, request: &Request) -> SearchContext {
        let context = SearchContext::from_request(request);
        if context.culture.is_empty() {
            return context.with_culture(self.config.culture.clone());
        }
        context
    }

    /// Resolve and process a request.
    ///
    /// A miss is answered by the 404 status page; a failing endpoint by the
    /// status page of its error. Without a matching status page a plain
    /// response with that status is returned.
    pub async fn dispatch(&self, request: &Request) -> Response {
        let context = self.search_context(request);
        let result = self.search(&request.uri, &context);

        let Some(endpoint) = result.context().cloned() else {
            debug!(uri = %request.uri, "No endpoint found");
            let application = self.application_for(&request.uri);
            return self
                .status_response(HttpStatus::NotFound, application.as_ref(), &context, request)
                .await;
        };

        match result.process(request).await {
            Ok(response) => response,
            Err(e) => {
                let status = e.http_status();
                if status.is_server_error() {
                    error!(uri = %request.uri, endpoint = %endpoint.endpoint_id(), error = %e, "Endpoint failed");
                } else {
                    debug!(uri = %request.uri, endpoint = %endpoint.endpoint_id(), error = %e, "Endpoint rejected request");
                }
                self.status_response(status, Some(endpoint.application_id()), &context, request)
                    .await
            }
        }
    }

    async fn status_response(
        &self,
        status: HttpStatus,
        application: Option<&ApplicationId>,
        context: &SearchContext,
        request: &Request,
    ) -> Response {
        self.refresh_if_stale();
        if let Some(page) = self.sitemap.status_page(status.code(), application, context) {
            match page.process(request).await {
                Ok(response) => return response,
                Err(e) => warn!(status = status.code(), error = %e, "Status page failed"),
            }
        }
        Response::from_status(status)
    }

    /// The application whose context path is the longest prefix of `uri`.
    fn application_for(&self, uri: &UriResource) -> Option<ApplicationId> {
        self.applications
            .applications()
            .into_iter()
            .filter(|app| uri.starts_with(&app.context_path))
            .max_by_key(|app| app.context_path.len())
            .map(|app| app.id.clone())
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn plugins(&self) -> &Arc<PluginManager> {
        &self.plugins
    }

    pub fn applications(&self) -> &Arc<ApplicationManager> {
        &self.applications
    }

    pub fn modules(&self) -> &Arc<ModuleManager> {
        &self.modules
    }

    pub fn directory(&self) -> &Arc<EndpointDirectory> {
        &self.directory
    }

    pub fn resources(&self) -> &Arc<EndpointManager<ResourceFamily>> {
        &self.resources
    }

    pub fn pages(&self) -> &Arc<EndpointManager<PageFamily>> {
        &self.pages
    }

    pub fn rest_apis(&self) -> &Arc<EndpointManager<RestApiFamily>> {
        &self.rest_apis
    }

    pub fn status_pages(&self) -> &Arc<EndpointManager<StatusPageFamily>> {
        &self.status_pages
    }

    pub fn sitemap(&self) -> &Arc<SitemapManager> {
        &self.sitemap
    }
}

/// The bus may be cloned out of the hub; its handlers must not outlive it.
impl Drop for ComponentHub {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}

impl Default for ComponentHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// Run `f` if the manager is still alive. Handlers hold weak references so
/// the bus does not keep the hub's managers alive.
fn with<T>(manager: &Weak<T>, f: impl FnOnce(&T)) -> Result<(), EventHandlerError> {
    if let Some(manager) = manager.upgrade() {
        f(&manager);
    }
    Ok(())
}

fn endpoint_manager<F: EndpointFamily>(
    modules: &Arc<ModuleManager>,
    directory: &Arc<EndpointDirectory>,
    config: &Arc<HubConfig>,
    bus: &EventBus,
) -> Arc<EndpointManager<F>> {
    Arc::new(EndpointManager::new(
        Arc::clone(modules),
        Arc::clone(directory),
        Arc::clone(config),
        bus.clone(),
    ))
}

/// Plugin and module lifecycle subscriptions of one endpoint family.
fn subscribe_family<F: EndpointFamily>(
    bus: &EventBus,
    manager: &Arc<EndpointManager<F>>,
) -> [SubscriptionId; 4] {
    let registered = Arc::downgrade(manager);
    let removed = Arc::downgrade(manager);
    let attached = Arc::downgrade(manager);
    let detached = Arc::downgrade(manager);
    [
        bus.subscribe(move |event: &PluginAdded| {
            with(&registered, |m| {
                m.register(&event.plugin);
            })
        }),
        bus.subscribe(move |event: &PluginRemoved| {
            with(&removed, |m| {
                m.remove(&event.plugin.id);
            })
        }),
        bus.subscribe(move |event: &ModuleAdded| {
            with(&attached, |m| {
                m.assign_to_module(&event.module);
            })
        }),
        bus.subscribe(move |event: &ModuleRemoved| {
            with(&detached, |m| {
                m.detach_from_module(&event.module);
            })
        }),
    ]
}
