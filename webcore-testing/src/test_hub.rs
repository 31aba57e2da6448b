// Test hub builder

use crate::TestClient;
use std::sync::Arc;
use webcore_core::{ComponentHub, HubConfig, Plugin, PluginContext, SearchContext, SearchResult, UriResource};

/// A hub with plugins loaded, for integration tests.
pub struct TestHub {
    hub: Arc<ComponentHub>,
    plugins: Vec<Arc<PluginContext>>,
}

impl TestHub {
    pub fn builder() -> TestHubBuilder {
        TestHubBuilder::new()
    }

    pub fn hub(&self) -> &Arc<ComponentHub> {
        &self.hub
    }

    /// Plugins that registered successfully, in order
    pub fn plugins(&self) -> &[Arc<PluginContext>] {
        &self.plugins
    }

    pub fn client(&self) -> TestClient {
        TestClient::new(Arc::clone(&self.hub))
    }

    /// Search with an empty search context. An unparsable URI is a miss.
    pub fn search(&self, uri: &str) -> SearchResult {
        self.search_with(uri, &SearchContext::new())
    }

    pub fn search_with(&self, uri: &str, context: &SearchContext) -> SearchResult {
        match UriResource::parse(uri) {
            Ok(uri) => self.hub.search(&uri, context),
            Err(_) => SearchResult::not_found(UriResource::from_path(uri)),
        }
    }

    pub fn uri_of<T: 'static>(&self) -> Option<String> {
        self.hub.uri_of::<T>().map(|uri| uri.to_string())
    }
}

/// Builder for [`TestHub`]
#[derive(Default)]
pub struct TestHubBuilder {
    config: HubConfig,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl TestHubBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_context_path(mut self, path: &str) -> Self {
        self.config.context_path = path.to_string();
        self
    }

    /// Plugins are registered in the order they are added.
    pub fn with_plugin<P: Plugin>(mut self, plugin: P) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Register all plugins and refresh the sitemap.
    pub fn build(self) -> TestHub {
        let hub = Arc::new(ComponentHub::new(self.config));
        let plugins = self
            .plugins
            .into_iter()
            .filter_map(|plugin| hub.register_plugin(plugin))
            .collect();
        hub.refresh();
        TestHub { hub, plugins }
    }
}
