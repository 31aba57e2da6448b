// Core library of the webcore framework
// Component registration, sitemap resolution and request dispatch

pub mod application;
pub mod config;
pub mod cow_state;
pub mod descriptor;
pub mod directory;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod family;
pub mod http;
pub mod hub;
pub mod ids;
pub mod logging;
pub mod manager;
pub mod metadata;
pub mod module;
pub mod plugin;
pub mod sitemap;
pub mod status;
pub mod uri;

// Re-export commonly used types
pub use application::{ApplicationContext, ApplicationManager};
pub use config::{HubConfig, LogSettings};
pub use descriptor::{
    Activation, ApplicationDescriptor, EndpointDescriptor, ErasedInstance, InstanceFactory,
    ModuleDescriptor, Plugin, PluginManifest,
};
pub use directory::EndpointDirectory;
pub use endpoint::{ContextKey, EndpointContext, EndpointItem};
pub use error::*;
pub use events::{
    ApplicationAdded, ApplicationRemoved, EndpointAdded, EndpointRemoved, ModuleAdded,
    ModuleRemoved, PluginAdded, PluginRemoved,
};
pub use family::{
    EndpointFamily, Page, PageFamily, Resource, ResourceFamily, RestApi, RestApiFamily,
    StatusPage, StatusPageFamily,
};
pub use http::{HttpMethod, Request, Response};
pub use hub::ComponentHub;
pub use ids::{ApplicationId, EndpointId, ModuleId, PluginId};
pub use manager::EndpointManager;
pub use metadata::{Condition, EndpointKind, EndpointMetadata};
pub use module::{ModuleContext, ModuleKey, ModuleManager};
pub use plugin::{PluginContext, PluginManager};
pub use sitemap::{EndpointRegistration, SearchContext, SearchResult, SitemapManager};
pub use status::*;
pub use uri::UriResource;

pub use async_trait::async_trait;

/// Everything needed to write a plugin
pub mod prelude {
    pub use crate::{
        Activation, ApplicationDescriptor, ComponentHub, Condition, EndpointContext,
        EndpointDescriptor, EndpointKind, EndpointMetadata, Error, HttpMethod, HttpStatus,
        HubConfig, ModuleDescriptor, Page, Plugin, PluginManifest, Request, Resource, Response,
        RestApi, SearchContext, SearchResult, StatusPage, UriResource, async_trait,
    };
}
