//! Plugin declarations
//!
//! A plugin declares its applications, modules and endpoints through an
//! explicit registration table instead of runtime reflection. Endpoint types
//! are registered with a typed constructor; the managers only ever see the
//! type-erased [`EndpointDescriptor`].
//!
//! ```rust
//! use webcore_core::prelude::*;
//!
//! struct Shop;
//! struct Catalog;
//! struct Products;
//!
//! #[async_trait]
//! impl Resource for Products {
//!     async fn process(&self, _ctx: &EndpointContext, _req: &Request) -> Result<Response, Error> {
//!         Ok(Response::ok())
//!     }
//! }
//!
//! struct ShopPlugin;
//!
//! impl Plugin for ShopPlugin {
//!     fn manifest(&self) -> PluginManifest {
//!         PluginManifest::of::<ShopPlugin>().name("Shop")
//!     }
//!
//!     fn applications(&self) -> Vec<ApplicationDescriptor> {
//!         vec![ApplicationDescriptor::new::<Shop>().context_path("/shop")]
//!     }
//!
//!     fn modules(&self) -> Vec<ModuleDescriptor> {
//!         vec![ModuleDescriptor::new::<Catalog>().application::<Shop>().context_path("/catalog")]
//!     }
//!
//!     fn endpoints(&self) -> Vec<EndpointDescriptor> {
//!         vec![EndpointDescriptor::resource(
//!             EndpointMetadata::new().segment("products", "").module::<Catalog>(),
//!             |_| Ok(Products),
//!         )]
//!     }
//! }
//! ```

use crate::endpoint::EndpointContext;
use crate::family::{Page, Resource, RestApi, StatusPage};
use crate::ids::{ApplicationId, EndpointId, ModuleId, PluginId};
use crate::metadata::{EndpointKind, EndpointMetadata};
use crate::uri::UriResource;
use crate::Error;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A type-erased endpoint instance.
///
/// Always wraps the family's trait object (`Arc<dyn Resource>` and so on), so
/// the owning family can downcast it back.
pub type ErasedInstance = Arc<dyn Any + Send + Sync>;

/// Constructor of endpoint instances.
pub type InstanceFactory = Arc<dyn Fn(&Activation<'_>) -> Result<ErasedInstance, Error> + Send + Sync>;

/// Arguments handed to an endpoint constructor.
#[derive(Debug, Clone, Copy)]
pub struct Activation<'a> {
    pub context: &'a Arc<EndpointContext>,
    /// URI the instance is created for
    pub uri: &'a UriResource,
    pub culture: &'a str,
}

/// Identity of a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginManifest {
    pub id: PluginId,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub version: String,
}

impl PluginManifest {
    pub fn new(id: impl Into<PluginId>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            description: String::new(),
            icon: None,
            version: String::from("0.0.0"),
        }
    }

    /// Manifest whose id is derived from the plugin type
    pub fn of<P: ?Sized>() -> Self {
        Self::new(PluginId::of::<P>())
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// A loadable unit of components.
pub trait Plugin: Send + Sync + 'static {
    fn manifest(&self) -> PluginManifest;

    fn applications(&self) -> Vec<ApplicationDescriptor> {
        Vec::new()
    }

    fn modules(&self) -> Vec<ModuleDescriptor> {
        Vec::new()
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        Vec::new()
    }
}

/// Declaration of an application.
#[derive(Debug, Clone)]
pub struct ApplicationDescriptor {
    pub id: ApplicationId,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub context_path: UriResource,
    pub asset_path: Option<String>,
    pub data_path: Option<String>,
}

impl ApplicationDescriptor {
    pub fn new<A: ?Sized>() -> Self {
        Self::with_id(ApplicationId::of::<A>())
    }

    pub fn with_id(id: impl Into<ApplicationId>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            description: String::new(),
            icon: None,
            context_path: UriResource::root(),
            asset_path: None,
            data_path: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn context_path(mut self, path: &str) -> Self {
        self.context_path = UriResource::from_path(path);
        self
    }

    pub fn asset_path(mut self, path: impl Into<String>) -> Self {
        self.asset_path = Some(path.into());
        self
    }

    pub fn data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = Some(path.into());
        self
    }
}

/// Declaration of a module, attached to one or more applications.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub id: ModuleId,
    pub applications: Vec<ApplicationId>,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub context_path: UriResource,
    pub asset_path: Option<String>,
    pub data_path: Option<String>,
}

impl ModuleDescriptor {
    pub fn new<M: ?Sized>() -> Self {
        Self::with_id(ModuleId::of::<M>())
    }

    pub fn with_id(id: impl Into<ModuleId>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            applications: Vec::new(),
            description: String::new(),
            icon: None,
            context_path: UriResource::root(),
            asset_path: None,
            data_path: None,
        }
    }

    pub fn application<A: ?Sized>(self) -> Self {
        self.application_id(ApplicationId::of::<A>())
    }

    pub fn application_id(mut self, id: impl Into<ApplicationId>) -> Self {
        let id = id.into();
        if !self.applications.contains(&id) {
            self.applications.push(id);
        }
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn context_path(mut self, path: &str) -> Self {
        self.context_path = UriResource::from_path(path);
        self
    }

    pub fn asset_path(mut self, path: impl Into<String>) -> Self {
        self.asset_path = Some(path.into());
        self
    }

    pub fn data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = Some(path.into());
        self
    }
}

/// Declaration of one endpoint type.
#[derive(Clone)]
pub struct EndpointDescriptor {
    pub id: EndpointId,
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Family markers; see [`EndpointKind::accepts`]
    pub markers: Vec<EndpointKind>,
    pub metadata: EndpointMetadata,
    pub factory: InstanceFactory,
}

impl EndpointDescriptor {
    fn build<T: 'static>(
        markers: Vec<EndpointKind>,
        metadata: EndpointMetadata,
        factory: InstanceFactory,
    ) -> Self {
        Self {
            id: EndpointId::of::<T>(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            markers,
            metadata,
            factory,
        }
    }

    pub fn resource<T, F>(metadata: EndpointMetadata, ctor: F) -> Self
    where
        T: Resource + 'static,
        F: Fn(&Activation<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        let factory: InstanceFactory = Arc::new(move |activation| {
            let instance: Arc<dyn Resource> = Arc::new(ctor(activation)?);
            Ok(Arc::new(instance) as ErasedInstance)
        });
        Self::build::<T>(vec![EndpointKind::Resource], metadata, factory)
    }

    pub fn page<T, F>(metadata: EndpointMetadata, ctor: F) -> Self
    where
        T: Page + 'static,
        F: Fn(&Activation<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        let factory: InstanceFactory = Arc::new(move |activation| {
            let instance: Arc<dyn Page> = Arc::new(ctor(activation)?);
            Ok(Arc::new(instance) as ErasedInstance)
        });
        Self::build::<T>(vec![EndpointKind::Page], metadata, factory)
    }

    pub fn rest_api<T, F>(metadata: EndpointMetadata, ctor: F) -> Self
    where
        T: RestApi + 'static,
        F: Fn(&Activation<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        let factory: InstanceFactory = Arc::new(move |activation| {
            let instance: Arc<dyn RestApi> = Arc::new(ctor(activation)?);
            Ok(Arc::new(instance) as ErasedInstance)
        });
        Self::build::<T>(vec![EndpointKind::RestApi], metadata, factory)
    }

    /// A status page is a page specialised to one status code.
    pub fn status_page<T, F>(code: u16, metadata: EndpointMetadata, ctor: F) -> Self
    where
        T: StatusPage + 'static,
        F: Fn(&Activation<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        let factory: InstanceFactory = Arc::new(move |activation| {
            let instance: Arc<dyn StatusPage> = Arc::new(ctor(activation)?);
            Ok(Arc::new(instance) as ErasedInstance)
        });
        Self::build::<T>(
            vec![EndpointKind::Page, EndpointKind::StatusPage],
            metadata.status_code(code),
            factory,
        )
    }

    /// Replace the family markers.
    pub fn with_markers(mut self, markers: Vec<EndpointKind>) -> Self {
        self.markers = markers;
        self
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("markers", &self.markers)
            .field("metadata", &self.metadata)
            .finish()
    }
}
