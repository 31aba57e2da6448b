//! Endpoint items and endpoint contexts
//!
//! An [`EndpointItem`] is the immutable, type-level record of one declared
//! endpoint. Attaching it to a module produces an [`EndpointContext`], the
//! per-module descriptor that knows its parent, its URI and (for cached
//! endpoints) its shared instance.
//!
//! The URI of a context is never stored: it is derived on every call from the
//! parent's URI (or the module's context path) and the declared segment, so a
//! moved parent or module is picked up without invalidation.

use crate::descriptor::{Activation, EndpointDescriptor, ErasedInstance, InstanceFactory};
use crate::directory::EndpointDirectory;
use crate::ids::{ApplicationId, EndpointId, ModuleId};
use crate::metadata::{EndpointKind, EndpointMetadata};
use crate::module::{ModuleContext, ModuleKey};
use crate::plugin::PluginContext;
use crate::sitemap::SearchContext;
use crate::uri::UriResource;
use crate::Error;
use once_cell::sync::OnceCell;
use std::any::TypeId;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

/// Type-level registration record of one endpoint.
pub struct EndpointItem {
    pub id: EndpointId,
    pub kind: EndpointKind,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub plugin: Arc<PluginContext>,
    pub metadata: EndpointMetadata,
    factory: InstanceFactory,
}

impl EndpointItem {
    pub(crate) fn from_descriptor(
        kind: EndpointKind,
        descriptor: EndpointDescriptor,
        plugin: &Arc<PluginContext>,
    ) -> Self {
        Self {
            id: descriptor.id,
            kind,
            type_id: descriptor.type_id,
            type_name: descriptor.type_name,
            plugin: Arc::clone(plugin),
            metadata: descriptor.metadata,
            factory: descriptor.factory,
        }
    }

    /// Declared module. Items without a module are never registered.
    pub fn module_id(&self) -> Option<&ModuleId> {
        self.metadata.module_ref()
    }

    /// Create the context of this item inside `module`.
    pub fn create_context(
        self: &Arc<Self>,
        module: Arc<ModuleContext>,
        directory: &Arc<EndpointDirectory>,
        max_parent_depth: usize,
    ) -> Arc<EndpointContext> {
        Arc::new(EndpointContext {
            item: Arc::clone(self),
            module,
            directory: Arc::downgrade(directory),
            max_parent_depth,
            chain_reported: AtomicBool::new(false),
            instance: OnceCell::new(),
        })
    }
}

impl fmt::Debug for EndpointItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointItem")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .field("plugin", &self.plugin.id)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Identifies one endpoint context: an endpoint inside one module of one
/// application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey {
    pub endpoint: EndpointId,
    pub application: ApplicationId,
    pub module: ModuleId,
}

impl ContextKey {
    pub fn module_key(&self) -> ModuleKey {
        ModuleKey {
            application: self.application.clone(),
            module: self.module.clone(),
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.application, self.module, self.endpoint)
    }
}

/// An endpoint attached to a module.
pub struct EndpointContext {
    item: Arc<EndpointItem>,
    module: Arc<ModuleContext>,
    directory: Weak<EndpointDirectory>,
    max_parent_depth: usize,
    chain_reported: AtomicBool,
    instance: OnceCell<ErasedInstance>,
}

impl EndpointContext {
    pub fn item(&self) -> &Arc<EndpointItem> {
        &self.item
    }

    pub fn endpoint_id(&self) -> &EndpointId {
        &self.item.id
    }

    pub fn kind(&self) -> EndpointKind {
        self.item.kind
    }

    pub fn type_id(&self) -> TypeId {
        self.item.type_id
    }

    pub fn metadata(&self) -> &EndpointMetadata {
        &self.item.metadata
    }

    pub fn module(&self) -> &Arc<ModuleContext> {
        &self.module
    }

    pub fn plugin(&self) -> &Arc<PluginContext> {
        &self.item.plugin
    }

    pub fn application_id(&self) -> &ApplicationId {
        self.module.application_id()
    }

    pub fn key(&self) -> ContextKey {
        ContextKey {
            endpoint: self.item.id.clone(),
            application: self.module.application.id.clone(),
            module: self.module.id.clone(),
        }
    }

    pub fn module_key(&self) -> ModuleKey {
        self.module.key()
    }

    /// Resolve the parent context.
    ///
    /// Only contexts of the same application qualify; one in the same module
    /// is preferred. Returns `None` when no parent is declared or the parent
    /// is not attached (yet).
    pub fn parent(&self) -> Option<Arc<EndpointContext>> {
        let parent_id = self.item.metadata.parent.as_ref()?;
        let directory = self.directory.upgrade()?;
        let parent = directory.find_parent(parent_id, &self.module);
        if parent.is_none() {
            trace!(
                endpoint = %self.item.id,
                parent = %parent_id,
                application = %self.module.application.id,
                "Parent not attached in this application"
            );
        }
        parent
    }

    /// Path the segment is appended to: the parent's URI, or the module's
    /// context path, followed by the context path override if declared.
    ///
    /// A parent whose chain leads back to this context, or runs deeper than
    /// `max_parent_depth`, is treated as unresolvable.
    pub fn context_path(&self) -> UriResource {
        let base = match self.parent() {
            Some(parent) => match self.broken_parent_chain(&parent) {
                None => parent.uri(),
                Some(reason) => {
                    if !self.chain_reported.swap(true, Ordering::Relaxed) {
                        warn!(
                            endpoint = %self.item.id,
                            application = %self.module.application.id,
                            module = %self.module.id,
                            max_depth = self.max_parent_depth,
                            "{reason}, placing the endpoint at its module path"
                        );
                    }
                    self.module.context_path()
                }
            },
            None => self.module.context_path(),
        };

        match &self.item.metadata.context_path {
            Some(extra) => base.combine(extra),
            None => base,
        }
    }

    /// Effective URI of this context.
    pub fn uri(&self) -> UriResource {
        self.context_path().combine(&self.item.metadata.segment)
    }

    // A cycle further up that does not pass through this context is left to
    // its members: each of them falls back to its own module path.
    fn broken_parent_chain(&self, parent: &Arc<EndpointContext>) -> Option<&'static str> {
        let own = self.key();
        let mut seen = BTreeSet::new();
        let mut current = Some(Arc::clone(parent));
        while let Some(context) = current {
            let key = context.key();
            if key == own {
                return Some("Parent chain cycles back to the endpoint");
            }
            if !seen.insert(key) {
                return None;
            }
            if seen.len() > self.max_parent_depth {
                return Some("Parent chain too deep");
            }
            current = context.parent();
        }
        None
    }

    /// Whether the search context may see this endpoint: every requested
    /// scope is declared and every condition holds.
    pub fn is_eligible(&self, search: &SearchContext) -> bool {
        let metadata = &self.item.metadata;
        search.scopes.iter().all(|scope| metadata.scopes.contains(scope))
            && metadata
                .conditions
                .iter()
                .all(|condition| condition.fulfillment(search))
    }

    /// Get an instance for a request.
    ///
    /// Cached endpoints are created once, on first use, and shared; all other
    /// endpoints get a fresh instance per call.
    pub fn instance(self: &Arc<Self>, uri: &UriResource, culture: &str) -> Result<ErasedInstance, Error> {
        let activation = Activation {
            context: self,
            uri,
            culture,
        };

        if self.item.metadata.cache {
            return self
                .instance
                .get_or_try_init(|| self.create(&activation))
                .cloned();
        }
        self.create(&activation)
    }

    /// The shared instance, if this endpoint is cached and was resolved before.
    pub fn cached_instance(&self) -> Option<ErasedInstance> {
        self.instance.get().cloned()
    }

    fn create(&self, activation: &Activation<'_>) -> Result<ErasedInstance, Error> {
        trace!(endpoint = %self.item.id, uri = %activation.uri, "Creating endpoint instance");
        (self.item.factory)(activation).map_err(|error| match error {
            Error::Instantiation { .. } => error,
            other => Error::instantiation(self.item.id.to_string(), other.to_string()),
        })
    }
}

impl fmt::Debug for EndpointContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointContext")
            .field("endpoint", &self.item.id)
            .field("kind", &self.item.kind)
            .field("application", &self.module.application.id)
            .field("module", &self.module.id)
            .field("cached", &self.instance.get().is_some())
            .finish()
    }
}
