//! Sitemap resolution
//!
//! The sitemap unifies all endpoint families into one address space. Each
//! family registers an [`EndpointRegistration`]; [`SitemapManager::refresh`]
//! asks every addressable family for its contexts and rebuilds a trie keyed by
//! URI path segments. The finished index is published with a single swap, so
//! a concurrent [`search`](SitemapManager::search) sees either the old or the
//! new index.
//!
//! # Matching
//!
//! A search walks the trie along the request path and takes the deepest node
//! holding an eligible context:
//!
//! - at the full request depth every context matches (exact match)
//! - above it only contexts declaring `include_sub_paths` match
//! - a context is eligible when it declares every scope the search asks for
//!   and all of its conditions hold
//!
//! Several eligible contexts in one node are resolved by a fixed order
//! (family, endpoint id, application, module).

use crate::descriptor::ErasedInstance;
use crate::endpoint::EndpointContext;
use crate::http::{HttpMethod, Request, Response};
use crate::ids::{ApplicationId, EndpointId, normalize_id};
use crate::metadata::EndpointKind;
use crate::module::ModuleContext;
use crate::uri::UriResource;
use crate::cow_state::CowState;
use crate::Error;
use futures_util::future::BoxFuture;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, trace};

/// Creates (or reuses) the instance behind a context.
pub type FactoryFn =
    Arc<dyn Fn(&Arc<EndpointContext>, &UriResource, &str) -> Result<ErasedInstance, Error> + Send + Sync>;

/// Finds the contexts of a type, optionally inside one module.
pub type ContextResolverFn =
    Arc<dyn Fn(TypeId, Option<&ModuleContext>) -> Vec<Arc<EndpointContext>> + Send + Sync>;

/// Lists every context of a family.
pub type EndpointResolverFn = Arc<dyn Fn() -> Vec<Arc<EndpointContext>> + Send + Sync>;

/// Runs an instance against a request.
pub type RequestHandlerFn = Arc<
    dyn Fn(ErasedInstance, Arc<EndpointContext>, Request) -> BoxFuture<'static, Result<Response, Error>>
        + Send
        + Sync,
>;

/// What a family supplies to the sitemap.
#[derive(Clone)]
pub struct EndpointRegistration {
    pub kind: EndpointKind,
    /// Whether the family's contexts are entered into the URI index
    pub addressable: bool,
    pub factory: FactoryFn,
    pub context_resolver: ContextResolverFn,
    pub endpoint_resolver: EndpointResolverFn,
    pub request_handler: RequestHandlerFn,
}

impl fmt::Debug for EndpointRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRegistration")
            .field("kind", &self.kind)
            .field("addressable", &self.addressable)
            .finish()
    }
}

/// Request-side input of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    pub host: Option<String>,
    pub culture: String,
    /// Scopes the endpoint must declare, normalized
    pub scopes: Vec<String>,
    pub method: Option<HttpMethod>,
    /// Request headers, names lowercased
    pub headers: HashMap<String, String>,
}

impl SearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive host, culture and method from a request.
    ///
    /// The culture is the first tag of `Accept-Language`, if any.
    pub fn from_request(request: &Request) -> Self {
        let culture = request
            .header("accept-language")
            .and_then(|value| value.split(',').next())
            .and_then(|tag| tag.split(';').next())
            .map(|tag| tag.trim().to_string())
            .unwrap_or_default();

        Self {
            host: request.header("host").cloned(),
            culture,
            scopes: Vec::new(),
            method: Some(request.method),
            headers: request.headers.clone(),
        }
    }

    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = culture.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        let scope = normalize_id(scope);
        if !scope.is_empty() && !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_ascii_lowercase())
    }
}

#[derive(Clone)]
struct IndexEntry {
    uri: UriResource,
    context: Arc<EndpointContext>,
    registration: Arc<EndpointRegistration>,
}

impl IndexEntry {
    fn order(&self) -> (u8, crate::endpoint::ContextKey) {
        (self.context.kind().order(), self.context.key())
    }
}

#[derive(Default)]
struct Node {
    children: HashMap<String, Node>,
    entries: Vec<IndexEntry>,
}

impl Node {
    fn insert(&mut self, segments: &[String], entry: IndexEntry) {
        let mut node = self;
        for segment in segments {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.entries.push(entry);
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(IndexEntry::order);
        for child in self.children.values_mut() {
            child.sort();
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a IndexEntry>) {
        out.extend(self.entries.iter());
        for child in self.children.values() {
            child.collect(out);
        }
    }
}

#[derive(Default)]
struct SitemapIndex {
    root: Node,
    len: usize,
    status_pages: Vec<IndexEntry>,
}

/// Outcome of a search: either a lazily instantiated endpoint or not found.
#[derive(Clone)]
pub struct SearchResult {
    uri: UriResource,
    culture: String,
    entry: Option<IndexEntry>,
}

impl SearchResult {
    pub fn not_found(uri: UriResource) -> Self {
        Self {
            uri,
            culture: String::new(),
            entry: None,
        }
    }

    fn found(entry: IndexEntry, uri: UriResource, culture: String) -> Self {
        Self {
            uri,
            culture,
            entry: Some(entry),
        }
    }

    pub fn is_found(&self) -> bool {
        self.entry.is_some()
    }

    pub fn endpoint_id(&self) -> Option<&EndpointId> {
        self.entry.as_ref().map(|entry| entry.context.endpoint_id())
    }

    pub fn context(&self) -> Option<&Arc<EndpointContext>> {
        self.entry.as_ref().map(|entry| &entry.context)
    }

    pub fn kind(&self) -> Option<EndpointKind> {
        self.entry.as_ref().map(|entry| entry.registration.kind)
    }

    /// The requested URI.
    pub fn uri(&self) -> &UriResource {
        &self.uri
    }

    /// The matched endpoint's own URI, as indexed.
    pub fn endpoint_uri(&self) -> Option<&UriResource> {
        self.entry.as_ref().map(|entry| &entry.uri)
    }

    pub fn culture(&self) -> &str {
        &self.culture
    }

    /// Instantiate the endpoint through its family's factory.
    pub fn instance(&self) -> Result<ErasedInstance, Error> {
        let entry = self.found_entry()?;
        (entry.registration.factory)(&entry.context, &self.uri, &self.culture)
    }

    /// Instantiate the endpoint and let its family handle the request.
    pub async fn process(&self, request: &Request) -> Result<Response, Error> {
        let entry = self.found_entry()?;
        let instance = (entry.registration.factory)(&entry.context, &self.uri, &self.culture)?;
        (entry.registration.request_handler)(instance, Arc::clone(&entry.context), request.clone()).await
    }

    fn found_entry(&self) -> Result<&IndexEntry, Error> {
        self.entry
            .as_ref()
            .ok_or_else(|| Error::NotFound(self.uri.to_string()))
    }
}

impl fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResult")
            .field("uri", &self.uri.to_string())
            .field("endpoint", &self.endpoint_id())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Unified, atomically refreshed URI index over all endpoint families.
pub struct SitemapManager {
    registrations: CowState<BTreeMap<EndpointKind, Arc<EndpointRegistration>>>,
    index: CowState<SitemapIndex>,
    stale: AtomicBool,
}

impl SitemapManager {
    pub fn new() -> Self {
        Self {
            registrations: CowState::default(),
            index: CowState::new(SitemapIndex::default()),
            stale: AtomicBool::new(false),
        }
    }

    /// Register a family. A second registration of the same family replaces
    /// the first.
    pub fn register(&self, registration: EndpointRegistration) {
        let kind = registration.kind;
        self.registrations.update(|registrations| {
            registrations.insert(kind, Arc::new(registration));
        });
        self.mark_stale();
        debug!(family = %kind, "Endpoint family registered with the sitemap");
    }

    pub fn families(&self) -> Vec<EndpointKind> {
        self.registrations.snapshot().keys().copied().collect()
    }

    /// Rebuild the index from all families and publish it.
    pub fn refresh(&self) {
        // cleared first so changes made while building mark the new index stale
        self.stale.store(false, Ordering::SeqCst);

        let registrations = self.registrations.snapshot();
        let mut index = SitemapIndex::default();

        for registration in registrations.values() {
            for context in (registration.endpoint_resolver)() {
                let entry = IndexEntry {
                    uri: context.uri(),
                    context,
                    registration: Arc::clone(registration),
                };
                if registration.addressable {
                    index.root.insert(entry.uri.segments(), entry.clone());
                    index.len += 1;
                } else {
                    index.status_pages.push(entry);
                }
            }
        }

        index.root.sort();
        index.status_pages.sort_by_key(IndexEntry::order);

        let len = index.len;
        let status_pages = index.status_pages.len();
        self.index.replace(index);
        info!(entries = len, status_pages, "Sitemap refreshed");
    }

    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Version of the published index; increases with every refresh.
    pub fn version(&self) -> u64 {
        self.index.version()
    }

    /// Number of addressable entries in the index.
    pub fn index_len(&self) -> usize {
        self.index.snapshot().len
    }

    /// Resolve a URI to an endpoint context.
    pub fn search(&self, uri: &UriResource, context: &SearchContext) -> SearchResult {
        let index = self.index.snapshot();
        let segments = uri.segments();

        let mut path = vec![&index.root];
        let mut node = &index.root;
        for segment in segments {
            match node.children.get(segment) {
                Some(child) => {
                    path.push(child);
                    node = child;
                }
                None => break,
            }
        }

        for (depth, node) in path.iter().enumerate().rev() {
            let exact = depth == segments.len();
            let mut eligible = node.entries.iter().filter(|entry| {
                (exact || entry.context.metadata().include_sub_paths)
                    && entry.context.is_eligible(context)
            });

            if let Some(entry) = eligible.next() {
                let others = eligible.count();
                if others > 0 {
                    debug!(
                        uri = %uri,
                        endpoint = %entry.context.endpoint_id(),
                        others,
                        "Several endpoints match, taking the first"
                    );
                }
                trace!(uri = %uri, endpoint = %entry.context.endpoint_id(), exact, "Sitemap match");
                return SearchResult::found(entry.clone(), uri.clone(), context.culture.clone());
            }
        }

        trace!(uri = %uri, "No sitemap match");
        SearchResult::not_found(uri.clone())
    }

    /// URI of the first context of type `T`, for link generation.
    pub fn uri_of<T: 'static>(&self) -> Option<UriResource> {
        self.uri_of_type(TypeId::of::<T>(), None)
    }

    /// URI of the first context of a type, optionally inside one module.
    pub fn uri_of_type(&self, type_id: TypeId, module: Option<&ModuleContext>) -> Option<UriResource> {
        self.registrations
            .snapshot()
            .values()
            .filter(|registration| registration.addressable)
            .find_map(|registration| {
                (registration.context_resolver)(type_id, module)
                    .into_iter()
                    .next()
            })
            .map(|context| context.uri())
    }

    /// The status page for a code, preferring one of `application`.
    pub fn status_page(
        &self,
        code: u16,
        application: Option<&ApplicationId>,
        context: &SearchContext,
    ) -> Option<SearchResult> {
        let index = self.index.snapshot();
        let mut pages = index
            .status_pages
            .iter()
            .filter(|entry| entry.context.metadata().status_code == Some(code));

        let first = pages.next()?;
        let chosen = match application {
            Some(application) if first.context.application_id() != application => pages
                .find(|entry| entry.context.application_id() == application)
                .unwrap_or(first),
            _ => first,
        };

        Some(SearchResult::found(
            chosen.clone(),
            chosen.uri.clone(),
            context.culture.clone(),
        ))
    }

    /// All addressable entries as (URI, context), ordered by URI.
    pub fn entries(&self) -> Vec<(UriResource, Arc<EndpointContext>)> {
        let index = self.index.snapshot();
        let mut entries = Vec::with_capacity(index.len);
        index.root.collect(&mut entries);

        let mut entries: Vec<_> = entries
            .into_iter()
            .map(|entry| (entry.uri.clone(), Arc::clone(&entry.context)))
            .collect();
        entries.sort_by(|a, b| {
            a.0.segments()
                .cmp(b.0.segments())
                .then_with(|| a.1.key().cmp(&b.1.key()))
        });
        entries
    }
}

impl Default for SitemapManager {
    fn default() -> Self {
        Self::new()
    }
}
