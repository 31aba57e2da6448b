//! Shared fixtures for the webcore-core integration tests
//!
//! Applications `Aca` (`/aca`) and `Acb` (`/acb`) both contain module `Mca`
//! (`/mca`). The endpoints plugin places its resources below that module.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use webcore_core::prelude::*;

pub struct Aca;
pub struct Acb;
pub struct Mca;
pub struct Unknown;

/// Resources answering with their own endpoint id.
macro_rules! echo_resources {
    ($($name:ident),* $(,)?) => {
        $(
            pub struct $name;

            #[async_trait]
            impl Resource for $name {
                async fn process(&self, context: &EndpointContext, _request: &Request) -> Result<Response, Error> {
                    Ok(Response::ok().with_body(context.endpoint_id().to_string().into_bytes()))
                }
            }
        )*
    };
}

echo_resources!(
    TestResourceA1X,
    TestResourceA1Y,
    FilesResource,
    CachedResource,
    TransientResource,
    NoModuleResource,
    AdminResource,
    BetaResource,
    FailingResource,
    OrphanResource,
    ShadowResource,
    CycleA,
    CycleB,
    DualEndpoint,
    UnmarkedResource,
);

pub struct BrokenResource;

#[async_trait]
impl Resource for BrokenResource {
    async fn process(&self, _context: &EndpointContext, _request: &Request) -> Result<Response, Error> {
        Err(Error::Handler("broken on purpose".into()))
    }
}

pub struct TestPage;

#[async_trait]
impl Page for TestPage {
    async fn render(&self, context: &EndpointContext, _request: &Request) -> Result<String, Error> {
        Ok(format!("<h1>{}</h1>", context.uri()))
    }
}

pub struct TestApi;

#[async_trait]
impl RestApi for TestApi {
    async fn get(&self, _context: &EndpointContext, _request: &Request) -> Result<Value, Error> {
        Ok(json!({"items": [1, 2, 3]}))
    }

    async fn delete(&self, _context: &EndpointContext, _request: &Request) -> Result<Value, Error> {
        Ok(Value::Null)
    }
}

pub struct NotFoundPage;

#[async_trait]
impl StatusPage for NotFoundPage {
    async fn render(&self, context: &EndpointContext, status: HttpStatus, _request: &Request) -> Result<String, Error> {
        Ok(format!("missing in {} ({})", context.application_id(), status))
    }
}

pub struct ErrorPage;

#[async_trait]
impl StatusPage for ErrorPage {
    async fn render(&self, context: &EndpointContext, status: HttpStatus, _request: &Request) -> Result<String, Error> {
        Ok(format!("failure in {} ({})", context.application_id(), status))
    }
}

/// Applications `/aca` and `/acb` with module `/mca` in both.
pub struct AppsPlugin;

impl Plugin for AppsPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("webcore.test.apps").name("Apps")
    }

    fn applications(&self) -> Vec<ApplicationDescriptor> {
        vec![
            ApplicationDescriptor::new::<Aca>().context_path("/aca"),
            ApplicationDescriptor::new::<Acb>().context_path("/acb"),
        ]
    }

    fn modules(&self) -> Vec<ModuleDescriptor> {
        vec![
            ModuleDescriptor::new::<Mca>()
                .application::<Aca>()
                .application::<Acb>()
                .context_path("/mca"),
        ]
    }
}

/// Endpoints below module `Mca`. Every successful construction is counted.
#[derive(Default, Clone)]
pub struct EndpointsPlugin {
    created: Arc<AtomicUsize>,
}

impl EndpointsPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn counted<T>(&self, value: fn() -> T) -> impl Fn(&Activation<'_>) -> Result<T, Error> + Send + Sync + 'static
    where
        T: Send + Sync + 'static,
    {
        let created = Arc::clone(&self.created);
        move |_: &Activation<'_>| {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(value())
        }
    }
}

fn in_module() -> EndpointMetadata {
    EndpointMetadata::new().module::<Mca>()
}

impl Plugin for EndpointsPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("webcore.test.endpoints").name("Endpoints")
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![
            EndpointDescriptor::resource(
                in_module().segment("a1x", "title.a1x"),
                self.counted(|| TestResourceA1X),
            ),
            EndpointDescriptor::resource(
                in_module().segment("a1y", "title.a1y").parent::<TestResourceA1X>(),
                self.counted(|| TestResourceA1Y),
            ),
            EndpointDescriptor::resource(
                in_module().segment("files", "").include_sub_paths(true),
                self.counted(|| FilesResource),
            ),
            EndpointDescriptor::resource(in_module().segment("cached", "").cache(), self.counted(|| CachedResource)),
            EndpointDescriptor::resource(in_module().segment("transient", ""), self.counted(|| TransientResource)),
            EndpointDescriptor::resource(
                EndpointMetadata::new().segment("nomodule", ""),
                self.counted(|| NoModuleResource),
            ),
            EndpointDescriptor::resource(
                in_module().segment("admin", "").scope("Admin"),
                self.counted(|| AdminResource),
            ),
            EndpointDescriptor::resource(
                in_module()
                    .segment("beta", "")
                    .condition(|search: &SearchContext| search.header("x-beta").is_some()),
                self.counted(|| BetaResource),
            ),
            EndpointDescriptor::resource(in_module().segment("failing", ""), |_: &Activation<'_>| {
                Err::<FailingResource, _>(Error::Internal("no database".into()))
            }),
            EndpointDescriptor::resource(in_module().segment("broken", ""), |_: &Activation<'_>| Ok(BrokenResource)),
            EndpointDescriptor::page(in_module().segment("page", ""), |_: &Activation<'_>| Ok(TestPage)),
            EndpointDescriptor::rest_api(in_module().segment("api", ""), |_: &Activation<'_>| Ok(TestApi)),
            EndpointDescriptor::status_page(404, in_module(), |_: &Activation<'_>| Ok(NotFoundPage)),
            EndpointDescriptor::status_page(500, in_module(), |_: &Activation<'_>| Ok(ErrorPage)),
        ]
    }
}

/// Both fixture plugins as one plugin.
#[derive(Default)]
pub struct ScenarioPlugin {
    pub endpoints: EndpointsPlugin,
}

impl ScenarioPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for ScenarioPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("webcore.test.scenario")
    }

    fn applications(&self) -> Vec<ApplicationDescriptor> {
        AppsPlugin.applications()
    }

    fn modules(&self) -> Vec<ModuleDescriptor> {
        AppsPlugin.modules()
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        self.endpoints.endpoints()
    }
}

/// Redeclares `TestResourceA1X` at another segment and adds an endpoint in
/// a module nobody declares.
pub struct ShadowPlugin;

impl Plugin for ShadowPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("webcore.test.shadow")
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![
            EndpointDescriptor::resource(in_module().segment("shadow-a1x", ""), |_: &Activation<'_>| {
                Ok(TestResourceA1X)
            }),
            EndpointDescriptor::resource(in_module().segment("shadow", ""), |_: &Activation<'_>| Ok(ShadowResource)),
            EndpointDescriptor::resource(
                EndpointMetadata::new().module::<Unknown>().segment("orphan", ""),
                |_: &Activation<'_>| Ok(OrphanResource),
            ),
        ]
    }
}

#[async_trait]
impl Page for DualEndpoint {
    async fn render(&self, context: &EndpointContext, _request: &Request) -> Result<String, Error> {
        Ok(format!("<p>{}</p>", context.uri()))
    }
}

/// `CycleA` and `CycleB` name each other as parent.
pub struct CyclePlugin;

impl Plugin for CyclePlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("webcore.test.cycle")
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![
            EndpointDescriptor::resource(in_module().segment("ca", "").parent::<CycleB>(), |_: &Activation<'_>| {
                Ok(CycleA)
            }),
            EndpointDescriptor::resource(in_module().segment("cb", "").parent::<CycleA>(), |_: &Activation<'_>| {
                Ok(CycleB)
            }),
        ]
    }
}

/// Declares `DualEndpoint` as a resource and again as a page.
pub struct DualPlugin;

impl Plugin for DualPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("webcore.test.dual")
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![
            EndpointDescriptor::resource(in_module().segment("dual-r", ""), |_: &Activation<'_>| Ok(DualEndpoint)),
            EndpointDescriptor::page(in_module().segment("dual-p", ""), |_: &Activation<'_>| Ok(DualEndpoint)),
        ]
    }
}

/// Declares `DualEndpoint` as a page only.
pub struct DualPagePlugin;

impl Plugin for DualPagePlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("webcore.test.dual-page")
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::page(in_module().segment("dual-p", ""), |_: &Activation<'_>| Ok(DualEndpoint))]
    }
}

/// An endpoint carrying no family marker.
pub struct UnmarkedPlugin;

impl Plugin for UnmarkedPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("webcore.test.unmarked")
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![
            EndpointDescriptor::resource(in_module().segment("unmarked", ""), |_: &Activation<'_>| {
                Ok(UnmarkedResource)
            })
            .with_markers(vec![]),
        ]
    }
}

struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return the warnings it logged.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buffer);
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || LogBuffer(Arc::clone(&sink)))
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.lock().unwrap()).into_owned();
    (result, logs)
}

/// A hub with the scenario loaded.
pub fn scenario_hub() -> (ComponentHub, ScenarioPlugin) {
    let hub = ComponentHub::new(HubConfig::default());
    let plugin = ScenarioPlugin::new();
    let counter = ScenarioPlugin {
        endpoints: plugin.endpoints.clone(),
    };
    hub.register_plugin(Arc::new(plugin))
        .expect("scenario plugin registers");
    (hub, counter)
}

pub fn search(hub: &ComponentHub, uri: &str) -> SearchResult {
    search_with(hub, uri, &SearchContext::new())
}

pub fn search_with(hub: &ComponentHub, uri: &str, context: &SearchContext) -> SearchResult {
    hub.search(&UriResource::parse(uri).expect("valid uri"), context)
}

pub fn found_id(result: &SearchResult) -> Option<String> {
    result.endpoint_id().map(|id| id.to_string())
}

pub fn id_of<T>() -> String {
    webcore_core::EndpointId::of::<T>().to_string()
}
