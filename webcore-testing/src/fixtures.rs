//! Fixture plugins
//!
//! The canonical scenario: applications [`Aca`] at `/aca` and [`Acb`] at
//! `/acb`, both containing module [`Mca`] at `/mca`. Inside the module:
//!
//! | endpoint | URI below the module |
//! |---|---|
//! | [`TestResourceA1X`] | `/a1x` |
//! | [`TestResourceA1Y`] | `/a1x/a1y` (child of A1X) |
//! | [`CachedResource`] | `/cached` (one shared instance) |
//! | [`TestPage`] | `/page` |
//! | [`TestApi`] | `/api` |
//! | [`NotFoundPage`] | status page for 404 |

use crate::counter::InstanceCounter;
use serde_json::{Value, json};
use webcore_core::prelude::*;

pub struct Aca;
pub struct Acb;
pub struct Mca;

/// Plugin id of [`FixturePlugin`]
pub const FIXTURE_PLUGIN: &str = "webcore.testing.fixture";

macro_rules! echo_resource {
    ($($name:ident),*) => {
        $(
            /// Answers with its own endpoint id.
            pub struct $name;

            #[async_trait]
            impl Resource for $name {
                async fn process(&self, context: &EndpointContext, _request: &Request) -> Result<Response, Error> {
                    Ok(Response::ok()
                        .with_header("Content-Type", "text/plain")
                        .with_body(context.endpoint_id().to_string().into_bytes()))
                }
            }
        )*
    };
}

echo_resource!(TestResourceA1X, TestResourceA1Y, CachedResource);

pub struct TestPage;

#[async_trait]
impl Page for TestPage {
    async fn render(&self, context: &EndpointContext, _request: &Request) -> Result<String, Error> {
        Ok(format!("<html><body>{}</body></html>", context.uri()))
    }
}

/// Lists and accepts items; other methods are not allowed.
pub struct TestApi;

#[async_trait]
impl RestApi for TestApi {
    async fn get(&self, _context: &EndpointContext, _request: &Request) -> Result<Value, Error> {
        Ok(json!({"items": ["a", "b"]}))
    }

    async fn post(&self, _context: &EndpointContext, request: &Request) -> Result<Value, Error> {
        let item: Value = request.json()?;
        Ok(json!({"created": item}))
    }
}

pub struct NotFoundPage;

#[async_trait]
impl StatusPage for NotFoundPage {
    async fn render(&self, context: &EndpointContext, status: HttpStatus, request: &Request) -> Result<String, Error> {
        Ok(format!("{}: {} (application {})", status, request.uri, context.application_id()))
    }
}

/// The canonical scenario as one plugin.
#[derive(Clone, Default)]
pub struct FixturePlugin {
    counter: InstanceCounter,
}

impl FixturePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugin whose constructors report to `counter`
    pub fn with_counter(counter: InstanceCounter) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> &InstanceCounter {
        &self.counter
    }
}

fn in_module() -> EndpointMetadata {
    EndpointMetadata::new().module::<Mca>()
}

impl Plugin for FixturePlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new(FIXTURE_PLUGIN)
            .name("Fixtures")
            .description("Canonical two-application scenario")
    }

    fn applications(&self) -> Vec<ApplicationDescriptor> {
        vec![
            ApplicationDescriptor::new::<Aca>().name("Application A").context_path("/aca"),
            ApplicationDescriptor::new::<Acb>().name("Application B").context_path("/acb"),
        ]
    }

    fn modules(&self) -> Vec<ModuleDescriptor> {
        vec![
            ModuleDescriptor::new::<Mca>()
                .name("Module")
                .application::<Aca>()
                .application::<Acb>()
                .context_path("/mca"),
        ]
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        let counter = &self.counter;
        vec![
            EndpointDescriptor::resource(
                in_module().segment("a1x", "title.a1x"),
                counter.counting(|_: &Activation<'_>| Ok(TestResourceA1X)),
            ),
            EndpointDescriptor::resource(
                in_module().segment("a1y", "title.a1y").parent::<TestResourceA1X>(),
                counter.counting(|_: &Activation<'_>| Ok(TestResourceA1Y)),
            ),
            EndpointDescriptor::resource(
                in_module().segment("cached", "").cache(),
                counter.counting(|_: &Activation<'_>| Ok(CachedResource)),
            ),
            EndpointDescriptor::page(
                in_module().segment("page", "title.page"),
                counter.counting(|_: &Activation<'_>| Ok(TestPage)),
            ),
            EndpointDescriptor::rest_api(
                in_module().segment("api", ""),
                counter.counting(|_: &Activation<'_>| Ok(TestApi)),
            ),
            EndpointDescriptor::status_page(
                404,
                in_module(),
                counter.counting(|_: &Activation<'_>| Ok(NotFoundPage)),
            ),
        ]
    }
}
