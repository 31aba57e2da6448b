//! Testing utilities for webcore plugins.
//!
//! ## Features
//!
//! - **TestHub** - hub builder that loads plugins and refreshes the sitemap
//! - **TestClient** - dispatches requests without a transport
//! - **Fixtures** - the canonical two-application scenario as a plugin
//! - **InstanceCounter** - counts endpoint constructions
//! - **Assertions** - response and resolution assertions
//!
//! ## Quick Start
//!
//! ```
//! use webcore_testing::*;
//! use webcore_testing::fixtures::{FixturePlugin, TestResourceA1Y};
//!
//! let hub = TestHub::builder().with_plugin(FixturePlugin::new()).build();
//!
//! assert_resolves::<TestResourceA1Y>(&hub, "/acb/mca/a1x/a1y");
//! assert_not_found(&hub, "/uri/does/not/exist");
//! assert_uri_of::<TestResourceA1Y>(&hub, "/aca/mca/a1x/a1y");
//! ```
//!
//! ## Dispatching Requests
//!
//! ```
//! use webcore_testing::*;
//! use webcore_testing::fixtures::FixturePlugin;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let hub = TestHub::builder().with_plugin(FixturePlugin::new()).build();
//! let client = hub.client();
//!
//! let response = client.get("/aca/mca/api").await;
//! assert_status(&response, 200);
//! assert_json(&response, &serde_json::json!({"items": ["a", "b"]}));
//!
//! let response = client.get("/aca/missing").await;
//! assert_status(&response, 404);
//! # });
//! ```

mod assertions;
pub mod fixtures;
mod counter;
mod test_client;
mod test_hub;

pub use assertions::{
    assert_body_contains, assert_header, assert_json, assert_not_found, assert_resolves, assert_status,
    assert_uri_of,
};
pub use counter::InstanceCounter;
pub use test_client::{TestClient, TestRequestBuilder, TestResponse};
pub use test_hub::{TestHub, TestHubBuilder};

// Re-export common testing utilities
pub use tokio::test as tokio_test;

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use webcore_core::HubConfig;

    #[test]
    fn test_fixture_scenario_resolves() {
        let hub = TestHub::builder().with_plugin(FixturePlugin::new()).build();

        assert_eq!(hub.plugins().len(), 1);
        assert_resolves::<TestResourceA1X>(&hub, "/aca/mca/a1x");
        assert_resolves::<TestResourceA1Y>(&hub, "/aca/mca/a1x/a1y");
        assert_resolves::<TestResourceA1Y>(&hub, "/acb/mca/a1x/a1y");
        assert_not_found(&hub, "/uri/does/not/exist");
        assert_not_found(&hub, "not a ::uri");
    }

    #[test]
    fn test_duplicate_plugin_registered_once() {
        let hub = TestHub::builder()
            .with_plugin(FixturePlugin::new())
            .with_plugin(FixturePlugin::new())
            .build();
        assert_eq!(hub.plugins().len(), 1);
    }

    #[test]
    fn test_context_path() {
        let hub = TestHub::builder()
            .with_config(HubConfig::default().with_culture("fr"))
            .with_context_path("/root")
            .with_plugin(FixturePlugin::new())
            .build();

        assert_eq!(hub.hub().config().culture, "fr");
        assert_uri_of::<TestPage>(&hub, "/root/aca/mca/page");
    }

    #[test]
    fn test_counter_counts_constructions() {
        let counter = InstanceCounter::new();
        let hub = TestHub::builder()
            .with_plugin(FixturePlugin::with_counter(counter.clone()))
            .build();
        assert_eq!(counter.created(), 0);

        for _ in 0..3 {
            hub.search("/aca/mca/cached").instance().unwrap();
        }
        assert_eq!(counter.created(), 1);

        hub.search("/aca/mca/a1x").instance().unwrap();
        hub.search("/aca/mca/a1x").instance().unwrap();
        assert_eq!(counter.created(), 3);
        assert_eq!(counter.failed(), 0);

        counter.reset();
        assert_eq!(counter.created(), 0);
    }

    #[tokio::test]
    async fn test_client_requests() {
        let hub = TestHub::builder().with_plugin(FixturePlugin::new()).build();
        let client = hub.client();

        let response = client.get("/aca/mca/a1x").await;
        assert_status(&response, 200);
        assert_header(&response, "content-type", "text/plain");
        assert_body_contains(&response, "testresourcea1x");

        let response = client.get("/acb/mca/page").await;
        assert_status(&response, 200);
        assert_body_contains(&response, "/acb/mca/page");

        let response = client.delete("/aca/mca/api").await;
        assert_status(&response, 405);
    }

    #[tokio::test]
    async fn test_request_builder_with_json() {
        let hub = TestHub::builder().with_plugin(FixturePlugin::new()).build();

        let response = hub
            .client()
            .build(webcore_core::HttpMethod::POST, "/aca/mca/api")
            .json(&serde_json::json!({"name": "c"}))
            .unwrap()
            .send()
            .await;

        assert_status(&response, 200);
        assert_json(&response, &serde_json::json!({"created": {"name": "c"}}));
    }

    #[tokio::test]
    async fn test_not_found_page() {
        let hub = TestHub::builder().with_plugin(FixturePlugin::new()).build();

        let response = hub.client().get("/acb/nothing").await;
        assert_status(&response, 404);
        assert_body_contains(&response, "404 Not Found: /acb/nothing");
        assert_body_contains(&response, "acb");
    }
}
