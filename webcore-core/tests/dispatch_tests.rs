//! Integration tests for request dispatch and status page fallback

mod common;

use common::*;
use std::sync::Arc;
use webcore_core::prelude::*;
use webcore_core::ApplicationId;

async fn dispatch(hub: &ComponentHub, method: HttpMethod, uri: &str) -> Response {
    let request = Request::parse(method, uri).expect("valid request");
    hub.dispatch(&request).await
}

#[tokio::test]
async fn test_dispatch_resource() {
    let (hub, _) = scenario_hub();

    let response = dispatch(&hub, HttpMethod::GET, "/aca/mca/a1x/a1y").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body_string(), id_of::<TestResourceA1Y>());
}

#[tokio::test]
async fn test_dispatch_page_renders_html() {
    let (hub, _) = scenario_hub();

    let response = dispatch(&hub, HttpMethod::GET, "/acb/mca/page").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body_string(), "<h1>/acb/mca/page</h1>");
    assert!(response.header("content-type").is_some_and(|v| v.starts_with("text/html")));
}

#[tokio::test]
async fn test_dispatch_rest_api_by_method() {
    let (hub, _) = scenario_hub();

    let response = dispatch(&hub, HttpMethod::GET, "/aca/mca/api").await;
    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&response.body).expect("json body");
    assert_eq!(body["items"][2], 3);

    let response = dispatch(&hub, HttpMethod::DELETE, "/aca/mca/api").await;
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_unsupported_method_without_status_page() {
    let (hub, _) = scenario_hub();

    let response = dispatch(&hub, HttpMethod::POST, "/aca/mca/api").await;
    assert_eq!(response.status, 405);
    assert_eq!(response.body_string(), "405 Method Not Allowed");
}

#[tokio::test]
async fn test_miss_served_by_not_found_page() {
    let (hub, _) = scenario_hub();

    let response = dispatch(&hub, HttpMethod::GET, "/uri/does/not/exist").await;
    assert_eq!(response.status, 404);
    assert!(response.body_string().starts_with("missing in"));
}

#[tokio::test]
async fn test_not_found_page_of_matching_application() {
    let (hub, _) = scenario_hub();

    let response = dispatch(&hub, HttpMethod::GET, "/acb/mca/nothing-here").await;
    assert_eq!(response.status, 404);
    assert_eq!(
        response.body_string(),
        format!("missing in {} (404 Not Found)", ApplicationId::of::<Acb>())
    );
}

#[tokio::test]
async fn test_failing_factory_served_by_error_page() {
    let (hub, _) = scenario_hub();

    let response = dispatch(&hub, HttpMethod::GET, "/acb/mca/failing").await;
    assert_eq!(response.status, 500);
    assert_eq!(
        response.body_string(),
        format!("failure in {} (500 Internal Server Error)", ApplicationId::of::<Acb>())
    );
}

#[tokio::test]
async fn test_failing_handler_served_by_error_page() {
    let (hub, _) = scenario_hub();

    let response = dispatch(&hub, HttpMethod::GET, "/aca/mca/broken").await;
    assert_eq!(response.status, 500);
    assert!(response.body_string().starts_with("failure in"));
}

#[tokio::test]
async fn test_plain_fallback_without_status_pages() {
    let hub = ComponentHub::default();
    hub.register_plugin(Arc::new(AppsPlugin)).expect("apps");

    let response = dispatch(&hub, HttpMethod::GET, "/aca/mca/a1x").await;
    assert_eq!(response.status, 404);
    assert_eq!(response.body_string(), "404 Not Found");
    assert_eq!(
        response.header("content-type").map(String::as_str),
        Some("text/plain; charset=utf-8")
    );
}

#[tokio::test]
async fn test_condition_sees_request_headers() {
    let (hub, _) = scenario_hub();

    let response = dispatch(&hub, HttpMethod::GET, "/aca/mca/beta").await;
    assert_eq!(response.status, 404);

    let request = Request::get("/aca/mca/beta").expect("request").with_header("x-beta", "on");
    let response = hub.dispatch(&request).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body_string(), id_of::<BetaResource>());
}

#[tokio::test]
async fn test_search_context_culture() {
    let (hub, _) = scenario_hub();

    let request = Request::get("/aca/mca/a1x").expect("request");
    assert_eq!(hub.search_context(&request).culture, "en");

    let request = request.with_header("Accept-Language", "de-CH, de;q=0.9");
    let context = hub.search_context(&request);
    assert_eq!(context.culture, "de-CH");
    assert_eq!(hub.search(&request.uri, &context).culture(), "de-CH");
}

#[tokio::test]
async fn test_cached_endpoint_reused_across_requests() {
    let (hub, counter) = scenario_hub();

    for _ in 0..3 {
        let response = dispatch(&hub, HttpMethod::GET, "/aca/mca/cached").await;
        assert_eq!(response.status, 200);
    }
    assert_eq!(counter.endpoints.created(), 1);

    for _ in 0..3 {
        dispatch(&hub, HttpMethod::GET, "/aca/mca/transient").await;
    }
    assert_eq!(counter.endpoints.created(), 4);
}
