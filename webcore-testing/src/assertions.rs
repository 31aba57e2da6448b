// Test assertions for responses and sitemap resolution

use crate::{TestHub, TestResponse};
use webcore_core::EndpointId;

/// Assert that a response has a specific status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status();
    assert_eq!(
        actual,
        expected,
        "Expected status {}, got {} (body: {})",
        expected,
        actual,
        response.body_string()
    );
}

/// Assert that a response body contains JSON matching expected value
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = match response.body_json() {
        Ok(actual) => actual,
        Err(e) => panic!("Failed to deserialize response body: {} (body: {})", e, response.body_string()),
    };
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

/// Assert that a response has a specific header
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key).map(|s| s.as_str());
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

pub fn assert_body_contains(response: &TestResponse, expected: &str) {
    let body = response.body_string();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

/// Assert that `uri` resolves to endpoint type `T`.
pub fn assert_resolves<T: ?Sized>(hub: &TestHub, uri: &str) {
    let result = hub.search(uri);
    let expected = EndpointId::of::<T>();
    assert_eq!(
        result.endpoint_id(),
        Some(&expected),
        "Expected {} to resolve to {}, got {:?}",
        uri,
        expected,
        result
    );
}

/// Assert that `uri` resolves to nothing.
pub fn assert_not_found(hub: &TestHub, uri: &str) {
    let result = hub.search(uri);
    assert!(!result.is_found(), "Expected {} not to resolve, got {:?}", uri, result);
}

/// Assert the URI generated for endpoint type `T`.
pub fn assert_uri_of<T: 'static>(hub: &TestHub, expected: &str) {
    let actual = hub.uri_of::<T>();
    assert_eq!(
        actual.as_deref(),
        Some(expected),
        "Expected the URI of {} to be {}",
        std::any::type_name::<T>(),
        expected
    );
}
