// Test client dispatching requests through a hub

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use webcore_core::{ComponentHub, Error, HttpMethod, HttpStatus, Request, Response};

/// Sends requests to a [`ComponentHub`] without a network transport.
#[derive(Clone)]
pub struct TestClient {
    hub: Arc<ComponentHub>,
}

impl TestClient {
    pub fn new(hub: Arc<ComponentHub>) -> Self {
        Self { hub }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(HttpMethod::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request(HttpMethod::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request(HttpMethod::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(HttpMethod::DELETE, path, None).await
    }

    pub async fn patch(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request(HttpMethod::PATCH, path, Some(body)).await
    }

    /// An unparsable path answers 400 without reaching the hub.
    pub async fn request(&self, method: HttpMethod, path: &str, body: Option<Vec<u8>>) -> TestResponse {
        match Request::parse(method, path) {
            Ok(request) => self.send(request.with_body(body.unwrap_or_default())).await,
            Err(error) => TestResponse::rejected(error),
        }
    }

    pub async fn send(&self, request: Request) -> TestResponse {
        TestResponse::new(self.hub.dispatch(&request).await)
    }

    pub fn build(&self, method: HttpMethod, path: &str) -> TestRequestBuilder {
        TestRequestBuilder::new(self.clone(), method, path)
    }
}

/// Request with headers and body, sent through a [`TestClient`].
pub struct TestRequestBuilder {
    client: TestClient,
    method: HttpMethod,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl TestRequestBuilder {
    fn new(client: TestClient, method: HttpMethod, path: &str) -> Self {
        Self {
            client,
            method,
            path: path.to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn json<T: serde::Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub async fn send(self) -> TestResponse {
        let request = match Request::parse(self.method, &self.path) {
            Ok(request) => request,
            Err(error) => return TestResponse::rejected(error),
        };
        let request = self
            .headers
            .into_iter()
            .fold(request, |request, (key, value)| request.with_header(key, value))
            .with_body(self.body);
        self.client.send(request).await
    }
}

/// Response observed by a test.
#[derive(Debug, Clone)]
pub struct TestResponse {
    response: Response,
}

impl TestResponse {
    pub fn new(response: Response) -> Self {
        Self { response }
    }

    fn rejected(error: Error) -> Self {
        let status = error.http_status();
        Self::new(Response::from_status(status).with_body(error.to_string().into_bytes()))
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn http_status(&self) -> Option<HttpStatus> {
        HttpStatus::from_code(self.response.status)
    }

    pub fn header(&self, key: &str) -> Option<&String> {
        self.response.header(key)
    }

    pub fn body(&self) -> &[u8] {
        &self.response.body
    }

    pub fn body_string(&self) -> String {
        self.response.body_string()
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.response.body)
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}
