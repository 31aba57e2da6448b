// HTTP request and response types handed to endpoints

use crate::{Error, HttpStatus, UriResource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request methods an endpoint family can be asked to handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::DELETE,
        HttpMethod::PATCH,
        HttpMethod::HEAD,
        HttpMethod::OPTIONS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    /// Methods that never change server state
    pub fn is_safe(&self) -> bool {
        matches!(self, HttpMethod::GET | HttpMethod::HEAD | HttpMethod::OPTIONS)
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = Error;

    /// Case-insensitive
    fn from_str(s: &str) -> Result<Self, Error> {
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::MethodNotAllowed(s.to_string()))
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound request as seen by the component hub
///
/// The transport layer is responsible for building this from the wire; the
/// hub only needs the method, the normalized URI and the headers.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: HttpMethod,
    pub uri: UriResource,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub query_params: HashMap<String, String>,
}

impl Request {
    pub fn new(method: HttpMethod, uri: UriResource) -> Self {
        let query_params = uri.query_pairs().into_iter().collect();
        Self {
            method,
            uri,
            headers: HashMap::new(),
            body: Vec::new(),
            query_params,
        }
    }

    /// Build a request from a method and a raw URI string
    pub fn parse(method: HttpMethod, uri: &str) -> Result<Self, Error> {
        let uri = UriResource::parse(uri)?;
        let mut request = Self::new(method, uri);
        if let Some(host) = request.uri.authority().map(str::to_string) {
            request.headers.insert("host".to_string(), host);
        }
        Ok(request)
    }

    /// Shorthand for a GET request
    pub fn get(uri: &str) -> Result<Self, Error> {
        Self::parse(HttpMethod::GET, uri)
    }

    /// Header names are stored lowercased
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get a header by (case-insensitive) name
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Response produced by an endpoint family handler
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(HttpStatus::Ok.code())
    }

    /// A bare response for a status, with the reason phrase as body
    pub fn from_status(status: HttpStatus) -> Self {
        Self::new(status.code())
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(status.to_string().into_bytes())
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.body = html.into().into_bytes();
        self.headers
            .insert("Content-Type".to_string(), "text/html; charset=utf-8".to_string());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    }

    /// Body as UTF-8 text (lossy)
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::PATCH);
        assert!(matches!("BREW".parse::<HttpMethod>(), Err(Error::MethodNotAllowed(m)) if m == "BREW"));
        assert!(HttpMethod::HEAD.is_safe());
        assert!(!HttpMethod::POST.is_safe());
        assert_eq!(HttpMethod::DELETE.to_string(), "DELETE");
    }

    #[test]
    fn test_request_parse() {
        let request = Request::get("http://example.org/aca/mca?lang=de").unwrap();
        assert_eq!(request.method, HttpMethod::GET);
        assert_eq!(request.uri.to_string(), "/aca/mca");
        assert_eq!(request.header("Host").map(String::as_str), Some("example.org"));
        assert_eq!(request.query("lang").map(String::as_str), Some("de"));
    }

    #[test]
    fn test_request_json() {
        #[derive(Deserialize)]
        struct Payload {
            name: String,
        }

        let request = Request::parse(HttpMethod::POST, "/api")
            .unwrap()
            .with_body(br#"{"name":"webcore"}"#.to_vec());
        let payload: Payload = request.json().unwrap();
        assert_eq!(payload.name, "webcore");
    }

    #[test]
    fn test_response_helpers() {
        let response = Response::ok().with_html("<p>hi</p>");
        assert_eq!(response.status, 200);
        assert_eq!(
            response.header("content-type").map(String::as_str),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(response.body_string(), "<p>hi</p>");

        let response = Response::from_status(HttpStatus::NotFound);
        assert_eq!(response.status, 404);
        assert_eq!(response.body_string(), "404 Not Found");
    }

    #[test]
    fn test_with_json() {
        let response = Response::ok()
            .with_json(&serde_json::json!({"id": 1}))
            .unwrap();
        assert_eq!(response.body_string(), r#"{"id":1}"#);
    }
}
