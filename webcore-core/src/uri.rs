// Normalized URIs used for endpoint addressing

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A normalized URI.
///
/// The path is kept as a list of percent-decoded segments with empty and `.`
/// segments removed and `..` applied. Absolute URIs additionally keep their
/// scheme, authority, query and fragment; only the path takes part in
/// endpoint resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UriResource {
    scheme: Option<String>,
    authority: Option<String>,
    segments: Vec<String>,
    query: Option<String>,
    fragment: Option<String>,
}

impl UriResource {
    /// The root path `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse an absolute URI (`http://host/a/b?x=1`) or a path (`/a/b`).
    pub fn parse(input: &str) -> Result<Self, Error> {
        let input = input.trim();

        if input.contains("://") {
            let url = Url::parse(input).map_err(|e| Error::InvalidUri(format!("{}: {}", input, e)))?;
            let authority = url.host_str().map(|host| match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            });
            return Ok(Self {
                scheme: Some(url.scheme().to_string()),
                authority,
                segments: decode_segments(url.path())?,
                query: url.query().map(str::to_string),
                fragment: url.fragment().map(str::to_string),
            });
        }

        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (input, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };

        Ok(Self {
            scheme: None,
            authority: None,
            segments: decode_segments(path)?,
            query,
            fragment,
        })
    }

    /// Build a path-only URI, keeping undecodable segments verbatim.
    ///
    /// Used for declared segments and context paths, where a malformed escape
    /// should not prevent registration.
    pub fn from_path(path: &str) -> Self {
        let raw = path.split(['?', '#']).next().unwrap_or_default();
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            let decoded = urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            push_segment(&mut segments, decoded);
        }
        Self {
            segments,
            ..Self::default()
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Host with optional port.
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Decoded `key=value` pairs of the query string.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(query) = &self.query else {
            return Vec::new();
        };
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_lossy(key), decode_lossy(value))
            })
            .collect()
    }

    /// Append the path of `other` to this URI.
    ///
    /// Scheme and authority are kept from `self`; query and fragment are
    /// taken from `other`.
    pub fn combine(&self, other: &UriResource) -> UriResource {
        let mut segments = self.segments.clone();
        for segment in &other.segments {
            push_segment(&mut segments, segment.clone());
        }
        UriResource {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            segments,
            query: other.query.clone(),
            fragment: other.fragment.clone(),
        }
    }

    /// Append a single path (which may contain several segments).
    pub fn join(&self, path: &str) -> UriResource {
        self.combine(&UriResource::from_path(path))
    }

    /// Whether this path begins with all segments of `prefix`.
    pub fn starts_with(&self, prefix: &UriResource) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The path part only, e.g. `/a/b`.
    pub fn path(&self) -> String {
        self.to_string()
    }

    /// The same path without scheme, authority, query or fragment.
    pub fn to_path(&self) -> UriResource {
        UriResource {
            segments: self.segments.clone(),
            ..Self::default()
        }
    }
}

fn push_segment(segments: &mut Vec<String>, segment: String) {
    match segment.as_str() {
        "" | "." => {}
        ".." => {
            segments.pop();
        }
        _ => segments.push(segment),
    }
}

fn decode_segments(path: &str) -> Result<Vec<String>, Error> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        let decoded = urlencoding::decode(segment)
            .map_err(|e| Error::InvalidUri(format!("{}: {}", path, e)))?;
        push_segment(&mut segments, decoded.into_owned());
    }
    Ok(segments)
}

fn decode_lossy(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

impl fmt::Display for UriResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for UriResource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let uri = UriResource::parse("http://localhost:8080/aca/mca/a1x?x=1#top").unwrap();
        assert_eq!(uri.scheme(), Some("http"));
        assert_eq!(uri.authority(), Some("localhost:8080"));
        assert_eq!(uri.segments(), ["aca", "mca", "a1x"]);
        assert_eq!(uri.query(), Some("x=1"));
        assert_eq!(uri.fragment(), Some("top"));
        assert_eq!(uri.to_string(), "/aca/mca/a1x");
    }

    #[test]
    fn test_parse_path_normalizes() {
        let uri = UriResource::parse("//aca/./mca//x/../a%20b/").unwrap();
        assert_eq!(uri.segments(), ["aca", "mca", "a b"]);
    }

    #[test]
    fn test_parse_invalid_escape() {
        assert!(matches!(UriResource::parse("/a/%ff%fe"), Err(Error::InvalidUri(_))));
        // from_path keeps it verbatim instead
        assert_eq!(UriResource::from_path("/a/%ff%fe").segments(), ["a", "%ff%fe"]);
    }

    #[test]
    fn test_root_display() {
        assert_eq!(UriResource::root().to_string(), "/");
        assert!(UriResource::parse("http://host").unwrap().is_root());
    }

    #[test]
    fn test_combine_and_starts_with() {
        let app = UriResource::from_path("/aca");
        let module = app.join("mca");
        let endpoint = module.join("/a1x/");
        assert_eq!(endpoint.to_string(), "/aca/mca/a1x");
        assert!(endpoint.starts_with(&module));
        assert!(!module.starts_with(&endpoint));
        assert!(endpoint.starts_with(&UriResource::root()));
    }

    #[test]
    fn test_query_pairs() {
        let uri = UriResource::parse("/search?q=hello+world&page=2&flag").unwrap();
        assert_eq!(
            uri.query_pairs(),
            vec![
                ("q".to_string(), "hello world".to_string()),
                ("page".to_string(), "2".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }
}
