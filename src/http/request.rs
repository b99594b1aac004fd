//! HTTP request message.

use crate::http::{Attributes, Headers, Method, Version};

/// An HTTP request.
///
/// Built by the codec for inbound server traffic and by the client façade for
/// outbound submissions. Route dispatch injects path captures and query
/// parameters into [`attributes`](Request::attributes) on a successful match.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request target as it appears on the request line (path + query).
    pub target: String,
    /// Protocol version.
    pub version: Version,
    /// Header map.
    pub headers: Headers,
    /// Message body.
    pub body: Vec<u8>,
    keep_alive: bool,
    attributes: Attributes,
}

impl Request {
    /// Create a request with an empty body and no headers.
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            version: Version::Http11,
            headers: Headers::new(),
            body: Vec::new(),
            keep_alive: true,
            attributes: Attributes::new(),
        }
    }

    /// Set the body, consuming and returning the request.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header, consuming and returning the request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// The target path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    /// The raw query string, or `""` when absent.
    #[must_use]
    pub fn query(&self) -> &str {
        self.target.split_once('?').map_or("", |(_, query)| query)
    }

    /// Whether the peer asked to keep the connection open after this exchange.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Record the keep-alive decision derived from version and headers.
    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
    }

    /// Attributes injected by route dispatch.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Mutable access to the attribute map.
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Shorthand for `attributes().get_str(key)`.
    #[must_use]
    pub fn attr(&self, key: &str) -> &str {
        self.attributes.get_str(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query_split() {
        let req = Request::new(Method::Get, "/items/7?sort=asc&limit=5");
        assert_eq!(req.path(), "/items/7");
        assert_eq!(req.query(), "sort=asc&limit=5");
    }

    #[test]
    fn test_path_without_query() {
        let req = Request::new(Method::Get, "/items");
        assert_eq!(req.path(), "/items");
        assert_eq!(req.query(), "");
    }

    #[test]
    fn test_builder_helpers() {
        let req = Request::new(Method::Post, "/submit")
            .with_header("Content-Type", "text/plain")
            .with_body("payload");
        assert_eq!(req.headers.get("content-type"), Some("text/plain"));
        assert_eq!(req.body, b"payload");
    }
}
