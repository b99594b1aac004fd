//! HTTP message types shared by the server and client sessions.

mod attributes;
mod headers;
mod method;
mod request;
mod response;
mod status;

pub use attributes::Attributes;
pub use headers::Headers;
pub use method::Method;
pub use request::Request;
pub use response::{Postponed, Response};
pub use status::Status;

/// HTTP protocol version of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    /// HTTP/1.0
    Http10,
    /// HTTP/1.1
    #[default]
    Http11,
}

impl Version {
    /// Parse the version token of a request or status line.
    pub(crate) fn parse(token: &str) -> Option<Self> {
        match token {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    /// Whether connections default to keep-alive for this version.
    #[must_use]
    pub const fn default_keep_alive(self) -> bool {
        matches!(self, Version::Http11)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::Http10 => f.write_str("HTTP/1.0"),
            Version::Http11 => f.write_str("HTTP/1.1"),
        }
    }
}
