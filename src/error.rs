//! Error types for the HTTP session engine.
//!
//! Two families live here: [`Error`], the transport-level taxonomy surfaced by
//! the client and the codec, and [`HttpError`], the typed handler error the
//! server converts into a response of exactly that status.

use thiserror::Error;

use crate::http::Status;

/// Result type alias for HTTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving an HTTP connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Host name resolution failed.
    #[error("Resolve failed: {0}")]
    Resolve(String),

    /// TCP connect failed.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// TLS handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Read from the peer failed mid-exchange.
    #[error("Read failed: {0}")]
    Read(String),

    /// Write to the peer failed.
    #[error("Write failed: {0}")]
    Write(String),

    /// The request's deadline elapsed before its response arrived.
    #[error("Request timed out")]
    Timeout,

    /// The URL could not be parsed. Rejected before any I/O.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL scheme is not one the client can speak.
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Malformed HTTP message on the wire.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Header block exceeds the configured maximum.
    #[error("Header block too large: {size} bytes (max: {max})")]
    HeaderTooLarge {
        /// Actual header block size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message body exceeds the configured maximum.
    #[error("Body too large: {size} bytes (max: {max})")]
    BodyTooLarge {
        /// Actual body size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// The peer closed the connection between exchanges.
    ///
    /// On the client this is the idle keep-alive closure that triggers a
    /// transparent reconnect rather than a caller-visible failure.
    #[error("Connection closed by peer")]
    ConnectionClosed,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Read(err.to_string())
    }
}

/// A typed HTTP error raised by a route handler.
///
/// The server session converts it into a response carrying exactly this
/// status and message; it never terminates the connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct HttpError {
    /// Status the response will carry.
    pub status: Status,
    /// Message used as the response body.
    pub message: String,
}

impl HttpError {
    /// Create an error with an arbitrary status.
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BAD_REQUEST, message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(Status::UNAUTHORIZED, message)
    }

    /// 403 Forbidden.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(Status::FORBIDDEN, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Status::NOT_FOUND, message)
    }

    /// 500 Internal Server Error.
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(Status::INTERNAL_SERVER_ERROR, message)
    }

    /// 501 Not Implemented.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(Status::NOT_IMPLEMENTED, message)
    }

    /// 502 Bad Gateway.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(Status::BAD_GATEWAY, message)
    }

    /// 503 Service Unavailable.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(Status::SERVICE_UNAVAILABLE, message)
    }
}

/// Error type route handlers return.
///
/// A [`HttpError`] inside the box maps to its exact status; anything else is
/// recovered as a 500 with a wrapped message.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::HeaderTooLarge {
            size: 16_000,
            max: 8192,
        };
        assert_eq!(
            err.to_string(),
            "Header block too large: 16000 bytes (max: 8192)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Read(_)));
    }

    #[test]
    fn test_http_error_display() {
        let err = HttpError::not_found("no such thing");
        assert_eq!(err.to_string(), "404 Not Found: no such thing");
    }

    #[test]
    fn test_http_error_downcast_through_handler_error() {
        let boxed: HandlerError = Box::new(HttpError::forbidden("nope"));
        let err = boxed.downcast_ref::<HttpError>().unwrap();
        assert_eq!(err.status, Status::FORBIDDEN);
        assert_eq!(err.message, "nope");
    }
}
