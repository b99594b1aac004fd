//! # rshttp - Embeddable Asynchronous HTTP(S) Server and Client
//!
//! `rshttp` is a small HTTP/1.x library built on tokio: an in-process server
//! with pattern-based routing and an HTTP(S) client with transparent
//! connection reuse.
//!
//! ## Features
//!
//! - **Pattern routing** with `:param` path captures and
//!   specificity-ordered matching
//! - **Keep-alive sessions** on both sides, one task per connection
//! - **Postponed responses** for handlers that finish work out of band
//! - **Queued client** with per-request deadlines and transparent
//!   reconnect of stale keep-alive connections
//! - **TLS integration** for `https://` support (feature `tls-rustls`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rshttp::{Client, Config, Method, Router, Server};
//!
//! let mut router = Router::new();
//! router.add(Method::Get, "/hello/:name", |req, res| {
//!     res.set_body(format!("hello {}", req.attr("name")));
//!     Ok(())
//! });
//! let server = Server::bind("127.0.0.1:0", router, Config::server()).await?;
//!
//! let client = Client::new();
//! let url = format!("http://{}/hello/world", server.local_addr());
//! let response = client.get(&url).await?;
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod router;
pub mod server;
pub mod transport;

#[cfg(feature = "tls-rustls")]
pub mod tls;

pub use client::{Client, ClientSession, Endpoint, Scheme, USER_AGENT};
pub use codec::HttpCodec;
pub use config::{Config, Limits};
pub use error::{Error, HandlerError, HttpError, Result};
pub use http::{Attributes, Headers, Method, Postponed, Request, Response, Status, Version};
pub use router::{Route, Router};
pub use server::{SERVER_NAME, Server, ServerSession};
pub use transport::MaybeTlsStream;
