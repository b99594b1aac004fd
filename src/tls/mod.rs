//! TLS support for HTTPS connections (feature `tls-rustls`).
//!
//! Thin wrappers around `tokio-rustls` used by the client session for
//! `https://` endpoints and by the server façade for TLS listeners.

mod rustls_impl;

pub use rustls_impl::{
    TlsAcceptor, TlsConnector, TlsError, client_config_with_native_roots, load_certs_from_file,
    load_private_key_from_file, server_config,
};
