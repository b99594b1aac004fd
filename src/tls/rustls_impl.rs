use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::rustls::{ClientConfig, ServerConfig};

/// TLS setup and handshake errors.
#[derive(Error, Debug)]
pub enum TlsError {
    /// I/O failure during handshake or file access.
    #[error("TLS I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid TLS configuration.
    #[error("TLS configuration error: {0}")]
    Configuration(String),

    /// A certificate file contained no certificates.
    #[error("no certificates found in file")]
    NoCertificatesFound,

    /// A key file contained no usable private key.
    #[error("no private key found in file")]
    NoPrivateKeyFound,

    /// The host is not a valid SNI server name.
    #[error("invalid DNS name: {0}")]
    InvalidDnsName(String),
}

/// Client-side TLS connector.
pub struct TlsConnector {
    inner: tokio_rustls::TlsConnector,
}

impl TlsConnector {
    /// Build a connector from a client configuration.
    #[must_use]
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self {
            inner: tokio_rustls::TlsConnector::from(config),
        }
    }

    /// Perform the client handshake over `stream` for `domain` (SNI).
    ///
    /// # Errors
    ///
    /// [`TlsError::InvalidDnsName`] for an unusable host name,
    /// [`TlsError::Io`] for handshake failures.
    pub async fn connect<S>(
        &self,
        domain: &str,
        stream: S,
    ) -> Result<tokio_rustls::client::TlsStream<S>, TlsError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let server_name = ServerName::try_from(domain.to_owned())
            .map_err(|_| TlsError::InvalidDnsName(domain.to_owned()))?;

        Ok(self.inner.connect(server_name, stream).await?)
    }
}

/// Server-side TLS acceptor.
#[derive(Clone)]
pub struct TlsAcceptor {
    inner: tokio_rustls::TlsAcceptor,
}

impl TlsAcceptor {
    /// Build an acceptor from a server configuration.
    #[must_use]
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            inner: tokio_rustls::TlsAcceptor::from(config),
        }
    }

    /// Perform the server handshake over an accepted stream.
    ///
    /// # Errors
    ///
    /// [`TlsError::Io`] for handshake failures.
    pub async fn accept<S>(&self, stream: S) -> Result<tokio_rustls::server::TlsStream<S>, TlsError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Ok(self.inner.accept(stream).await?)
    }
}

/// Client configuration trusting the bundled webpki roots.
pub fn client_config_with_native_roots() -> Result<Arc<ClientConfig>, TlsError> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

/// Server configuration from a certificate chain and private key.
///
/// # Errors
///
/// [`TlsError::Configuration`] when the chain/key pair is rejected.
pub fn server_config(
    cert_chain: Vec<CertificateDer<'static>>,
    private_key: PrivateKeyDer<'static>,
) -> Result<Arc<ServerConfig>, TlsError> {
    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| TlsError::Configuration(e.to_string()))?;

    Ok(Arc::new(config))
}

/// Load all PEM certificates from a file.
///
/// # Errors
///
/// [`TlsError::NoCertificatesFound`] when the file parses but holds none.
pub fn load_certs_from_file(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificatesFound);
    }

    Ok(certs)
}

/// Load the first PEM private key from a file.
///
/// # Errors
///
/// [`TlsError::NoPrivateKeyFound`] when the file holds no usable key.
pub fn load_private_key_from_file(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    for item in rustls_pemfile::read_all(&mut reader) {
        match item? {
            rustls_pemfile::Item::Pkcs1Key(key) => return Ok(PrivateKeyDer::Pkcs1(key)),
            rustls_pemfile::Item::Pkcs8Key(key) => return Ok(PrivateKeyDer::Pkcs8(key)),
            rustls_pemfile::Item::Sec1Key(key) => return Ok(PrivateKeyDer::Sec1(key)),
            _ => continue,
        }
    }

    Err(TlsError::NoPrivateKeyFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_error_display() {
        let err = TlsError::InvalidDnsName("bad name".to_owned());
        assert!(err.to_string().contains("invalid DNS name"));

        let err = TlsError::Configuration("bad config".to_owned());
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_load_certs_file_not_found() {
        let result = load_certs_from_file(Path::new("/nonexistent/path/cert.pem"));
        assert!(matches!(result, Err(TlsError::Io(_))));
    }

    #[test]
    fn test_load_private_key_file_not_found() {
        let result = load_private_key_from_file(Path::new("/nonexistent/path/key.pem"));
        assert!(matches!(result, Err(TlsError::Io(_))));
    }
}
