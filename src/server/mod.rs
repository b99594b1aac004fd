//! Server façade: listener, accept loop, session spawning.

mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use session::{SERVER_NAME, ServerSession};

use crate::config::Config;
use crate::router::Router;

/// An in-process HTTP server.
///
/// Owns the listening socket and the accept-loop task. Each accepted
/// connection gets its own [`ServerSession`] task, which is the serialized
/// execution lane for that connection; the router is shared read-only.
pub struct Server {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Server {
    /// Bind a plaintext listener and start accepting.
    ///
    /// # Errors
    ///
    /// Propagates the bind failure.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        router: Router,
        config: Config,
    ) -> std::io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let router = Arc::new(router);
        let (shutdown, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            info!(%local_addr, "server listening");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        let (stream, peer) = match accepted {
                            Ok(pair) => pair,
                            Err(e) => {
                                debug!(error = %e, "accept failed");
                                continue;
                            }
                        };
                        debug!(%peer, "connection accepted");
                        let session =
                            ServerSession::new(stream, router.clone(), config.clone());
                        tokio::spawn(session.run());
                    }
                }
            }
        });

        Ok(Server {
            local_addr,
            shutdown,
            handle,
        })
    }

    /// Bind a TLS listener and start accepting.
    ///
    /// Connections that fail the TLS handshake are dropped silently, like
    /// any other transport failure on the server side.
    ///
    /// # Errors
    ///
    /// Propagates the bind failure.
    #[cfg(feature = "tls-rustls")]
    pub async fn bind_tls(
        addr: impl ToSocketAddrs,
        router: Router,
        config: Config,
        tls_config: Arc<tokio_rustls::rustls::ServerConfig>,
    ) -> std::io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let router = Arc::new(router);
        let acceptor = crate::tls::TlsAcceptor::new(tls_config);
        let (shutdown, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            info!(%local_addr, "TLS server listening");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        let (stream, peer) = match accepted {
                            Ok(pair) => pair,
                            Err(e) => {
                                debug!(error = %e, "accept failed");
                                continue;
                            }
                        };
                        let acceptor = acceptor.clone();
                        let router = router.clone();
                        let config = config.clone();
                        tokio::spawn(async move {
                            match acceptor.accept(stream).await {
                                Ok(tls_stream) => {
                                    ServerSession::new(tls_stream, router, config).run().await;
                                }
                                Err(e) => {
                                    debug!(%peer, error = %e, "TLS handshake failed");
                                }
                            }
                        });
                    }
                }
            }
        });

        Ok(Server {
            local_addr,
            shutdown,
            handle,
        })
    }

    /// The bound address (useful with port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and wait for the accept loop to finish.
    ///
    /// Sessions already spawned run to completion on their own.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}
