//! Client session: one reusable connection, FIFO request pipeline.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::codec::HttpCodec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::transport::MaybeTlsStream;

/// Completion callback of a submitted request. Fires exactly once.
pub type Continuation = Box<dyn FnOnce(Result<Response>) + Send + 'static>;

/// URL scheme the client can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    /// Default port for the scheme.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// The remote endpoint a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Scheme deciding the transport (plain or TLS).
    pub scheme: Scheme,
    /// Host name or address, also used for SNI.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// A queued request waiting for its exchange to complete or time out.
///
/// The continuation lives in a take-once slot: success, transport error and
/// timeout all race through [`deliver`](PendingRequest::deliver), so whichever
/// comes first wins and every later outcome is silently discarded.
struct PendingRequest {
    request: Request,
    continuation: Mutex<Option<Continuation>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl PendingRequest {
    fn new(request: Request, continuation: Continuation) -> Arc<Self> {
        Arc::new(Self {
            request,
            continuation: Mutex::new(Some(continuation)),
            timer: Mutex::new(None),
        })
    }

    /// Fire the continuation if it has not fired yet; cancel the deadline
    /// timer either way. Returns whether this call delivered.
    fn deliver(&self, result: Result<Response>) -> bool {
        let continuation = lock_ignore_poison(&self.continuation).take();
        if let Some(timer) = lock_ignore_poison(&self.timer).take() {
            timer.abort();
        }
        match continuation {
            Some(continuation) => {
                continuation(result);
                true
            }
            None => false,
        }
    }
}

impl Drop for PendingRequest {
    /// Session teardown counts as a delivery: a request still holding its
    /// continuation when the queue is destroyed reports the connection as
    /// closed instead of vanishing.
    fn drop(&mut self) {
        self.deliver(Err(Error::ConnectionClosed));
    }
}

/// A session owning (at most) one connection to a single remote endpoint.
///
/// Arbitrarily-concurrent submissions are serialized into a mutex-guarded
/// FIFO queue — the only state shared between caller threads and the pump
/// task. The pump is the connection's serialized lane: it connects on
/// demand, writes the queue head, reads exactly one response, delivers it,
/// then moves on; the connection stays open between requests and is rebuilt
/// transparently when the peer closes it while idle.
#[derive(Clone)]
pub struct ClientSession {
    inner: Arc<SessionInner>,
    // Aborts the pump once every handle is gone.
    _pump: Arc<PumpGuard>,
}

struct SessionInner {
    endpoint: Endpoint,
    config: Config,
    queue: Mutex<VecDeque<Arc<PendingRequest>>>,
    notify: Notify,
}

struct PumpGuard(JoinHandle<()>);

impl Drop for PumpGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl ClientSession {
    /// Create a session for `endpoint` and start its pump task.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(endpoint: Endpoint, config: Config) -> Self {
        let inner = Arc::new(SessionInner {
            endpoint,
            config,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        });
        let pump = tokio::spawn(pump(inner.clone()));
        Self {
            inner,
            _pump: Arc::new(PumpGuard(pump)),
        }
    }

    /// The endpoint this session is bound to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Queue a request for the pump.
    ///
    /// A nonzero `timeout` arms a deadline timer immediately — the clock
    /// starts at submission, not at write. The continuation fires exactly
    /// once with the response, a transport error, or [`Error::Timeout`];
    /// a response arriving after the timeout is discarded.
    pub fn submit(&self, request: Request, timeout: Option<Duration>, continuation: Continuation) {
        let pending = PendingRequest::new(request, continuation);

        if let Some(deadline) = timeout.filter(|d| !d.is_zero()) {
            let weak = Arc::downgrade(&pending);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                if let Some(pending) = weak.upgrade() {
                    if pending.deliver(Err(Error::Timeout)) {
                        debug!("request deadline elapsed before its response");
                    }
                }
            });
            *lock_ignore_poison(&pending.timer) = Some(handle);
        }

        lock_ignore_poison(&self.inner.queue).push_back(pending);
        self.inner.notify.notify_one();
    }
}

impl SessionInner {
    fn head(&self) -> Option<Arc<PendingRequest>> {
        lock_ignore_poison(&self.queue).front().cloned()
    }

    fn pop_head(&self) {
        lock_ignore_poison(&self.queue).pop_front();
    }

    /// Resolve, connect and (for https) handshake a fresh connection.
    async fn connect(&self) -> Result<HttpCodec<MaybeTlsStream>> {
        let addrs: Vec<_> =
            tokio::net::lookup_host((self.endpoint.host.as_str(), self.endpoint.port))
                .await
                .map_err(|e| Error::Resolve(e.to_string()))?
                .collect();
        if addrs.is_empty() {
            return Err(Error::Resolve(format!(
                "no addresses for {}",
                self.endpoint.host
            )));
        }

        let mut last_error = None;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }
        let stream = match stream {
            Some(s) => s,
            None => {
                let cause = last_error.map_or_else(String::new, |e| e.to_string());
                return Err(Error::Connect(cause));
            }
        };

        let transport = match self.endpoint.scheme {
            Scheme::Http => MaybeTlsStream::Plain(stream),
            #[cfg(feature = "tls-rustls")]
            Scheme::Https => {
                let tls_config = crate::tls::client_config_with_native_roots()
                    .map_err(|e| Error::Handshake(e.to_string()))?;
                let connector = crate::tls::TlsConnector::new(tls_config);
                let tls_stream = connector
                    .connect(&self.endpoint.host, stream)
                    .await
                    .map_err(|e| Error::Handshake(e.to_string()))?;
                MaybeTlsStream::Tls(Box::new(tls_stream))
            }
            #[cfg(not(feature = "tls-rustls"))]
            Scheme::Https => {
                return Err(Error::UnsupportedScheme("https".into()));
            }
        };

        Ok(HttpCodec::new(transport, self.config.clone()))
    }
}

/// Write one request and read its response.
async fn exchange(
    codec: &mut HttpCodec<MaybeTlsStream>,
    request: &Request,
) -> Result<Response> {
    codec.write_request(request).await?;
    codec.read_response().await
}

/// The session's serialized lane.
///
/// Only ever touches the queue through its mutex; everything else it owns
/// exclusively.
async fn pump(inner: Arc<SessionInner>) {
    let mut conn: Option<HttpCodec<MaybeTlsStream>> = None;
    // Completed exchanges on the current connection; nonzero marks it as a
    // reused keep-alive connection for idle-close classification.
    let mut exchanges = 0u64;

    loop {
        let head = loop {
            match inner.head() {
                Some(head) => break head,
                None => inner.notify.notified().await,
            }
        };

        if conn.is_none() {
            match inner.connect().await {
                Ok(codec) => {
                    exchanges = 0;
                    conn = Some(codec);
                }
                Err(e) => {
                    debug!(error = %e, "client connection failed");
                    inner.pop_head();
                    head.deliver(Err(e));
                    continue;
                }
            }
        }
        let Some(codec) = conn.as_mut() else {
            continue;
        };

        match exchange(codec, &head.request).await {
            Ok(response) => {
                exchanges += 1;
                inner.pop_head();
                // No-op when the deadline timer already delivered.
                head.deliver(Ok(response));
            }
            Err(Error::ConnectionClosed) if exchanges > 0 => {
                // The peer closed the idle keep-alive connection between
                // exchanges. The head stays queued; reconnect and retry it.
                debug!("idle keep-alive connection closed by peer, reconnecting");
                conn = None;
            }
            Err(Error::Write(e)) if exchanges > 0 => {
                // Writing into a stale keep-alive connection; same recovery.
                debug!(error = %e, "write on stale connection, reconnecting");
                conn = None;
            }
            Err(Error::ConnectionClosed) => {
                inner.pop_head();
                head.deliver(Err(Error::Read("connection closed before response".into())));
                conn = None;
            }
            Err(e) => {
                inner.pop_head();
                head.deliver(Err(e));
                conn = None;
            }
        }
    }
}

fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
