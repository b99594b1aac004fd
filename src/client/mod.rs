//! HTTP(S) client: URL-level façade over [`ClientSession`].

mod session;

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use url::Url;

pub use session::{ClientSession, Continuation, Endpoint, Scheme};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{Method, Request, Response};

/// `User-Agent` header value stamped on outgoing requests.
pub const USER_AGENT: &str = concat!("rshttp/", env!("CARGO_PKG_VERSION"));

/// An HTTP(S) client.
///
/// Holds one [`ClientSession`] for the origin it last talked to; requests
/// to the same scheme/host/port reuse that session (and its keep-alive
/// connection), a request to a different origin replaces it. URLs are
/// validated synchronously before any I/O starts.
///
/// ```no_run
/// # async fn run() -> rshttp::Result<()> {
/// let client = rshttp::Client::new();
/// let response = client.get("http://localhost:8080/status").await?;
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: Config,
    session: Mutex<Option<ClientSession>>,
}

impl Client {
    /// A client with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::client())
    }

    /// A client with an explicit configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    /// `GET` without a deadline.
    ///
    /// # Errors
    ///
    /// See [`request`](Client::request).
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request(Method::Get, url, Vec::<u8>::new(), None).await
    }

    /// `GET` with a deadline measured from submission.
    ///
    /// # Errors
    ///
    /// See [`request`](Client::request).
    pub async fn get_timeout(&self, url: &str, timeout: Duration) -> Result<Response> {
        self.request(Method::Get, url, Vec::<u8>::new(), Some(timeout)).await
    }

    /// `POST` with a body, without a deadline.
    ///
    /// # Errors
    ///
    /// See [`request`](Client::request).
    pub async fn post(&self, url: &str, body: impl Into<Vec<u8>>) -> Result<Response> {
        self.request(Method::Post, url, body, None).await
    }

    /// `POST` with a body and a deadline.
    ///
    /// # Errors
    ///
    /// See [`request`](Client::request).
    pub async fn post_timeout(
        &self,
        url: &str,
        body: impl Into<Vec<u8>>,
        timeout: Duration,
    ) -> Result<Response> {
        self.request(Method::Post, url, body, Some(timeout)).await
    }

    /// `PUT` with a body, without a deadline.
    ///
    /// # Errors
    ///
    /// See [`request`](Client::request).
    pub async fn put(&self, url: &str, body: impl Into<Vec<u8>>) -> Result<Response> {
        self.request(Method::Put, url, body, None).await
    }

    /// `PUT` with a body and a deadline.
    ///
    /// # Errors
    ///
    /// See [`request`](Client::request).
    pub async fn put_timeout(
        &self,
        url: &str,
        body: impl Into<Vec<u8>>,
        timeout: Duration,
    ) -> Result<Response> {
        self.request(Method::Put, url, body, Some(timeout)).await
    }

    /// `DELETE` without a deadline.
    ///
    /// # Errors
    ///
    /// See [`request`](Client::request).
    pub async fn delete(&self, url: &str) -> Result<Response> {
        self.request(Method::Delete, url, Vec::<u8>::new(), None).await
    }

    /// `DELETE` with a deadline.
    ///
    /// # Errors
    ///
    /// See [`request`](Client::request).
    pub async fn delete_timeout(&self, url: &str, timeout: Duration) -> Result<Response> {
        self.request(Method::Delete, url, Vec::<u8>::new(), Some(timeout)).await
    }

    /// Send a request and wait for its outcome.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] or [`Error::UnsupportedScheme`] before any I/O;
    /// [`Error::Resolve`], [`Error::Connect`], [`Error::Handshake`],
    /// [`Error::Write`], [`Error::Read`] from the exchange;
    /// [`Error::Timeout`] when the deadline elapses first.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: impl Into<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let (endpoint, request) = prepare(method, url, body.into())?;
        let session = self.session_for(endpoint);

        let (tx, rx) = oneshot::channel();
        session.submit(
            request,
            timeout,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );

        // The sender side only disappears when the session is torn down.
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::ConnectionClosed),
        }
    }

    /// Callback form of [`request`](Client::request): `continuation` fires
    /// exactly once with the outcome.
    ///
    /// # Errors
    ///
    /// URL validation failures are returned directly and the continuation
    /// never fires.
    pub fn send_request(
        &self,
        method: Method,
        url: &str,
        body: impl Into<Vec<u8>>,
        timeout: Option<Duration>,
        continuation: impl FnOnce(Result<Response>) + Send + 'static,
    ) -> Result<()> {
        let (endpoint, request) = prepare(method, url, body.into())?;
        let session = self.session_for(endpoint);
        session.submit(request, timeout, Box::new(continuation));
        Ok(())
    }

    /// Session for `endpoint`, reusing the current one when the origin
    /// matches.
    fn session_for(&self, endpoint: Endpoint) -> ClientSession {
        let mut guard = self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match guard.as_ref() {
            Some(session) if *session.endpoint() == endpoint => session.clone(),
            _ => {
                let session = ClientSession::new(endpoint, self.config.clone());
                *guard = Some(session.clone());
                session
            }
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a URL and build the endpoint plus the wire request for it.
///
/// Runs before any I/O so malformed input fails synchronously.
fn prepare(method: Method, url: &str, body: Vec<u8>) -> Result<(Endpoint, Request)> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let scheme = match parsed.scheme() {
        "http" => Scheme::Http,
        "https" => {
            if cfg!(not(feature = "tls-rustls")) {
                // Without TLS support compiled in, https is just another
                // scheme we cannot speak.
                return Err(Error::UnsupportedScheme("https".into()));
            }
            Scheme::Https
        }
        other => return Err(Error::UnsupportedScheme(other.to_owned())),
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidUrl(format!("no host in '{url}'")))?
        .to_owned();
    let port = parsed.port().unwrap_or_else(|| scheme.default_port());

    let mut target = parsed.path().to_owned();
    if let Some(query) = parsed.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut request = Request::new(method, target).with_body(body);
    let host_header = if port == scheme.default_port() {
        host.clone()
    } else {
        format!("{host}:{port}")
    };
    request.headers.set("Host", &host_header);
    request.headers.set("User-Agent", USER_AGENT);

    Ok((Endpoint { scheme, host, port }, request))
}
