//! Per-connection server state machine.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::codec::HttpCodec;
use crate::config::Config;
use crate::error::HttpError;
use crate::http::{Request, Response, Status};
use crate::router::{DispatchError, Router};

/// `Server` header value stamped on generated responses.
pub const SERVER_NAME: &str = concat!("rshttp/", env!("CARGO_PKG_VERSION"));

/// Owns one accepted connection and drives it to completion.
///
/// The session reads one request at a time, dispatches it through the
/// router, runs the handler, writes the response, then loops for the next
/// keep-alive request. A postponed response suspends the loop until the
/// external completer finishes it. There is no server-side pipelining: a
/// full request/response cycle completes before the next read starts.
pub struct ServerSession<T> {
    codec: HttpCodec<T>,
    router: Arc<Router>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> ServerSession<T> {
    /// Take ownership of an accepted stream.
    #[must_use]
    pub fn new(io: T, router: Arc<Router>, config: Config) -> Self {
        Self {
            codec: HttpCodec::new(io, config),
            router,
        }
    }

    /// Drive the connection until it closes.
    ///
    /// Transport errors end the session silently (there is no caller to
    /// notify); handler errors are recovered into responses and never end
    /// the connection.
    pub async fn run(mut self) {
        loop {
            let request = match self.codec.read_request().await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    // Peer closed between requests.
                    return self.close().await;
                }
                Err(e) => {
                    debug!(error = %e, "server session read failed");
                    return;
                }
            };

            let response = self.handle(request).await;
            let close = !response.keep_alive();

            if let Err(e) = self.codec.write_response(&response).await {
                debug!(error = %e, "server session write failed");
                return;
            }

            if close {
                return self.close().await;
            }
        }
    }

    /// Dispatch one request and produce its response, waiting out a
    /// postponed completion if the handler deferred.
    async fn handle(&mut self, mut request: Request) -> Response {
        let route = match self.router.dispatch(&mut request) {
            Ok(route) => route,
            Err(DispatchError::UnsupportedMethod) => {
                return error_response(&request, Status::BAD_REQUEST, "Not supported HTTP-method");
            }
            Err(DispatchError::NotFound) => {
                let body = format!("The resource '{}' was not found.", request.target);
                return error_response(&request, Status::NOT_FOUND, &body);
            }
        };

        let mut response = Response::new(Status::OK);
        response.version = request.version;
        response.set_keep_alive(request.keep_alive());
        response.set_header("Server", SERVER_NAME);

        match route.execute(&request, &mut response) {
            Ok(()) => {}
            Err(e) => match e.downcast::<HttpError>() {
                Ok(http) => {
                    return error_response(&request, http.status, &http.message);
                }
                Err(other) => {
                    let body = format!("An error occurred: '{other}'");
                    return error_response(&request, Status::INTERNAL_SERVER_ERROR, &body);
                }
            },
        }

        if response.is_postponed() {
            if let Some(deferred) = response.take_deferred() {
                // Suspend until the completer calls done() or drops the
                // handle. External latency here is unbounded.
                response = deferred.wait().await;
            }
        }

        response
    }

    /// Graceful half-close; the full close happens on drop.
    async fn close(&mut self) {
        let _ = self.codec.shutdown().await;
    }
}

/// Synthesize an error response inheriting the request's version and
/// keep-alive decision.
fn error_response(request: &Request, status: Status, body: &str) -> Response {
    let mut response = Response::new(status);
    response.version = request.version;
    response.set_keep_alive(request.keep_alive());
    response.set_header("Server", SERVER_NAME);
    response.set_header("Content-Type", "text/plain");
    response.set_body(body);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    fn spawn_session(router: Router) -> DuplexStream {
        let (client, server) = duplex(64 * 1024);
        let session = ServerSession::new(server, Arc::new(router), Config::server());
        tokio::spawn(session.run());
        client
    }

    async fn send_and_read(client: &mut DuplexStream, raw: &[u8]) -> String {
        client.write_all(raw).await.unwrap();
        let mut buf = vec![0u8; 64 * 1024];
        let n = client.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    fn echo_router() -> Router {
        let mut router = Router::new();
        router.add(Method::Get, "/hello/:name", |req, res| {
            res.set_body(format!("hello {}", req.attr("name")));
            Ok(())
        });
        router
    }

    #[tokio::test]
    async fn test_dispatch_and_capture() {
        let mut client = spawn_session(echo_router());
        let reply = send_and_read(&mut client, b"GET /hello/world HTTP/1.1\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(reply.ends_with("hello world"));
    }

    #[tokio::test]
    async fn test_keep_alive_two_requests_one_connection() {
        let mut client = spawn_session(echo_router());
        let first = send_and_read(&mut client, b"GET /hello/one HTTP/1.1\r\n\r\n").await;
        assert!(first.ends_with("hello one"));
        let second = send_and_read(&mut client, b"GET /hello/two HTTP/1.1\r\n\r\n").await;
        assert!(second.ends_with("hello two"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let mut client = spawn_session(echo_router());
        let reply = send_and_read(&mut client, b"GET /nope HTTP/1.1\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(reply.contains("The resource '/nope' was not found."));
    }

    #[tokio::test]
    async fn test_unsupported_method_is_400() {
        let mut client = spawn_session(echo_router());
        let reply = send_and_read(&mut client, b"DELETE /hello/x HTTP/1.1\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(reply.contains("Not supported HTTP-method"));
    }

    #[tokio::test]
    async fn test_typed_handler_error_maps_to_exact_status() {
        let mut router = Router::new();
        router.add(Method::Get, "/secret", |_req, _res| {
            Err(HttpError::forbidden("not yours").into())
        });
        let mut client = spawn_session(router);
        let reply = send_and_read(&mut client, b"GET /secret HTTP/1.1\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 403 Forbidden\r\n"));
        assert!(reply.ends_with("not yours"));
    }

    #[tokio::test]
    async fn test_generic_handler_error_maps_to_500() {
        let mut router = Router::new();
        router.add(Method::Get, "/boom", |_req, _res| {
            Err("database exploded".into())
        });
        let mut client = spawn_session(router);
        let reply = send_and_read(&mut client, b"GET /boom HTTP/1.1\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(reply.contains("An error occurred: 'database exploded'"));
    }

    #[tokio::test]
    async fn test_handler_error_keeps_connection_usable() {
        let mut router = echo_router();
        router.add(Method::Get, "/boom", |_req, _res| Err("bad".into()));
        let mut client = spawn_session(router);
        let first = send_and_read(&mut client, b"GET /boom HTTP/1.1\r\n\r\n").await;
        assert!(first.starts_with("HTTP/1.1 500"));
        let second = send_and_read(&mut client, b"GET /hello/again HTTP/1.1\r\n\r\n").await;
        assert!(second.ends_with("hello again"));
    }

    #[tokio::test]
    async fn test_connection_close_is_honored() {
        let mut client = spawn_session(echo_router());
        let reply =
            send_and_read(&mut client, b"GET /hello/x HTTP/1.1\r\nConnection: close\r\n\r\n").await;
        assert!(reply.contains("Connection: close\r\n"));
        // Server half-closes after the response; the next read sees EOF.
        let mut buf = [0u8; 16];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_postponed_response_round_trip() {
        let mut router = Router::new();
        router.add(Method::Get, "/later", |_req, res| {
            let postponed = res.postpone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                postponed.set_body("finally");
                postponed.done();
            });
            Ok(())
        });
        let mut client = spawn_session(router);

        let reply = send_and_read(&mut client, b"GET /later HTTP/1.1\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(reply.ends_with("finally"));
    }

    #[tokio::test]
    async fn test_connection_survives_postponed_response() {
        let mut router = Router::new();
        router.add(Method::Get, "/later", |_req, res| {
            let postponed = res.postpone();
            tokio::spawn(async move {
                postponed.set_body("deferred");
                postponed.done();
            });
            Ok(())
        });
        router.add(Method::Get, "/now", |_req, res| {
            res.set_body("immediate");
            Ok(())
        });
        let mut client = spawn_session(router);

        let first = send_and_read(&mut client, b"GET /later HTTP/1.1\r\n\r\n").await;
        assert!(first.ends_with("deferred"));
        let second = send_and_read(&mut client, b"GET /now HTTP/1.1\r\n\r\n").await;
        assert!(second.ends_with("immediate"));
    }
}
