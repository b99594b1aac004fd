//! Raw TCP test servers for exercising the client.
//!
//! These speak just enough HTTP/1.1 by hand to control connection behavior
//! precisely: keep-alive reuse, close-after-first-exchange, and delayed
//! responses.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// How a [`RawServer`] treats each accepted connection.
#[derive(Clone, Copy)]
pub enum Behavior {
    /// Serve requests on the connection until the peer closes it.
    KeepAlive,
    /// Serve exactly one request, then drop the socket without warning.
    /// The response does not carry `Connection: close`.
    CloseAfterFirst,
    /// Keep-alive, but sleep before writing each response.
    DelayResponse(Duration),
}

/// A scripted HTTP server on a random port.
///
/// Every response is `200 OK` with the request path as its body, so tests
/// can match responses back to the requests that caused them.
pub struct RawServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
}

impl RawServer {
    pub async fn spawn(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));

        let counter = connections.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, behavior));
            }
        });

        Self { addr, connections }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn serve(mut stream: TcpStream, behavior: Behavior) {
    loop {
        let Some(path) = read_request_path(&mut stream).await else {
            return;
        };
        if let Behavior::DelayResponse(delay) = behavior {
            tokio::time::sleep(delay).await;
        }
        let reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            path.len(),
            path
        );
        if stream.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
        if matches!(behavior, Behavior::CloseAfterFirst) {
            // Dropping the stream closes the socket mid-keep-alive.
            return;
        }
    }
}

/// Read one request head and return its target. `None` on EOF.
///
/// Bodies are not handled; use GET requests against [`RawServer`].
async fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).into_owned();
            return head.split_whitespace().nth(1).map(str::to_owned);
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}
