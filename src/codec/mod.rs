//! HTTP/1.1 wire codec.
//!
//! Incremental, buffered parsing and serialization of HTTP messages over any
//! async byte stream. Bodies are framed by `Content-Length`; chunked transfer
//! encoding is rejected. The session state machines treat this module as
//! their wire collaborator and only depend on whole-message reads and writes.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{Headers, Method, Request, Response, Status, Version};

/// Buffered HTTP codec over an async stream.
pub struct HttpCodec<T> {
    io: T,
    read_buf: BytesMut,
    config: Config,
}

impl<T> HttpCodec<T> {
    /// Wrap a stream with the given configuration.
    #[must_use]
    pub fn new(io: T, config: Config) -> Self {
        let read_buf = BytesMut::with_capacity(config.read_buffer_size);
        Self {
            io,
            read_buf,
            config,
        }
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.io
    }

    /// Consume the codec and return the underlying stream.
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> HttpCodec<T> {
    /// Read one complete request.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly between
    /// requests (no buffered bytes).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMessage`] for malformed or truncated messages,
    /// [`Error::HeaderTooLarge`]/[`Error::BodyTooLarge`] when limits are
    /// exceeded, [`Error::Read`] for transport failures.
    pub async fn read_request(&mut self) -> Result<Option<Request>> {
        let head = match self.read_head().await? {
            Some(head) => head,
            None => return Ok(None),
        };
        let (request_line, headers) = parse_head(&head)?;

        let mut parts = request_line.split(' ');
        let method: Method = parts
            .next()
            .unwrap_or_default()
            .parse()?;
        let target = parts
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidMessage("missing request target".into()))?
            .to_owned();
        let version = Version::parse(parts.next().unwrap_or_default())
            .ok_or_else(|| Error::InvalidMessage("bad HTTP version".into()))?;

        let body = self.read_body(&headers).await?;

        let mut request = Request::new(method, target);
        request.version = version;
        request.set_keep_alive(keep_alive_for(version, &headers));
        request.headers = headers;
        request.body = body;
        Ok(Some(request))
    }

    /// Read one complete response.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] when the peer closed before sending any
    /// byte of the response; otherwise as [`read_request`](Self::read_request).
    pub async fn read_response(&mut self) -> Result<Response> {
        let head = self.read_head().await?.ok_or(Error::ConnectionClosed)?;
        let (status_line, headers) = parse_head(&head)?;

        let mut parts = status_line.splitn(3, ' ');
        let version = Version::parse(parts.next().unwrap_or_default())
            .ok_or_else(|| Error::InvalidMessage("bad HTTP version".into()))?;
        let code: u16 = parts
            .next()
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| Error::InvalidMessage("bad status code".into()))?;

        let body = self.read_body(&headers).await?;

        let mut response = Response::new(Status(code));
        response.version = version;
        response.set_keep_alive(keep_alive_for(version, &headers));
        response.headers = headers;
        response.body = body;
        Ok(response)
    }

    /// Serialize and write one request.
    ///
    /// # Errors
    ///
    /// [`Error::Write`] for transport failures.
    pub async fn write_request(&mut self, request: &Request) -> Result<()> {
        let mut out = Vec::with_capacity(self.config.write_buffer_size);
        out.extend_from_slice(request.method.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(request.target.as_bytes());
        out.push(b' ');
        out.extend_from_slice(request.version.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");

        let needs_length = !request.body.is_empty()
            || matches!(request.method, Method::Post | Method::Put | Method::Patch);
        write_headers(&mut out, &request.headers, needs_length, request.body.len());
        out.extend_from_slice(&request.body);

        self.write_all(&out).await
    }

    /// Serialize and write one response.
    ///
    /// `Content-Length` is always emitted; `Connection: close` is emitted
    /// when the response does not keep the connection alive.
    ///
    /// # Errors
    ///
    /// [`Error::Write`] for transport failures.
    pub async fn write_response(&mut self, response: &Response) -> Result<()> {
        let mut out = Vec::with_capacity(self.config.write_buffer_size);
        out.extend_from_slice(response.version.to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(response.status.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");

        let mut headers = response.headers.clone();
        if !response.keep_alive() {
            headers.set("Connection", "close");
        } else if response.version == Version::Http10 {
            headers.set("Connection", "keep-alive");
        }
        write_headers(&mut out, &headers, true, response.body.len());
        out.extend_from_slice(&response.body);

        self.write_all(&out).await
    }

    /// Gracefully shut down the write side of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io
            .shutdown()
            .await
            .map_err(|e| Error::Write(e.to_string()))
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.io
            .write_all(bytes)
            .await
            .map_err(|e| Error::Write(e.to_string()))?;
        self.io
            .flush()
            .await
            .map_err(|e| Error::Write(e.to_string()))
    }

    /// Buffer up to and including the `\r\n\r\n` terminator and return the
    /// header block (terminator stripped).
    ///
    /// `Ok(None)` on clean EOF before any byte.
    async fn read_head(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(end) = find_terminator(&self.read_buf) {
                self.config.limits.check_header_size(end)?;
                let head = self.read_buf[..end].to_vec();
                self.read_buf.advance(end + 4);
                return Ok(Some(head));
            }

            self.config.limits.check_header_size(self.read_buf.len())?;

            self.read_buf.reserve(self.config.read_buffer_size);
            let n = self
                .io
                .read_buf(&mut self.read_buf)
                .await
                .map_err(|e| Error::Read(e.to_string()))?;
            if n == 0 {
                if self.read_buf.is_empty() {
                    return Ok(None);
                }
                return Err(Error::InvalidMessage("truncated header block".into()));
            }
        }
    }

    /// Read the `Content-Length`-framed body, if any.
    async fn read_body(&mut self, headers: &Headers) -> Result<Vec<u8>> {
        if headers.contains("transfer-encoding") {
            return Err(Error::InvalidMessage(
                "chunked transfer encoding not supported".into(),
            ));
        }

        let length = match headers.get("content-length") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::InvalidMessage("bad Content-Length".into()))?,
            None => return Ok(Vec::new()),
        };
        self.config.limits.check_body_size(length)?;

        while self.read_buf.len() < length {
            self.read_buf.reserve(self.config.read_buffer_size);
            let n = self
                .io
                .read_buf(&mut self.read_buf)
                .await
                .map_err(|e| Error::Read(e.to_string()))?;
            if n == 0 {
                return Err(Error::InvalidMessage("truncated body".into()));
            }
        }

        let body = self.read_buf[..length].to_vec();
        self.read_buf.advance(length);
        Ok(body)
    }
}

/// Position of the `\r\n\r\n` header terminator.
fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Split a header block into its start line and parsed headers.
fn parse_head(head: &[u8]) -> Result<(&str, Headers)> {
    let text = std::str::from_utf8(head)
        .map_err(|_| Error::InvalidMessage("header block is not valid UTF-8".into()))?;

    let mut lines = text.split("\r\n");
    let start_line = lines
        .next()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| Error::InvalidMessage("empty start line".into()))?;

    let mut headers = Headers::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidMessage(format!("malformed header line: {line}")))?;
        headers.append(name.trim(), value.trim());
    }

    Ok((start_line, headers))
}

/// Keep-alive decision from version defaults and the `Connection` header.
fn keep_alive_for(version: Version, headers: &Headers) -> bool {
    if headers.connection_contains("close") {
        false
    } else if version == Version::Http10 {
        headers.connection_contains("keep-alive")
    } else {
        version.default_keep_alive()
    }
}

fn write_headers(out: &mut Vec<u8>, headers: &Headers, force_length: bool, body_len: usize) {
    let mut has_length = false;
    for (name, value) in headers.iter() {
        if name.eq_ignore_ascii_case("content-length") {
            has_length = true;
        }
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    if !has_length && (force_length || body_len > 0) {
        out.extend_from_slice(format!("Content-Length: {body_len}\r\n").as_bytes());
    }
    out.extend_from_slice(b"\r\n");
}
