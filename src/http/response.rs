//! HTTP response message and deferred completion.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::http::{Headers, Status, Version};

/// An HTTP response.
///
/// The server session creates a default 200 response per dispatched request
/// and hands it to the handler for mutation. A handler that cannot finish
/// synchronously calls [`postpone`](Response::postpone) and completes the
/// exchange later through the returned [`Postponed`] handle.
#[derive(Debug, Default)]
pub struct Response {
    /// Status code.
    pub status: Status,
    /// Protocol version.
    pub version: Version,
    /// Header map.
    pub headers: Headers,
    /// Message body.
    pub body: Vec<u8>,
    keep_alive: bool,
    postponed: bool,
    deferred: Option<Deferred>,
}

/// Session-side plumbing of a postponed response.
#[derive(Debug)]
pub(crate) struct Deferred {
    slot: Arc<Mutex<Response>>,
    rx: oneshot::Receiver<()>,
}

impl Deferred {
    /// Wait for the completer, then reclaim the finished response.
    ///
    /// Resolves when [`Postponed::done`] is called or the handle is dropped;
    /// either way the slot holds the final response.
    pub(crate) async fn wait(self) -> Response {
        // The sender is never dropped without sending; an Err here still
        // means every Postponed handle is gone, so the slot is final.
        let _ = self.rx.await;
        std::mem::take(&mut *lock_ignore_poison(&self.slot))
    }
}

impl Response {
    /// Create a response with the given status and an empty body.
    #[must_use]
    pub fn new(status: Status) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Set the status code.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Set a header, replacing an existing one with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Set the body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Body interpreted as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Whether the connection stays open after this response is written.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive && !self.headers.connection_contains("close")
    }

    /// Record the keep-alive decision inherited from the request.
    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        self.keep_alive = keep_alive;
    }

    /// Whether completion was deferred past handler return.
    #[must_use]
    pub fn is_postponed(&self) -> bool {
        self.postponed
    }

    /// Defer completion of this response.
    ///
    /// The response built so far moves into a shared slot owned by the
    /// returned [`Postponed`] handle. The server session suspends after the
    /// handler returns and resumes writing once the handle's
    /// [`done`](Postponed::done) is called (or the handle is dropped). The
    /// handle keeps the exchange alive for as long as an external completer
    /// holds it.
    pub fn postpone(&mut self) -> Postponed {
        let (tx, rx) = oneshot::channel();
        let parked = std::mem::take(self);
        let keep_alive = parked.keep_alive;
        let slot = Arc::new(Mutex::new(parked));
        self.keep_alive = keep_alive;
        self.postponed = true;
        self.deferred = Some(Deferred {
            slot: slot.clone(),
            rx,
        });
        Postponed { slot, tx: Some(tx) }
    }

    /// Detach the deferred plumbing, leaving the response writable.
    pub(crate) fn take_deferred(&mut self) -> Option<Deferred> {
        self.deferred.take()
    }
}

/// Completion handle of a postponed response.
///
/// Mutate the parked response through [`set_status`](Postponed::set_status),
/// [`set_header`](Postponed::set_header), [`set_body`](Postponed::set_body)
/// or [`with`](Postponed::with), then call [`done`](Postponed::done).
/// Dropping the handle without calling `done` completes the response as-is,
/// so a suspended connection can never be stranded.
#[derive(Debug)]
pub struct Postponed {
    slot: Arc<Mutex<Response>>,
    tx: Option<oneshot::Sender<()>>,
}

impl Postponed {
    /// Set the status of the parked response.
    pub fn set_status(&self, status: Status) {
        lock_ignore_poison(&self.slot).status = status;
    }

    /// Set a header on the parked response.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        lock_ignore_poison(&self.slot).headers.set(name, value);
    }

    /// Set the body of the parked response.
    pub fn set_body(&self, body: impl Into<Vec<u8>>) {
        lock_ignore_poison(&self.slot).body = body.into();
    }

    /// Run `f` against the parked response.
    pub fn with<R>(&self, f: impl FnOnce(&mut Response) -> R) -> R {
        f(&mut lock_ignore_poison(&self.slot))
    }

    /// Finish the response and resume the suspended session.
    pub fn done(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Postponed {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

fn lock_ignore_poison<'a>(slot: &'a Arc<Mutex<Response>>) -> MutexGuard<'a, Response> {
    slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_200_keep_alive_off_wire() {
        let res = Response::default();
        assert_eq!(res.status, Status::OK);
        assert!(!res.is_postponed());
        assert!(res.body.is_empty());
    }

    #[test]
    fn test_connection_close_header_overrides_keep_alive() {
        let mut res = Response::default();
        res.set_keep_alive(true);
        assert!(res.keep_alive());
        res.set_header("Connection", "close");
        assert!(!res.keep_alive());
    }

    #[tokio::test]
    async fn test_postpone_round_trip() {
        let mut res = Response::default();
        res.set_keep_alive(true);
        res.set_header("X-Early", "1");

        let handle = res.postpone();
        assert!(res.is_postponed());
        assert!(res.keep_alive());

        let deferred = res.take_deferred().unwrap();

        handle.set_status(Status::ACCEPTED);
        handle.set_body("later");
        handle.done();

        let finished = deferred.wait().await;
        assert_eq!(finished.status, Status::ACCEPTED);
        assert_eq!(finished.body, b"later");
        assert_eq!(finished.headers.get("x-early"), Some("1"));
    }

    #[tokio::test]
    async fn test_postpone_completes_on_drop() {
        let mut res = Response::default();
        res.set_body("as-is");
        let handle = res.postpone();
        let deferred = res.take_deferred().unwrap();

        drop(handle);

        let finished = deferred.wait().await;
        assert_eq!(finished.body, b"as-is");
    }
}
