//! A cloneable handle for cancelling the in-flight query from external code.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle onto a running session.
///
/// All fields are `Arc`-wrapped, so cloning is cheap. The token is replaced
/// at the start of each query, which makes [`SessionHandle::cancel`] a no-op
/// once the query it targeted has already finished.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) idle_notify: Arc<tokio::sync::Notify>,
    pub(crate) is_running: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            idle_notify: Arc::new(tokio::sync::Notify::new()),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the in-flight query, if any.
    ///
    /// The session appends a single cancellation notice to history and stops
    /// reading the transport. Calling this when nothing is running (or a
    /// second time after completion) does nothing.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    /// Wait until the session finishes the current query.
    pub async fn wait_for_idle(&self) {
        let notified = self.idle_notify.notified();
        if !self.is_running.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }

    /// Wait until idle, with a timeout. Returns `true` if idle was reached.
    pub async fn wait_for_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        if !self.is_running.load(Ordering::Acquire) {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_for_idle())
            .await
            .is_ok()
    }

    /// Whether a query is currently in flight.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }
}
