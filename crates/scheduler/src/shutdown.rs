//! ShutdownSignal - process-wide one-shot stop broadcast

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// One-shot, idempotent stop signal observed by every loop.
///
/// Cloning is cheap; all clones share the same state. `trigger` is a plain
/// synchronous call and may be made from a signal-handling task.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    token: CancellationToken,
    triggered: AtomicBool,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal every waiter.
    ///
    /// Returns `true` for the call that actually flipped the signal and
    /// `false` for every later call. All pending waits are woken before
    /// this returns.
    pub fn trigger(&self) -> bool {
        let first = !self.inner.triggered.swap(true, Ordering::AcqRel);
        self.inner.token.cancel();
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Resolve once the signal has been triggered
    pub async fn wait(&self) {
        self.inner.token.cancelled().await;
    }

    /// Token view for APIs that take a `CancellationToken`
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }
}
