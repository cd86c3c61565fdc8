//! Cancellation token for aborting parallel production.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Signals cancellation across the parallel producer's suspension points.
///
/// Clone the token freely; all clones observe the same signal. Pass it to a
/// produce call via
/// [`ProduceOptions::with_cancellation`](crate::ProduceOptions::with_cancellation);
/// the producer aborts outstanding factory tasks and fails with
/// [`DiError::Cancelled`](crate::DiError::Cancelled) at its next suspension
/// point.
///
/// # Examples
///
/// ```
/// use kiln_di::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
/// assert!(!observer.is_cancelled());
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// A fresh, uncancelled token.
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Signals cancellation and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation is signalled.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            // A cancel between the check above and this await would be
            // missed without re-checking after registering the waiter.
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
