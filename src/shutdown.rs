//! Single-shot store shutdown.
//!
//! Several paths may decide the process is going down: the SIGINT listener,
//! a fatal serve error, and the drop guard that runs when startup bails out
//! early. [`ShutdownLatch`] lets all of them ask for the store to be closed
//! while guaranteeing `close` runs at most once.

use crate::store::KvStore;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Why the store is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupted,
    ServeFailed,
    StartupFailed,
    Dropped,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShutdownReason::Interrupted => "interrupt signal",
            ShutdownReason::ServeFailed => "serve error",
            ShutdownReason::StartupFailed => "startup error",
            ShutdownReason::Dropped => "server dropped",
        };
        f.write_str(s)
    }
}

/// Closes a shared store exactly once, whichever path gets there first.
///
/// Cloning the latch shares the same flag. When the last clone is dropped
/// without the latch having fired, the store is closed then.
pub struct ShutdownLatch<S: KvStore> {
    inner: Arc<Inner<S>>,
}

struct Inner<S: KvStore> {
    store: Arc<S>,
    fired: AtomicBool,
}

impl<S: KvStore> Clone for ShutdownLatch<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KvStore> ShutdownLatch<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                fired: AtomicBool::new(false),
            }),
        }
    }

    /// Closes the store unless some other caller already did.
    ///
    /// Returns `true` for the single call that performed the close.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        self.inner.trigger(reason)
    }

    /// Same as [`trigger`](Self::trigger), but the close (and its flush to
    /// disk) runs on the blocking pool instead of the calling task's worker.
    pub async fn trigger_blocking(&self, reason: ShutdownReason) -> bool {
        let latch = self.clone();
        match tokio::task::spawn_blocking(move || latch.trigger(reason)).await {
            Ok(fired) => fired,
            Err(e) => {
                error!(error = %e, "Store close task failed");
                false
            }
        }
    }

    pub fn has_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }
}

impl<S: KvStore> Inner<S> {
    fn trigger(&self, reason: ShutdownReason) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        info!(reason = %reason, "Closing store");
        if let Err(e) = self.store.close() {
            error!(error = %e, "Failed to close store cleanly");
        }
        true
    }
}

impl<S: KvStore> Drop for Inner<S> {
    fn drop(&mut self) {
        self.trigger(ShutdownReason::Dropped);
    }
}
