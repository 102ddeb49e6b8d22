//! Process-wide shutdown coordination.
//! Provides a flag set by the signal handler so chunked transfers and batch
//! loops can stop between units of work instead of mid-write.
//!
//! Relaxed atomics are sufficient for a one-way "stop" flag, and `request()`
//! is safe to call from signal handlers.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Request a cooperative shutdown (idempotent).
#[inline]
pub fn request() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

/// Check whether a shutdown has been requested.
#[inline]
pub fn is_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Test-only: clear the flag between cases.
#[cfg(test)]
#[inline]
pub fn reset() {
    SHUTDOWN.store(false, Ordering::Relaxed);
}
