//! Cooperative shutdown signal
//!
//! One [`ShutdownSignal`] is cloned into every sensor task and the
//! aggregator. Loops check it at the top of each iteration and sleep through
//! [`ShutdownSignal::wait_timeout`], which returns as soon as the signal is
//! raised. Shutdown latency is therefore bounded by the in-flight hardware
//! call, not by the sleep interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

struct Inner {
    flag: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Clonable shutdown flag with interruptible sleeps
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

impl ShutdownSignal {
    /// New, untriggered signal
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                flag: AtomicBool::new(false),
                lock: Mutex::new(()),
                wake: Condvar::new(),
            }),
        }
    }

    /// Raise the signal and wake every sleeper. Idempotent.
    pub fn trigger(&self) {
        self.inner.flag.store(true, Ordering::Release);
        // Taking the lock orders the store before any sleeper re-checks
        let _guard = self.inner.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.inner.wake.notify_all();
    }

    /// Whether the signal has been raised
    pub fn is_triggered(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// Sleep for `timeout` or until the signal is raised
    ///
    /// Returns `true` if the signal is raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        loop {
            if self.is_triggered() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = match self.inner.wake.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}
