//! Repaint signalling between the tile cache, the viewport and the render loop.
//!
//! Any component that changes what should be on screen calls
//! [`RepaintSignal::invalidate`]. The render loop either polls
//! [`RepaintSignal::take`] once per UI tick or awaits [`RepaintSignal::wait`].
//! Invalidations that arrive before the next frame coalesce into a single
//! pending repaint, so a burst of completed fetches costs one extra frame.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SignalInner {
    pending: AtomicBool,
    generation: AtomicU64,
    notify: Notify,
    listeners: Mutex<Vec<Listener>>,
}

/// Shared, cloneable repaint flag.
#[derive(Clone, Default)]
pub struct RepaintSignal {
    inner: Arc<SignalInner>,
}

impl RepaintSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the view as needing a repaint and wakes any waiter.
    pub fn invalidate(&self) {
        self.inner.generation.fetch_add(1, Ordering::Relaxed);
        self.inner.pending.store(true, Ordering::Release);
        self.inner.notify.notify_one();

        let listeners: Vec<Listener> = self.inner.listeners.lock().clone();
        for listener in listeners {
            listener();
        }
    }

    /// Consumes the pending repaint, returning whether there was one.
    pub fn take(&self) -> bool {
        self.inner.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether a repaint is pending, without consuming it.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Total number of invalidations since creation.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Relaxed)
    }

    /// Registers a callback run on every invalidation.
    ///
    /// UI toolkits hook their own redraw request in here. Callbacks run on
    /// whichever thread invalidated, including tile worker threads.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.listeners.lock().push(Arc::new(listener));
    }

    /// Waits until a repaint is pending and consumes it.
    pub async fn wait(&self) {
        loop {
            if self.take() {
                return;
            }
            self.inner.notify.notified().await;
        }
    }

    /// Like [`wait`](Self::wait) with a deadline. Returns `false` on timeout.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}

impl std::fmt::Debug for RepaintSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepaintSignal")
            .field("pending", &self.is_pending())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_invalidations_coalesce() {
        let signal = RepaintSignal::new();
        assert!(!signal.take());

        signal.invalidate();
        signal.invalidate();

        assert!(signal.take(), "First take should see the repaint");
        assert!(!signal.take(), "Burst should coalesce into one repaint");
        assert_eq!(signal.generation(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let signal = RepaintSignal::new();
        let clone = signal.clone();

        clone.invalidate();
        assert!(signal.is_pending());
    }

    #[test]
    fn test_listeners_run_on_invalidate() {
        let signal = RepaintSignal::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        signal.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.invalidate();
        signal.invalidate();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wait_returns_after_invalidate_from_other_task() {
        let signal = RepaintSignal::new();
        let clone = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            clone.invalidate();
        });

        assert!(signal.wait_timeout(Duration::from_secs(5)).await);
        assert!(!signal.is_pending(), "wait should consume the repaint");
    }

    #[tokio::test]
    async fn test_wait_timeout_expires() {
        let signal = RepaintSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(20)).await);
    }
}
