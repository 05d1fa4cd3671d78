//! # Stop signal: a manual-reset, one-shot gate.
//!
//! [`StopSignal`] is created unset once per run. Setting it is idempotent and it
//! stays set; every current and future waiter returns. The entry-point thread
//! blocks on it with [`StopSignal::wait`]; the task can observe it through
//! [`StopSignal::child_token`].
//!
//! ```text
//! control handler thread            entry-point thread          task (runtime)
//!        │                                 │                         │
//!        │                           wait() ── parked ──             │ child_token()
//!   set() ──────────────────────────────► wakes                      ├──► cancelled
//!   set() (no-op)                          │                         │
//! ```
//!
//! Built on [`CancellationToken`]: the blocking wait drives `cancelled()` with
//! [`futures::executor::block_on`], so an idle service parks its thread instead of polling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Manual-reset stop gate shared by the control handler, the entry point and the task.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates an unset signal.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets the signal. Returns `true` only for the call that actually set it.
    pub fn set(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    /// True once set.
    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Blocks the calling thread until the signal is set. No timeout.
    ///
    /// Must not be called from inside an async context.
    pub fn wait(&self) {
        futures::executor::block_on(self.token.cancelled());
    }

    /// Completes once the signal is set.
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }

    /// Token cancelled when this signal is set; cancelling the child does not set the signal.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_unset() {
        let s = StopSignal::new();
        assert!(!s.is_set());
    }

    #[test]
    fn repeated_set_before_wait_wakes_once() {
        let s = StopSignal::new();
        assert!(s.set());
        assert!(!s.set());
        assert!(!s.set());
        s.wait();
        s.wait();
        assert!(s.is_set());
    }

    #[test]
    fn wait_wakes_when_set_from_other_thread() {
        let s = StopSignal::new();
        let woke = Arc::new(AtomicUsize::new(0));

        let waiter = {
            let s = s.clone();
            let woke = Arc::clone(&woke);
            thread::spawn(move || {
                s.wait();
                woke.fetch_add(1, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert_eq!(woke.load(Ordering::SeqCst), 0);
        s.set();
        s.set();
        waiter.join().expect("waiter thread");
        assert_eq!(woke.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn child_token_follows_signal_but_not_back() {
        let s = StopSignal::new();
        let child = s.child_token();
        child.cancel();
        assert!(!s.is_set());

        let child = s.child_token();
        s.set();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn stopped_resolves_after_set() {
        let s = StopSignal::new();
        let s2 = s.clone();
        let h = tokio::spawn(async move { s2.stopped().await });
        s.set();
        h.await.expect("join");
    }
}
