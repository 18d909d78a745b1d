//! Quiet-window debouncing for outbound publishes.
//!
//! One `Debouncer` per debounced channel. Every [`Debouncer::schedule`]
//! restarts the quiet window and replaces any pending action; the action
//! runs once, on a timer task, only if no newer schedule arrives before the
//! window elapses. The effect is "fire at most once per quiet period, with
//! the latest data".
//!
//! Cancellation is a generation counter rather than task aborts: each
//! schedule bumps the generation, and a timer task that wakes up to find a
//! newer generation simply does nothing.
//!
//! Actions run outside the host evaluation context, so they are restricted
//! to operations safe from any thread — here, publishing a pre-serialized
//! payload and committing its snapshot.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

/// Restartable single-shot quiet-window timer.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    generation: Arc<AtomicU64>,
    handle: Handle,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window, spawning its timer
    /// tasks on `handle`.
    #[must_use]
    pub fn new(quiet: Duration, handle: Handle) -> Self {
        Self {
            quiet,
            generation: Arc::new(AtomicU64::new(0)),
            handle,
        }
    }

    /// Configured quiet window.
    #[must_use]
    pub fn quiet_window(&self) -> Duration {
        self.quiet
    }

    /// Schedule `action` to run once the quiet window elapses.
    ///
    /// Any previously scheduled action that has not fired yet is superseded:
    /// only the most recent action passed before the window elapses ever
    /// executes.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let scheduled = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let quiet = self.quiet;
        self.handle.spawn(async move {
            tokio::time::sleep(quiet).await;
            if latest.load(Ordering::SeqCst) == scheduled {
                action.await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().expect("runtime")
    }

    #[test]
    fn test_single_schedule_fires_once() {
        let runtime = runtime();
        let debouncer = Debouncer::new(Duration::from_millis(30), runtime.handle().clone());
        let (tx, rx) = mpsc::channel();

        debouncer.schedule(async move {
            let _ = tx.send("fired");
        });

        assert_eq!(rx.recv_timeout(Duration::from_millis(500)), Ok("fired"));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_rapid_schedules_fire_only_the_last() {
        let runtime = runtime();
        let debouncer = Debouncer::new(Duration::from_millis(60), runtime.handle().clone());
        let (tx, rx) = mpsc::channel();

        for i in 0..5 {
            let tx = tx.clone();
            debouncer.schedule(async move {
                let _ = tx.send(i);
            });
        }

        assert_eq!(rx.recv_timeout(Duration::from_millis(500)), Ok(4));
        // Earlier superseded actions never execute.
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    }

    #[test]
    fn test_separate_quiet_periods_fire_separately() {
        let runtime = runtime();
        let debouncer = Debouncer::new(Duration::from_millis(20), runtime.handle().clone());
        let (tx, rx) = mpsc::channel();

        let first = tx.clone();
        debouncer.schedule(async move {
            let _ = first.send(1);
        });
        assert_eq!(rx.recv_timeout(Duration::from_millis(500)), Ok(1));

        debouncer.schedule(async move {
            let _ = tx.send(2);
        });
        assert_eq!(rx.recv_timeout(Duration::from_millis(500)), Ok(2));
    }
}
