//! The "please re-run me" handle.
//!
//! Inbound message arrival and applied commands both need the host to run
//! another evaluation pass, but only the host's own single-threaded context
//! may do so. The trigger is the cross-thread request: any context calls
//! [`SolveTrigger::request`], and the host loop picks requests up via
//! [`SolveRequests`], coalescing bursts into a single pass.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Clone-able handle requesting the next evaluation pass.
#[derive(Debug, Clone)]
pub struct SolveTrigger {
    sender: Sender<()>,
}

impl SolveTrigger {
    /// Request that the host run another evaluation pass.
    ///
    /// Cheap and non-blocking; safe from any thread. Requests made while
    /// the host is mid-pass coalesce into one follow-up pass.
    pub fn request(&self) {
        let _ = self.sender.send(());
    }
}

/// Receiving side of the trigger, owned by the host loop.
#[derive(Debug)]
pub struct SolveRequests {
    receiver: Receiver<()>,
}

impl SolveRequests {
    /// Block until a request arrives or `timeout` elapses.
    ///
    /// Returns true when at least one request arrived; all requests pending
    /// at that moment are absorbed, so one wake-up answers a whole burst.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(()) => {
                self.absorb_pending();
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Non-blocking check; absorbs and reports any pending requests.
    #[must_use]
    pub fn pending(&self) -> bool {
        let mut any = false;
        while self.receiver.try_recv().is_ok() {
            any = true;
        }
        any
    }

    fn absorb_pending(&self) {
        while self.receiver.try_recv().is_ok() {}
    }
}

/// Create a connected trigger/receiver pair.
#[must_use]
pub fn channel() -> (SolveTrigger, SolveRequests) {
    let (sender, receiver) = mpsc::channel();
    (SolveTrigger { sender }, SolveRequests { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wakes_waiter() {
        let (trigger, requests) = channel();
        trigger.request();
        assert!(requests.wait(Duration::from_millis(100)));
    }

    #[test]
    fn test_wait_times_out_without_requests() {
        let (_trigger, requests) = channel();
        assert!(!requests.wait(Duration::from_millis(10)));
    }

    #[test]
    fn test_burst_coalesces_into_one_wakeup() {
        let (trigger, requests) = channel();
        for _ in 0..10 {
            trigger.request();
        }
        assert!(requests.wait(Duration::from_millis(100)));
        // The burst was absorbed by the first wake-up.
        assert!(!requests.pending());
    }

    #[test]
    fn test_request_from_another_thread() {
        let (trigger, requests) = channel();
        std::thread::spawn(move || trigger.request())
            .join()
            .expect("trigger thread");
        assert!(requests.wait(Duration::from_millis(100)));
    }
}
