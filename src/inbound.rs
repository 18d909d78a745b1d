//! Thread-safe staging queues for inbound control messages.
//!
//! The transport's receive context enqueues raw payloads on an arbitrary
//! thread; the host evaluation context drains them in strict arrival order.
//! The queue is a pure staging buffer — unbounded on purpose, never a
//! backpressure mechanism. If the host evaluates less often than producers
//! enqueue, the queue grows; that is an accepted limitation.
//!
//! Access is serialized by a per-channel mutex held only for the duration
//! of an enqueue or drain; nothing blocks while holding it.

use std::collections::VecDeque;
use std::sync::Mutex;

/// FIFO staging buffer for one inbound channel.
#[derive(Debug, Default)]
pub struct InboundQueue {
    messages: Mutex<VecDeque<String>>,
}

impl InboundQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw payload (producer side, any thread).
    pub fn enqueue(&self, payload: String) {
        let mut messages = self.lock();
        messages.push_back(payload);
    }

    /// Empty the queue and return everything in arrival order
    /// (consumer side, host evaluation context only).
    #[must_use]
    pub fn drain_all(&self) -> Vec<String> {
        let mut messages = self.lock();
        messages.drain(..).collect()
    }

    /// Number of staged messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        // Poisoning cannot corrupt a VecDeque of owned strings; recover.
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
