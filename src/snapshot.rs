//! Per-channel last-published-payload cache.
//!
//! Change detection is byte-exact comparison of serialized payloads, not
//! semantic equality: two equivalent meshes serialized in different vertex
//! order count as changed. The wire codecs are deterministic, so identical
//! model state always compares equal.
//!
//! A snapshot is committed only after its publish has actually been
//! dispatched; a failed or superseded publish leaves the snapshot untouched,
//! so the divergence is re-detected and retried on the next pass.

use std::collections::HashMap;
use std::sync::Mutex;

/// Last-published payload per outbound topic.
///
/// Shared between the evaluation context (`has_changed`) and publish tasks
/// (`commit`); each commit touches a single topic's entry.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<String, String>>,
}

impl SnapshotCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a topic with a baseline payload.
    ///
    /// Used at session start so an empty model does not publish an empty
    /// batch on the first pass.
    pub fn seed(&self, topic: &str, payload: &str) {
        let mut entries = self.lock();
        entries.insert(topic.to_string(), payload.to_string());
    }

    /// Whether `payload` differs from the last committed payload for `topic`.
    ///
    /// A topic with no snapshot yet always counts as changed.
    #[must_use]
    pub fn has_changed(&self, topic: &str, payload: &str) -> bool {
        let entries = self.lock();
        entries.get(topic).map(String::as_str) != Some(payload)
    }

    /// Record `payload` as the last published payload for `topic`.
    ///
    /// Call only after the corresponding publish has been dispatched.
    pub fn commit(&self, topic: &str, payload: String) {
        let mut entries = self.lock();
        entries.insert(topic.to_string(), payload);
    }

    /// Current snapshot for `topic`, if any.
    #[must_use]
    pub fn current(&self, topic: &str) -> Option<String> {
        let entries = self.lock();
        entries.get(topic).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned lock only means a publish task panicked mid-commit;
        // the map itself is still usable.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
