//! Application-wide constants for parabridge.
//!
//! This module centralizes timing tunables and protocol defaults to improve
//! maintainability and discoverability. Constants are grouped by domain with
//! documentation explaining their purpose.
//!
//! # Categories
//!
//! - **Quiet windows**: debounce durations for outbound publish channels
//! - **Host loop**: evaluation scheduling intervals
//! - **Protocol**: wire-level defaults

use std::time::Duration;

// ============================================================================
// Quiet windows
// ============================================================================

/// Debounce quiet window for geometry mesh publishes.
///
/// Mesh payloads are the largest messages the bridge emits; a slightly wider
/// window coalesces drag-style edits into a single publish. The exact value
/// is a tunable, not a correctness constant.
pub const MESH_QUIET_WINDOW: Duration = Duration::from_millis(400);

/// Debounce quiet window for parameter snapshot publishes.
///
/// Parameter payloads are small, so a shorter window keeps remote widgets
/// feeling responsive while still absorbing slider scrubbing.
pub const PARAMETER_QUIET_WINDOW: Duration = Duration::from_millis(300);

// ============================================================================
// Host loop
// ============================================================================

/// Idle tick for the host evaluation loop.
///
/// When no wake request arrives within this interval, the loop runs an
/// evaluation pass anyway so externally-made model edits are picked up.
pub const HOST_IDLE_TICK: Duration = Duration::from_millis(250);

// ============================================================================
// Protocol defaults
// ============================================================================

/// Default client identifier presented to the broker.
///
/// Also used as the final segment of the status topic, so remote clients can
/// watch `<base>/status/<client_id>` for presence.
pub const DEFAULT_CLIENT_ID: &str = "parabridge";

/// Retained status payload published after a successful connect.
pub const STATUS_ONLINE: &str = "online";

/// Last-will status payload the broker publishes if the session dies.
pub const STATUS_OFFLINE: &str = "offline";

/// Initial snapshot payload for outbound data channels.
///
/// Seeding the snapshot cache with an empty JSON array means an empty model
/// does not trigger a publish on the very first evaluation pass.
pub const EMPTY_BATCH: &str = "[]";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_windows_are_reasonable() {
        // Sub-100ms would defeat coalescing; above 2s would feel laggy.
        assert!(MESH_QUIET_WINDOW >= Duration::from_millis(100));
        assert!(MESH_QUIET_WINDOW <= Duration::from_secs(2));
        assert!(PARAMETER_QUIET_WINDOW >= Duration::from_millis(100));
        assert!(PARAMETER_QUIET_WINDOW <= Duration::from_secs(2));
    }

    #[test]
    fn test_parameter_window_not_wider_than_mesh_window() {
        assert!(PARAMETER_QUIET_WINDOW <= MESH_QUIET_WINDOW);
    }

    #[test]
    fn test_host_tick_shorter_than_quiet_windows() {
        // The host loop must tick often enough to re-detect unpublished
        // changes before users notice the latency.
        assert!(HOST_IDLE_TICK < PARAMETER_QUIET_WINDOW);
    }

    #[test]
    fn test_status_payloads_differ() {
        assert_ne!(STATUS_ONLINE, STATUS_OFFLINE);
    }
}
