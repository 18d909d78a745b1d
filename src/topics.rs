//! Topic set derivation for a bridge session.
//!
//! All topics hang off a single configurable base topic. The base is
//! project-specific; the sub-topic layout is what remote clients rely on:
//!
//! ```text
//! <base>/status/<client_id>            retained presence ("online"/"offline")
//! <base>/geometry/meshes               outbound localized meshes
//! <base>/parameters/share              outbound parameter snapshot
//! <base>/geometry/positions/share      outbound geometry positions
//! <base>/parameters/control            inbound parameter commands
//! <base>/geometry/positions/control    inbound position commands
//! ```

/// The full set of topics used by one bridge session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    /// Normalized base topic (no trailing slash).
    pub base: String,
    /// Retained presence topic, ends with the client id.
    pub status: String,
    /// Outbound localized mesh topic.
    pub meshes: String,
    /// Outbound parameter snapshot topic.
    pub parameter_share: String,
    /// Outbound geometry position topic.
    pub position_share: String,
    /// Inbound parameter command topic.
    pub parameter_control: String,
    /// Inbound geometry position command topic.
    pub position_control: String,
}

impl TopicSet {
    /// Derive the topic set from a base topic and client id.
    ///
    /// Trailing slashes on the base are trimmed so user configuration like
    /// `"myproject/"` and `"myproject"` produce identical topics.
    #[must_use]
    pub fn new(base_topic: &str, client_id: &str) -> Self {
        let base = base_topic.trim_end_matches('/').to_string();
        Self {
            status: format!("{base}/status/{client_id}"),
            meshes: format!("{base}/geometry/meshes"),
            parameter_share: format!("{base}/parameters/share"),
            position_share: format!("{base}/geometry/positions/share"),
            parameter_control: format!("{base}/parameters/control"),
            position_control: format!("{base}/geometry/positions/control"),
            base,
        }
    }

    /// The topics the bridge subscribes to (inbound control channels).
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        vec![self.parameter_control.clone(), self.position_control.clone()]
    }
}
