//! Per-cycle parameter registry.
//!
//! Rebuilt from the document's upstream sources at the start of every
//! evaluation pass: upstream wiring may have changed since the last pass, so
//! entries are never reused across cycles. Each supported source yields a
//! typed live handle (for the command interpreter) and a wire snapshot entry
//! (for outbound publishing), keyed by the source's stable identifier.
//!
//! Sources of an unsupported kind are skipped with a warning; they never
//! abort the cycle.

use std::collections::HashMap;

use crate::model::ParamSource;
use crate::params::{SharedListItem, SharedParameter};

/// Capability of a live handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// Boolean toggle.
    Toggle,
    /// Numeric slider.
    Slider,
    /// Value list.
    List,
    /// Dial knob.
    Knob,
}

impl HandleKind {
    /// Wire discriminator this capability corresponds to.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Slider => "slider",
            Self::List => "list",
            Self::Knob => "knob",
        }
    }
}

/// A live, capability-typed handle into the document's source list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveHandle {
    /// Index into the source list the registry was built from.
    pub index: usize,
    /// Capability of the source at that index.
    pub kind: HandleKind,
}

/// Guid → live-handle map for one evaluation pass.
#[derive(Debug, Default)]
pub struct ParameterRegistry {
    handles: HashMap<String, LiveHandle>,
}

impl ParameterRegistry {
    /// Look up the live handle for a parameter guid.
    #[must_use]
    pub fn get(&self, guid: &str) -> Option<LiveHandle> {
        self.handles.get(guid).copied()
    }

    /// Number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True if no sources were registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Result of one registry rebuild.
#[derive(Debug)]
pub struct RegistryBuild {
    /// Guid → live handle map.
    pub registry: ParameterRegistry,
    /// Wire snapshot of every supported source, in wiring order.
    pub snapshot: Vec<SharedParameter>,
    /// One warning per skipped (unsupported) source.
    pub warnings: Vec<String>,
}

/// Walk the current upstream sources and build handles plus the outbound
/// snapshot together.
#[must_use]
pub fn rebuild(sources: &[ParamSource]) -> RegistryBuild {
    let mut handles = HashMap::with_capacity(sources.len());
    let mut snapshot = Vec::with_capacity(sources.len());
    let mut warnings = Vec::new();

    for (index, source) in sources.iter().enumerate() {
        let guid = source.guid().to_string();
        match source {
            ParamSource::Toggle(toggle) => {
                handles.insert(guid.clone(), LiveHandle { index, kind: HandleKind::Toggle });
                snapshot.push(SharedParameter::Toggle {
                    guid,
                    name: toggle.name.clone(),
                    nick_name: toggle.nick_name.clone(),
                    value: toggle.value,
                });
            }
            ParamSource::Slider(slider) => {
                handles.insert(guid.clone(), LiveHandle { index, kind: HandleKind::Slider });
                snapshot.push(SharedParameter::Slider {
                    guid,
                    name: slider.name.clone(),
                    nick_name: slider.nick_name.clone(),
                    value: slider.value,
                    accuracy: slider.accuracy,
                    min: slider.minimum,
                    max: slider.maximum,
                    epsilon: slider.epsilon,
                    decimal_places: slider.decimal_places,
                });
            }
            ParamSource::List(list) => {
                handles.insert(guid.clone(), LiveHandle { index, kind: HandleKind::List });
                snapshot.push(SharedParameter::List {
                    guid,
                    name: list.name.clone(),
                    nick_name: list.nick_name.clone(),
                    list_mode: list.mode,
                    values: list
                        .items
                        .iter()
                        .map(|item| SharedListItem {
                            expression: item.expression.clone(),
                            selected: item.selected,
                            name: item.name.clone(),
                        })
                        .collect(),
                });
            }
            ParamSource::Knob(knob) => {
                handles.insert(guid.clone(), LiveHandle { index, kind: HandleKind::Knob });
                snapshot.push(SharedParameter::Knob {
                    guid,
                    name: knob.name.clone(),
                    nick_name: knob.nick_name.clone(),
                    value: knob.value,
                    decimals: knob.decimals,
                    range: knob.range,
                    limit_knob_value: knob.limit,
                    min: knob.minimum,
                    max: knob.maximum,
                });
            }
            ParamSource::Colour(_) => {
                warnings.push(format!(
                    "{} not supported (parameter name: {} / guid: {})",
                    source.kind_name(),
                    source.nick_name(),
                    guid
                ));
            }
        }
    }

    RegistryBuild {
        registry: ParameterRegistry { handles },
        snapshot,
        warnings,
    }
}
