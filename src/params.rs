//! Wire types for shareable control parameters.
//!
//! Parameters cross the bus as a JSON array of objects discriminated by a
//! `Type` field (`"toggle" | "slider" | "list" | "knob"`). Field names are
//! PascalCase on the wire; this is the contract existing viewer clients
//! parse, so it is frozen here independently of Rust naming.
//!
//! # Wire Format
//!
//! ```json
//! [
//!   {"Type":"toggle","Guid":"…","Name":"Show roof","NickName":"roof","Value":true},
//!   {"Type":"slider","Guid":"…","Name":"Radius","NickName":"R",
//!    "Value":2.5,"Accuracy":1,"Min":0.0,"Max":10.0,"Epsilon":0.01,"DecimalPlaces":2}
//! ]
//! ```
//!
//! Decoding with per-entry recovery for unknown `Type` values lives in
//! [`crate::control`]; this module owns the types and the deterministic
//! encoder that change detection relies on.

use serde::{Deserialize, Serialize};

/// Selection behavior of a value list.
///
/// Serialized as the integer the legacy clients expect:
/// 0 = checklist, 1 = dropdown, 2 = sequence, 3 = cyclic sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ListMode {
    /// Independent checkboxes; any subset of items may be selected.
    CheckList,
    /// Dropdown menu; exactly one item selected.
    DropDown,
    /// Sequence stepper; exactly one item selected.
    Sequence,
    /// Wrapping sequence stepper; exactly one item selected.
    CyclicSequence,
}

impl ListMode {
    /// True for the one mode where selection flags are independent.
    #[must_use]
    pub fn is_checklist(self) -> bool {
        matches!(self, Self::CheckList)
    }
}

impl From<i32> for ListMode {
    fn from(raw: i32) -> Self {
        match raw {
            0 => Self::CheckList,
            2 => Self::Sequence,
            3 => Self::CyclicSequence,
            // Out-of-range modes behave like plain single-select.
            _ => Self::DropDown,
        }
    }
}

impl From<ListMode> for i32 {
    fn from(mode: ListMode) -> Self {
        match mode {
            ListMode::CheckList => 0,
            ListMode::DropDown => 1,
            ListMode::Sequence => 2,
            ListMode::CyclicSequence => 3,
        }
    }
}

/// One entry of a shareable value list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SharedListItem {
    /// Expression evaluated when the item is selected.
    pub expression: String,
    /// True for the selected item (or every checked item in checklist mode).
    pub selected: bool,
    /// Display name.
    pub name: String,
}

/// A control parameter in wire form.
///
/// A closed sum over the four parameter kinds the bridge shares. The `Type`
/// tag always matches the concrete variant; decoders that cannot match the
/// tag yield nothing rather than an error (see [`crate::control`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum SharedParameter {
    /// Boolean toggle.
    #[serde(rename = "toggle", rename_all = "PascalCase")]
    Toggle {
        /// Stable identifier of the live source.
        guid: String,
        /// Display name.
        name: String,
        /// Short display name.
        nick_name: String,
        /// Current boolean value.
        value: bool,
    },
    /// Numeric slider.
    #[serde(rename = "slider", rename_all = "PascalCase")]
    Slider {
        /// Stable identifier of the live source.
        guid: String,
        /// Display name.
        name: String,
        /// Short display name.
        nick_name: String,
        /// Current value.
        value: f32,
        /// Numeric accuracy class of the slider.
        accuracy: i32,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
        /// Snapping epsilon.
        epsilon: f32,
        /// Displayed decimal places.
        decimal_places: i32,
    },
    /// Value list.
    #[serde(rename = "list", rename_all = "PascalCase")]
    List {
        /// Stable identifier of the live source.
        guid: String,
        /// Display name.
        name: String,
        /// Short display name.
        nick_name: String,
        /// Selection behavior.
        list_mode: ListMode,
        /// Ordered items.
        values: Vec<SharedListItem>,
    },
    /// Dial knob.
    #[serde(rename = "knob", rename_all = "PascalCase")]
    Knob {
        /// Stable identifier of the live source.
        guid: String,
        /// Display name.
        name: String,
        /// Short display name.
        nick_name: String,
        /// Current value.
        value: f32,
        /// Displayed decimal places.
        decimals: i32,
        /// Value change per full revolution.
        range: f32,
        /// Whether the knob clamps to its bounds.
        limit_knob_value: bool,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },
}

impl SharedParameter {
    /// Stable identifier of the live source this entry refers to.
    #[must_use]
    pub fn guid(&self) -> &str {
        match self {
            Self::Toggle { guid, .. }
            | Self::Slider { guid, .. }
            | Self::List { guid, .. }
            | Self::Knob { guid, .. } => guid,
        }
    }

    /// Wire discriminator value for this variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Toggle { .. } => "toggle",
            Self::Slider { .. } => "slider",
            Self::List { .. } => "list",
            Self::Knob { .. } => "knob",
        }
    }
}

/// Encode a parameter batch to its wire form.
///
/// Encoding is pure and deterministic: the same logical batch always
/// produces the same bytes, which is what snapshot comparison relies on.
///
/// # Errors
///
/// Returns a serialization error only for non-finite floats, which the
/// authoritative model never produces.
pub fn encode_batch(parameters: &[SharedParameter]) -> Result<String, serde_json::Error> {
    serde_json::to_string(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle(guid: &str, value: bool) -> SharedParameter {
        SharedParameter::Toggle {
            guid: guid.to_string(),
            name: "Show roof".to_string(),
            nick_name: "roof".to_string(),
            value,
        }
    }

    #[test]
    fn test_toggle_wire_shape() {
        let json = encode_batch(&[toggle("abc", true)]).expect("encodes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(value[0]["Type"], "toggle");
        assert_eq!(value[0]["Guid"], "abc");
        assert_eq!(value[0]["NickName"], "roof");
        assert_eq!(value[0]["Value"], true);
    }

    #[test]
    fn test_slider_wire_shape_uses_pascal_case() {
        let slider = SharedParameter::Slider {
            guid: "s1".to_string(),
            name: "Radius".to_string(),
            nick_name: "R".to_string(),
            value: 2.5,
            accuracy: 1,
            min: 0.0,
            max: 10.0,
            epsilon: 0.01,
            decimal_places: 2,
        };
        let json = encode_batch(&[slider]).expect("encodes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(value[0]["Type"], "slider");
        assert_eq!(value[0]["DecimalPlaces"], 2);
        assert_eq!(value[0]["Min"], 0.0);
        assert!(value[0].get("decimal_places").is_none());
    }

    #[test]
    fn test_list_mode_round_trips_as_integer() {
        let json = serde_json::to_string(&ListMode::CyclicSequence).expect("encodes");
        assert_eq!(json, "3");
        let mode: ListMode = serde_json::from_str("0").expect("decodes");
        assert_eq!(mode, ListMode::CheckList);
    }

    #[test]
    fn test_unknown_list_mode_behaves_like_single_select() {
        let mode: ListMode = serde_json::from_str("42").expect("decodes");
        assert_eq!(mode, ListMode::DropDown);
        assert!(!mode.is_checklist());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let batch = vec![toggle("a", false), toggle("b", true)];
        let first = encode_batch(&batch).expect("encodes");
        let second = encode_batch(&batch).expect("encodes");
        assert_eq!(first, second);
    }

    #[test]
    fn test_known_variant_decodes_by_tag() {
        let json = r#"{"Type":"knob","Guid":"k","Name":"Rot","NickName":"r",
            "Value":90.0,"Decimals":0,"Range":360.0,"LimitKnobValue":true,
            "Min":0.0,"Max":360.0}"#;
        let parameter: SharedParameter = serde_json::from_str(json).expect("decodes");
        assert_eq!(parameter.type_name(), "knob");
        assert_eq!(parameter.guid(), "k");
    }
}
