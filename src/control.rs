//! Inbound command parsing and application.
//!
//! Control messages arrive as the same tagged JSON batches the bridge
//! publishes (see [`crate::params`]): remote clients echo an edited entry
//! back on a control topic, and this module turns it into a mutation of the
//! live model.
//!
//! # Failure containment
//!
//! One bad message never takes anything else down:
//! - a payload that is not a parameter batch at all drops that one message;
//! - an entry with an unknown `Type` is skipped and reported, the rest of
//!   the batch continues;
//! - an entry naming an unknown guid, or a kind that does not match the
//!   live handle, drops the remainder of that one message (mutations
//!   already applied stay applied);
//! - other queued messages are unaffected in every case.
//!
//! The worst case for any single bad message is one ignored update; the
//! channel self-corrects on the next successfully processed cycle.

use std::fmt;

use crate::mesh;
use crate::model::{Document, ParamSource};
use crate::params::{SharedListItem, SharedParameter};
use crate::registry::{HandleKind, ParameterRegistry};

/// Errors raised while interpreting an inbound control message.
#[derive(Debug)]
pub enum ControlError {
    /// The payload could not be parsed at all; the message is dropped.
    MalformedPayload(String),
    /// A message arrived on a topic the bridge did not subscribe for.
    UnexpectedTopic(String),
    /// A command named a guid absent from the current registry.
    MissingTarget(String),
    /// A command's kind does not match the live handle's kind.
    KindMismatch {
        /// Guid the command named.
        guid: String,
        /// Kind of the live handle.
        live: &'static str,
        /// Kind the command carried.
        received: &'static str,
    },
    /// A list command's item count does not line up with the live list.
    ItemCountMismatch {
        /// Guid the command named.
        guid: String,
        /// Live item count.
        live: usize,
        /// Inbound item count.
        inbound: usize,
    },
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPayload(detail) => write!(f, "malformed payload: {detail}"),
            Self::UnexpectedTopic(topic) => write!(f, "unexpected topic: {topic}"),
            Self::MissingTarget(guid) => write!(f, "no live parameter for guid {guid}"),
            Self::KindMismatch { guid, live, received } => write!(
                f,
                "command kind {received} does not match live {live} (guid {guid})"
            ),
            Self::ItemCountMismatch { guid, live, inbound } => write!(
                f,
                "list item count mismatch for guid {guid}: live {live}, inbound {inbound}"
            ),
        }
    }
}

impl std::error::Error for ControlError {}

/// Decoded parameter batch with per-entry recovery.
#[derive(Debug)]
pub struct BatchDecode {
    /// Entries whose `Type` matched a known variant.
    pub parameters: Vec<SharedParameter>,
    /// `Type` values that matched nothing; one report per skipped entry.
    pub unrecognized: Vec<String>,
}

/// Decode a parameter batch, skipping entries with an unknown `Type`.
///
/// The discriminator is peeked first to select the variant, then the entry
/// is populated — an unknown discriminator yields no object and must not
/// abort the batch. A known discriminator over malformed fields is a
/// malformed payload and drops the whole message.
///
/// # Errors
///
/// Returns [`ControlError::MalformedPayload`] when the payload is not a
/// JSON array, or when a recognized entry fails to populate.
pub fn decode_parameter_batch(payload: &str) -> Result<BatchDecode, ControlError> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(payload)
        .map_err(|e| ControlError::MalformedPayload(e.to_string()))?;

    let mut parameters = Vec::with_capacity(entries.len());
    let mut unrecognized = Vec::new();

    for entry in entries {
        let tag = entry
            .get("Type")
            .and_then(serde_json::Value::as_str)
            .map(String::from);
        match tag.as_deref() {
            Some("toggle" | "slider" | "list" | "knob") => {
                let parameter = serde_json::from_value(entry).map_err(|e| {
                    ControlError::MalformedPayload(format!("bad parameter entry: {e}"))
                })?;
                parameters.push(parameter);
            }
            Some(other) => unrecognized.push(other.to_string()),
            None => unrecognized.push("<missing>".to_string()),
        }
    }

    Ok(BatchDecode { parameters, unrecognized })
}

/// Result of applying one inbound message.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Number of commands that mutated the model.
    pub applied: usize,
    /// Per-item reports (unknown types, unsupported kinds, count warnings).
    pub warnings: Vec<String>,
    /// Error that dropped (the remainder of) this message, if any.
    pub dropped: Option<ControlError>,
}

impl ApplyReport {
    fn dropped_by(error: ControlError) -> Self {
        Self { dropped: Some(error), ..Self::default() }
    }
}

/// Parse one parameter-control message and apply it to the live model.
///
/// Mutation rules per kind:
/// - **Toggle**: set the boolean directly.
/// - **Slider**: set the value directly; no re-clamping against min/max.
/// - **List (checklist)**: walk inbound and live items by positional index
///   and overwrite each live selected flag.
/// - **List (single-select)**: honor the first inbound item with
///   `Selected = true`; if the live item at that index is not already
///   selected, select it exclusively. Later `true` flags are ignored.
/// - **Knob**: recognized on the wire but has no apply rule; reported and
///   skipped.
pub fn apply_parameter_message(
    payload: &str,
    registry: &ParameterRegistry,
    sources: &mut [ParamSource],
) -> ApplyReport {
    let batch = match decode_parameter_batch(payload) {
        Ok(batch) => batch,
        Err(error) => return ApplyReport::dropped_by(error),
    };

    let mut report = ApplyReport::default();
    for tag in &batch.unrecognized {
        report
            .warnings
            .push(format!("unrecognised parameter type: {tag}"));
    }

    for command in batch.parameters {
        match apply_command(&command, registry, sources, &mut report) {
            Ok(()) => {}
            Err(error) => {
                // Drop the remainder of this one message; earlier mutations
                // stay applied, later queued messages are unaffected.
                report.dropped = Some(error);
                break;
            }
        }
    }

    report
}

/// Apply a single decoded command. Returns an error only for failures that
/// drop the remainder of the message.
fn apply_command(
    command: &SharedParameter,
    registry: &ParameterRegistry,
    sources: &mut [ParamSource],
    report: &mut ApplyReport,
) -> Result<(), ControlError> {
    if let SharedParameter::Knob { guid, .. } = command {
        report
            .warnings
            .push(format!("knob control not supported (parameter {guid})"));
        return Ok(());
    }

    let guid = command.guid();
    let handle = registry
        .get(guid)
        .ok_or_else(|| ControlError::MissingTarget(guid.to_string()))?;

    let mismatch = |live: HandleKind| ControlError::KindMismatch {
        guid: guid.to_string(),
        live: live.name(),
        received: command.type_name(),
    };

    match command {
        SharedParameter::Toggle { value, .. } => {
            let ParamSource::Toggle(toggle) = &mut sources[handle.index] else {
                return Err(mismatch(handle.kind));
            };
            log::debug!("[Control] Setting toggle {guid} to {value}");
            toggle.value = *value;
            report.applied += 1;
        }
        SharedParameter::Slider { value, .. } => {
            let ParamSource::Slider(slider) = &mut sources[handle.index] else {
                return Err(mismatch(handle.kind));
            };
            log::debug!("[Control] Setting slider {guid} to {value}");
            slider.set_value(*value);
            report.applied += 1;
        }
        SharedParameter::List { values, .. } => {
            let ParamSource::List(list) = &mut sources[handle.index] else {
                return Err(mismatch(handle.kind));
            };
            apply_list_command(guid, values, list, report)?;
        }
        // Already reported before the registry lookup.
        SharedParameter::Knob { .. } => {}
    }

    Ok(())
}

/// Apply a list command using the mode-specific selection rules.
fn apply_list_command(
    guid: &str,
    inbound: &[SharedListItem],
    list: &mut crate::model::ValueList,
    report: &mut ApplyReport,
) -> Result<(), ControlError> {
    if list.mode.is_checklist() {
        // Positional walk; both sides must line up, there is no matching
        // by identity or expression.
        if inbound.len() < list.items.len() {
            return Err(ControlError::ItemCountMismatch {
                guid: guid.to_string(),
                live: list.items.len(),
                inbound: inbound.len(),
            });
        }
        for (item, incoming) in list.items.iter_mut().zip(inbound) {
            item.selected = incoming.selected;
        }
        log::debug!("[Control] Overwrote checklist selection for {guid}");
        report.applied += 1;
        return Ok(());
    }

    // Single-select: only the first selected inbound item is honored.
    for (index, incoming) in inbound.iter().enumerate() {
        if !incoming.selected {
            continue;
        }
        if index >= list.items.len() {
            return Err(ControlError::ItemCountMismatch {
                guid: guid.to_string(),
                live: list.items.len(),
                inbound: inbound.len(),
            });
        }
        if !list.items[index].selected {
            log::debug!("[Control] Selecting list item {index} for {guid}");
            list.select_item(index);
            report.applied += 1;
        }
        break;
    }

    Ok(())
}

/// Parse one position-control message and apply it to the document.
///
/// A parseable position array replaces the document's position text block
/// (last writer wins, messages applied in arrival order). The only
/// cross-check is a count comparison against the current mesh count, which
/// warns without rejecting.
pub fn apply_position_message(
    payload: &str,
    mesh_count: usize,
    document: &mut Document,
) -> ApplyReport {
    let positions = match mesh::decode_positions(payload) {
        Ok(positions) => positions,
        Err(e) => return ApplyReport::dropped_by(ControlError::MalformedPayload(e.to_string())),
    };

    let mut report = ApplyReport::default();
    if positions.len() != mesh_count {
        report.warnings.push(format!(
            "the number of meshes ({mesh_count}) differs from the number of positions ({})",
            positions.len()
        ));
    }

    log::debug!("[Control] Updating geometry position data ({} entries)", positions.len());
    document.geometry_positions = payload.to_string();
    report.applied += 1;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BooleanToggle, NumberSlider, ValueList, ValueListItem};
    use crate::params::ListMode;
    use crate::registry;

    fn toggle_entry(guid: &str, value: bool) -> serde_json::Value {
        serde_json::json!({
            "Type": "toggle", "Guid": guid, "Name": "T", "NickName": "t", "Value": value
        })
    }

    fn slider_entry(guid: &str, value: f32) -> serde_json::Value {
        serde_json::json!({
            "Type": "slider", "Guid": guid, "Name": "S", "NickName": "s",
            "Value": value, "Accuracy": 1, "Min": 0.0, "Max": 10.0,
            "Epsilon": 0.01, "DecimalPlaces": 2
        })
    }

    fn list_entry(guid: &str, mode: i32, selection: &[bool]) -> serde_json::Value {
        let values: Vec<serde_json::Value> = selection
            .iter()
            .enumerate()
            .map(|(i, &selected)| {
                serde_json::json!({
                    "Expression": i.to_string(), "Selected": selected, "Name": format!("item {i}")
                })
            })
            .collect();
        serde_json::json!({
            "Type": "list", "Guid": guid, "Name": "L", "NickName": "l",
            "ListMode": mode, "Values": values
        })
    }

    fn checklist_sources(selection: &[bool]) -> Vec<ParamSource> {
        let items = selection
            .iter()
            .enumerate()
            .map(|(i, &selected)| {
                let mut item = ValueListItem::new(format!("item {i}"), i.to_string());
                item.selected = selected;
                item
            })
            .collect();
        vec![ParamSource::List(ValueList::new(
            "L",
            "l",
            ListMode::CheckList,
            items,
        ))]
    }

    #[test]
    fn test_toggle_applied_directly() {
        let mut sources = vec![ParamSource::Toggle(BooleanToggle::new("T", "t", false))];
        let guid = sources[0].guid().to_string();
        let build = registry::rebuild(&sources);

        let payload = serde_json::json!([toggle_entry(&guid, true)]).to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        assert_eq!(report.applied, 1);
        assert!(report.dropped.is_none());
        let ParamSource::Toggle(toggle) = &sources[0] else { panic!("toggle") };
        assert!(toggle.value);
    }

    #[test]
    fn test_slider_applied_without_reclamping() {
        let mut sources = vec![ParamSource::Slider(NumberSlider::new("S", "s", 5.0, 0.0, 10.0))];
        let guid = sources[0].guid().to_string();
        let build = registry::rebuild(&sources);

        // Out of bounds on purpose: the inbound value is trusted.
        let payload = serde_json::json!([slider_entry(&guid, 12.5)]).to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        assert_eq!(report.applied, 1);
        let ParamSource::Slider(slider) = &sources[0] else { panic!("slider") };
        assert_eq!(slider.value, 12.5);
    }

    #[test]
    fn test_checklist_positional_apply() {
        let mut sources = checklist_sources(&[false, false, false]);
        let guid = sources[0].guid().to_string();
        let build = registry::rebuild(&sources);

        let payload = serde_json::json!([list_entry(&guid, 0, &[true, false, true])]).to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        assert_eq!(report.applied, 1);
        let ParamSource::List(list) = &sources[0] else { panic!("list") };
        assert_eq!(list.selection(), vec![true, false, true]);
    }

    #[test]
    fn test_checklist_short_inbound_drops_message() {
        let mut sources = checklist_sources(&[false, false, false]);
        let guid = sources[0].guid().to_string();
        let build = registry::rebuild(&sources);

        let payload = serde_json::json!([list_entry(&guid, 0, &[true])]).to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        assert_eq!(report.applied, 0);
        assert!(matches!(report.dropped, Some(ControlError::ItemCountMismatch { .. })));
        let ParamSource::List(list) = &sources[0] else { panic!("list") };
        assert_eq!(list.selection(), vec![false, false, false]);
    }

    #[test]
    fn test_single_select_honors_first_match_only() {
        let mut sources = vec![ParamSource::List(ValueList::new(
            "L",
            "l",
            ListMode::DropDown,
            vec![
                ValueListItem::new("a", "0"),
                ValueListItem::new("b", "1"),
                ValueListItem::new("c", "2"),
            ],
        ))];
        let guid = sources[0].guid().to_string();
        let build = registry::rebuild(&sources);

        let payload =
            serde_json::json!([list_entry(&guid, 1, &[false, true, true])]).to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        assert_eq!(report.applied, 1);
        let ParamSource::List(list) = &sources[0] else { panic!("list") };
        // Index 1 selected exclusively; index 2's `true` never applied.
        assert_eq!(list.selection(), vec![false, true, false]);
    }

    #[test]
    fn test_single_select_already_selected_is_a_no_op() {
        let mut sources = vec![ParamSource::List(ValueList::new(
            "L",
            "l",
            ListMode::DropDown,
            vec![ValueListItem::new("a", "0"), ValueListItem::new("b", "1")],
        ))];
        let guid = sources[0].guid().to_string();
        let build = registry::rebuild(&sources);

        // Item 0 is already the selection.
        let payload = serde_json::json!([list_entry(&guid, 1, &[true, false])]).to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        assert_eq!(report.applied, 0);
        assert!(report.dropped.is_none());
    }

    #[test]
    fn test_unknown_variant_is_skipped_not_fatal() {
        let mut sources = vec![
            ParamSource::Toggle(BooleanToggle::new("T", "t", false)),
            ParamSource::Slider(NumberSlider::new("S", "s", 1.0, 0.0, 10.0)),
        ];
        let toggle_guid = sources[0].guid().to_string();
        let slider_guid = sources[1].guid().to_string();
        let build = registry::rebuild(&sources);

        let payload = serde_json::json!([
            toggle_entry(&toggle_guid, true),
            {"Type": "bogus", "Guid": "x"},
            slider_entry(&slider_guid, 3.0),
        ])
        .to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        assert_eq!(report.applied, 2);
        assert!(report.dropped.is_none());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("bogus"));
    }

    #[test]
    fn test_knob_command_reported_unsupported() {
        let mut sources = vec![ParamSource::Toggle(BooleanToggle::new("T", "t", false))];
        let guid = sources[0].guid().to_string();
        let build = registry::rebuild(&sources);

        let payload = serde_json::json!([
            {"Type": "knob", "Guid": "k1", "Name": "K", "NickName": "k",
             "Value": 1.0, "Decimals": 0, "Range": 10.0, "LimitKnobValue": true,
             "Min": 0.0, "Max": 10.0},
            toggle_entry(&guid, true),
        ])
        .to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        // Knob skipped with a report, toggle still applied.
        assert_eq!(report.applied, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("knob control not supported"));
    }

    #[test]
    fn test_malformed_payload_drops_whole_message() {
        let mut sources = vec![ParamSource::Toggle(BooleanToggle::new("T", "t", false))];
        let build = registry::rebuild(&sources);

        let report = apply_parameter_message("not json at all", &build.registry, &mut sources);

        assert_eq!(report.applied, 0);
        assert!(matches!(report.dropped, Some(ControlError::MalformedPayload(_))));
    }

    #[test]
    fn test_missing_target_drops_remainder_keeps_earlier_applies() {
        let mut sources = vec![
            ParamSource::Toggle(BooleanToggle::new("T", "t", false)),
            ParamSource::Slider(NumberSlider::new("S", "s", 1.0, 0.0, 10.0)),
        ];
        let toggle_guid = sources[0].guid().to_string();
        let slider_guid = sources[1].guid().to_string();
        let build = registry::rebuild(&sources);

        let payload = serde_json::json!([
            toggle_entry(&toggle_guid, true),
            toggle_entry("no-such-guid", true),
            slider_entry(&slider_guid, 9.0),
        ])
        .to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        assert_eq!(report.applied, 1);
        assert!(matches!(report.dropped, Some(ControlError::MissingTarget(_))));
        // The slider command after the failure never ran.
        let ParamSource::Slider(slider) = &sources[1] else { panic!("slider") };
        assert_eq!(slider.value, 1.0);
    }

    #[test]
    fn test_kind_mismatch_drops_remainder() {
        let mut sources = vec![ParamSource::Toggle(BooleanToggle::new("T", "t", false))];
        let guid = sources[0].guid().to_string();
        let build = registry::rebuild(&sources);

        let payload = serde_json::json!([slider_entry(&guid, 1.0)]).to_string();
        let report = apply_parameter_message(&payload, &build.registry, &mut sources);

        assert_eq!(report.applied, 0);
        assert!(matches!(report.dropped, Some(ControlError::KindMismatch { .. })));
    }

    #[test]
    fn test_position_message_replaces_document_block() {
        let mut document = Document::new();
        let payload = r#"[{"lat":47.2,"lon":8.5,"hdg":90.0}]"#;

        let report = apply_position_message(payload, 1, &mut document);

        assert_eq!(report.applied, 1);
        assert!(report.warnings.is_empty());
        assert_eq!(document.geometry_positions, payload);
    }

    #[test]
    fn test_position_count_mismatch_warns_but_applies() {
        let mut document = Document::new();
        let payload = r#"[{"lat":1.0,"lon":2.0,"hdg":3.0}]"#;

        let report = apply_position_message(payload, 3, &mut document);

        assert_eq!(report.applied, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("differs"));
        assert_eq!(document.geometry_positions, payload);
    }

    #[test]
    fn test_malformed_position_message_dropped() {
        let mut document = Document::new();
        let before = document.geometry_positions.clone();

        let report = apply_position_message("{broken", 0, &mut document);

        assert_eq!(report.applied, 0);
        assert!(matches!(report.dropped, Some(ControlError::MalformedPayload(_))));
        assert_eq!(document.geometry_positions, before);
    }
}
