//! The authoritative model the bridge reads from and writes into.
//!
//! The host modeling environment proper is out of scope; this module is the
//! minimal live stand-in the engine needs: capability-typed parameter
//! sources (toggle, slider, value list, dial knob), the document that owns
//! them together with the localized meshes and the geometry-position text
//! block, and the mutation entry points remote commands are applied through.
//!
//! Only the host evaluation context may touch these types — the engine
//! never hands references to them across threads.

use uuid::Uuid;

use crate::mesh::LocalisedMesh;
use crate::params::ListMode;

/// A boolean toggle source.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanToggle {
    /// Stable instance identifier.
    pub guid: Uuid,
    /// Display name.
    pub name: String,
    /// Short display name.
    pub nick_name: String,
    /// Current value.
    pub value: bool,
}

impl BooleanToggle {
    /// Create a toggle with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, nick_name: impl Into<String>, value: bool) -> Self {
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            nick_name: nick_name.into(),
            value,
        }
    }
}

/// A numeric slider source.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberSlider {
    /// Stable instance identifier.
    pub guid: Uuid,
    /// Display name.
    pub name: String,
    /// Short display name.
    pub nick_name: String,
    /// Current value.
    pub value: f32,
    /// Lower bound.
    pub minimum: f32,
    /// Upper bound.
    pub maximum: f32,
    /// Snapping epsilon.
    pub epsilon: f32,
    /// Numeric accuracy class.
    pub accuracy: i32,
    /// Displayed decimal places.
    pub decimal_places: i32,
}

impl NumberSlider {
    /// Create a slider with a fresh identifier.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        nick_name: impl Into<String>,
        value: f32,
        minimum: f32,
        maximum: f32,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            nick_name: nick_name.into(),
            value,
            minimum,
            maximum,
            epsilon: 0.01,
            accuracy: 1,
            decimal_places: 2,
        }
    }

    /// Set the slider value.
    ///
    /// The value is applied as-is; remote commands are trusted to respect
    /// the slider's own bounds.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }
}

/// One entry of a value list source.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueListItem {
    /// Expression evaluated when the item is selected.
    pub expression: String,
    /// Display name.
    pub name: String,
    /// Whether the item is currently selected.
    pub selected: bool,
}

impl ValueListItem {
    /// Create an unselected item.
    #[must_use]
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            name: name.into(),
            selected: false,
        }
    }
}

/// A value list source.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueList {
    /// Stable instance identifier.
    pub guid: Uuid,
    /// Display name.
    pub name: String,
    /// Short display name.
    pub nick_name: String,
    /// Selection behavior.
    pub mode: ListMode,
    /// Ordered items.
    pub items: Vec<ValueListItem>,
}

impl ValueList {
    /// Create a value list with a fresh identifier.
    ///
    /// In single-select modes the first item starts selected so the list is
    /// never in a no-selection state.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        nick_name: impl Into<String>,
        mode: ListMode,
        mut items: Vec<ValueListItem>,
    ) -> Self {
        if !mode.is_checklist() {
            if let Some(first) = items.first_mut() {
                first.selected = true;
            }
        }
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            nick_name: nick_name.into(),
            mode,
            items,
        }
    }

    /// Select the item at `index` exclusively (single-select semantics).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds; callers validate first.
    pub fn select_item(&mut self, index: usize) {
        assert!(index < self.items.len(), "value list index out of bounds");
        for (i, item) in self.items.iter_mut().enumerate() {
            item.selected = i == index;
        }
    }

    /// Current selection flags in item order.
    #[must_use]
    pub fn selection(&self) -> Vec<bool> {
        self.items.iter().map(|item| item.selected).collect()
    }
}

/// A dial knob source.
#[derive(Debug, Clone, PartialEq)]
pub struct DialKnob {
    /// Stable instance identifier.
    pub guid: Uuid,
    /// Display name.
    pub name: String,
    /// Short display name.
    pub nick_name: String,
    /// Current value.
    pub value: f32,
    /// Displayed decimal places.
    pub decimals: i32,
    /// Value change per full revolution.
    pub range: f32,
    /// Whether the knob clamps to its bounds.
    pub limit: bool,
    /// Lower bound.
    pub minimum: f32,
    /// Upper bound.
    pub maximum: f32,
}

impl DialKnob {
    /// Create a knob with a fresh identifier.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        nick_name: impl Into<String>,
        value: f32,
        minimum: f32,
        maximum: f32,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            nick_name: nick_name.into(),
            value,
            decimals: 0,
            range: maximum - minimum,
            limit: true,
            minimum,
            maximum,
        }
    }
}

/// A colour picker source.
///
/// Present in model graphs but not yet shareable; the registry skips it
/// with a warning. Kept so the unsupported-kind path stays exercised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColourPicker {
    /// Stable instance identifier.
    pub guid: Uuid,
    /// Display name.
    pub name: String,
    /// Short display name.
    pub nick_name: String,
    /// Current RGB colour.
    pub colour: [u8; 3],
}

impl ColourPicker {
    /// Create a colour picker with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, nick_name: impl Into<String>, colour: [u8; 3]) -> Self {
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            nick_name: nick_name.into(),
            colour,
        }
    }
}

/// A parameter source wired into the bridge's parameter input.
///
/// The concrete capability is identified structurally by the variant; the
/// registry maps each supported variant to a live handle and skips the
/// rest.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// Boolean toggle.
    Toggle(BooleanToggle),
    /// Numeric slider.
    Slider(NumberSlider),
    /// Value list.
    List(ValueList),
    /// Dial knob.
    Knob(DialKnob),
    /// Colour picker (not shareable).
    Colour(ColourPicker),
}

impl ParamSource {
    /// Stable instance identifier of the underlying source.
    #[must_use]
    pub fn guid(&self) -> Uuid {
        match self {
            Self::Toggle(toggle) => toggle.guid,
            Self::Slider(slider) => slider.guid,
            Self::List(list) => list.guid,
            Self::Knob(knob) => knob.guid,
            Self::Colour(colour) => colour.guid,
        }
    }

    /// Human-readable kind name, for warnings.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Toggle(_) => "toggle",
            Self::Slider(_) => "slider",
            Self::List(_) => "list",
            Self::Knob(_) => "knob",
            Self::Colour(_) => "colour picker",
        }
    }

    /// Short display name of the underlying source, for warnings.
    #[must_use]
    pub fn nick_name(&self) -> &str {
        match self {
            Self::Toggle(toggle) => &toggle.nick_name,
            Self::Slider(slider) => &slider.nick_name,
            Self::List(list) => &list.nick_name,
            Self::Knob(knob) => &knob.nick_name,
            Self::Colour(colour) => &colour.nick_name,
        }
    }
}

/// The authoritative document: everything one bridge session shares.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Upstream parameter sources, in wiring order.
    pub sources: Vec<ParamSource>,
    /// Localized meshes to share, refreshed by the host each pass.
    pub meshes: Vec<LocalisedMesh>,
    /// Raw geometry-position JSON block (the position channel's payload).
    pub geometry_positions: String,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            meshes: Vec::new(),
            geometry_positions: crate::constants::EMPTY_BATCH.to_string(),
        }
    }
}
