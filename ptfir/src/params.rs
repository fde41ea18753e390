//! Parameter vectors and the per-glyph merge of their scopes.
//!
//! A vector arrives as one flat JSON object: numeric entries are the global
//! scope, a handful of well-known keys carry structural directives.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::Error,
    types::{Codepoint, GlyphName},
};

const ALT_LIST: &str = "altList";
const INDIV_GLYPHS: &str = "indiv_glyphs";
const INDIV_GROUP_PARAM: &str = "indiv_group_param";
const GLYPH_SPECIAL_PROPS: &str = "glyphSpecialProps";
const GLYPH_COMPONENT_CHOICE: &str = "glyphComponentChoice";
const MANUAL_CHANGES: &str = "manualChanges";

pub const SPACING_LEFT: &str = "spacingLeft";
pub const SPACING_RIGHT: &str = "spacingRight";

/// Per-node overrides of one glyph, keyed by cursor
pub type ManualCursors = IndexMap<String, f64>;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ManualChanges {
    #[serde(default)]
    pub cursors: ManualCursors,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RelationState {
    Relative,
    Absolute,
}

/// An entry of an individualization group.
///
/// `thickness: 120` sets the value outright, `thickness_rel: {state, value}`
/// scales (relative) or offsets (absolute) the global value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum GroupEntry {
    Value(f64),
    Relation { state: RelationState, value: f64 },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(try_from = "IndexMap<String, Value>", into = "IndexMap<String, Value>")]
pub struct ParameterVector {
    /// Global scope
    pub values: IndexMap<String, f64>,
    /// Codepoint to the glyph that should answer it
    pub alt_list: IndexMap<Codepoint, GlyphName>,
    /// Codepoint to individualization group
    pub indiv_glyphs: IndexMap<Codepoint, String>,
    pub indiv_group_param: IndexMap<String, IndexMap<String, GroupEntry>>,
    /// Additive deltas per codepoint
    pub glyph_special_props: IndexMap<Codepoint, IndexMap<String, f64>>,
    /// Codepoint to component id to chosen glyph
    pub glyph_component_choice: IndexMap<Codepoint, IndexMap<String, GlyphName>>,
    pub manual_changes: IndexMap<GlyphName, ManualChanges>,
}

fn directive<T: serde::de::DeserializeOwned + Default>(
    raw: &mut IndexMap<String, Value>,
    key: &str,
) -> Result<T, serde_json::Error> {
    match raw.shift_remove(key) {
        Some(Value::Null) | None => Ok(T::default()),
        Some(value) => serde_json::from_value(value),
    }
}

impl TryFrom<IndexMap<String, Value>> for ParameterVector {
    type Error = serde_json::Error;

    fn try_from(mut raw: IndexMap<String, Value>) -> Result<Self, Self::Error> {
        let alt_list = directive(&mut raw, ALT_LIST)?;
        let indiv_glyphs = directive(&mut raw, INDIV_GLYPHS)?;
        let indiv_group_param = directive(&mut raw, INDIV_GROUP_PARAM)?;
        let glyph_special_props = directive(&mut raw, GLYPH_SPECIAL_PROPS)?;
        let glyph_component_choice = directive(&mut raw, GLYPH_COMPONENT_CHOICE)?;
        let manual_changes = directive(&mut raw, MANUAL_CHANGES)?;
        let values = raw
            .into_iter()
            .filter_map(|(name, value)| match value.as_f64() {
                Some(v) => Some((name, v)),
                None => {
                    trace!("Ignoring non-numeric parameter '{name}'");
                    None
                }
            })
            .collect();
        Ok(ParameterVector {
            values,
            alt_list,
            indiv_glyphs,
            indiv_group_param,
            glyph_special_props,
            glyph_component_choice,
            manual_changes,
        })
    }
}

fn insert_directive<T: Serialize>(
    raw: &mut IndexMap<String, Value>,
    key: &str,
    directive: &IndexMap<impl Serialize, T>,
) {
    if directive.is_empty() {
        return;
    }
    if let Ok(value) = serde_json::to_value(directive) {
        raw.insert(key.to_string(), value);
    }
}

impl From<ParameterVector> for IndexMap<String, Value> {
    fn from(vector: ParameterVector) -> Self {
        let mut raw: IndexMap<String, Value> = vector
            .values
            .iter()
            .map(|(name, v)| (name.clone(), Value::from(*v)))
            .collect();
        insert_directive(&mut raw, ALT_LIST, &vector.alt_list);
        insert_directive(&mut raw, INDIV_GLYPHS, &vector.indiv_glyphs);
        insert_directive(&mut raw, INDIV_GROUP_PARAM, &vector.indiv_group_param);
        insert_directive(&mut raw, GLYPH_SPECIAL_PROPS, &vector.glyph_special_props);
        insert_directive(&mut raw, GLYPH_COMPONENT_CHOICE, &vector.glyph_component_choice);
        insert_directive(&mut raw, MANUAL_CHANGES, &vector.manual_changes);
        raw
    }
}

impl ParameterVector {
    pub fn from_json(source: &str) -> Result<ParameterVector, Error> {
        serde_json::from_str(source).map_err(Error::ParameterParse)
    }

    /// A vector holding only global values.
    pub fn from_values(values: impl IntoIterator<Item = (String, f64)>) -> ParameterVector {
        ParameterVector {
            values: values.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// What a glyph update reads besides its own cells.
#[derive(Debug, Clone, Copy)]
pub struct UpdateScope<'a> {
    /// The values the cascade starts from: font-level values for a glyph,
    /// the parent's merged values for a component
    pub base: &'a IndexMap<String, f64>,
    pub vector: &'a ParameterVector,
    /// Overrides stored by the session, on top of those in `vector`
    pub manual: &'a HashMap<GlyphName, ManualCursors>,
}

impl<'a> UpdateScope<'a> {
    pub fn with_base(self, base: &'a IndexMap<String, f64>) -> UpdateScope<'a> {
        UpdateScope { base, ..self }
    }
}

/// The fully merged parameters of one glyph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphParameters {
    pub values: IndexMap<String, f64>,
    /// Spacing before special-property deltas
    pub base_spacing_left: Option<f64>,
    pub base_spacing_right: Option<f64>,
    pub spacing_left: Option<f64>,
    pub spacing_right: Option<f64>,
    /// Additive per-cursor deltas, applied after each formula
    pub manual: ManualCursors,
}

fn individualize(base: f64, param: &str, group: &IndexMap<String, GroupEntry>) -> f64 {
    if let Some(GroupEntry::Value(value)) = group.get(param) {
        return *value;
    }
    match group.get(&format!("{param}_rel")) {
        Some(GroupEntry::Relation {
            state: RelationState::Absolute,
            value,
        }) => base + value,
        Some(GroupEntry::Relation {
            state: RelationState::Relative,
            value,
        }) => base * value,
        _ => base,
    }
}

/// Merge every scope that applies to one glyph.
///
/// Low to high: base values, individualization group, special-property
/// deltas, parent parameters. Manual cursor overrides are carried alongside
/// and applied last, per cell.
pub fn resolve(
    scope: UpdateScope,
    name: &GlyphName,
    unicode: Option<Codepoint>,
    parent: &IndexMap<String, f64>,
) -> GlyphParameters {
    let vector = scope.vector;
    let mut values = scope.base.clone();

    let group = unicode
        .and_then(|u| vector.indiv_glyphs.get(&u))
        .map(|group| vector.indiv_group_param.get(group));
    if let Some(group) = group {
        let empty = IndexMap::new();
        let group = group.unwrap_or(&empty);
        for (param, value) in values.iter_mut() {
            *value = individualize(*value, param, group);
        }
    }
    values.extend(parent.iter().map(|(k, v)| (k.clone(), *v)));

    let base_spacing_left = values.get(SPACING_LEFT).copied();
    let base_spacing_right = values.get(SPACING_RIGHT).copied();

    if let Some(deltas) = unicode.and_then(|u| vector.glyph_special_props.get(&u)) {
        for (property, delta) in deltas {
            *values.entry(property.clone()).or_default() += delta;
        }
    }

    // parent parameters always have the final word
    values.extend(parent.iter().map(|(k, v)| (k.clone(), *v)));

    let mut manual = vector
        .manual_changes
        .get(name)
        .map(|m| m.cursors.clone())
        .unwrap_or_default();
    if let Some(stored) = scope.manual.get(name) {
        manual.extend(stored.iter().map(|(k, v)| (k.clone(), *v)));
    }

    GlyphParameters {
        spacing_left: values.get(SPACING_LEFT).copied(),
        spacing_right: values.get(SPACING_RIGHT).copied(),
        values,
        base_spacing_left,
        base_spacing_right,
        manual,
    }
}
