//! The declarative, parametric font source.
//!
//! A template is read from JSON. Sources arriving over the wire are sometimes
//! encoded twice (a JSON string whose content is the template JSON); both
//! forms are accepted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    types::{Codepoint, GlyphName},
};

pub const DEFAULT_FAMILY_NAME: &str = "Prototypo";
pub const DEFAULT_STYLE_NAME: &str = "Regular";
pub const DEFAULT_UNITS_PER_EM: u16 = 1000;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub fontinfo: FontInfo,
    #[serde(default)]
    pub controls: Vec<Control>,
    /// Font-level derived parameters, evaluated over the global scope
    #[serde(default)]
    pub parameters: IndexMap<String, Formula>,
    pub glyphs: IndexMap<String, GlyphSource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FontInfo {
    #[serde(default = "default_family_name")]
    pub family_name: String,
    #[serde(default = "default_style_name")]
    pub style_name: String,
    #[serde(default = "default_units_per_em")]
    pub units_per_em: u16,
}

fn default_family_name() -> String {
    DEFAULT_FAMILY_NAME.to_string()
}

fn default_style_name() -> String {
    DEFAULT_STYLE_NAME.to_string()
}

fn default_units_per_em() -> u16 {
    DEFAULT_UNITS_PER_EM
}

impl Default for FontInfo {
    fn default() -> Self {
        FontInfo {
            family_name: default_family_name(),
            style_name: default_style_name(),
            units_per_em: default_units_per_em(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Control {
    #[serde(default)]
    pub parameters: Vec<ControlParameter>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ControlParameter {
    pub name: String,
    pub init: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlyphSource {
    pub name: GlyphName,
    #[serde(default)]
    pub unicode: Option<Codepoint>,
    #[serde(default)]
    pub contours: Vec<ContourSource>,
    #[serde(default)]
    pub components: Vec<ComponentSource>,
    /// Glyphs built from this one (e.g. accented forms), consulted when an alternate is chosen
    #[serde(default)]
    pub related_glyphs: Vec<GlyphName>,
    /// The segment of the name shared with related glyphs
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub parameters: IndexMap<String, Formula>,
    #[serde(default)]
    pub properties: IndexMap<String, Formula>,
    #[serde(default)]
    pub transforms: Vec<TransformSource>,
    #[serde(default)]
    pub transform_origin: Option<PointSource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContourSource {
    pub nodes: Vec<NodeSource>,
    #[serde(default)]
    pub skeleton: bool,
    #[serde(default = "default_closed")]
    pub closed: bool,
    #[serde(default)]
    pub transforms: Vec<TransformSource>,
    #[serde(default)]
    pub transform_origin: Option<PointSource>,
}

fn default_closed() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSource {
    pub x: Formula,
    pub y: Formula,
    #[serde(default)]
    pub dir_in: Option<Formula>,
    #[serde(default)]
    pub dir_out: Option<Formula>,
    #[serde(default)]
    pub tension_in: Option<Formula>,
    #[serde(default)]
    pub tension_out: Option<Formula>,
    #[serde(default)]
    pub expand: Option<ExpandSource>,
    #[serde(default)]
    pub transforms: Vec<TransformSource>,
    #[serde(default)]
    pub transform_origin: Option<PointSource>,
}

/// How a skeleton node expands into its two drawable counterparts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExpandSource {
    pub width: Formula,
    /// Degrees
    pub angle: Formula,
    #[serde(default = "default_distr")]
    pub distr: Formula,
}

fn default_distr() -> Formula {
    Formula::Constant(0.5)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSource {
    pub id: String,
    pub base: ComponentBase,
    /// Evaluated in the parent glyph, handed to the component as parameters that always win
    #[serde(default)]
    pub parameters: IndexMap<String, Formula>,
    #[serde(default)]
    pub transforms: Vec<TransformSource>,
    #[serde(default)]
    pub transform_origin: Option<PointSource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ComponentBase {
    Single(GlyphName),
    Choices(Vec<GlyphName>),
}

impl ComponentBase {
    pub fn choices(&self) -> &[GlyphName] {
        match self {
            ComponentBase::Single(name) => std::slice::from_ref(name),
            ComponentBase::Choices(names) => names,
        }
    }

    /// The choice a freshly built (or reset) component uses.
    pub fn default_choice(&self) -> Option<&GlyphName> {
        self.choices().first()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PointSource {
    pub x: Formula,
    pub y: Formula,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransformKind {
    Rotate,
    Scale,
    ScaleX,
    ScaleY,
    SkewX,
    SkewY,
    Translate,
    TranslateX,
    TranslateY,
}

/// One transform operation, `["rotate", 15]` or `["translate", 10, "xHeight"]` in JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum TransformSource {
    Unary(TransformKind, Formula),
    Binary(TransformKind, Formula, Formula),
}

impl TransformSource {
    pub fn kind(&self) -> TransformKind {
        match self {
            TransformSource::Unary(kind, _) | TransformSource::Binary(kind, ..) => *kind,
        }
    }

    pub fn args(&self) -> Vec<&Formula> {
        match self {
            TransformSource::Unary(_, a) => vec![a],
            TransformSource::Binary(_, a, b) => vec![a, b],
        }
    }
}

/// A property value: constant, expression, or annotated expression.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Formula {
    Constant(f64),
    Expression(String),
    Annotated {
        #[serde(rename = "_operation")]
        operation: String,
        #[serde(rename = "_dependencies", default)]
        dependencies: Vec<String>,
    },
}

impl Formula {
    pub fn explicit_dependencies(&self) -> &[String] {
        match self {
            Formula::Annotated { dependencies, .. } => dependencies,
            _ => &[],
        }
    }

    pub fn text(&self) -> String {
        match self {
            Formula::Constant(value) => value.to_string(),
            Formula::Expression(text) | Formula::Annotated { operation: text, .. } => {
                text.clone()
            }
        }
    }
}

impl From<f64> for Formula {
    fn from(value: f64) -> Self {
        Formula::Constant(value)
    }
}

impl From<&str> for Formula {
    fn from(value: &str) -> Self {
        Formula::Expression(value.to_string())
    }
}

impl Template {
    /// Parse a template, tolerating a source that was JSON-encoded twice.
    ///
    /// Objects are read straight into the model so declaration order survives.
    pub fn from_json(source: &str) -> Result<Template, Error> {
        serde_json::from_str::<Template>(source)
            .or_else(|direct| match serde_json::from_str::<String>(source) {
                Ok(inner) => serde_json::from_str(&inner),
                Err(_) => Err(direct),
            })
            .map_err(Error::TemplateParse)
    }

    /// The initial value of every control parameter, in declaration order.
    pub fn init_values(&self) -> IndexMap<String, f64> {
        self.controls
            .iter()
            .flat_map(|c| c.parameters.iter())
            .map(|p| (p.name.clone(), p.init))
            .collect()
    }

    pub fn glyph(&self, name: &str) -> Option<&GlyphSource> {
        self.glyphs.values().find(|g| g.name.as_str() == name)
    }
}
