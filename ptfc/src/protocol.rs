//! Messages between callers and the compilation worker.

use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use indexmap::IndexMap;
use log::debug;
use ptfir::{
    params::{ManualCursors, ParameterVector},
    types::{Codepoint, Cursor, GlyphName},
};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

const KINDS: &[&str] = &[
    "font",
    "update",
    "subset",
    "alternate",
    "soloAlternate",
    "getGlyphsProperties",
    "otfFont",
    "changeCursorsToManual",
];

/// One property name or several.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Properties {
    One(String),
    Many(Vec<String>),
}

impl Properties {
    pub fn names(&self) -> &[String] {
        match self {
            Properties::One(name) => std::slice::from_ref(name),
            Properties::Many(names) => names,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    /// Load a template by identifier and build its font.
    #[serde(rename_all = "camelCase")]
    Font {
        name: String,
        /// The caller's name for the font
        #[serde(default)]
        db: Option<String>,
    },
    /// Apply a fully merged parameter vector.
    Update { data: ParameterVector },
    /// Replace, or append to, the text of a subset origin.
    Subset {
        data: String,
        #[serde(default)]
        add: bool,
        #[serde(default)]
        origin: Option<String>,
    },
    /// Several remaps at once, or a single one.
    ///
    /// Map keys are decimal codepoints.
    #[serde(rename_all = "camelCase")]
    Alternate {
        #[serde(default)]
        alt_list: Option<IndexMap<String, GlyphName>>,
        #[serde(default)]
        unicode: Option<Codepoint>,
        #[serde(default)]
        glyph_name: Option<GlyphName>,
    },
    #[serde(rename_all = "camelCase")]
    SoloAlternate {
        unicode: Codepoint,
        glyph_name: GlyphName,
    },
    GetGlyphsProperties { properties: Properties },
    /// Export every glyph, named for distribution.
    OtfFont {
        #[serde(default)]
        family: Option<String>,
        #[serde(default)]
        style: Option<String>,
        #[serde(default)]
        values: Option<ParameterVector>,
    },
    #[serde(rename_all = "camelCase")]
    ChangeCursorsToManual {
        glyph_unicode: Codepoint,
        cursors: ManualCursors,
    },
}

impl Request {
    /// Parse a message, `None` if its type is not one we handle.
    pub fn decode(message: &str) -> Result<Option<Request>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(message)?;
        let kind = value.get("type").and_then(|k| k.as_str());
        if !kind.is_some_and(|k| KINDS.contains(&k)) {
            debug!("Dropping message of type {kind:?}");
            return Ok(None);
        }
        serde_json::from_value(value).map(Some)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Request::Font { .. } => "font",
            Request::Update { .. } => "update",
            Request::Subset { .. } => "subset",
            Request::Alternate { .. } => "alternate",
            Request::SoloAlternate { .. } => "soloAlternate",
            Request::GetGlyphsProperties { .. } => "getGlyphsProperties",
            Request::OtfFont { .. } => "otfFont",
            Request::ChangeCursorsToManual { .. } => "changeCursorsToManual",
        }
    }
}

/// Codepoint to property name to value; `None` where a glyph lacks the property.
pub type GlyphProperties = BTreeMap<Codepoint, IndexMap<String, Option<f64>>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The solving order of every glyph, `None` for glyphs with a cycle
    FontLoaded {
        solving_orders: IndexMap<GlyphName, Option<Vec<Cursor>>>,
    },
    /// A compiled font
    Binary(Arc<[u8]>),
    /// The request was applied, there was nothing to compile
    Acknowledged,
    Props { result: GlyphProperties },
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Response::FontLoaded { .. } => "fontLoaded",
            Response::Binary(..) => "binary",
            Response::Acknowledged => "acknowledged",
            Response::Props { .. } => "props",
        }
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Binary(bytes) => write!(f, "binary of {} bytes", bytes.len()),
            _ => f.write_str(self.kind()),
        }
    }
}

/// The wire shape: `{solvingOrders, handler: "font"}`, raw bytes, `true`, or
/// `{type: "props", result}`.
impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Response::FontLoaded { solving_orders } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("solvingOrders", solving_orders)?;
                map.serialize_entry("handler", "font")?;
                map.end()
            }
            Response::Binary(bytes) => serializer.serialize_bytes(bytes),
            Response::Acknowledged => serializer.serialize_bool(true),
            Response::Props { result } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "props")?;
                map.serialize_entry("result", result)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_requests() {
        assert_eq!(
            Some(Request::Subset {
                data: "abc".to_string(),
                add: true,
                origin: Some("ui".to_string()),
            }),
            Request::decode(r#"{"type": "subset", "data": "abc", "add": true, "origin": "ui"}"#)
                .unwrap()
        );
        assert_eq!(
            Some(Request::SoloAlternate {
                unicode: 97,
                glyph_name: "a.alt".into(),
            }),
            Request::decode(r#"{"type": "soloAlternate", "unicode": 97, "glyphName": "a.alt"}"#)
                .unwrap()
        );
        assert_eq!(
            Some(Request::GetGlyphsProperties {
                properties: Properties::One("advanceWidth".to_string()),
            }),
            Request::decode(r#"{"type": "getGlyphsProperties", "properties": "advanceWidth"}"#)
                .unwrap()
        );
    }

    #[test]
    fn decode_update() {
        let Some(Request::Update { data }) =
            Request::decode(r#"{"type": "update", "data": {"thickness": 90, "altList": {"97": "a.alt"}}}"#)
                .unwrap()
        else {
            panic!("expected an update");
        };
        assert_eq!(Some(90.0), data.get("thickness"));
        assert_eq!(Some(&GlyphName::from("a.alt")), data.alt_list.get(&97));
    }

    #[test]
    fn unknown_types_are_dropped() {
        assert_eq!(None, Request::decode(r#"{"type": "reboot"}"#).unwrap());
        assert_eq!(None, Request::decode(r#"{"data": 1}"#).unwrap());
        assert!(Request::decode("not json").is_err());
    }

    #[test]
    fn malformed_known_type_is_an_error() {
        assert!(Request::decode(r#"{"type": "soloAlternate", "unicode": "a"}"#).is_err());
    }

    #[test]
    fn response_wire_shapes() {
        let loaded = Response::FontLoaded {
            solving_orders: [(GlyphName::from("a"), Some(vec!["width".into()]))]
                .into_iter()
                .collect(),
        };
        assert_eq!(
            json!({"solvingOrders": {"a": ["width"]}, "handler": "font"}),
            serde_json::to_value(&loaded).unwrap()
        );
        let props = Response::Props {
            result: [(97, [("advanceWidth".to_string(), Some(120.0))].into_iter().collect())]
                .into_iter()
                .collect(),
        };
        assert_eq!(
            json!({"type": "props", "result": {"97": {"advanceWidth": 120.0}}}),
            serde_json::to_value(&props).unwrap()
        );
        assert_eq!(json!(true), serde_json::to_value(Response::Acknowledged).unwrap());
    }
}
