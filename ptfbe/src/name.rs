//! Generates a [name](https://learn.microsoft.com/en-us/typography/opentype/spec/name) table.

use ptfir::template::FontInfo;
use serde::{Deserialize, Serialize};
use write_fonts::{
    tables::name::{Name, NameRecord},
    types::NameId,
    OffsetMarker,
};

pub const DEFAULT_FAMILY: &str = "Prototypo";
pub const DEFAULT_STYLE: &str = "regular";
const VERSION: &str = "Version 1.0";

// Windows, Unicode BMP, en-US
const PLATFORM_ID: u16 = 3;
const ENCODING_ID: u16 = 1;
const LANGUAGE_ID: u16 = 0x409;

/// The naming a binary declares.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportNames {
    pub family: String,
    pub subfamily: String,
    pub postscript_name: String,
    pub unique_id: String,
    pub full_name: String,
    pub version: String,
}

impl Default for ExportNames {
    fn default() -> Self {
        ExportNames::new(None, None)
    }
}

/// "bOLD itaLic" => "Bold italic"
fn capitalize_style(style: &str) -> String {
    let lower = style.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => lower,
    }
}

impl ExportNames {
    /// Names for an exported family and style, defaulting to Prototypo Regular.
    pub fn new(family: Option<&str>, style: Option<&str>) -> ExportNames {
        let family = family
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FAMILY)
            .to_string();
        let subfamily = capitalize_style(style.unwrap_or(DEFAULT_STYLE));
        ExportNames {
            postscript_name: format!("{family}-{subfamily}"),
            unique_id: format!("Prototypo: {family} {subfamily}:2016"),
            full_name: format!("{family} {subfamily}"),
            version: VERSION.to_string(),
            family,
            subfamily,
        }
    }

    /// The names of a live session, taken from the template as is.
    pub fn from_font_info(info: &FontInfo) -> ExportNames {
        let family = info.family_name.as_str();
        let subfamily = info.style_name.as_str();
        ExportNames {
            family: family.to_string(),
            subfamily: subfamily.to_string(),
            postscript_name: format!("{family}-{subfamily}").replace(' ', ""),
            unique_id: format!("Prototypo: {family} {subfamily}:2016"),
            full_name: format!("{family} {subfamily}"),
            version: VERSION.to_string(),
        }
    }

    fn records(&self) -> [(NameId, &str); 8] {
        [
            (NameId::FAMILY_NAME, self.family.as_str()),
            (NameId::SUBFAMILY_NAME, self.subfamily.as_str()),
            (NameId::UNIQUE_ID, self.unique_id.as_str()),
            (NameId::FULL_NAME, self.full_name.as_str()),
            (NameId::VERSION_STRING, self.version.as_str()),
            (NameId::POSTSCRIPT_NAME, self.postscript_name.as_str()),
            (NameId::TYPOGRAPHIC_FAMILY_NAME, self.family.as_str()),
            (NameId::TYPOGRAPHIC_SUBFAMILY_NAME, self.subfamily.as_str()),
        ]
    }
}

pub(crate) fn build_name(names: &ExportNames) -> Name {
    let name_records = names
        .records()
        .into_iter()
        .map(|(name_id, value)| NameRecord {
            name_id,
            platform_id: PLATFORM_ID,
            encoding_id: ENCODING_ID,
            language_id: LANGUAGE_ID,
            string: OffsetMarker::new(value.to_string()),
        })
        .collect::<Vec<_>>();
    Name::new(name_records.into_iter().collect())
}
