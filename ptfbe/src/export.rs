//! What a backend needs to know about a font: the glyphs to export, in
//! order, with their outlines and metrics.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use kurbo::BezPath;
use log::{debug, trace};
use ptfir::{
    font::{FontMetrics, ParametricFont},
    types::{Codepoint, GlyphName},
};

use crate::{name::ExportNames, os2::StyleClass};

const X_HEIGHT: &str = "xHeight";
const CAP_DELTA: &str = "capDelta";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportGlyph {
    pub name: GlyphName,
    /// Codepoints currently mapped to this glyph, ascending
    pub codepoints: Vec<Codepoint>,
    pub outline: BezPath,
    pub advance_width: f64,
}

/// A font ready for binary serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFont {
    pub units_per_em: u16,
    pub metrics: FontMetrics,
    pub x_height: f64,
    pub cap_height: f64,
    pub names: ExportNames,
    pub style: StyleClass,
    /// `.notdef` first
    pub glyphs: Vec<ExportGlyph>,
}

impl ExportFont {
    /// Collect `glyphs` of `font`, skipping duplicates and unknown names.
    ///
    /// `values` are the merged global values the font was last updated with.
    pub fn new(
        font: &ParametricFont,
        glyphs: &[GlyphName],
        values: &IndexMap<String, f64>,
        names: ExportNames,
        style: StyleClass,
    ) -> ExportFont {
        let units_per_em = font.info().units_per_em;
        let mut codepoints: BTreeMap<&GlyphName, Vec<Codepoint>> = BTreeMap::new();
        for (codepoint, name) in font.char_map().iter() {
            codepoints.entry(name).or_default().push(*codepoint);
        }

        let mut seen = HashSet::new();
        let mut export = vec![notdef(font, units_per_em)];
        seen.insert(GlyphName::NOTDEF);
        for name in glyphs.iter() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(glyph) = font.glyph(name.as_str()) else {
                trace!("'{name}' is not in the font, not exported");
                continue;
            };
            export.push(ExportGlyph {
                name: name.clone(),
                codepoints: codepoints.get(name).cloned().unwrap_or_default(),
                outline: glyph.outline().clone(),
                advance_width: glyph.metrics().advance_width,
            });
        }
        debug!("Exporting {} glyphs", export.len());

        let metrics = *font.metrics();
        let x_height = values.get(X_HEIGHT).copied().unwrap_or_default();
        let cap_height = match values.get(CAP_DELTA) {
            Some(delta) => x_height + delta,
            None => metrics.ascender,
        };
        ExportFont {
            units_per_em,
            metrics,
            x_height,
            cap_height,
            names,
            style,
            glyphs: export,
        }
    }

    pub fn glyph_names(&self) -> impl Iterator<Item = &GlyphName> {
        self.glyphs.iter().map(|g| &g.name)
    }
}

/// The template's own `.notdef`, or an empty one half an em wide.
fn notdef(font: &ParametricFont, units_per_em: u16) -> ExportGlyph {
    match font.glyph(GlyphName::NOTDEF.as_str()) {
        Some(glyph) => ExportGlyph {
            name: GlyphName::NOTDEF,
            codepoints: Vec::new(),
            outline: glyph.outline().clone(),
            advance_width: glyph.metrics().advance_width,
        },
        None => ExportGlyph {
            name: GlyphName::NOTDEF,
            codepoints: Vec::new(),
            outline: BezPath::new(),
            advance_width: units_per_em as f64 / 2.0,
        },
    }
}
