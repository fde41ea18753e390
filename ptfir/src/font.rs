//! A parametric font: every glyph instance of a template plus the codepoint map.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use indexmap::IndexMap;
use log::{debug, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    expr::{self, Expr},
    glyph::GlyphInstance,
    graph::{FontSource, GlyphGraphBuilder},
    params::{ManualCursors, ParameterVector, UpdateScope},
    template::{FontInfo, Template},
    types::{Codepoint, Cursor, GlyphName},
};

const X_HEIGHT: &str = "xHeight";
const CAP_DELTA: &str = "capDelta";
const ASCENDER: &str = "ascender";
const DESCENDER: &str = "descender";

/// Vertical font metrics derived from the global parameters.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FontMetrics {
    pub ascender: f64,
    pub descender: f64,
    pub global_height: f64,
}

impl FontMetrics {
    /// Missing inputs count as zero.
    pub fn from_parameters(values: &IndexMap<String, f64>) -> FontMetrics {
        let get = |name: &str| values.get(name).copied().unwrap_or_default();
        let ascender = get(X_HEIGHT) + get(CAP_DELTA).max(get(ASCENDER));
        let descender = get(DESCENDER);
        FontMetrics {
            ascender,
            descender,
            global_height: ascender - descender,
        }
    }
}

#[derive(Debug)]
pub struct ParametricFont {
    source: Arc<FontSource>,
    glyphs: IndexMap<GlyphName, GlyphInstance>,
    /// The active glyph of each codepoint
    char_map: BTreeMap<Codepoint, GlyphName>,
    /// Font-level derived parameters, in declaration order
    parameters: Vec<(String, Expr)>,
    /// Per-glyph cursor overrides set during the session
    manual: HashMap<GlyphName, ManualCursors>,
    metrics: FontMetrics,
}

impl ParametricFont {
    /// Build the graph of every glyph.
    ///
    /// When several glyphs claim a codepoint the first declared is active;
    /// the others are alternates.
    pub fn new(template: Template) -> Result<ParametricFont, Error> {
        let parameters = template
            .parameters
            .iter()
            .map(|(name, formula)| {
                let text = formula.text();
                expr::parse(&text)
                    .map(|e| (name.clone(), e))
                    .map_err(|e| Error::BadFontParameter {
                        name: name.clone(),
                        formula: text.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let source = Arc::new(FontSource::new(template));
        let mut glyphs = IndexMap::new();
        let mut char_map = BTreeMap::new();
        for glyph_source in source.glyphs() {
            let glyph = GlyphGraphBuilder::new(&source).build(&glyph_source.name)?;
            if let Some(unicode) = glyph.unicode() {
                char_map
                    .entry(unicode)
                    .or_insert_with(|| glyph_source.name.clone());
            }
            glyphs.insert(glyph_source.name.clone(), glyph);
        }
        debug!(
            "Built {} glyphs, {} codepoints",
            glyphs.len(),
            char_map.len()
        );

        Ok(ParametricFont {
            source,
            glyphs,
            char_map,
            parameters,
            manual: HashMap::new(),
            metrics: FontMetrics::default(),
        })
    }

    pub fn template(&self) -> &Template {
        self.source.template()
    }

    pub fn info(&self) -> &FontInfo {
        &self.source.template().fontinfo
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// Glyph instances in declaration order
    pub fn glyphs(&self) -> impl Iterator<Item = &GlyphInstance> {
        self.glyphs.values()
    }

    pub fn glyph(&self, name: &str) -> Option<&GlyphInstance> {
        self.glyphs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.glyphs.contains_key(name)
    }

    pub fn char_map(&self) -> &BTreeMap<Codepoint, GlyphName> {
        &self.char_map
    }

    /// Put back a codepoint map taken earlier with [`char_map`](Self::char_map).
    ///
    /// Entries naming glyphs this font does not have are dropped.
    pub fn restore_char_map(&mut self, mut char_map: BTreeMap<Codepoint, GlyphName>) {
        char_map.retain(|_, name| self.glyphs.contains_key(name));
        self.char_map = char_map;
    }

    pub(crate) fn char_map_mut(&mut self) -> &mut BTreeMap<Codepoint, GlyphName> {
        &mut self.char_map
    }

    /// The active glyph of a codepoint.
    pub fn glyph_for(&self, codepoint: Codepoint) -> Option<&GlyphInstance> {
        self.char_map
            .get(&codepoint)
            .and_then(|name| self.glyphs.get(name))
    }

    /// Active glyphs of `codepoints`, first occurrence order, no duplicates.
    ///
    /// Codepoints without a glyph are skipped.
    pub fn resolve(&self, codepoints: impl IntoIterator<Item = Codepoint>) -> Vec<GlyphName> {
        let mut seen = HashSet::new();
        codepoints
            .into_iter()
            .filter_map(|cp| self.char_map.get(&cp))
            .filter(|name| seen.insert(*name))
            .cloned()
            .collect()
    }

    /// Every glyph name, declaration order.
    pub fn glyph_names(&self) -> Vec<GlyphName> {
        self.glyphs.keys().cloned().collect()
    }

    /// The solving order of every glyph, `None` for glyphs with a cycle.
    pub fn solving_orders(&mut self) -> IndexMap<GlyphName, Option<Vec<Cursor>>> {
        self.glyphs
            .iter_mut()
            .map(|(name, glyph)| (name.clone(), glyph.solving_order_cursors()))
            .collect()
    }

    /// Global values plus the font-level derived parameters.
    pub fn scope(&self, vector: &ParameterVector) -> IndexMap<String, f64> {
        let mut scope = vector.values.clone();
        for (name, formula) in self.parameters.iter() {
            let value = formula.eval(&|reference| scope.get(reference).copied());
            match value {
                Ok(value) => {
                    scope.insert(name.clone(), value);
                }
                Err(e) => warn!("Font parameter '{name}' skipped: {e}"),
            }
        }
        scope
    }

    /// Apply `vector` to `set`, or to every glyph.
    ///
    /// Glyphs that fail to compute keep their last good geometry; the failure
    /// is logged, never returned.
    pub fn update(&mut self, vector: &ParameterVector, set: Option<&[GlyphName]>) {
        for (codepoint, name) in vector.alt_list.iter() {
            if self.char_map.get(codepoint) != Some(name) {
                if let Err(e) = self.set_alternate_for(*codepoint, name) {
                    warn!("Alternate for U+{codepoint:04X} skipped: {e}");
                }
            }
        }

        let scope = self.scope(vector);
        self.metrics = FontMetrics::from_parameters(&scope);
        let update_scope = UpdateScope {
            base: &scope,
            vector,
            manual: &self.manual,
        };

        let wanted: Option<HashSet<&GlyphName>> = set.map(|s| s.iter().collect());
        let mut targets: Vec<&mut GlyphInstance> = self
            .glyphs
            .values_mut()
            .filter(|g| wanted.as_ref().map_or(true, |w| w.contains(g.name())))
            .collect();
        trace!("Update {} glyphs", targets.len());
        targets.par_iter_mut().for_each(|glyph| {
            if let Err(e) = glyph.update(update_scope) {
                warn!("'{}' keeps its previous geometry: {e}", glyph.name());
            }
        });
    }

    /// Put every glyph's components back on their default choices.
    pub fn reset_components(&mut self) -> Result<(), Error> {
        for glyph in self.glyphs.values_mut() {
            glyph.reset_components()?;
        }
        Ok(())
    }

    /// Store per-cursor overrides for the active glyph of `codepoint`.
    ///
    /// They are merged over earlier overrides and take effect on the next
    /// update of that glyph.
    pub fn change_cursors_to_manual(
        &mut self,
        codepoint: Codepoint,
        cursors: ManualCursors,
    ) -> Result<GlyphName, Error> {
        let name = self
            .char_map
            .get(&codepoint)
            .cloned()
            .ok_or(Error::UnmappedCodepoint(codepoint))?;
        self.manual
            .entry(name.clone())
            .or_default()
            .extend(cursors);
        Ok(name)
    }
}
