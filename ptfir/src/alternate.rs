//! Remapping codepoints to alternate glyphs.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, MissingAlternateError},
    font::ParametricFont,
    types::{Codepoint, GlyphName},
};

/// One applied remap.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlternateChange {
    pub codepoint: Codepoint,
    pub new_name: GlyphName,
}

impl ParametricFont {
    /// Make `name` the active glyph of `codepoint`, and nothing else.
    pub fn set_alternate_for(&mut self, codepoint: Codepoint, name: &GlyphName) -> Result<(), Error> {
        if !self.contains(name.as_str()) {
            return Err(Error::UnknownGlyph(name.clone()));
        }
        debug!("U+{codepoint:04X} => '{name}'");
        self.char_map_mut().insert(codepoint, name.clone());
        Ok(())
    }

    /// Make `name` the active glyph of `codepoint` and carry the switch over
    /// to the glyphs related to the current one.
    ///
    /// The alternate of a related glyph is found by substituting the base
    /// segment of its name: `a_acute` with base `a` becomes `a.alt_acute` when
    /// `a.alt` is chosen. Related glyphs without such an alternate are left
    /// alone.
    pub fn set_alternates_for(
        &mut self,
        codepoint: Codepoint,
        name: &GlyphName,
    ) -> Result<Vec<AlternateChange>, Error> {
        let next = self
            .template()
            .glyph(name.as_str())
            .ok_or_else(|| Error::UnknownGlyph(name.clone()))?;
        let next_base = next.base.clone().unwrap_or_else(|| next.name.to_string());

        let mut remaps = Vec::new();
        let current = self
            .char_map()
            .get(&codepoint)
            .and_then(|current| self.template().glyph(current.as_str()));
        for related_name in current.map(|c| c.related_glyphs.as_slice()).unwrap_or_default() {
            let Some(related) = self.template().glyph(related_name.as_str()) else {
                continue;
            };
            let Some(related_codepoint) = related.unicode else {
                continue;
            };
            let pattern = related.base.as_deref().unwrap_or(related.name.as_str());
            let alternate = GlyphName::from(related.name.as_str().replacen(pattern, &next_base, 1));
            if !self.contains(alternate.as_str()) {
                let missing = MissingAlternateError {
                    related: related.name.clone(),
                    alternate,
                };
                warn!("{missing}");
                continue;
            }
            remaps.push(AlternateChange {
                codepoint: related_codepoint,
                new_name: alternate,
            });
        }
        remaps.push(AlternateChange {
            codepoint,
            new_name: name.clone(),
        });

        for remap in remaps.iter() {
            self.set_alternate_for(remap.codepoint, &remap.new_name)?;
        }
        Ok(remaps)
    }
}
