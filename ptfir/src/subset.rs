//! The live subset: the glyphs the session currently needs.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::debug;

use crate::{
    font::ParametricFont,
    types::{Codepoint, GlyphName},
};

/// The origin of subset requests that name none.
pub const DEFAULT_ORIGIN: &str = "native";

/// Per-origin text whose characters make up the live subset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubsetTracker {
    origins: IndexMap<String, String>,
}

impl SubsetTracker {
    /// Replace the text of `origin`, or append to it if `add`.
    pub fn apply(&mut self, origin: Option<&str>, text: &str, add: bool) {
        let origin = origin.unwrap_or(DEFAULT_ORIGIN);
        let entry = self.origins.entry(origin.to_string()).or_default();
        if add {
            entry.push_str(text);
        } else {
            *entry = text.to_string();
        }
        debug!("Subset origin '{origin}' holds {} chars", entry.chars().count());
    }

    /// True until the first request arrives.
    pub fn is_unset(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn origin(&self, origin: &str) -> Option<&str> {
        self.origins.get(origin).map(String::as_str)
    }

    /// Codepoints of every origin, concatenated in order of first request.
    pub fn codepoints(&self) -> impl Iterator<Item = Codepoint> + '_ {
        self.origins
            .values()
            .flat_map(|text| text.chars())
            .map(Codepoint::from)
    }

    /// The active glyphs of the subset, no duplicates.
    ///
    /// Before any request every mapped glyph is live.
    pub fn resolve(&self, font: &ParametricFont) -> Vec<GlyphName> {
        if self.is_unset() {
            font.resolve(font.char_map().keys().copied())
        } else {
            font.resolve(self.codepoints())
        }
    }
}

/// Glyphs in `current` that `previous` lacks, in `current` order.
pub fn added(previous: &[GlyphName], current: &[GlyphName]) -> Vec<GlyphName> {
    let previous: HashSet<&GlyphName> = previous.iter().collect();
    current
        .iter()
        .filter(|name| !previous.contains(name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::font::tests::font;

    use super::*;

    fn names(names: &[&str]) -> Vec<GlyphName> {
        names.iter().map(|n| GlyphName::from(*n)).collect()
    }

    #[test]
    fn add_appends_and_replace_replaces() {
        let mut subset = SubsetTracker::default();
        assert!(subset.is_unset());
        subset.apply(None, "ab", false);
        subset.apply(None, "c", true);
        assert_eq!(Some("abc"), subset.origin(DEFAULT_ORIGIN));
        subset.apply(None, "z", false);
        assert_eq!(Some("z"), subset.origin(DEFAULT_ORIGIN));
    }

    #[test]
    fn origins_are_merged() {
        let mut subset = SubsetTracker::default();
        subset.apply(Some("ui"), "ba", false);
        subset.apply(None, "ab\u{1E03}", false);
        assert_eq!(
            vec![98, 97, 97, 98, 0x1E03],
            subset.codepoints().collect::<Vec<_>>()
        );
        let font = font();
        assert_eq!(names(&["b", "a", "bdot"]), subset.resolve(&font));
    }

    #[test]
    fn sequential_adds_keep_everything() {
        let font = font();
        let mut subset = SubsetTracker::default();
        subset.apply(Some("editor"), "a", true);
        subset.apply(Some("editor"), "b", true);
        let live = subset.resolve(&font);
        assert!(live.contains(&"a".into()) && live.contains(&"b".into()));
    }

    #[test]
    fn unset_subset_is_every_mapped_glyph() {
        let font = font();
        assert_eq!(
            names(&["a", "b", "a_acute", "bdot"]),
            SubsetTracker::default().resolve(&font)
        );
    }

    #[test]
    fn diff_finds_new_glyphs() {
        assert_eq!(
            names(&["c"]),
            added(&names(&["a", "b"]), &names(&["b", "c", "a"]))
        );
    }
}
