//! Basic types shared by the IR and the backend.

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A unicode scalar value as it appears in templates and requests.
pub type Codepoint = u32;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GlyphName(SmolStr);

impl GlyphName {
    /// The name of the undefined glyph
    pub const NOTDEF: GlyphName = GlyphName(SmolStr::new_inline(".notdef"));

    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for GlyphName {
    fn from(value: String) -> Self {
        GlyphName(value.into())
    }
}

impl From<&str> for GlyphName {
    fn from(value: &str) -> Self {
        GlyphName(value.into())
    }
}

impl Debug for GlyphName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for GlyphName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// lets name-keyed maps and sets be queried with &str
impl std::borrow::Borrow<str> for GlyphName {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl PartialEq<&str> for GlyphName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// The address of one computable property of a glyph, e.g. `contours.0.nodes.1.x`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor(SmolStr);

impl Cursor {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// True if `prefix` names this cursor or one of its ancestors.
    ///
    /// `contours.0.nodes.1` is a prefix of `contours.0.nodes.1.x` but
    /// `contours.0.nodes.1` is not a prefix of `contours.0.nodes.10.x`.
    pub fn starts_with_segments(&self, prefix: &str) -> bool {
        let s = self.as_str();
        s == prefix
            || (s.len() > prefix.len()
                && s.starts_with(prefix)
                && s.as_bytes()[prefix.len()] == b'.')
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Cursor(value.into())
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Cursor(value.into())
    }
}

impl Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::borrow::Borrow<str> for Cursor {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}
