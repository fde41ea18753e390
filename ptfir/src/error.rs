use std::fmt::Display;

use thiserror::Error;

use crate::types::{Codepoint, Cursor, GlyphName};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to parse template: {0}")]
    TemplateParse(#[source] serde_json::Error),
    #[error("Unable to parse parameters: {0}")]
    ParameterParse(#[source] serde_json::Error),
    #[error("'{0}' is not a glyph of this template")]
    UnknownGlyph(GlyphName),
    #[error("No glyph is mapped to U+{0:04X}")]
    UnmappedCodepoint(Codepoint),
    #[error("'{glyph}' {cursor}: bad formula '{formula}': {reason}")]
    BadFormula {
        glyph: GlyphName,
        cursor: Cursor,
        formula: String,
        reason: String,
    },
    #[error("Font parameter '{name}': bad formula '{formula}': {reason}")]
    BadFontParameter {
        name: String,
        formula: String,
        reason: String,
    },
    #[error("'{glyph}' {cursor}: {reason}")]
    Evaluation {
        glyph: GlyphName,
        cursor: Cursor,
        reason: String,
    },
    #[error("'{glyph}' has no component '{component}'")]
    UnknownComponent {
        glyph: GlyphName,
        component: String,
    },
    #[error("'{glyph}' component '{component}' offers no choice '{choice}'")]
    UnknownComponentChoice {
        glyph: GlyphName,
        component: String,
        choice: GlyphName,
    },
    #[error("Component cycle through {0:?}")]
    ComponentCycle(Vec<GlyphName>),
    #[error("'{glyph}' transform {kind} expects {expected} argument(s), got {actual}")]
    TransformArity {
        glyph: GlyphName,
        kind: String,
        expected: &'static str,
        actual: usize,
    },
    #[error(transparent)]
    GraphCycle(#[from] GraphCycleError),
    #[error(transparent)]
    MissingAlternate(#[from] MissingAlternateError),
}

/// The properties of a glyph depend on one another in a loop.
///
/// Fatal only for the glyph concerned; it keeps its last-known-good geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct GraphCycleError {
    pub glyph: GlyphName,
    /// Cursors that could not be ordered, in declaration order
    pub cursors: Vec<Cursor>,
}

impl Display for GraphCycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' has a dependency cycle among {} properties: {:?}",
            self.glyph,
            self.cursors.len(),
            self.cursors
        )
    }
}

/// A related glyph has no counterpart for the requested alternate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{related}' has no alternate '{alternate}'")]
pub struct MissingAlternateError {
    pub related: GlyphName,
    pub alternate: GlyphName,
}
