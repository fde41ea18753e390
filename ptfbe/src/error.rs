use ptfir::types::GlyphName;
use thiserror::Error;
use write_fonts::tables::cmap::CmapConflict;

#[derive(Debug, Error)]
pub enum Error {
    #[error("'{glyph_name}' {problem} {context}")]
    OutlineError {
        glyph_name: GlyphName,
        problem: String,
        context: String,
    },
    #[error("Conflicting codepoint mappings: {0:?}")]
    CmapConflict(#[from] CmapConflict),
    #[error("Generating bytes for {context} failed: {reason}")]
    DumpTableError { context: String, reason: String },
    #[error("{what} out of bounds: {value}")]
    OutOfBounds { what: String, value: String },
}
