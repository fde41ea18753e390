//! Intermediate Representation (IR) of parametric fonts
//!
//! A [template::Template] is built into a [font::ParametricFont], a graph of
//! glyph instances whose properties are formulas over a
//! [params::ParameterVector]. Updating the font evaluates each glyph along its
//! solving order and yields outlines ready for a backend.

pub mod alternate;
pub mod error;
pub mod expr;
pub mod font;
pub mod glyph;
pub mod graph;
pub mod outline;
pub mod params;
pub mod solve;
pub mod subset;
pub mod template;
pub mod transform;
pub mod types;
