//! Backend of the `ptfc` parametric font compiler.
//!
//! Turns the evaluated outlines of a [ptfir::font::ParametricFont] into an
//! OpenType binary.
pub mod engine;
pub mod error;
pub mod export;
pub mod glyphs;
pub mod hmetrics;
pub mod name;
pub mod os2;

#[cfg(test)]
mod test_util;
