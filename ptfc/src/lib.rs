//! A compiler for parametric fonts.
//!
//! Templates are fetched once and turned into a [ptfir::font::ParametricFont];
//! a single worker thread owns the fonts and answers [protocol::Request]s with
//! binaries compiled by [ptfbe]. Hosts talk to it through a [Compiler] and the
//! [FontHandle]s it creates.

mod args;
mod compiler;
mod config;
mod error;
pub mod handle;
pub mod loader;
pub mod protocol;
pub mod session;
pub mod worker;

pub use args::Args;
pub use compiler::Compiler;
pub use config::Config;
pub use error::Error;
pub use handle::{FontHandle, FontRegistry, MemoryRegistry};
