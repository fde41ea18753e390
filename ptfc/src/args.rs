//! Command line arguments

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Which parametric font shall we draw today?
#[derive(Serialize, Deserialize, Parser, Debug, Clone, PartialEq)]
pub struct Args {
    /// Directory holding template sources, one file per template identifier
    #[arg(long)]
    #[clap(default_value = "templates")]
    pub templates: PathBuf,

    /// Template identifier, e.g. elzevir.ptf
    #[arg(short, long)]
    pub template: String,

    /// Bearer token sent along with template fetches
    #[arg(long)]
    #[clap(default_value = None)]
    pub token: Option<String>,

    /// A parameter vector, JSON or YAML. Init values are used if absent.
    #[arg(short, long)]
    #[clap(default_value = None)]
    pub params: Option<PathBuf>,

    /// Text whose glyphs make up the compiled font. All glyphs if absent.
    #[arg(short, long)]
    #[clap(default_value = None)]
    pub subset: Option<String>,

    /// Export every glyph with distribution names instead of compiling the subset
    #[arg(short, long)]
    #[clap(default_value = "false")]
    pub export: bool,

    /// Family name of an export
    #[arg(long)]
    #[clap(default_value = None)]
    pub family: Option<String>,

    /// Style name of an export
    #[arg(long)]
    #[clap(default_value = None)]
    pub style: Option<String>,

    /// Where the binary is written
    #[arg(short, long)]
    #[clap(default_value = "font.otf")]
    pub output: PathBuf,

    /// Accept template identifiers beyond the well-known ones
    #[arg(long)]
    #[clap(default_value = "false")]
    pub any_template: bool,
}

impl Args {
    /// Arguments for `template` served from `templates`, everything else
    /// defaulted.
    pub fn new(templates: impl Into<PathBuf>, template: &str) -> Args {
        Args {
            templates: templates.into(),
            template: template.to_string(),
            token: None,
            params: None,
            subset: None,
            export: false,
            family: None,
            style: None,
            output: PathBuf::from("font.otf"),
            any_template: false,
        }
    }
}
