//! Settings of a single command line run

use std::{fs, path::Path};

use log::debug;
use ptfir::params::ParameterVector;
use serde::{Deserialize, Serialize};

use crate::{
    loader::{DirectoryFetcher, TemplateLoader},
    Args, Error,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub args: Args,
    /// Parsed from `args.params`
    pub params: Option<ParameterVector>,
}

impl Config {
    /// Check the arguments and read the parameter file, if any.
    pub fn new(args: Args) -> Result<Config, Error> {
        if args.templates.exists() && !args.templates.is_dir() {
            return Err(Error::ExpectedDirectory(args.templates.clone()));
        }
        let params = args.params.as_deref().map(read_params).transpose()?;
        Ok(Config { args, params })
    }

    pub fn loader(&self) -> TemplateLoader {
        let loader = TemplateLoader::new(DirectoryFetcher::new(&self.args.templates))
            .with_token(self.args.token.clone());
        if self.args.any_template {
            loader.with_known(None)
        } else {
            loader
        }
    }
}

// JSON is YAML
fn read_params(path: &Path) -> Result<ParameterVector, Error> {
    debug!("Reading parameters from {path:?}");
    let raw = fs::read_to_string(path).map_err(|source| Error::FileIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(Into::into)
}
