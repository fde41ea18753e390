use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Template '{0}' not found, please use a correct template name")]
    Validation(String),
    #[error("Not authorized to fetch template '{0}'")]
    Authorization(String),
    #[error("Unable to fetch template '{id}': {reason}")]
    Fetch { id: String, reason: String },
    #[error("Expected a {expected} response, got {actual}")]
    ProtocolMismatch {
        expected: &'static str,
        actual: String,
    },
    #[error("No font is loaded")]
    NoFont,
    #[error("'{0}' is not a codepoint")]
    BadCodepoint(String),
    #[error("The compilation worker has stopped")]
    WorkerGone,
    #[error("Unable to start the compilation worker: '{0}'")]
    Spawn(#[source] io::Error),
    #[error("'{0}' exists but is not a directory")]
    ExpectedDirectory(PathBuf),
    #[error("io failed for '{path}': '{source}'")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    YamlSerError(#[from] serde_yaml::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    FontIrError(#[from] ptfir::error::Error),
    #[error(transparent)]
    Backend(#[from] ptfbe::error::Error),
}
