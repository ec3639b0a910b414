use thiserror::Error;

use crate::{http::error::HttpError, util::error::UtilError};

#[derive(Error, Debug)]
pub enum MinecraftError {
    #[error(transparent)]
    Util(#[from] UtilError),
    #[error(transparent)]
    IO(#[from] tokio::io::Error),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("Unknown {0} version")]
    UnknownVersion(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Broken inheritance chain at {id}: {reason}")]
    BrokenChain { id: String, reason: String },
    #[error("Critical libraries missing after install: {}", .0.join(", "))]
    CriticalLibrariesMissing(Vec<String>),
    #[error("Incompatible combination: {0}")]
    Incompatible(String),
    #[error("Processor {0} failed")]
    Processor(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Operation cancelled")]
    Cancelled,
}
