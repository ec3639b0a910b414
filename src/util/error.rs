use thiserror::Error;
use zip::result::ZipError;

#[derive(Error, Debug)]
pub enum UtilError {
    #[error(transparent)]
    IO(#[from] tokio::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Zip(#[from] ZipError),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("{0} not found in archive")]
    EntryNotFound(String),
}
