use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error(transparent)]
    IO(#[from] tokio::io::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("Download of {url} failed with status code: {status}")]
    Status { status: String, url: String },
    #[error("All endpoints failed, last error: {0}")]
    AllEndpointsFailed(String),
    #[error("Operation cancelled")]
    Cancelled,
}
