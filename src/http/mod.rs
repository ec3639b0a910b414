pub mod downloader;
pub mod error;
pub mod fetch;
