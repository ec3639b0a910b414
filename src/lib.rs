pub mod error;
pub mod http;
pub mod json;
pub mod minecraft;
pub mod reporter;
pub mod util;

pub use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
