use std::io;

use crate::{http::error::HttpError, minecraft::error::MinecraftError, util::error::UtilError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Util(#[from] UtilError),
    #[error(transparent)]
    Minecraft(#[from] MinecraftError),
    #[error("IO error occured : {0}")]
    Io(#[from] io::Error),
    #[error("Serialize error occured : {0}")]
    Serde(#[from] serde_json::Error),
}
