use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::{create_dir_all, File},
    io::{AsyncReadExt, AsyncWriteExt},
};

use super::error::UtilError;

/// Asynchronously reads a JSON file and deserializes its contents into the
/// requested type.
pub async fn read_json<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T, UtilError> {
    let mut file = File::open(file_path).await?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// Asynchronously serializes a value to JSON and writes it to the given
/// path, creating parent directories as needed.
pub async fn write_json<T: Serialize, P: AsRef<Path>>(
    file_path: P,
    value: &T,
) -> Result<(), UtilError> {
    let json_string = serde_json::to_string(value)?;
    write_text(file_path, &json_string).await
}

/// Writes raw text to a file, creating parent directories as needed.
///
/// Remote descriptors are persisted through this so the on-disk bytes match
/// what the endpoint served.
pub async fn write_text<P: AsRef<Path>>(file_path: P, contents: &str) -> Result<(), UtilError> {
    if let Some(parent) = file_path.as_ref().parent() {
        if !parent.is_dir() {
            create_dir_all(parent).await?;
        }
    }
    let mut file = File::create(file_path).await?;
    file.write_all(contents.as_bytes()).await?;
    Ok(())
}
