use std::{
    io::{Cursor, Read},
    path::Path,
};

use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
    task::block_in_place,
};
use zip::ZipArchive;

use super::error::UtilError;

pub type Archive = ZipArchive<Cursor<Vec<u8>>>;

/// Reads a jar/zip into memory and opens it as an archive. The `zip` crate
/// is synchronous, so the open runs under `block_in_place`, which requires
/// a multi-thread tokio runtime (the default `#[tokio::main]` flavor;
/// current-thread runtimes panic here).
pub async fn open_archive<P: AsRef<Path>>(path: P) -> Result<Archive, UtilError> {
    let data = fs::read(path).await?;
    Ok(block_in_place(|| ZipArchive::new(Cursor::new(data)))?)
}

/// Lists entry names with separators normalized to `/`.
pub async fn entry_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>, UtilError> {
    let archive = open_archive(path).await?;
    Ok(archive
        .file_names()
        .map(|name| name.replace('\\', "/"))
        .collect())
}

/// Returns true when the archive contains the named entry.
pub fn has_entry(archive: &Archive, name: &str) -> bool {
    archive.file_names().any(|n| n.replace('\\', "/") == name)
}

/// Reads a single archive entry into a string.
pub async fn read_entry_to_string<P: AsRef<Path>>(
    jar_path: P,
    entry_name: &str,
) -> Result<String, UtilError> {
    let mut archive = open_archive(jar_path).await?;
    let mut entry = archive
        .by_name(entry_name)
        .map_err(|_| UtilError::EntryNotFound(entry_name.to_string()))?;
    let mut content = Vec::new();
    block_in_place(|| entry.read_to_end(&mut content))?;
    Ok(String::from_utf8(content)?)
}

/// Extracts a single archive entry to an exact destination path.
pub async fn extract_entry<P: AsRef<Path>>(
    jar_path: P,
    entry_name: &str,
    destination: &Path,
) -> Result<(), UtilError> {
    let mut archive = open_archive(jar_path).await?;
    // The zip entry handle is not Send; it must not live across an await.
    let content = {
        let mut entry = archive
            .by_name(entry_name)
            .map_err(|_| UtilError::EntryNotFound(entry_name.to_string()))?;
        let mut content = Vec::new();
        block_in_place(|| entry.read_to_end(&mut content))?;
        content
    };

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut output = File::create(destination).await?;
    output.write_all(&content).await?;

    Ok(())
}

/// Extracts every entry under `prefix` into `output_dir`, optionally
/// stripping the prefix from the written paths. Entries escaping the
/// output directory are skipped.
pub async fn extract_prefixed<P: AsRef<Path>>(
    jar_path: P,
    prefix: &str,
    output_dir: &Path,
    strip_prefix: bool,
) -> Result<usize, UtilError> {
    let mut archive = open_archive(jar_path).await?;
    let mut extracted = 0;

    for i in 0..archive.len() {
        // Entry handles are not Send; read each one fully before the
        // write awaits below.
        let (relative, content) = {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().replace('\\', "/");

            if !name.starts_with(prefix) || name.ends_with('/') {
                continue;
            }
            let relative = if strip_prefix {
                name.trim_start_matches(prefix).trim_start_matches('/')
            } else {
                name.as_str()
            };
            if relative.is_empty() || relative.split('/').any(|part| part == "..") {
                continue;
            }

            let mut content = Vec::new();
            block_in_place(|| entry.read_to_end(&mut content))?;
            (relative.to_string(), content)
        };

        let output_path = output_dir.join(&relative);

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut output = File::create(&output_path).await?;
        output.write_all(&content).await?;
        extracted += 1;
    }

    Ok(extracted)
}
