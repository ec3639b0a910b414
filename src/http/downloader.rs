use std::{path::{Path, PathBuf}, sync::Arc, time::Duration};

use futures_util::StreamExt;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use reqwest::IntoUrl;
use tokio::{
    fs::{create_dir_all, File},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tokio_util::sync::CancellationToken;

use crate::{
    reporter::{Report, Reporter},
    util::{hash::calculate_sha1, retry::retry},
};

use super::error::HttpError;

/// One file to acquire: a priority-ordered list of candidate URLs plus the
/// expected size and hash from published metadata, when known.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub urls: Vec<String>,
    pub path: PathBuf,
    pub size: Option<u64>,
    pub sha1: Option<String>,
}

/// Result of a bulk download run. Individual failures are collected, not
/// raised; the caller decides whether any of them is fatal.
#[derive(Debug, Default)]
pub struct DownloadOutcome {
    pub completed: usize,
    pub failed: Vec<DownloadJob>,
}

/// Returns true when the file exists and matches the expected size and
/// SHA-1, where given. With neither expectation, bare existence counts.
pub fn is_file_valid(path: &Path, size: Option<u64>, sha1: Option<&str>) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    if let Some(expected) = size {
        if meta.len() != expected {
            return false;
        }
    }
    if let Some(expected) = sha1 {
        match calculate_sha1(path) {
            Ok(actual) => {
                if !actual.eq_ignore_ascii_case(expected) {
                    return false;
                }
            }
            Err(_) => return false,
        }
    }
    true
}

/// Downloads a file from the specified URL and saves it to the given
/// destination, streaming the body chunk by chunk.
///
/// Byte-level progress is pushed through the reporter after every chunk and
/// the cancellation token is checked at the same points, so a cancel takes
/// effect without waiting for the transfer to finish.
pub async fn download<P: AsRef<Path>>(
    url: impl IntoUrl,
    destination: P,
    reporter: Option<&dyn Reporter>,
    cancel: &CancellationToken,
) -> Result<u64, HttpError> {
    if cancel.is_cancelled() {
        return Err(HttpError::Cancelled);
    }

    let response = super::fetch::CLIENT.get(url).send().await?;
    if !response.status().is_success() {
        return Err(HttpError::Status {
            status: response.status().to_string(),
            url: response.url().to_string(),
        });
    }

    let total_size = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    if let Some(parent) = destination.as_ref().parent() {
        if !parent.is_dir() {
            create_dir_all(parent).await?;
        }
    }

    let mut file = File::create(&destination).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        if cancel.is_cancelled() {
            return Err(HttpError::Cancelled);
        }
        let chunk = chunk?;
        downloaded += chunk.len() as u64;
        file.write_all(&chunk).await?;
        reporter.bytes(destination.as_ref(), downloaded, total_size);
    }
    file.flush().await?;

    Ok(downloaded)
}

/// Downloads a file trying each candidate URL in order.
pub async fn download_any<P: AsRef<Path>>(
    urls: &[String],
    destination: P,
    reporter: Option<&dyn Reporter>,
    cancel: &CancellationToken,
) -> Result<u64, HttpError> {
    let mut last = None;
    for url in urls {
        match download(url, destination.as_ref(), reporter, cancel).await {
            Ok(size) => return Ok(size),
            Err(HttpError::Cancelled) => return Err(HttpError::Cancelled),
            Err(e) => {
                log::debug!("Download from {url} failed: {e}");
                last = Some(e);
            }
        }
    }
    Err(HttpError::AllEndpointsFailed(
        last.map(|e| e.to_string()).unwrap_or_else(|| "no endpoints".into()),
    ))
}

/// Downloads many files with bounded concurrency.
///
/// Files already present with the expected size/hash are skipped without
/// network I/O; the check runs on the rayon pool since hashing large local
/// files is CPU-bound. Each remaining job is retried a few times before
/// being recorded as failed. A failed job never aborts the run; only
/// cancellation does.
pub async fn download_multiple(
    jobs: Vec<DownloadJob>,
    concurrency: usize,
    reporter: Option<&dyn Reporter>,
    cancel: &CancellationToken,
) -> Result<DownloadOutcome, HttpError> {
    let total = jobs.len() as u64;

    let pending: Vec<DownloadJob> = tokio::task::block_in_place(|| {
        jobs.into_par_iter()
            .filter(|job| !is_file_valid(&job.path, job.size, job.sha1.as_deref()))
            .collect()
    });

    let skipped = total - pending.len() as u64;
    let done = Arc::new(Mutex::new(skipped));
    let failed = Arc::new(Mutex::new(Vec::new()));
    reporter.progress(skipped, total);

    let results = futures_util::stream::iter(pending.into_iter().map(|job| {
        let done = Arc::clone(&done);
        let failed = Arc::clone(&failed);
        async move {
            if cancel.is_cancelled() {
                return Err(HttpError::Cancelled);
            }

            let result = retry(
                || async { download_any(&job.urls, &job.path, None, cancel).await },
                Result::is_ok,
                3,
                Duration::from_secs(3),
            )
            .await;

            match result {
                Ok(_) => {
                    let mut done = done.lock().await;
                    *done += 1;
                    reporter.progress(*done, total);
                }
                Err(HttpError::Cancelled) => return Err(HttpError::Cancelled),
                Err(e) => {
                    log::warn!("Download of {} failed: {e}", job.path.display());
                    failed.lock().await.push(job);
                }
            }
            Ok::<(), HttpError>(())
        }
    }))
    .buffer_unordered(concurrency.max(1));

    let mut results = std::pin::pin!(results);
    while let Some(result) = results.next().await {
        result?;
    }

    let completed = *done.lock().await as usize;
    let failed = failed.lock().await.drain(..).collect();

    Ok(DownloadOutcome { completed, failed })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    #[test]
    fn missing_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_file_valid(&dir.path().join("absent.jar"), None, None));
    }

    #[test]
    fn bare_existence_counts_without_expectations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.jar");
        std::fs::write(&path, b"payload").unwrap();
        assert!(is_file_valid(&path, None, None));
    }

    #[test]
    fn size_mismatch_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.jar");
        std::fs::write(&path, b"payload").unwrap();
        assert!(is_file_valid(&path, Some(7), None));
        assert!(!is_file_valid(&path, Some(8), None));
    }

    #[test]
    fn sha1_is_checked_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.jar");
        std::fs::write(&path, b"").unwrap();
        assert!(is_file_valid(&path, Some(0), Some(EMPTY_SHA1)));
        assert!(is_file_valid(&path, None, Some(&EMPTY_SHA1.to_uppercase())));
        assert!(!is_file_valid(
            &path,
            None,
            Some("0000000000000000000000000000000000000000")
        ));
    }
}
