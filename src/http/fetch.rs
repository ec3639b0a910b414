use once_cell::sync::Lazy;
use reqwest::IntoUrl;
use serde::de::DeserializeOwned;

use super::error::HttpError;

/// A global instance of the reqwest Client.
pub(crate) static CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Performs a GET request and deserializes the JSON response body.
pub async fn fetch<T: DeserializeOwned>(url: impl IntoUrl) -> Result<T, HttpError> {
    let response = CLIENT.get(url).send().await?;
    if !response.status().is_success() {
        return Err(HttpError::Status {
            status: response.status().to_string(),
            url: response.url().to_string(),
        });
    }
    Ok(response.json::<T>().await?)
}

/// Performs a GET request and returns the raw response body as text.
///
/// Used where a remote document must be persisted verbatim before being
/// parsed, so the on-disk copy stays byte-identical to the published one.
pub async fn fetch_text(url: impl IntoUrl) -> Result<String, HttpError> {
    let response = CLIENT.get(url).send().await?;
    if !response.status().is_success() {
        return Err(HttpError::Status {
            status: response.status().to_string(),
            url: response.url().to_string(),
        });
    }
    Ok(response.text().await?)
}

/// Tries each URL in order and returns the first successful JSON response.
///
/// This is the mirror-then-origin fallback: endpoint resolution hands the
/// caller a priority list and the fetch layer walks it.
pub async fn fetch_any<T: DeserializeOwned>(urls: &[String]) -> Result<T, HttpError> {
    let mut last = None;
    for url in urls {
        match fetch(url).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::debug!("Fetch from {url} failed: {e}");
                last = Some(e);
            }
        }
    }
    Err(HttpError::AllEndpointsFailed(
        last.map(|e| e.to_string()).unwrap_or_else(|| "no endpoints".into()),
    ))
}

/// Text variant of [`fetch_any`].
pub async fn fetch_text_any(urls: &[String]) -> Result<String, HttpError> {
    let mut last = None;
    for url in urls {
        match fetch_text(url).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::debug!("Fetch from {url} failed: {e}");
                last = Some(e);
            }
        }
    }
    Err(HttpError::AllEndpointsFailed(
        last.map(|e| e.to_string()).unwrap_or_else(|| "no endpoints".into()),
    ))
}
