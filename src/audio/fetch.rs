//! Locator validation and byte fetching for remote tracks.
//!
//! Any fetch failure, whatever the cause, ends up as a single
//! `NetworkOrDecode` error for the controller; only unusable locators are
//! reported differently.

use reqwest::Url;
use reqwest::blocking::Client;

use crate::error::FetchError;

/// Parse a track locator. Accepts `http`, `https` and `file` URLs.
pub fn parse_locator(uri: &str) -> Result<Url, FetchError> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(FetchError::EmptyLocator);
    }

    let url = Url::parse(trimmed).map_err(|e| FetchError::InvalidLocator {
        locator: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" | "file" => Ok(url),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

/// Fetch the whole payload behind `url`. Non-2xx answers are errors.
pub fn fetch_bytes(client: &Client, url: &Url) -> Result<Vec<u8>, FetchError> {
    if url.scheme() == "file" {
        let path = url.to_file_path().map_err(|_| FetchError::InvalidLocator {
            locator: url.to_string(),
            reason: "not a local path".to_string(),
        })?;
        return Ok(std::fs::read(path)?);
    }

    let response = client.get(url.clone()).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response.bytes()?.to_vec())
}
