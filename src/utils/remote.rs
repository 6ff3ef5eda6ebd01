//! Blocking HTTP helpers for package metadata.

use crate::error::{PkgBridgeError, Result};
use crate::project_identity;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

const ALLOWED_SCHEMES: &[&str] = &["https", "http"];

pub fn client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(project_identity::USER_AGENT)
        .build()
        .map_err(|e| PkgBridgeError::RemoteFetchError(format!("HTTP client setup failed: {}", e)))
}

fn validate_url(url: &str) -> Result<reqwest::Url> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|_| PkgBridgeError::RemoteFetchError(format!("Invalid URL: {}", url)))?;
    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(PkgBridgeError::RemoteFetchError(format!(
            "URL scheme '{}' is not supported: {}",
            parsed.scheme(),
            url
        )));
    }
    Ok(parsed)
}

/// GET `url` and decode the JSON body.
pub fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let parsed = validate_url(url)?;
    let response = client
        .get(parsed)
        .send()
        .map_err(|e| PkgBridgeError::RemoteFetchError(format!("Network error: {}", e)))?;

    if !response.status().is_success() {
        return Err(PkgBridgeError::RemoteFetchError(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    let body = response
        .text()
        .map_err(|e| PkgBridgeError::RemoteFetchError(format!("Could not read {}: {}", url, e)))?;
    Ok(serde_json::from_str(&body)?)
}

/// Size of the resource behind `url` in megabytes, from a HEAD request.
pub fn content_length_mb(client: &Client, url: &str) -> Result<f64> {
    let parsed = validate_url(url)?;
    let response = client
        .head(parsed)
        .send()
        .map_err(|e| PkgBridgeError::RemoteFetchError(format!("Network error: {}", e)))?;

    response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .filter(|_| response.status().is_success())
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|bytes| bytes as f64 / 1_000_000.0)
        .ok_or_else(|| PkgBridgeError::RemoteFetchError(format!("{} reported no size", url)))
}
