// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use url::Url;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
///
/// The timeout applies to every request, so a hung call fails the tick
/// instead of stalling it.
pub fn create_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Append percent-encoded path segments to an API base URL.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| AppError::config(format!("API base URL cannot be a base: {base}")))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

/// Turn a non-success response into an error carrying the body text.
pub async fn check_status<F>(response: reqwest::Response, to_error: F) -> Result<reqwest::Response>
where
    F: FnOnce(String) -> AppError,
{
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    Err(to_error(format!("{} {}: {}", status, url.path(), body.trim())))
}
