use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::error::{Result, ScrapeError};

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"apiKey:\s*'([^']*)'").unwrap());

/// Pull the `apiKey: '...'` assignment out of inline script text.
pub fn extract_api_key(html: &str) -> Option<&str> {
    API_KEY_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Fetch the home page and return the access token embedded in it.
///
/// Fetched fresh on every run; nothing is cached.
pub async fn fetch_api_key(client: &reqwest::Client, home_page: &str) -> Result<String> {
    info!("Fetching API key from {}", home_page);
    let html = client
        .get(home_page)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    extract_api_key(&html)
        .map(str::to_string)
        .ok_or_else(|| ScrapeError::KeyNotFound(home_page.to_string()))
}
