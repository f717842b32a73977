//! Search-engine page fetching.

use once_cell::sync::Lazy;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use super::PageFetcher;
use crate::config::{Config, PAGE_MAX_CHARS};
use crate::{Error, Result};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>")
        .expect("script regex is valid")
});
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"));
static SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Build the search URL for a query: spaces become `+`, appended to the endpoint.
pub fn search_url(endpoint: &str, query: &str) -> String {
    format!("{}{}", endpoint, query.replace(' ', "+"))
}

/// Reduce an HTML document to its readable text.
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let collapsed = SPACE_RE.replace_all(decoded.trim(), " ");
    collapsed.chars().take(max_chars).collect()
}

/// Page fetcher over reqwest.
#[derive(Debug, Clone)]
pub struct WebFetcher {
    http: Client,
    max_chars: usize,
}

impl WebFetcher {
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("HTTP client error: {}", e)))?;

        Ok(Self { http, max_chars })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.request_timeout(), config.page_max_chars)
    }
}

impl Default for WebFetcher {
    fn default() -> Self {
        Self {
            http: Client::new(),
            max_chars: PAGE_MAX_CHARS,
        }
    }
}

#[async_trait]
impl PageFetcher for WebFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::FetchError(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::FetchError(format!("Failed to read page: {}", e)))?;

        if !status.is_success() {
            return Err(Error::FetchError(format!("{} returned {}", url, status)));
        }

        let text = html_to_text(&body, self.max_chars);
        debug!(%url, chars = text.chars().count(), "Fetched page");
        Ok(text)
    }
}
