use crate::network::errors::NetworkError;
use crate::network::{AsyncResult, FetchedPage, PageFetcher};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Client;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; prospect-flow/0.1; +https://example.invalid/bot)";

// * Interstitial pages that would otherwise be mistaken for content
static BLOCK_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<title>[^<]*(Just a moment|Attention Required|Security Check|Access Denied|Captcha)")
        .expect("! CRITICAL: Failed to compile block page regex")
});

const BLOCK_SIGNATURES: &[&str] = &["captcha-delivery", "cf-turnstile", "datadome", "challenge-platform"];

// * Plain HTTP page fetcher, with an optional prerender service for thin pages
#[derive(Clone)]
pub struct HttpFetcher {
    inner: Client,
    render_endpoint: Option<Arc<str>>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.9"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            inner: client,
            render_endpoint: None,
        })
    }

    /// Renders through a prerender service: the page URL is appended to the
    /// endpoint, e.g. "http://localhost:3000/render?url="
    pub fn with_render_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.render_endpoint = Some(Arc::from(endpoint.into()));
        self
    }

    async fn get(client: Client, request_url: String, page_url: String) -> Result<FetchedPage, NetworkError> {
        let resp = client.get(&request_url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;

        detect_block_page(&body)?;

        Ok(FetchedPage {
            url: page_url,
            body,
            status: status.as_u16(),
            content_type,
        })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> AsyncResult<FetchedPage> {
        let client = self.inner.clone();
        let url = url.to_string();
        Box::pin(async move {
            Url::parse(&url).map_err(|_| NetworkError::InvalidUrl(url.clone()))?;
            Self::get(client, url.clone(), url).await
        })
    }

    fn render(&self, url: &str) -> AsyncResult<FetchedPage> {
        let Some(endpoint) = self.render_endpoint.clone() else {
            return Box::pin(async { Err(NetworkError::RenderUnsupported) });
        };
        let client = self.inner.clone();
        let url = url.to_string();
        Box::pin(async move {
            Url::parse(&url).map_err(|_| NetworkError::InvalidUrl(url.clone()))?;
            let request_url = format!("{}{}", endpoint, url);
            Self::get(client, request_url, url).await
        })
    }

    fn supports_render(&self) -> bool {
        self.render_endpoint.is_some()
    }
}

fn detect_block_page(body: &str) -> Result<(), NetworkError> {
    if let Some(cap) = BLOCK_TITLE.find(body) {
        return Err(NetworkError::Blocked(format!("Title Trigger: {}", cap.as_str())));
    }

    for sig in BLOCK_SIGNATURES {
        if body.contains(sig) {
            return Err(NetworkError::Blocked(format!("Body Trigger: {}", sig)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_page_detection() {
        assert!(detect_block_page("<html><title>Just a moment...</title></html>").is_err());
        assert!(detect_block_page(r#"<div class="cf-turnstile"></div>"#).is_err());
        assert!(detect_block_page("<html><title>Andrew Riley Heating</title></html>").is_ok());
    }

    #[test]
    fn test_render_support_follows_endpoint() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        assert!(!fetcher.supports_render());
        let fetcher = fetcher.with_render_endpoint("http://localhost:3000/render?url=");
        assert!(fetcher.supports_render());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let result = fetcher.fetch("not a url").await;
        assert!(matches!(result, Err(NetworkError::InvalidUrl(_))));
    }
}
