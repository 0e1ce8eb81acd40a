// * Profile search through a general search engine's HTML results page
// * Only links that are themselves professional-network profile URLs are kept.

use crate::network::errors::NetworkError;
use crate::network::{AsyncResult, ProfileSearch};
use crate::refinery::regex_extractor::{canonical_profile_url, is_profile_url};
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const MAX_RESULTS: usize = 10;

static RESULT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a, a.result-link").expect("Invalid result selector"));

/// Unwraps redirect links ("/l/?uddg=...") to their destination
fn normalize_result_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let candidate = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };

    if let Ok(url) = Url::parse(&candidate) {
        if url.host_str().is_some_and(|h| h.ends_with("duckduckgo.com")) && url.path().starts_with("/l/") {
            return url
                .query_pairs()
                .find(|(k, v)| k == "uddg" && !v.trim().is_empty())
                .map(|(_, v)| v.into_owned());
        }
    }

    (candidate.starts_with("http://") || candidate.starts_with("https://")).then_some(candidate)
}

/// Profile URLs from a results page, canonical and de-duplicated in rank order
pub fn parse_profile_results(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut out: Vec<String> = Vec::new();
    for link in doc.select(&RESULT_LINK) {
        let Some(href) = link.value().attr("href").and_then(normalize_result_href) else {
            continue;
        };
        if !href.to_lowercase().contains("linkedin.com/in/") {
            continue;
        }
        let canonical = canonical_profile_url(&href);
        if is_profile_url(&canonical) && !out.contains(&canonical) {
            out.push(canonical);
        }
        if out.len() >= MAX_RESULTS {
            break;
        }
    }
    out
}

#[derive(Clone)]
pub struct SearchEngineProfileSearch {
    inner: Client,
    endpoint: String,
}

impl SearchEngineProfileSearch {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; prospect-flow/0.1)")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            inner: client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl ProfileSearch for SearchEngineProfileSearch {
    fn search(&self, query: &str) -> AsyncResult<Vec<String>> {
        let client = self.inner.clone();
        let endpoint = self.endpoint.clone();
        let query = query.to_string();
        Box::pin(async move {
            let mut url = Url::parse(&endpoint).map_err(|_| NetworkError::InvalidUrl(endpoint.clone()))?;
            url.query_pairs_mut().append_pair("q", &query);

            let resp = client.get(url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(NetworkError::Status(status.as_u16()));
            }
            let body = resp.text().await?;
            Ok(parse_profile_results(&body))
        })
    }
}
