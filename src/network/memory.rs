// * In-memory collaborators
// * Scripted fetcher, registry and profile search used by tests and dry runs.
// * Every call is counted; latency is simulated with tokio's clock.

use crate::network::errors::NetworkError;
use crate::network::{
    AsyncResult, EmployeeListing, FetchedPage, PageFetcher, ProfileSearch, RegistryQuery, RegistryResponse,
    RegistrySearch,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A failure a scripted collaborator reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptedFailure {
    Status(u16),
    Timeout,
    Unavailable,
}

impl ScriptedFailure {
    fn to_error(self) -> NetworkError {
        match self {
            ScriptedFailure::Status(code) => NetworkError::Status(code),
            ScriptedFailure::Timeout => NetworkError::Timeout(Duration::from_secs(30)),
            ScriptedFailure::Unavailable => NetworkError::Unavailable("scripted outage".to_string()),
        }
    }
}

fn url_key(url: &str) -> String {
    url.trim_end_matches('/').to_lowercase()
}

async fn delayed<T: Send>(latency: Duration, result: Result<T, NetworkError>) -> Result<T, NetworkError> {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    result
}

// * Counts a fetch as in flight until its future completes or is dropped
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(current: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(current.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Page fetcher serving scripted bodies; unknown URLs answer 404
#[derive(Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, Result<FetchedPage, ScriptedFailure>>,
    rendered: HashMap<String, FetchedPage>,
    flaky: HashMap<String, Arc<AtomicUsize>>,
    latency: Duration,
    calls: AtomicUsize,
    render_calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(self, url: &str, body: &str) -> Self {
        self.with_page(FetchedPage::html(url, body))
    }

    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.with_page(FetchedPage::text(url, body))
    }

    pub fn with_page(mut self, page: FetchedPage) -> Self {
        self.pages.insert(url_key(&page.url), Ok(page));
        self
    }

    pub fn with_failure(mut self, url: &str, failure: ScriptedFailure) -> Self {
        self.pages.insert(url_key(url), Err(failure));
        self
    }

    /// Body served by the rendering fallback
    pub fn with_rendered(mut self, url: &str, body: &str) -> Self {
        self.rendered.insert(url_key(url), FetchedPage::html(url, body));
        self
    }

    /// The first `times` fetches of the URL fail with a 503
    pub fn with_flaky(mut self, url: &str, times: usize) -> Self {
        self.flaky.insert(url_key(url), Arc::new(AtomicUsize::new(times)));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::Relaxed)
    }

    /// Most fetches ever outstanding at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl PageFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> AsyncResult<FetchedPage> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let key = url_key(url);

        let still_flaky = self.flaky.get(&key).is_some_and(|remaining| {
            remaining
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
                .is_ok()
        });
        let result = if still_flaky {
            Err(NetworkError::Status(503))
        } else {
            match self.pages.get(&key) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(failure)) => Err(failure.to_error()),
                None => Err(NetworkError::Status(404)),
            }
        };
        let guard = InFlight::enter(&self.in_flight, &self.peak_in_flight);
        let latency = self.latency;
        Box::pin(async move {
            let result = delayed(latency, result).await;
            drop(guard);
            result
        })
    }

    fn render(&self, url: &str) -> AsyncResult<FetchedPage> {
        self.render_calls.fetch_add(1, Ordering::Relaxed);
        let result = self
            .rendered
            .get(&url_key(url))
            .cloned()
            .ok_or(NetworkError::RenderUnsupported);
        Box::pin(delayed(self.latency, result))
    }

    fn supports_render(&self) -> bool {
        !self.rendered.is_empty()
    }
}

/// Registry answering every query with the same scripted response
pub struct MemoryRegistry {
    response: Result<RegistryResponse, ScriptedFailure>,
    latency: Duration,
    calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn found(officers: Vec<crate::network::OfficerRecord>) -> Self {
        Self::scripted(Ok(RegistryResponse::Found(officers)))
    }

    pub fn not_found() -> Self {
        Self::scripted(Ok(RegistryResponse::NotFound))
    }

    pub fn failing(failure: ScriptedFailure) -> Self {
        Self::scripted(Err(failure))
    }

    fn scripted(response: Result<RegistryResponse, ScriptedFailure>) -> Self {
        Self {
            response,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl RegistrySearch for MemoryRegistry {
    fn search(&self, _query: &RegistryQuery) -> AsyncResult<RegistryResponse> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let result = self.response.clone().map_err(ScriptedFailure::to_error);
        Box::pin(delayed(self.latency, result))
    }
}

/// Profile search with per-query scripted results; unknown queries return nothing
#[derive(Default)]
pub struct MemoryProfileSearch {
    results: HashMap<String, Vec<String>>,
    employees: HashMap<String, Vec<EmployeeListing>>,
    failure: Option<ScriptedFailure>,
    latency: Duration,
    calls: AtomicUsize,
}

impl MemoryProfileSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, urls: &[&str]) -> Self {
        self.results
            .insert(query.to_string(), urls.iter().map(|u| u.to_string()).collect());
        self
    }

    pub fn with_employees(mut self, company: &str, employees: Vec<EmployeeListing>) -> Self {
        self.employees.insert(company.to_lowercase(), employees);
        self
    }

    pub fn failing(failure: ScriptedFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl ProfileSearch for MemoryProfileSearch {
    fn search(&self, query: &str) -> AsyncResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let result = match self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(self.results.get(query).cloned().unwrap_or_default()),
        };
        Box::pin(delayed(self.latency, result))
    }

    fn employees(&self, company: &str) -> AsyncResult<Vec<EmployeeListing>> {
        let result = match self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(self.employees.get(&company.to_lowercase()).cloned().unwrap_or_default()),
        };
        Box::pin(delayed(self.latency, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetcher_serves_and_counts() {
        let fetcher = MemoryFetcher::new()
            .with_text("https://andrewrileyheating.co.uk/", "Contact: Andrew Riley")
            .with_failure("https://andrewrileyheating.co.uk/team", ScriptedFailure::Status(500));

        let page = fetcher.fetch("https://andrewrileyheating.co.uk").await.unwrap();
        assert_eq!(page.body, "Contact: Andrew Riley");
        assert!(matches!(
            fetcher.fetch("https://andrewrileyheating.co.uk/team").await,
            Err(NetworkError::Status(500))
        ));
        assert!(matches!(
            fetcher.fetch("https://andrewrileyheating.co.uk/missing").await,
            Err(NetworkError::Status(404))
        ));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetcher_tracks_peak_in_flight() {
        let fetcher = MemoryFetcher::new()
            .with_text("https://x.co.uk/", "hello")
            .with_latency(Duration::from_millis(50));
        let (a, b) = tokio::join!(fetcher.fetch("https://x.co.uk/"), fetcher.fetch("https://x.co.uk/"));
        assert!(a.is_ok() && b.is_ok());
        fetcher.fetch("https://x.co.uk/").await.unwrap();
        assert_eq!(fetcher.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_flaky_recovers() {
        let fetcher = MemoryFetcher::new()
            .with_text("https://x.co.uk/", "hello")
            .with_flaky("https://x.co.uk/", 1);
        assert!(fetcher.fetch("https://x.co.uk/").await.is_err());
        assert!(fetcher.fetch("https://x.co.uk/").await.is_ok());
    }

    #[tokio::test]
    async fn test_registry_failure_is_transient() {
        let registry = MemoryRegistry::failing(ScriptedFailure::Unavailable);
        let query = RegistryQuery {
            company_name: "Andrew Riley Heating Ltd".to_string(),
            company_id: None,
        };
        let err = registry.search(&query).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(registry.calls(), 1);
    }

    #[tokio::test]
    async fn test_profile_search_unknown_query_is_empty() {
        let search = MemoryProfileSearch::new().with_results("q", &["https://www.linkedin.com/in/andrew-riley"]);
        assert_eq!(search.search("q").await.unwrap().len(), 1);
        assert!(search.search("other").await.unwrap().is_empty());
        assert!(search.employees("Andrew Riley Heating").await.unwrap().is_empty());
    }
}
