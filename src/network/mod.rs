// * Collaborator contracts
// * Page fetching, registry search and profile search are consumed through
// * these traits; HTTP and in-memory implementations live in the submodules.

pub mod client;
pub mod errors;
pub mod memory;
pub mod registry;
pub mod search;

pub use client::HttpFetcher;
pub use errors::NetworkError;
pub use memory::{MemoryFetcher, MemoryProfileSearch, MemoryRegistry};
pub use registry::CompaniesHouseClient;
pub use search::SearchEngineProfileSearch;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Type alias for async result
pub type AsyncResult<T> = Pin<Box<dyn Future<Output = Result<T, NetworkError>> + Send>>;

/// A fetched page body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
    pub status: u16,
    pub content_type: Option<String>,
}

impl FetchedPage {
    pub fn html(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            status: 200,
            content_type: Some("text/html".to_string()),
        }
    }

    pub fn text(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            status: 200,
            content_type: Some("text/plain".to_string()),
        }
    }
}

/// Fetches pages, optionally through a JavaScript-rendering fallback
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> AsyncResult<FetchedPage>;

    /// Rendered fetch, used only when a plain fetch came back thin
    fn render(&self, _url: &str) -> AsyncResult<FetchedPage> {
        Box::pin(async { Err(NetworkError::RenderUnsupported) })
    }

    fn supports_render(&self) -> bool {
        false
    }
}

/// Registry search input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryQuery {
    pub company_name: String,
    pub company_id: Option<String>,
}

/// One officer appointment as returned by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficerRecord {
    pub officer_name: String,
    pub role: String,
    pub company_id: String,
    pub company_name: String,
    pub company_status: String,
    #[serde(default)]
    pub resigned: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryResponse {
    Found(Vec<OfficerRecord>),
    NotFound,
}

/// Company registry lookup
pub trait RegistrySearch: Send + Sync {
    fn search(&self, query: &RegistryQuery) -> AsyncResult<RegistryResponse>;
}

/// A person listed on a company's professional-network page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeListing {
    pub name: String,
    pub profile_url: String,
}

/// Professional-network profile search
pub trait ProfileSearch: Send + Sync {
    /// Profile URLs returned for a query
    fn search(&self, query: &str) -> AsyncResult<Vec<String>>;

    /// Employee list for a company page, when the collaborator offers one
    fn employees(&self, _company: &str) -> AsyncResult<Vec<EmployeeListing>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// Result of a collaborator call after boundary conversion. "Not found" is a
/// normal outcome, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Transient(String),
    // * Permanent refusal (auth, block page, malformed reply); retrying will not help
    Rejected(String),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Lookup::Transient(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Transient(reason) => Lookup::Transient(reason),
            Lookup::Rejected(reason) => Lookup::Rejected(reason),
        }
    }

    /// Converts a collaborator error; missing resources become NotFound
    pub fn from_error(error: &NetworkError) -> Self {
        if error.is_not_found() {
            Lookup::NotFound
        } else if error.is_transient() {
            Lookup::Transient(error.to_string())
        } else {
            Lookup::Rejected(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_from_error() {
        let missing: Lookup<()> = Lookup::from_error(&NetworkError::Status(404));
        assert_eq!(missing, Lookup::NotFound);

        let down: Lookup<()> = Lookup::from_error(&NetworkError::Status(503));
        assert!(down.is_transient());

        let forbidden: Lookup<()> = Lookup::from_error(&NetworkError::Status(403));
        assert_eq!(forbidden, Lookup::Rejected("HTTP 403".to_string()));
        let garbled: Lookup<()> = Lookup::from_error(&NetworkError::Parse("not json".into()));
        assert!(matches!(garbled, Lookup::Rejected(_)));
    }

    #[test]
    fn test_lookup_map() {
        let found = Lookup::Found(2).map(|v| v * 2);
        assert_eq!(found.found(), Some(4));
        assert_eq!(Lookup::<i32>::NotFound.map(|v| v * 2), Lookup::NotFound);
    }

    #[tokio::test]
    async fn test_default_render_unsupported() {
        struct Plain;
        impl PageFetcher for Plain {
            fn fetch(&self, url: &str) -> AsyncResult<FetchedPage> {
                let page = FetchedPage::text(url, "");
                Box::pin(async move { Ok(page) })
            }
        }

        let fetcher = Plain;
        assert!(!fetcher.supports_render());
        assert!(matches!(fetcher.render("https://x.co.uk").await, Err(NetworkError::RenderUnsupported)));
    }
}
