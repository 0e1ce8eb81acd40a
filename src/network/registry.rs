// * Company registry client (Companies House public data API)
// * Company search by name, or a direct profile lookup by company number,
// * followed by the officer list of each candidate company.

use crate::network::errors::NetworkError;
use crate::network::{AsyncResult, OfficerRecord, RegistryQuery, RegistryResponse, RegistrySearch};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.company-information.service.gov.uk";

// * Search hits whose officers are fetched; the reconciler picks the best match
const MAX_COMPANIES: usize = 3;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<CompanyItem>,
}

#[derive(Debug, Deserialize)]
struct CompanyItem {
    company_number: String,
    #[serde(alias = "company_name")]
    title: String,
    #[serde(default)]
    company_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OfficersResponse {
    #[serde(default)]
    items: Vec<OfficerItem>,
}

#[derive(Debug, Deserialize)]
struct OfficerItem {
    name: String,
    officer_role: String,
    #[serde(default)]
    resigned_on: Option<String>,
}

/// HTTP registry collaborator; the API key is sent as the basic-auth user
#[derive(Clone)]
pub struct CompaniesHouseClient {
    inner: Client,
    base_url: String,
    api_key: String,
}

impl CompaniesHouseClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        client: &Client,
        api_key: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, NetworkError> {
        let resp = client
            .get(url)
            .basic_auth(api_key, Some(""))
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()));
        }
        resp.json::<T>().await.map_err(|e| NetworkError::Parse(e.to_string()))
    }

    async fn run(self, query: RegistryQuery) -> Result<RegistryResponse, NetworkError> {
        let companies = match &query.company_id {
            Some(id) => {
                let url = format!("{}/company/{}", self.base_url, id);
                match Self::get_json::<CompanyItem>(&self.inner, &self.api_key, &url, &[]).await {
                    Ok(company) => vec![company],
                    Err(e) if e.is_not_found() => Vec::new(),
                    Err(e) => return Err(e),
                }
            }
            None => {
                let url = format!("{}/search/companies", self.base_url);
                let limit = MAX_COMPANIES.to_string();
                let found: SearchResponse = Self::get_json(
                    &self.inner,
                    &self.api_key,
                    &url,
                    &[("q", query.company_name.as_str()), ("items_per_page", limit.as_str())],
                )
                .await?;
                found.items.into_iter().take(MAX_COMPANIES).collect()
            }
        };

        if companies.is_empty() {
            return Ok(RegistryResponse::NotFound);
        }

        let mut officers = Vec::new();
        for company in companies {
            let url = format!("{}/company/{}/officers", self.base_url, company.company_number);
            let listed: OfficersResponse = match Self::get_json(&self.inner, &self.api_key, &url, &[]).await {
                Ok(listed) => listed,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            let status = company.company_status.clone().unwrap_or_default();
            officers.extend(listed.items.into_iter().map(|o| OfficerRecord {
                officer_name: o.name,
                role: o.officer_role,
                company_id: company.company_number.clone(),
                company_name: company.title.clone(),
                company_status: status.clone(),
                resigned: o.resigned_on.is_some(),
            }));
        }

        if officers.is_empty() {
            Ok(RegistryResponse::NotFound)
        } else {
            Ok(RegistryResponse::Found(officers))
        }
    }
}

impl RegistrySearch for CompaniesHouseClient {
    fn search(&self, query: &RegistryQuery) -> AsyncResult<RegistryResponse> {
        let client = self.clone();
        let query = query.clone();
        Box::pin(client.run(query))
    }
}
