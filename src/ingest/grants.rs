//! Grants adapter backed by the Grants.gov search2 API.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::model::{ProgramInventory, RawItem, Source};

use super::{build_http_client, execute_with_retry, AdapterConfig, SourceAdapter};

/// Environment variable holding the Grants.gov API key.
pub const API_KEY_VAR: &str = "GRANTS_GOV_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.grants.gov";
const PAGE_SIZE: u32 = 100;
const SEARCH_KEYWORD: &str = "tribal";

/// Fetches posted funding opportunities from Grants.gov.
pub struct GrantsAdapter {
    config: AdapterConfig,
    http: Client,
}

impl GrantsAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            http: build_http_client(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(AdapterConfig::from_env(API_KEY_VAR))
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

// Grants.gov search2 API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    keyword: &'a str,
    opp_statuses: &'a str,
    rows: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    #[serde(default)]
    opp_hits: Vec<OpportunityHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpportunityHit {
    number: String,
    #[serde(default)]
    title: String,
    agency_name: Option<String>,
    open_date: Option<NaiveDate>,
    close_date: Option<NaiveDate>,
    #[serde(default)]
    cfda_list: Vec<String>,
    synopsis: Option<String>,
}

#[async_trait]
impl SourceAdapter for GrantsAdapter {
    fn source(&self) -> Source {
        Source::Grants
    }

    async fn fetch(&self, _window_days: u32, _programs: &ProgramInventory) -> Result<Vec<RawItem>> {
        let Some(api_key) = self.config.api_key.clone() else {
            return Err(Error::adapter("grants", format!("{API_KEY_VAR} not set")));
        };

        let url = format!("{}/v1/api/search2", self.base_url());
        let response = execute_with_retry(
            || {
                self.http
                    .post(&url)
                    .header("X-Api-Key", api_key.as_str())
                    .json(&SearchRequest {
                        keyword: SEARCH_KEYWORD,
                        opp_statuses: "posted",
                        rows: PAGE_SIZE,
                    })
            },
            &self.config.retry,
            "grants",
        )
        .await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::adapter("grants", format!("decode search response: {e}")))?;

        let hits = parsed.data.map(|d| d.opp_hits).unwrap_or_default();
        let items = hits
            .into_iter()
            .map(|hit| {
                let mut item = RawItem::new(Source::Grants, hit.number.clone(), hit.title)
                    .with_url(format!(
                        "https://www.grants.gov/search-results-detail/{}",
                        hit.number
                    ));
                if let Some(synopsis) = hit.synopsis {
                    item = item.with_abstract(synopsis);
                }
                if let Some(agency) = hit.agency_name {
                    item = item.with_agency(agency);
                }
                if let Some(open) = hit.open_date {
                    item = item.with_published(open);
                }
                if let Some(close) = hit.close_date {
                    item = item.with_extra("close_date", json!(close.to_string()));
                }
                // The first assistance listing is the opportunity's primary
                // CFDA; the full list rides along in extras.
                if let Some(first) = hit.cfda_list.first() {
                    item = item.with_cfda(first.clone());
                }
                if !hit.cfda_list.is_empty() {
                    item = item.with_extra("cfda_list", json!(hit.cfda_list));
                }
                item
            })
            .collect();
        Ok(items)
    }
}
