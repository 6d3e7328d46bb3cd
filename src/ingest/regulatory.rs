//! Regulatory adapter backed by the Federal Register API.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::model::{ProgramInventory, RawItem, Source};

use super::{build_http_client, execute_with_retry, AdapterConfig, SourceAdapter};

/// Environment variable holding the Federal Register API key.
pub const API_KEY_VAR: &str = "FEDERAL_REGISTER_API_KEY";

const DEFAULT_BASE_URL: &str = "https://www.federalregister.gov";
const PAGE_SIZE: u32 = 100;

/// Agencies whose documents are fetched. Kept to the departments that issue
/// Tribal climate and consultation notices.
const AGENCY_SLUGS: &[&str] = &[
    "interior-department",
    "environmental-protection-agency",
    "homeland-security-department",
    "agriculture-department",
    "energy-department",
    "commerce-department",
];

/// Fetches recent rules and notices from the Federal Register.
pub struct RegulatoryAdapter {
    config: AdapterConfig,
    http: Client,
}

impl RegulatoryAdapter {
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

// Federal Register API types

#[derive(Debug, Deserialize)]
struct DocumentListResponse {
    #[serde(default)]
    results: Vec<DocumentSummary>,
}

#[derive(Debug, Deserialize)]
struct DocumentSummary {
    document_number: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    html_url: Option<String>,
    publication_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    document_type: Option<String>,
    #[serde(default)]
    agencies: Vec<AgencyRef>,
}

#[derive(Debug, Deserialize)]
struct AgencyRef {
    name: Option<String>,
    slug: Option<String>,
}

#[async_trait]
impl SourceAdapter for RegulatoryAdapter {
    fn source(&self) -> Source {
        Source::Regulatory
    }

    async fn fetch(&self, window_days: u32, _programs: &ProgramInventory) -> Result<Vec<RawItem>> {
        let since = (Utc::now() - Duration::days(i64::from(window_days)))
            .date_naive()
            .to_string();
        let url = format!("{}/api/v1/documents.json", self.base_url());

        let response = execute_with_retry(
            || {
                let mut request = self.http.get(&url).query(&[
                    ("per_page", PAGE_SIZE.to_string().as_str()),
                    ("order", "newest"),
                    ("conditions[publication_date][gte]", since.as_str()),
                ]);
                for slug in AGENCY_SLUGS {
                    request = request.query(&[("conditions[agencies][]", slug)]);
                }
                if let Some(key) = &self.config.api_key {
                    request = request.query(&[("api_key", key.as_str())]);
                }
                request
            },
            &self.config.retry,
            "regulatory",
        )
        .await?;

        let parsed: DocumentListResponse = response
            .json()
            .await
            .map_err(|e| Error::adapter("regulatory", format!("decode document list: {e}")))?;

        let items = parsed
            .results
            .into_iter()
            .map(|doc| {
                let agency = doc
                    .agencies
                    .iter()
                    .filter_map(|a| a.name.clone())
                    .next();
                let slugs: Vec<String> = doc
                    .agencies
                    .iter()
                    .filter_map(|a| a.slug.clone())
                    .collect();

                let mut item = RawItem::new(Source::Regulatory, doc.document_number, doc.title)
                    .with_extra("agency_slugs", json!(slugs));
                if let Some(text) = doc.abstract_text {
                    item = item.with_abstract(text);
                }
                if let Some(url) = doc.html_url {
                    item = item.with_url(url);
                }
                if let Some(date) = doc.publication_date {
                    item = item.with_published(date);
                }
                if let Some(agency) = agency {
                    item = item.with_agency(agency);
                }
                item.document_type = doc.document_type;
                item
            })
            .collect();
        Ok(items)
    }
}
