//! Legislative adapter backed by the Congress.gov v3 API.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::model::{ProgramInventory, RawItem, Source};

use super::{build_http_client, execute_with_retry, AdapterConfig, SourceAdapter};

/// Environment variable holding the Congress.gov API key.
pub const API_KEY_VAR: &str = "CONGRESS_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.congress.gov";
const PAGE_SIZE: u32 = 250;

/// Fetches recently updated bills from Congress.gov.
pub struct LegislativeAdapter {
    config: AdapterConfig,
    http: Client,
}

impl LegislativeAdapter {
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

// Congress.gov API types

#[derive(Debug, Deserialize)]
struct BillListResponse {
    #[serde(default)]
    bills: Vec<BillSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillSummary {
    congress: u32,
    #[serde(rename = "type")]
    bill_type: String,
    number: String,
    #[serde(default)]
    title: String,
    latest_action: Option<LatestAction>,
    update_date: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestAction {
    action_date: Option<NaiveDate>,
    text: Option<String>,
}

impl BillSummary {
    fn source_id(&self) -> String {
        format!(
            "{}{}-{}",
            self.bill_type.to_lowercase(),
            self.congress,
            self.number
        )
    }
}

#[async_trait]
impl SourceAdapter for LegislativeAdapter {
    fn source(&self) -> Source {
        Source::Legislative
    }

    async fn fetch(&self, window_days: u32, _programs: &ProgramInventory) -> Result<Vec<RawItem>> {
        let Some(api_key) = self.config.api_key.clone() else {
            return Err(Error::adapter("legislative", format!("{API_KEY_VAR} not set")));
        };

        let now = Utc::now();
        let from = now - Duration::days(i64::from(window_days));
        let url = format!("{}/v3/bill", self.base_url());
        let limit = PAGE_SIZE.to_string();
        let from_param = from.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let to_param = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let response = execute_with_retry(
            || {
                self.http.get(&url).query(&[
                    ("api_key", api_key.as_str()),
                    ("format", "json"),
                    ("limit", limit.as_str()),
                    ("sort", "updateDate+desc"),
                    ("fromDateTime", from_param.as_str()),
                    ("toDateTime", to_param.as_str()),
                ])
            },
            &self.config.retry,
            "legislative",
        )
        .await?;

        let parsed: BillListResponse = response
            .json()
            .await
            .map_err(|e| Error::adapter("legislative", format!("decode bill list: {e}")))?;

        let items = parsed
            .bills
            .into_iter()
            .map(|bill| {
                let source_id = bill.source_id();
                let mut item = RawItem::new(Source::Legislative, source_id, bill.title)
                    .with_extra("congress", json!(bill.congress))
                    .with_extra("bill_type", json!(bill.bill_type));
                if let Some(url) = bill.url {
                    item = item.with_url(url);
                }
                if let Some(action) = bill.latest_action {
                    if let Some(text) = action.text {
                        item = item.with_action(text);
                    }
                    if let Some(date) = action.action_date {
                        item = item.with_published(date);
                    }
                }
                if item.published_at.is_none() {
                    if let Some(updated) = bill
                        .update_date
                        .as_deref()
                        .and_then(|d| d.get(..10))
                        .and_then(|d| d.parse().ok())
                    {
                        item = item.with_published(updated);
                    }
                }
                item
            })
            .collect();
        Ok(items)
    }
}
