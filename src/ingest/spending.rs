//! Spending adapter backed by the USAspending award search API.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::model::{ProgramInventory, RawItem, Source};

use super::{build_http_client, execute_with_retry, AdapterConfig, SourceAdapter};

/// Environment variable holding the USAspending API key.
pub const API_KEY_VAR: &str = "USASPENDING_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.usaspending.gov";
const PAGE_SIZE: u32 = 100;
/// Grant-shaped award types: block, formula, project, and cooperative.
const AWARD_TYPE_CODES: &[&str] = &["02", "03", "04", "05"];

/// Fetches recent grant obligations for tracked CFDAs from USAspending.
pub struct SpendingAdapter {
    config: AdapterConfig,
    http: Client,
}

impl SpendingAdapter {
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

// USAspending API types. Result fields are display-labelled.

#[derive(Debug, Deserialize)]
struct AwardSearchResponse {
    #[serde(default)]
    results: Vec<AwardRow>,
}

#[derive(Debug, Deserialize)]
struct AwardRow {
    #[serde(rename = "generated_internal_id")]
    internal_id: Option<String>,
    #[serde(rename = "Award ID")]
    award_id: Option<String>,
    #[serde(rename = "Recipient Name")]
    recipient_name: Option<String>,
    #[serde(rename = "Award Amount")]
    award_amount: Option<f64>,
    #[serde(rename = "CFDA Number")]
    cfda_number: Option<String>,
    #[serde(rename = "Start Date")]
    start_date: Option<NaiveDate>,
    #[serde(rename = "Description")]
    description: Option<String>,
}

#[async_trait]
impl SourceAdapter for SpendingAdapter {
    fn source(&self) -> Source {
        Source::Spending
    }

    async fn fetch(&self, window_days: u32, programs: &ProgramInventory) -> Result<Vec<RawItem>> {
        let cfdas: Vec<&str> = programs.iter().filter_map(|p| p.cfda.as_deref()).collect();
        if cfdas.is_empty() {
            return Ok(Vec::new());
        }

        let today = Utc::now().date_naive();
        let start = today - Duration::days(i64::from(window_days));
        let url = format!("{}/api/v2/search/spending_by_award/", self.base_url());

        let body = json!({
            "fields": [
                "Award ID", "Recipient Name", "Award Amount",
                "CFDA Number", "Start Date", "Description"
            ],
            "filters": {
                "award_type_codes": AWARD_TYPE_CODES,
                "program_numbers": cfdas,
                "time_period": [{
                    "start_date": start.to_string(),
                    "end_date": today.to_string()
                }]
            },
            "limit": PAGE_SIZE,
            "page": 1
        });

        let response = execute_with_retry(
            || {
                let mut request = self.http.post(&url).json(&body);
                if let Some(key) = &self.config.api_key {
                    request = request.header("X-Api-Key", key.as_str());
                }
                request
            },
            &self.config.retry,
            "spending",
        )
        .await?;

        let parsed: AwardSearchResponse = response
            .json()
            .await
            .map_err(|e| Error::adapter("spending", format!("decode award search: {e}")))?;

        let items = parsed
            .results
            .into_iter()
            .filter_map(|row| {
                let source_id = row
                    .internal_id
                    .clone()
                    .or_else(|| row.award_id.clone())?;
                let title = match (&row.recipient_name, &row.cfda_number) {
                    (Some(recipient), Some(cfda)) => format!("{cfda} award to {recipient}"),
                    (Some(recipient), None) => format!("Award to {recipient}"),
                    _ => format!("Award {source_id}"),
                };

                let mut item = RawItem::new(Source::Spending, source_id, title);
                if let Some(description) = row.description {
                    item = item.with_abstract(description);
                }
                if let Some(cfda) = row.cfda_number {
                    item = item.with_cfda(cfda);
                }
                if let Some(date) = row.start_date {
                    item = item.with_published(date);
                }
                if let Some(amount) = row.award_amount {
                    item = item.with_extra("amount", json!(amount));
                }
                if let Some(recipient) = row.recipient_name {
                    item = item.with_extra("recipient", json!(recipient));
                }
                Some(item)
            })
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::program::sample_program;

    #[test]
    fn test_decode_award_row() {
        let body = r#"{
            "results": [{
                "generated_internal_id": "CONT_AWD_123",
                "Award ID": "EMW-2026-FP-00123",
                "Recipient Name": "HOOPA VALLEY TRIBE",
                "Award Amount": 1250000.0,
                "CFDA Number": "97.047",
                "Start Date": "2026-01-08",
                "Description": "BRIC DIRECT TECHNICAL ASSISTANCE"
            }]
        }"#;
        let parsed: AwardSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].award_amount, Some(1_250_000.0));
    }

    #[tokio::test]
    async fn test_no_tracked_cfdas_short_circuits() {
        let adapter = SpendingAdapter::new(AdapterConfig::new(None));
        let inventory =
            ProgramInventory::from_programs(vec![sample_program("no_cfda")]).unwrap();
        let items = adapter.fetch(14, &inventory).await.unwrap();
        assert!(items.is_empty());
    }
}
