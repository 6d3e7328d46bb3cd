//! Source adapters and ingest plumbing.
//!
//! One adapter per federal source: legislative bills (Congress.gov),
//! regulatory notices (Federal Register), grant opportunities (Grants.gov),
//! and spending awards (USAspending). Adapters present a uniform async
//! `fetch` contract and fail soft: a fetch error degrades to an empty item
//! list with a logged warning and never aborts the pipeline.

pub mod cfda_tracker;
pub mod grants;
pub mod legislative;
pub mod normalizer;
pub mod regulatory;
pub mod spending;

pub use cfda_tracker::{CfdaDelta, CfdaTracker};
pub use grants::GrantsAdapter;
pub use legislative::LegislativeAdapter;
pub use normalizer::Normalizer;
pub use regulatory::RegulatoryAdapter;
pub use spending::SpendingAdapter;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{ProgramInventory, RawItem, Source};

/// Connect timeout for adapter requests.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Total request timeout for adapter requests.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A federal data source the scanner can fetch from.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter serves.
    fn source(&self) -> Source;

    /// Fetch items published within the trailing window.
    ///
    /// Must be idempotent for a fixed point in time. Errors are recovered at
    /// the pipeline boundary, not here.
    async fn fetch(&self, window_days: u32, programs: &ProgramInventory) -> Result<Vec<RawItem>>;
}

/// Shared adapter settings.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// API credential, when the source requires one.
    pub api_key: Option<String>,
    /// Base URL override for tests.
    pub base_url: Option<String>,
    pub retry: RetryConfig,
}

impl AdapterConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: None,
            retry: RetryConfig::default(),
        }
    }

    /// Read the credential from the given environment variable.
    pub fn from_env(var: &str) -> Self {
        let api_key = std::env::var(var).ok().filter(|v| !v.is_empty());
        if api_key.is_none() {
            warn!(var, "adapter credential not set; fetches will be skipped");
        }
        Self::new(api_key)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

/// Bounded exponential backoff for transient network failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(attempt as i32);
        let millis = (self.base_delay.as_millis() as f64 * factor).round() as u64;
        Duration::from_millis(millis).min(self.max_delay)
    }
}

/// Build the shared HTTP client with adapter timeouts.
pub(crate) fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Execute a request, retrying transient failures with bounded backoff.
///
/// `build` is called once per attempt so each retry gets a fresh request.
pub(crate) async fn execute_with_retry<F>(
    build: F,
    retry: &RetryConfig,
    source_name: &str,
) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0u32;
    loop {
        let outcome = match build().send().await {
            Ok(response) if is_transient_status(response.status()) => {
                Err(format!("HTTP {}", response.status()))
            }
            Ok(response) if !response.status().is_success() => {
                // Client errors are not retryable.
                return Err(Error::adapter(
                    source_name,
                    format!("HTTP {}", response.status()),
                ));
            }
            Ok(response) => Ok(response),
            Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => Err(e.to_string()),
            Err(e) => return Err(Error::adapter(source_name, e.to_string())),
        };

        match outcome {
            Ok(response) => return Ok(response),
            Err(message) if attempt < retry.max_retries => {
                let delay = retry.delay_for_attempt(attempt);
                warn!(
                    source = source_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %message,
                    "transient fetch failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(message) => return Err(Error::adapter(source_name, message)),
        }
    }
}

/// Run every adapter, folding per-adapter failures into warnings.
///
/// Fetches overlap at the I/O layer, but results are folded back in adapter
/// declaration order so downstream stages see a deterministic sequence.
pub async fn fetch_all(
    adapters: &[Box<dyn SourceAdapter>],
    window_days: u32,
    programs: &ProgramInventory,
) -> Vec<RawItem> {
    let fetches = adapters
        .iter()
        .map(|adapter| adapter.fetch(window_days, programs));
    let results = futures::future::join_all(fetches).await;

    let mut items = Vec::new();
    for (adapter, result) in adapters.iter().zip(results) {
        match result {
            Ok(mut fetched) => {
                tracing::debug!(
                    source = %adapter.source(),
                    count = fetched.len(),
                    "adapter fetch complete"
                );
                items.append(&mut fetched);
            }
            Err(err) => {
                warn!(source = %adapter.source(), %err, "adapter fetch failed, continuing with no items");
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingAdapter;

    #[async_trait]
    impl SourceAdapter for FailingAdapter {
        fn source(&self) -> Source {
            Source::Grants
        }

        async fn fetch(&self, _: u32, _: &ProgramInventory) -> Result<Vec<RawItem>> {
            Err(Error::adapter("grants", "simulated outage"))
        }
    }

    struct StaticAdapter(Vec<RawItem>);

    #[async_trait]
    impl SourceAdapter for StaticAdapter {
        fn source(&self) -> Source {
            Source::Legislative
        }

        async fn fetch(&self, _: u32, _: &ProgramInventory) -> Result<Vec<RawItem>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_fetch_all_is_fail_soft() {
        let inventory = ProgramInventory::from_programs(Vec::new()).unwrap();
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(FailingAdapter),
            Box::new(StaticAdapter(vec![RawItem::new(
                Source::Legislative,
                "hr119-1",
                "Tribal Resilience Act",
            )])),
        ];

        let items = fetch_all(&adapters, 14, &inventory).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_id, "hr119-1");
    }

    #[test]
    fn test_backoff_is_bounded() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(retry.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(retry.delay_for_attempt(5), Duration::from_secs(8));
    }
}
