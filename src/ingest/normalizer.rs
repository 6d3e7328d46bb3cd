//! Normalization of raw adapter items into scored-item shells.
//!
//! The normalizer assigns source-tier confidence, derives per-source fields
//! (bill status from latest-action text, dollar amounts from abstracts), and
//! leaves `score`/`matched_programs` zeroed for the relevance scorer. Any
//! field recovered by parsing free text is tagged T3 regardless of the
//! source's structured-data tier.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::json;

use crate::model::{ConfidenceScore, RawItem, ScoredItem, Source, Tier};
use crate::model::confidence::freshness_decay;

/// Pattern for dollar amounts in free text ("$4.5 million", "$250,000").
static DOLLAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*(million|billion|M|B)?")
        .expect("Invalid regex")
});

/// Maps raw items to canonical scored-item shells.
#[derive(Debug, Clone)]
pub struct Normalizer {
    today: NaiveDate,
}

impl Normalizer {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Normalize a batch, preserving input order.
    pub fn normalize_all(&self, raw: Vec<RawItem>) -> Vec<ScoredItem> {
        raw.into_iter().map(|item| self.normalize(item)).collect()
    }

    /// Flatten one raw item into a scored-item shell.
    pub fn normalize(&self, raw: RawItem) -> ScoredItem {
        let freshness = freshness_decay(raw.published_at, self.today);
        let mut confidence = ConfidenceScore::new(
            raw.source.base_tier(),
            freshness,
            1,
            raw.source.to_string(),
            self.today,
        );

        let mut extras = raw.extras;
        if let Some(agency) = &raw.agency {
            extras.insert("agency".to_string(), json!(agency));
        }
        if let Some(document_type) = &raw.document_type {
            extras.insert("document_type".to_string(), json!(document_type));
        }

        match raw.source {
            Source::Legislative => {
                let status = raw
                    .action_text
                    .as_deref()
                    .map(classify_bill_status)
                    .unwrap_or("introduced");
                extras.insert("bill_status".to_string(), json!(status));
                if let Some(action) = &raw.action_text {
                    extras.insert("latest_action".to_string(), json!(action));
                }
            }
            Source::Grants | Source::Spending => {
                // Structured award amounts ride in from the adapter at the
                // source tier; a text-extracted fallback degrades to T3.
                if !extras.contains_key("amount") {
                    if let Some(amount) = extract_dollar_amount(&raw.abstract_text) {
                        extras.insert("amount".to_string(), json!(amount));
                        extras.insert("amount_extracted_from_text".to_string(), json!(true));
                        confidence = confidence.degraded_to(Tier::T3);
                    }
                }
            }
            Source::Regulatory => {}
        }

        ScoredItem {
            source: raw.source,
            source_id: raw.source_id,
            title: raw.title,
            abstract_text: raw.abstract_text,
            url: raw.url,
            published_at: raw.published_at,
            action_text: raw.action_text,
            score: 0.0,
            matched_programs: Default::default(),
            cfda: raw.cfda,
            extras,
            confidence,
        }
    }
}

/// Coarse bill-status bucket from latest-action text.
pub fn classify_bill_status(action_text: &str) -> &'static str {
    let text = action_text.to_lowercase();
    if text.contains("became public law") || text.contains("signed by president") {
        "enacted"
    } else if text.contains("conference") {
        "conference"
    } else if text.contains("passed") || text.contains("cloture") || text.contains("floor") {
        "floor"
    } else if text.contains("committee") || text.contains("referred to") {
        "committee"
    } else {
        "introduced"
    }
}

/// Parse the first dollar amount mentioned in `text`, in dollars.
pub fn extract_dollar_amount(text: &str) -> Option<f64> {
    let captures = DOLLAR_PATTERN.captures(text)?;
    let digits = captures.get(1)?.as_str().replace(',', "");
    let base: f64 = digits.parse().ok()?;
    let scale = match captures.get(2).map(|m| m.as_str()) {
        Some("million") | Some("M") => 1_000_000.0,
        Some("billion") | Some("B") => 1_000_000_000.0,
        _ => 1.0,
    };
    Some(base * scale)
}
