//! Cross-source item records.
//!
//! Adapters emit [`RawItem`]s; the normalizer flattens them into
//! [`ScoredItem`] shells that the rest of the pipeline consumes. Identity for
//! dedup and change detection is `(source, source_id)`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::confidence::{ConfidenceScore, Tier};

/// Federal source a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Legislative,
    Regulatory,
    Grants,
    Spending,
}

impl Source {
    /// All sources, in the order adapters are run.
    pub fn all() -> [Source; 4] {
        [
            Source::Legislative,
            Source::Regulatory,
            Source::Grants,
            Source::Spending,
        ]
    }

    /// Base confidence tier for structured fields from this source.
    pub fn base_tier(self) -> Tier {
        match self {
            Source::Legislative | Source::Spending => Tier::T1,
            Source::Regulatory | Source::Grants => Tier::T3,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Legislative => write!(f, "legislative"),
            Source::Regulatory => write!(f, "regulatory"),
            Source::Grants => write!(f, "grants"),
            Source::Spending => write!(f, "spending"),
        }
    }
}

/// Dedup identity of an item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub source: Source,
    pub source_id: String,
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.source_id)
    }
}

/// An item as fetched by a source adapter, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub source: Source,
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub abstract_text: String,
    #[serde(default)]
    pub url: String,
    pub published_at: Option<NaiveDate>,
    /// Latest recorded action, when the source tracks one (bill actions,
    /// award modifications).
    pub action_text: Option<String>,
    pub cfda: Option<String>,
    pub agency: Option<String>,
    pub document_type: Option<String>,
    /// Source-specific fields that have no cross-source meaning.
    #[serde(default)]
    pub extras: BTreeMap<String, Value>,
}

impl RawItem {
    pub fn new(source: Source, source_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source,
            source_id: source_id.into(),
            title: title.into(),
            abstract_text: String::new(),
            url: String::new(),
            published_at: None,
            action_text: None,
            cfda: None,
            agency: None,
            document_type: None,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = text.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_published(mut self, date: NaiveDate) -> Self {
        self.published_at = Some(date);
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action_text = Some(action.into());
        self
    }

    pub fn with_cfda(mut self, cfda: impl Into<String>) -> Self {
        self.cfda = Some(cfda.into());
        self
    }

    pub fn with_agency(mut self, agency: impl Into<String>) -> Self {
        self.agency = Some(agency.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            source: self.source,
            source_id: self.source_id.clone(),
        }
    }
}

/// Canonical cross-source record after normalization and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub source: Source,
    pub source_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub published_at: Option<NaiveDate>,
    pub action_text: Option<String>,
    /// Relevance score in [0, 1]; zero until the scorer runs.
    pub score: f64,
    /// Ids of tracked programs this item matched. Ordered set, so iteration
    /// is already alphabetical.
    pub matched_programs: BTreeSet<String>,
    pub cfda: Option<String>,
    pub extras: BTreeMap<String, Value>,
    #[serde(rename = "_confidence")]
    pub confidence: ConfidenceScore,
}

impl ScoredItem {
    pub fn key(&self) -> ItemKey {
        ItemKey {
            source: self.source,
            source_id: self.source_id.clone(),
        }
    }

    /// Lowercased title + abstract, the haystack for keyword matching.
    pub fn search_text(&self) -> String {
        let mut text = String::with_capacity(self.title.len() + self.abstract_text.len() + 1);
        text.push_str(&self.title);
        text.push(' ');
        text.push_str(&self.abstract_text);
        text.to_lowercase()
    }

    /// True when this item mentions the given program id in its match set.
    pub fn matches_program(&self, program_id: &str) -> bool {
        self.matched_programs.contains(program_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::confidence::ConfidenceScore;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(source: Source, id: &str) -> ScoredItem {
        ScoredItem {
            source,
            source_id: id.to_string(),
            title: "Community Wildfire Defense".to_string(),
            abstract_text: "Hazard Mitigation grants".to_string(),
            url: String::new(),
            published_at: None,
            action_text: None,
            score: 0.0,
            matched_programs: BTreeSet::new(),
            cfda: None,
            extras: BTreeMap::new(),
            confidence: ConfidenceScore::tiered(source.base_tier(), source.to_string(), day(2026, 1, 5)),
        }
    }

    #[test]
    fn test_source_tiers() {
        assert_eq!(Source::Legislative.base_tier(), Tier::T1);
        assert_eq!(Source::Spending.base_tier(), Tier::T1);
        assert_eq!(Source::Regulatory.base_tier(), Tier::T3);
        assert_eq!(Source::Grants.base_tier(), Tier::T3);
    }

    #[test]
    fn test_item_key_identity() {
        let a = item(Source::Grants, "GRANT-123");
        let b = item(Source::Spending, "GRANT-123");
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().key());
    }

    #[test]
    fn test_search_text_is_lowercased() {
        let it = item(Source::Legislative, "hr-1");
        assert_eq!(
            it.search_text(),
            "community wildfire defense hazard mitigation grants"
        );
    }
}
