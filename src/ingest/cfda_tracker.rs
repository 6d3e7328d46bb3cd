//! Cross-run CFDA obligation tracking.
//!
//! Persists cumulative per-CFDA totals at `.cfda_tracker.json` so a scan can
//! tell which assistance listings are newly active and how much their totals
//! moved since the last run. Feeds the briefing's New Developments section.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{ScoredItem, Source};
use crate::store;

/// Persisted per-CFDA aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfdaEntry {
    pub total_obligated: f64,
    pub award_count: u64,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
}

/// Movement observed for one CFDA during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfdaDelta {
    pub cfda: String,
    pub new_obligations: f64,
    pub new_awards: u64,
    /// True when this scan is the first time the CFDA produced an award.
    pub first_seen: bool,
}

/// Tracker state, loaded tolerantly and written atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CfdaTracker {
    entries: BTreeMap<String, CfdaEntry>,
}

impl CfdaTracker {
    /// Load tracker state; a missing or corrupt file is an empty tracker.
    pub fn load(path: &Path) -> Self {
        store::read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        store::write_json_atomic(path, self)
    }

    pub fn entry(&self, cfda: &str) -> Option<&CfdaEntry> {
        self.entries.get(cfda)
    }

    /// Fold this scan's spending items into the tracker and report movement.
    ///
    /// Items without a CFDA or a structured amount contribute award counts
    /// but no dollars.
    pub fn observe(&mut self, items: &[ScoredItem], today: NaiveDate) -> Vec<CfdaDelta> {
        let mut deltas: BTreeMap<String, CfdaDelta> = BTreeMap::new();

        for item in items.iter().filter(|i| i.source == Source::Spending) {
            let Some(cfda) = item.cfda.clone() else {
                continue;
            };
            let amount = item
                .extras
                .get("amount")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);

            let first_seen = !self.entries.contains_key(&cfda);
            let entry = self.entries.entry(cfda.clone()).or_insert(CfdaEntry {
                total_obligated: 0.0,
                award_count: 0,
                first_seen: today,
                last_seen: today,
            });
            entry.total_obligated += amount;
            entry.award_count += 1;
            entry.last_seen = today;

            let delta = deltas.entry(cfda.clone()).or_insert(CfdaDelta {
                cfda,
                new_obligations: 0.0,
                new_awards: 0,
                first_seen,
            });
            delta.new_obligations += amount;
            delta.new_awards += 1;
        }

        deltas.into_values().collect()
    }
}
