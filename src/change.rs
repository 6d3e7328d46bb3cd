//! Scan-over-scan change detection.
//!
//! Compares the current scan against the last persisted snapshot and buckets
//! every item as new, changed, or existing. Identity is `(source, source_id)`;
//! an item counts as changed when its title, abstract, action text, or extras
//! moved since the prior snapshot. After diffing, the full current scan is
//! written back atomically as the next snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::Result;
use crate::model::ScoredItem;
use crate::store;

/// Buckets produced by a diff. Input order is preserved within each bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub new: Vec<ScoredItem>,
    pub changed: Vec<ScoredItem>,
    pub existing: Vec<ScoredItem>,
}

impl ChangeSet {
    pub fn total(&self) -> usize {
        self.new.len() + self.changed.len() + self.existing.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    taken_at: Option<DateTime<Utc>>,
    /// Content fingerprints keyed by item identity.
    #[serde(default)]
    fingerprints: BTreeMap<String, String>,
    /// Full items from the last scan, for offline inspection.
    #[serde(default)]
    items: Vec<ScoredItem>,
}

/// Detects new and changed items across scans.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    snapshot_path: PathBuf,
}

impl ChangeDetector {
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Diff `current` against the persisted snapshot, then atomically replace
    /// the snapshot with the current scan.
    ///
    /// A missing or unparseable snapshot classifies everything as new.
    pub fn diff(&self, current: &[ScoredItem]) -> Result<ChangeSet> {
        let prior = self.load_snapshot();

        let mut changes = ChangeSet::default();
        for item in current {
            let key = item.key();
            match prior.fingerprints.get(&key.to_string()) {
                None => changes.new.push(item.clone()),
                Some(old) if *old != content_fingerprint(item) => {
                    changes.changed.push(item.clone());
                }
                Some(_) => changes.existing.push(item.clone()),
            }
        }

        self.write_snapshot(current)?;
        Ok(changes)
    }

    fn load_snapshot(&self) -> Snapshot {
        if !self.snapshot_path.exists() {
            warn!(
                path = %self.snapshot_path.display(),
                "no prior snapshot; classifying all items as new"
            );
            return Snapshot::default();
        }
        store::read_json_or_default(&self.snapshot_path)
    }

    fn write_snapshot(&self, current: &[ScoredItem]) -> Result<()> {
        let snapshot = Snapshot {
            taken_at: Some(Utc::now()),
            fingerprints: current
                .iter()
                .map(|item| (item.key().to_string(), content_fingerprint(item)))
                .collect(),
            items: current.to_vec(),
        };
        store::write_json_atomic(&self.snapshot_path, &snapshot)
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}

/// Content fingerprint over the change-relevant fields.
///
/// Extras are a BTreeMap, so serialization order is stable.
pub fn content_fingerprint(item: &ScoredItem) -> String {
    let mut hasher = Sha256::new();
    hasher.update(item.title.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(item.abstract_text.as_bytes());
    hasher.update(b"\x1f");
    if let Some(action) = &item.action_text {
        hasher.update(action.as_bytes());
    }
    hasher.update(b"\x1f");
    let extras = serde_json::to_vec(&item.extras).unwrap_or_default();
    hasher.update(&extras);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfidenceScore, Source, Tier};
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::tempdir;

    fn item(id: &str, title: &str) -> ScoredItem {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        ScoredItem {
            source: Source::Legislative,
            source_id: id.to_string(),
            title: title.to_string(),
            abstract_text: String::new(),
            url: String::new(),
            published_at: Some(day),
            action_text: None,
            score: 0.6,
            matched_programs: Default::default(),
            cfda: None,
            extras: Default::default(),
            confidence: ConfidenceScore::tiered(Tier::T1, "legislative", day),
        }
    }

    #[test]
    fn test_first_run_is_all_new() {
        let dir = tempdir().unwrap();
        let detector = ChangeDetector::new(dir.path().join(".scan_snapshot.json"));

        let items: Vec<ScoredItem> = (0..177).map(|i| item(&format!("hr119-{i}"), "Bill")).collect();
        let changes = detector.diff(&items).unwrap();
        assert_eq!(changes.new.len(), 177);
        assert!(changes.changed.is_empty());
        assert!(changes.existing.is_empty());
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let dir = tempdir().unwrap();
        let detector = ChangeDetector::new(dir.path().join(".scan_snapshot.json"));

        let items: Vec<ScoredItem> = (0..177).map(|i| item(&format!("hr119-{i}"), "Bill")).collect();
        detector.diff(&items).unwrap();
        let changes = detector.diff(&items).unwrap();
        assert!(changes.new.is_empty());
        assert!(changes.changed.is_empty());
        assert_eq!(changes.existing.len(), 177);
    }

    #[test]
    fn test_title_change_is_detected() {
        let dir = tempdir().unwrap();
        let detector = ChangeDetector::new(dir.path().join(".scan_snapshot.json"));

        detector.diff(&[item("hr119-1", "Original title")]).unwrap();
        let changes = detector.diff(&[item("hr119-1", "Amended title")]).unwrap();
        assert_eq!(changes.changed.len(), 1);
        assert!(changes.new.is_empty());
    }

    #[test]
    fn test_extras_change_is_detected() {
        let dir = tempdir().unwrap();
        let detector = ChangeDetector::new(dir.path().join(".scan_snapshot.json"));

        let mut first = item("hr119-1", "Bill");
        first.extras.insert("bill_status".to_string(), json!("committee"));
        detector.diff(std::slice::from_ref(&first)).unwrap();

        let mut second = first.clone();
        second.extras.insert("bill_status".to_string(), json!("floor"));
        let changes = detector.diff(&[second]).unwrap();
        assert_eq!(changes.changed.len(), 1);
    }

    #[test]
    fn test_score_change_is_not_a_content_change() {
        let dir = tempdir().unwrap();
        let detector = ChangeDetector::new(dir.path().join(".scan_snapshot.json"));

        let first = item("hr119-1", "Bill");
        detector.diff(std::slice::from_ref(&first)).unwrap();

        let mut rescored = first.clone();
        rescored.score = 0.9;
        let changes = detector.diff(&[rescored]).unwrap();
        assert_eq!(changes.existing.len(), 1);
    }

    #[test]
    fn test_corrupt_snapshot_degrades_to_all_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".scan_snapshot.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let detector = ChangeDetector::new(&path);
        let changes = detector.diff(&[item("hr119-1", "Bill")]).unwrap();
        assert_eq!(changes.new.len(), 1);
    }
}
