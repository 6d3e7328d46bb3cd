//! Briefing and mirror-artifact generation.
//!
//! The reporter snapshots per-program CI into the capped history file, then
//! renders the Markdown briefing and its JSON mirrors. Section order is
//! fixed, and the five watch sections render even when empty.

pub mod briefing;
pub mod history;
pub mod results;

pub use briefing::ReportGenerator;
pub use history::{CiHistory, CiHistoryEntry, CiSnapshot};
pub use results::{MonitorDataJson, ScanResultsJson, ScanSummary};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::change::ChangeSet;
use crate::decision::Classification;
use crate::ingest::CfdaDelta;
use crate::model::{EffectiveStatuses, ProgramInventory, ScoredItem};
use crate::monitors::{Alert, MonitorData};

/// Everything a render call consumes. Borrowed from the pipeline run.
pub struct ReportInput<'a> {
    pub scan_date: DateTime<Utc>,
    pub inventory: &'a ProgramInventory,
    pub items: &'a [ScoredItem],
    pub changes: &'a ChangeSet,
    pub graph: &'a crate::graph::KnowledgeGraph,
    pub alerts: &'a [Alert],
    pub monitor_data: &'a MonitorData,
    pub classifications: &'a BTreeMap<String, Classification>,
    pub effective: &'a EffectiveStatuses,
    pub cfda_deltas: &'a [CfdaDelta],
}
