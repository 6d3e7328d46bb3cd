//! JSON mirror artifacts for the briefing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change::ChangeSet;
use crate::decision::Classification;
use crate::graph::GraphSerial;
use crate::model::ScoredItem;
use crate::monitors::{Alert, MonitorData, Severity};
use crate::report::history::CiHistory;
use crate::report::ReportInput;

/// Headline numbers mirrored in the executive summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_items: usize,
    pub new_items: usize,
    pub changed_items: usize,
    pub critical_alerts: usize,
    pub warning_alerts: usize,
    pub info_alerts: usize,
    pub programs_classified: usize,
}

impl ScanSummary {
    pub fn from_input(input: &ReportInput<'_>) -> Self {
        let count = |severity: Severity| {
            input
                .alerts
                .iter()
                .filter(|a| a.severity == severity)
                .count()
        };
        Self {
            total_items: input.items.len(),
            new_items: input.changes.new.len(),
            changed_items: input.changes.changed.len(),
            critical_alerts: count(Severity::Critical),
            warning_alerts: count(Severity::Warning),
            info_alerts: count(Severity::Info),
            programs_classified: input.classifications.len(),
        }
    }
}

/// `LATEST-RESULTS.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResultsJson {
    pub scan_date: DateTime<Utc>,
    pub summary: ScanSummary,
    pub scan_results: Vec<ScoredItem>,
    pub changes: ChangeSet,
    pub knowledge_graph: GraphSerial,
    pub monitor_data: MonitorData,
    pub classifications: BTreeMap<String, Classification>,
    pub ci_history: CiHistory,
}

impl ScanResultsJson {
    pub fn build(input: &ReportInput<'_>, history: &CiHistory) -> Self {
        Self {
            scan_date: input.scan_date,
            summary: ScanSummary::from_input(input),
            scan_results: input.items.to_vec(),
            changes: input.changes.clone(),
            knowledge_graph: input.graph.to_serializable(),
            monitor_data: input.monitor_data.clone(),
            classifications: input.classifications.clone(),
            ci_history: history.clone(),
        }
    }
}

/// `LATEST-MONITOR-DATA.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorDataJson {
    pub alerts: Vec<Alert>,
    pub classifications: BTreeMap<String, Classification>,
    pub summary: MonitorData,
}

impl MonitorDataJson {
    pub fn build(input: &ReportInput<'_>) -> Self {
        Self {
            alerts: input.alerts.to_vec(),
            classifications: input.classifications.clone(),
            summary: input.monitor_data.clone(),
        }
    }
}
