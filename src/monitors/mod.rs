//! The monitor suite.
//!
//! Five monitors run in a fixed order over the scored items and the freshly
//! built graph. The Hot Sheets validator runs first because its effective-CI
//! overrides feed every later consumer. A failure inside one monitor is
//! logged and skipped; the others still run. After the suite completes, the
//! runner materializes THREATENS edges from alerts that request one.

pub mod consultation;
pub mod dhs_funding;
pub mod hot_sheets;
pub mod iija;
pub mod reconciliation;

pub use consultation::TribalConsultationMonitor;
pub use dhs_funding::DhsFundingCliffMonitor;
pub use hot_sheets::HotSheetsValidator;
pub use iija::IijaSunsetMonitor;
pub use reconciliation::ReconciliationMonitor;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::MonitorsConfig;
use crate::error::Result;
use crate::graph::{EdgeMetadata, EdgeType, GraphNode, KnowledgeGraph};
use crate::graph::node::ThreatNode;
use crate::model::{CiStatus, EffectiveStatuses, ProgramInventory, ScoredItem};
use crate::store;

/// Alert severity, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Typed alert payloads, one variant per signal family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertMetadata {
    None,
    /// Hot Sheets position disagrees with the scanner CI.
    Divergence {
        scanner_status: CiStatus,
        hot_sheets_status: CiStatus,
        repeat: bool,
    },
    /// Hot Sheets position has gone stale.
    Staleness {
        last_updated: Option<NaiveDate>,
        age_days: Option<i64>,
    },
    /// Authority sunset countdown.
    Sunset {
        days_remaining: i64,
        deadline: NaiveDate,
        authority: String,
    },
    /// Reconciliation-shaped legislative threat.
    LegislativeThreat {
        bill_status: String,
        matched_keyword: String,
        item: String,
    },
    /// Appropriations cliff countdown; requests a THREATENS edge.
    FundingCliff {
        days_remaining: i64,
        deadline: NaiveDate,
        description: String,
        creates_threatens_edge: bool,
    },
    /// Consultation signal in a scored item.
    Consultation { signal_type: String, item: String },
}

impl AlertMetadata {
    /// True when the runner should attach THREATENS edges for this alert.
    pub fn creates_threatens_edge(&self) -> bool {
        matches!(
            self,
            AlertMetadata::FundingCliff {
                creates_threatens_edge: true,
                ..
            }
        )
    }

    /// Deadline fields for THREATENS materialization.
    pub fn threat_fields(&self) -> Option<(i64, NaiveDate, &str)> {
        match self {
            AlertMetadata::FundingCliff {
                days_remaining,
                deadline,
                description,
                ..
            } => Some((*days_remaining, *deadline, description.as_str())),
            _ => None,
        }
    }
}

/// One monitor finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub monitor: String,
    pub severity: Severity,
    pub program_ids: Vec<String>,
    pub title: String,
    pub detail: String,
    pub metadata: AlertMetadata,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        monitor: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            monitor: monitor.into(),
            severity,
            program_ids: Vec::new(),
            title: title.into(),
            detail: detail.into(),
            metadata: AlertMetadata::None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_programs(mut self, program_ids: Vec<String>) -> Self {
        self.program_ids = program_ids;
        self
    }

    pub fn with_metadata(mut self, metadata: AlertMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Cross-run monitor memory, persisted at `.monitor_state.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorState {
    #[serde(default)]
    pub known_divergences: BTreeSet<String>,
    pub last_seen_at: Option<NaiveDate>,
}

impl MonitorState {
    pub fn load(path: &Path) -> Self {
        store::read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        store::write_json_atomic(path, self)
    }
}

/// Shared inputs handed to each monitor.
pub struct MonitorContext<'a> {
    pub config: &'a MonitorsConfig,
    pub inventory: &'a ProgramInventory,
    pub items: &'a [ScoredItem],
    pub graph: &'a KnowledgeGraph,
    pub today: NaiveDate,
    pub state: &'a mut MonitorState,
    pub effective: &'a mut EffectiveStatuses,
}

/// A single monitor in the suite.
pub trait Monitor: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &mut MonitorContext<'_>) -> Result<Vec<Alert>>;
}

/// Per-run summary of monitor execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorData {
    pub alerts_by_monitor: BTreeMap<String, usize>,
    /// Monitors that failed this run; their alerts are absent, not empty.
    pub failed_monitors: Vec<String>,
}

/// Everything the monitor stage produces.
#[derive(Debug, Clone)]
pub struct MonitorOutcome {
    pub alerts: Vec<Alert>,
    pub effective: EffectiveStatuses,
    pub monitor_data: MonitorData,
}

/// Runs the suite in declaration order and persists monitor state.
pub struct MonitorRunner {
    state_path: PathBuf,
}

impl MonitorRunner {
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    /// Run all five monitors, then attach THREATENS edges for alerts that
    /// request them. The graph is mutated in place.
    pub fn run_all(
        &self,
        graph: &mut KnowledgeGraph,
        items: &[ScoredItem],
        inventory: &ProgramInventory,
        config: &MonitorsConfig,
        today: NaiveDate,
    ) -> Result<MonitorOutcome> {
        let monitors: Vec<Box<dyn Monitor>> = vec![
            Box::new(HotSheetsValidator),
            Box::new(IijaSunsetMonitor),
            Box::new(ReconciliationMonitor),
            Box::new(DhsFundingCliffMonitor),
            Box::new(TribalConsultationMonitor),
        ];

        let mut state = MonitorState::load(&self.state_path);
        let mut effective = EffectiveStatuses::default();
        let mut alerts = Vec::new();
        let mut monitor_data = MonitorData::default();

        for monitor in &monitors {
            let mut ctx = MonitorContext {
                config,
                inventory,
                items,
                graph,
                today,
                state: &mut state,
                effective: &mut effective,
            };
            match monitor.run(&mut ctx) {
                Ok(mut found) => {
                    monitor_data
                        .alerts_by_monitor
                        .insert(monitor.name().to_string(), found.len());
                    alerts.append(&mut found);
                }
                Err(err) => {
                    warn!(monitor = monitor.name(), %err, "monitor failed; continuing");
                    monitor_data.failed_monitors.push(monitor.name().to_string());
                }
            }
        }

        state.last_seen_at = Some(today);
        if let Err(err) = state.save(&self.state_path) {
            warn!(%err, "failed to persist monitor state");
        }

        attach_threatens_edges(graph, &alerts)?;

        Ok(MonitorOutcome {
            alerts,
            effective,
            monitor_data,
        })
    }
}

/// Materialize one THREATENS edge per `(threat, program)` for every alert
/// that requests it. Threat node identity is `(monitor, program_id)`, so a
/// repeated alert from the same monitor cannot double-edge a program.
fn attach_threatens_edges(graph: &mut KnowledgeGraph, alerts: &[Alert]) -> Result<()> {
    for alert in alerts {
        if !alert.metadata.creates_threatens_edge() {
            continue;
        }
        let Some((days_remaining, deadline, description)) = alert.metadata.threat_fields() else {
            continue;
        };
        for program_id in &alert.program_ids {
            if !graph.has_node(program_id) {
                warn!(%program_id, "threat alert targets unknown program; skipping edge");
                continue;
            }
            let threat_id = ThreatNode::node_id(&alert.monitor, program_id);
            graph.add_node(GraphNode::Threat(ThreatNode {
                id: threat_id.clone(),
                threat_type: alert.monitor.clone(),
                program_id: program_id.clone(),
                description: description.to_string(),
            }))?;
            graph.add_edge(
                &threat_id,
                program_id,
                EdgeType::Threatens,
                EdgeMetadata::Threat {
                    days_remaining,
                    deadline,
                    description: description.to_string(),
                    severity: alert.severity.to_string(),
                },
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::schema::sample_schema;
    use crate::graph::{Direction, GraphBuilder};
    use crate::model::program::sample_program;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_threatens_propagation_is_exact() {
        let inventory = ProgramInventory::from_programs(vec![{
            let mut p = sample_program("bia_tcr");
            p.cfda = Some("15.156".to_string());
            p
        }])
        .unwrap();
        let mut graph = GraphBuilder::build(&inventory, &[], &sample_schema()).unwrap();

        let deadline = day(2026, 2, 13);
        let alerts = vec![
            Alert::new("dhs_funding_cliff", Severity::Critical, "CR cliff", "")
                .with_programs(vec!["bia_tcr".to_string()])
                .with_metadata(AlertMetadata::FundingCliff {
                    days_remaining: 4,
                    deadline,
                    description: "CR expiration".to_string(),
                    creates_threatens_edge: true,
                }),
            // INFO alerts without the flag never create edges.
            Alert::new("tribal_consultation", Severity::Info, "DTLL", "")
                .with_programs(vec!["bia_tcr".to_string()]),
        ];

        attach_threatens_edges(&mut graph, &alerts).unwrap();

        let threats = graph.edges("bia_tcr", Some(EdgeType::Threatens), Direction::In);
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].metadata.days_remaining(), Some(4));
        assert_eq!(graph.edges_of_type(EdgeType::Threatens).len(), 1);
    }

    #[test]
    fn test_monitor_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".monitor_state.json");

        let mut state = MonitorState::default();
        state.known_divergences.insert("fema_bric".to_string());
        state.last_seen_at = Some(day(2026, 1, 10));
        state.save(&path).unwrap();

        assert_eq!(MonitorState::load(&path), state);
    }

    #[test]
    fn test_corrupt_monitor_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".monitor_state.json");
        std::fs::write(&path, b"{{{{").unwrap();
        assert_eq!(MonitorState::load(&path), MonitorState::default());
    }
}
