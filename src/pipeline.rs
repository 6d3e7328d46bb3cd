//! The straight-line scan pipeline.
//!
//! Stages run in a fixed order: fetch → normalize → change-detect → score →
//! graph build → monitors → decisions → report. Adapter fetches are the only
//! suspension points; everything downstream is synchronous. Monitor and
//! decision failures degrade (the briefing is still written as long as
//! scoring succeeded); config, schema, and graph-invariant failures abort.

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::change::{ChangeDetector, ChangeSet};
use crate::config::ScannerConfig;
use crate::decision::{Classification, DecisionEngine};
use crate::error::Result;
use crate::graph::{GraphBuilder, GraphSchema, KnowledgeGraph};
use crate::ingest::{fetch_all, CfdaDelta, CfdaTracker, Normalizer, SourceAdapter};
use crate::model::{EffectiveStatuses, ProgramInventory, ScoredItem};
use crate::monitors::{Alert, MonitorData, MonitorRunner};
use crate::paths::PathRegistry;
use crate::relevance::RelevanceScorer;
use crate::report::{CiHistory, ReportGenerator, ReportInput};

/// Everything one scan produces, for the reporter and the packet layer.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scan_date: DateTime<Utc>,
    pub items: Vec<ScoredItem>,
    pub changes: ChangeSet,
    pub graph: KnowledgeGraph,
    pub alerts: Vec<Alert>,
    pub monitor_data: MonitorData,
    pub effective: EffectiveStatuses,
    pub classifications: std::collections::BTreeMap<String, Classification>,
    pub cfda_deltas: Vec<CfdaDelta>,
}

/// Drives one scan end to end.
pub struct ScanPipeline {
    config: ScannerConfig,
    paths: PathRegistry,
}

impl ScanPipeline {
    pub fn new(config: ScannerConfig, paths: PathRegistry) -> Self {
        Self { config, paths }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Run the scan stages at the current time.
    pub async fn run(
        &self,
        adapters: &[Box<dyn SourceAdapter>],
        inventory: &ProgramInventory,
        schema: &GraphSchema,
    ) -> Result<ScanOutcome> {
        self.run_at(adapters, inventory, schema, Utc::now()).await
    }

    /// Run the scan stages at a fixed time. Tests pin this to exercise the
    /// countdown monitors deterministically.
    pub async fn run_at(
        &self,
        adapters: &[Box<dyn SourceAdapter>],
        inventory: &ProgramInventory,
        schema: &GraphSchema,
        scan_date: DateTime<Utc>,
    ) -> Result<ScanOutcome> {
        let today = scan_date.date_naive();
        let started = Instant::now();

        let raw = fetch_all(adapters, self.config.scan_window_days, inventory).await;
        info!(fetched = raw.len(), "ingest complete");

        let normalized = Normalizer::new(today).normalize_all(raw);
        let scorer = RelevanceScorer::new(self.config.relevance.clone(), today);
        let items = scorer.score_all(normalized, inventory);
        info!(retained = items.len(), "relevance scoring complete");

        let changes = ChangeDetector::new(self.paths.change_snapshot()).diff(&items)?;

        let mut cfda_tracker = CfdaTracker::load(&self.paths.cfda_tracker());
        let cfda_deltas = cfda_tracker.observe(&items, today);
        if let Err(err) = cfda_tracker.save(&self.paths.cfda_tracker()) {
            warn!(%err, "failed to persist CFDA tracker");
        }

        let mut graph = GraphBuilder::build(inventory, &items, schema)?;

        // Monitor or decision failures degrade; the scan result still
        // carries the graph and items so the briefing can be written.
        let runner = MonitorRunner::new(self.paths.monitor_state());
        let (alerts, effective, monitor_data) =
            match runner.run_all(&mut graph, &items, inventory, &self.config.monitors, today) {
                Ok(outcome) => (outcome.alerts, outcome.effective, outcome.monitor_data),
                Err(err) => {
                    warn!(%err, "monitor stage failed; continuing with no alerts");
                    (Vec::new(), EffectiveStatuses::default(), MonitorData::default())
                }
            };

        let engine =
            DecisionEngine::new(self.config.monitors.decision_engine.urgency_threshold_days);
        let classifications = engine.classify_all(&graph, &alerts, inventory, &effective);

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            alerts = alerts.len(),
            "scan stages complete"
        );

        Ok(ScanOutcome {
            scan_date,
            items,
            changes,
            graph,
            alerts,
            monitor_data,
            effective,
            classifications,
            cfda_deltas,
        })
    }

    /// Render and persist the briefing and mirrors for a completed scan.
    pub fn report(&self, outcome: &ScanOutcome, inventory: &ProgramInventory) -> Result<CiHistory> {
        let generator = ReportGenerator::new(self.paths.clone(), self.config.reporter.clone());
        generator.generate(&ReportInput {
            scan_date: outcome.scan_date,
            inventory,
            items: &outcome.items,
            changes: &outcome.changes,
            graph: &outcome.graph,
            alerts: &outcome.alerts,
            monitor_data: &outcome.monitor_data,
            classifications: &outcome.classifications,
            effective: &outcome.effective,
            cfda_deltas: &outcome.cfda_deltas,
        })
    }
}
