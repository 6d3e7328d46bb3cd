//! # tcr-core
//!
//! Policy scanning and advocacy-packet pipeline for Tribal climate
//! resilience programs. The crate ingests federal policy and spending data
//! for the 16 tracked programs, fuses it with a curated knowledge graph and
//! the registry of 592 federally recognized Tribal Nations, and emits a
//! daily Markdown briefing plus per-Tribe packet contexts.
//!
//! ## Core Components
//!
//! - **Ingest**: one adapter per federal source, fail-soft, normalized into
//!   cross-source scored items
//! - **ChangeDetector**: scan-over-scan new/changed/existing buckets
//! - **RelevanceScorer**: five weighted factors, per-program match sets
//! - **KnowledgeGraph**: rebuilt per run from the static schema, inventory,
//!   and spending obligations
//! - **Monitors**: five watchers over the graph and items, with transient
//!   THREATENS edges
//! - **DecisionEngine**: priority-ordered advocacy-goal rules
//! - **Reporter**: Markdown briefing plus JSON mirrors and capped CI history
//! - **Tribes**: registry resolution, congressional mapping, relevance
//!   filtering, economic framing, and packet assembly
//!
//! ## Example
//!
//! ```rust,ignore
//! use tcr_core::{PathRegistry, ScanPipeline, ScannerConfig};
//!
//! let paths = PathRegistry::new("~/tcr");
//! let config = ScannerConfig::load(&paths.scanner_config())?;
//! let pipeline = ScanPipeline::new(config, paths);
//!
//! let outcome = pipeline.run(&adapters, &inventory, &schema).await?;
//! pipeline.report(&outcome, &inventory)?;
//! ```

pub mod change;
pub mod config;
pub mod decision;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod model;
pub mod monitors;
pub mod paths;
pub mod pipeline;
pub mod relevance;
pub mod report;
pub mod store;
pub mod tribes;

// Re-exports for convenience
pub use change::{ChangeDetector, ChangeSet};
pub use config::{
    ConsultationConfig, DecisionEngineConfig, DhsFundingConfig, HotSheetsConfig, IijaSunsetConfig,
    MonitorsConfig, PacketsConfig, ReconciliationConfig, RelevanceConfig, RelevanceWeights,
    ReporterConfig, ScannerConfig,
};
pub use decision::{AdvocacyGoal, Classification, DecisionEngine, RuleConfidence};
pub use error::{Error, Result};
pub use graph::{
    Direction, Edge, EdgeMetadata, EdgeType, GraphBuilder, GraphNode, GraphSchema, GraphSerial,
    KnowledgeGraph, NodeType,
};
pub use ingest::{
    CfdaDelta, CfdaTracker, GrantsAdapter, LegislativeAdapter, Normalizer, RegulatoryAdapter,
    SourceAdapter, SpendingAdapter,
};
pub use model::{
    AccessType, CiStatus, ConfidenceScore, EffectiveStatus, EffectiveStatuses, FundingType,
    HotSheetsStatus, ItemKey, Priority, Program, ProgramInventory, RawItem, ScoredItem, Source,
    Tier,
};
pub use monitors::{
    Alert, AlertMetadata, Monitor, MonitorData, MonitorOutcome, MonitorRunner, MonitorState,
    Severity,
};
pub use paths::PathRegistry;
pub use pipeline::{ScanOutcome, ScanPipeline};
pub use relevance::RelevanceScorer;
pub use report::{CiHistory, ReportGenerator, ReportInput, ScanResultsJson, ScanSummary};
pub use tribes::{
    BatchSummary, CongressionalDelegation, CongressionalMapper, EconomicImpact, EcoregionMapper,
    PacketChange, PacketChangeTracker, PacketOrchestrator, ProgramRelevanceFilter, Resolution,
    TribalRegistry, Tribe, TribePacketContext,
};
