//! Per-Tribe packet context assembly.
//!
//! The orchestrator composes identity, delegation, cached awards and
//! hazards, economic framing, the relevant-program set, changes since the
//! last packet, and an aggregate confidence summary into a
//! [`TribePacketContext`]. Rendering the context into a document is a
//! collaborator's job; this layer only assembles and persists state.
//!
//! Batch mode walks the full registry with error isolation: one Tribe's
//! failure is recorded and the walk continues.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PacketsConfig;
use crate::decision::{AdvocacyGoal, Classification};
use crate::error::Result;
use crate::graph::{Direction, EdgeMetadata, EdgeType, KnowledgeGraph};
use crate::model::confidence::weighted_mean;
use crate::model::{EffectiveStatuses, ProgramInventory, Tier};
use crate::paths::PathRegistry;
use crate::store;
use crate::tribes::congress::CongressionalMapper;
use crate::tribes::economic::EconomicImpact;
use crate::tribes::ecoregion::EcoregionMapper;
use crate::tribes::filter::ProgramRelevanceFilter;
use crate::tribes::registry::{TribalRegistry, Tribe};
use crate::tribes::tracker::{PacketChange, PacketChangeTracker, PacketSnapshot};

/// Confidence-summary weights per section.
const IDENTITY_WEIGHT: f64 = 0.10;
const CONGRESSIONAL_WEIGHT: f64 = 0.15;
const AWARDS_WEIGHT: f64 = 0.30;
const HAZARDS_WEIGHT: f64 = 0.30;
const ECONOMIC_WEIGHT: f64 = 0.15;

/// Working-set release cadence in batch mode.
const RECLAIM_EVERY: usize = 25;

/// One cached award row from `award_cache/<tribe_id>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwardRecord {
    pub award_id: String,
    pub cfda: Option<String>,
    pub program_id: Option<String>,
    pub amount: f64,
    pub recipient: Option<String>,
    pub date: Option<chrono::NaiveDate>,
}

/// Cached award join for one Tribe. May be an unpopulated placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwardProfile {
    pub tribe_id: String,
    pub awards: Vec<AwardRecord>,
    pub placeholder: bool,
}

impl AwardProfile {
    pub fn total_obligation(&self) -> f64 {
        self.awards.iter().map(|a| a.amount).sum()
    }

    pub fn award_count(&self) -> u64 {
        self.awards.len() as u64
    }

    pub fn tier(&self) -> Tier {
        if self.placeholder || self.awards.is_empty() {
            Tier::T6
        } else {
            Tier::T1
        }
    }
}

/// Cached hazard join for one Tribe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardProfile {
    pub tribe_id: String,
    pub top_hazards: Vec<String>,
    pub risk_scores: BTreeMap<String, f64>,
    pub placeholder: bool,
}

impl HazardProfile {
    pub fn tier(&self) -> Tier {
        if self.placeholder || self.top_hazards.is_empty() {
            Tier::T6
        } else {
            Tier::T3
        }
    }
}

/// Per-section and aggregate confidence for a packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    pub identity: f64,
    pub congressional: f64,
    pub awards: f64,
    pub hazards: f64,
    pub economic: f64,
    pub overall: f64,
}

/// The assembled context handed to the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TribePacketContext {
    pub tribe: Tribe,
    pub delegation: crate::tribes::congress::CongressionalDelegation,
    pub awards: AwardProfile,
    pub hazards: HazardProfile,
    pub economic: EconomicImpact,
    pub relevant_programs: Vec<String>,
    pub changes: Vec<PacketChange>,
    pub advocacy_goal: Option<AdvocacyGoal>,
    pub confidence_summary: ConfidenceSummary,
    pub generated_at: DateTime<Utc>,
}

/// Batch outcome with error isolation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub success: usize,
    pub errors: usize,
    pub total: usize,
    pub duration_s: f64,
    /// At most the first ten failing Tribe ids.
    pub error_tribes: Vec<String>,
}

/// Assembles packet contexts from the scan outcome and reference data.
pub struct PacketOrchestrator<'a> {
    pub registry: &'a TribalRegistry,
    pub congress: &'a CongressionalMapper,
    pub ecoregions: &'a EcoregionMapper,
    pub inventory: &'a ProgramInventory,
    pub classifications: &'a BTreeMap<String, Classification>,
    pub effective: &'a EffectiveStatuses,
    pub graph: &'a KnowledgeGraph,
    pub paths: &'a PathRegistry,
    pub config: &'a PacketsConfig,
}

impl<'a> PacketOrchestrator<'a> {
    /// Assemble the packet context for one Tribe and persist its snapshot.
    pub fn build_context(&self, tribe: &Tribe) -> Result<TribePacketContext> {
        let generated_at = Utc::now();
        let today = generated_at.date_naive();

        let awards = self.load_award_profile(&tribe.tribe_id);
        let hazards = self.load_hazard_profile(&tribe.tribe_id);
        let delegation = self.congress.delegation_for(tribe);

        let filter = ProgramRelevanceFilter::new(self.config.max_relevant_programs);
        let relevant_programs =
            filter.select(tribe, &hazards.top_hazards, self.inventory, self.ecoregions);

        let districts: Vec<String> = delegation
            .representatives
            .iter()
            .map(|rep| {
                format!(
                    "{}-{}",
                    rep.state,
                    rep.district.as_deref().unwrap_or("AL")
                )
            })
            .collect();
        let economic = EconomicImpact::compute(
            awards.total_obligation(),
            awards.award_count(),
            &districts,
            awards.tier(),
            today,
        );

        let advocacy_goal = self.primary_goal(&relevant_programs);
        let active_threats = self.active_threats(&relevant_programs);

        let tracker = PacketChangeTracker::new(self.state_dir());
        let snapshot = PacketSnapshot {
            tribe_id: tribe.tribe_id.clone(),
            generated_at,
            program_states: relevant_programs
                .iter()
                .filter_map(|id| {
                    self.inventory
                        .get(id)
                        .map(|p| (id.clone(), self.effective.status_for(p)))
                })
                .collect(),
            total_awards: awards.award_count(),
            total_obligation: awards.total_obligation(),
            top_hazards: hazards.top_hazards.clone(),
            advocacy_goal,
            active_threats,
        };
        let previous = tracker.load(&tribe.tribe_id)?;
        let changes = PacketChangeTracker::diff(previous.as_ref(), &snapshot);
        tracker.record(&snapshot)?;

        let confidence_summary = self.confidence_summary(&awards, &hazards, &delegation, &economic);

        Ok(TribePacketContext {
            tribe: tribe.clone(),
            delegation,
            awards,
            hazards,
            economic,
            relevant_programs,
            changes,
            advocacy_goal,
            confidence_summary,
            generated_at,
        })
    }

    /// Build packets for every Tribe in the registry.
    ///
    /// One Tribe's failure is recorded in the summary and the walk
    /// continues. The working set is released on a fixed cadence so a full
    /// 592-Tribe run stays bounded.
    pub fn build_all(&self) -> BatchSummary {
        let started = Instant::now();
        let tribes = self.registry.get_all();
        let output_dir = self.output_dir();

        let cached = glob::glob(&format!("{}/*.json", self.paths.award_cache_dir().display()))
            .map(|paths| paths.filter_map(|p| p.ok()).count())
            .unwrap_or(0);
        info!(
            tribes = tribes.len(),
            award_caches = cached,
            "starting batch packet build"
        );

        let mut summary = BatchSummary {
            total: tribes.len(),
            ..Default::default()
        };
        let mut scratch: Vec<u8> = Vec::new();

        for (index, tribe) in tribes.iter().enumerate() {
            match self.build_and_write(tribe, &output_dir, &mut scratch) {
                Ok(()) => summary.success += 1,
                Err(err) => {
                    warn!(tribe = %tribe.tribe_id, %err, "packet build failed; continuing");
                    summary.errors += 1;
                    if summary.error_tribes.len() < 10 {
                        summary.error_tribes.push(tribe.tribe_id.clone());
                    }
                }
            }

            if (index + 1) % RECLAIM_EVERY == 0 {
                // Release accumulated buffer capacity between cohorts.
                scratch = Vec::new();
                debug!(processed = index + 1, "batch checkpoint");
            }
        }

        summary.duration_s = started.elapsed().as_secs_f64();
        info!(
            success = summary.success,
            errors = summary.errors,
            duration_s = summary.duration_s,
            "batch packet build complete"
        );
        summary
    }

    fn build_and_write(
        &self,
        tribe: &Tribe,
        output_dir: &std::path::Path,
        scratch: &mut Vec<u8>,
    ) -> Result<()> {
        let context = self.build_context(tribe)?;
        scratch.clear();
        serde_json::to_writer_pretty(&mut *scratch, &context)?;
        store::write_bytes_atomic(
            &output_dir.join(format!("{}.json", tribe.tribe_id)),
            scratch,
        )
    }

    fn load_award_profile(&self, tribe_id: &str) -> AwardProfile {
        let path = self.paths.award_cache(tribe_id);
        match store::read_json_strict::<AwardProfile>(&path) {
            Ok(Some(profile)) => profile,
            Ok(None) => AwardProfile {
                tribe_id: tribe_id.to_string(),
                placeholder: true,
                ..Default::default()
            },
            Err(err) => {
                warn!(tribe_id, %err, "award cache unreadable; using placeholder");
                AwardProfile {
                    tribe_id: tribe_id.to_string(),
                    placeholder: true,
                    ..Default::default()
                }
            }
        }
    }

    fn load_hazard_profile(&self, tribe_id: &str) -> HazardProfile {
        let path = self.paths.hazard_profile(tribe_id);
        match store::read_json_strict::<HazardProfile>(&path) {
            Ok(Some(profile)) => profile,
            Ok(None) => HazardProfile {
                tribe_id: tribe_id.to_string(),
                placeholder: true,
                ..Default::default()
            },
            Err(err) => {
                warn!(tribe_id, %err, "hazard profile unreadable; using placeholder");
                HazardProfile {
                    tribe_id: tribe_id.to_string(),
                    placeholder: true,
                    ..Default::default()
                }
            }
        }
    }

    /// The most urgent advocacy goal across the relevant programs.
    fn primary_goal(&self, relevant_programs: &[String]) -> Option<AdvocacyGoal> {
        relevant_programs
            .iter()
            .filter_map(|id| self.classifications.get(id))
            .filter_map(|c| c.advocacy_goal)
            .min_by_key(|goal| goal_rank(*goal))
    }

    fn active_threats(&self, relevant_programs: &[String]) -> Vec<String> {
        let mut threats = Vec::new();
        for program_id in relevant_programs {
            for edge in self
                .graph
                .edges(program_id, Some(EdgeType::Threatens), Direction::In)
            {
                if let EdgeMetadata::Threat { description, .. } = edge.metadata {
                    if !threats.contains(&description) {
                        threats.push(description);
                    }
                }
            }
        }
        threats.sort();
        threats
    }

    fn confidence_summary(
        &self,
        awards: &AwardProfile,
        hazards: &HazardProfile,
        delegation: &crate::tribes::congress::CongressionalDelegation,
        economic: &EconomicImpact,
    ) -> ConfidenceSummary {
        // Identity comes straight from the curated registry.
        let identity = Tier::T1.base_score();
        let congressional = if delegation.is_empty() {
            Tier::T6.base_score()
        } else {
            Tier::T2.base_score()
        };
        let awards_score = awards.tier().base_score();
        let hazards_score = hazards.tier().base_score();
        let economic_score = economic.confidence.final_score;

        let overall = weighted_mean(&[
            (identity, IDENTITY_WEIGHT),
            (congressional, CONGRESSIONAL_WEIGHT),
            (awards_score, AWARDS_WEIGHT),
            (hazards_score, HAZARDS_WEIGHT),
            (economic_score, ECONOMIC_WEIGHT),
        ]);

        ConfidenceSummary {
            identity,
            congressional,
            awards: awards_score,
            hazards: hazards_score,
            economic: economic_score,
            overall,
        }
    }

    fn state_dir(&self) -> PathBuf {
        match &self.config.state_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => self.paths.packet_state_dir(),
        }
    }

    fn output_dir(&self) -> PathBuf {
        match &self.config.output_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => self.paths.packet_output_dir(),
        }
    }
}

fn goal_rank(goal: AdvocacyGoal) -> u8 {
    match goal {
        AdvocacyGoal::UrgentStabilization => 0,
        AdvocacyGoal::RestoreReplace => 1,
        AdvocacyGoal::ProtectBase => 2,
        AdvocacyGoal::DirectAccessParity => 3,
        AdvocacyGoal::ExpandStrengthen => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Classification, RuleConfidence};
    use crate::graph::KnowledgeGraph;
    use crate::model::program::sample_program;
    use crate::model::Priority;
    use crate::tribes::congress::{CongressionalCache, CongressionalMapper};
    use crate::tribes::ecoregion::sample_ecoregions;
    use crate::tribes::registry::{sample_tribe, TribalRegistry};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        paths: PathRegistry,
        registry: TribalRegistry,
        congress: CongressionalMapper,
        ecoregions: EcoregionMapper,
        inventory: ProgramInventory,
        classifications: BTreeMap<String, Classification>,
        effective: EffectiveStatuses,
        graph: KnowledgeGraph,
        config: PacketsConfig,
    }

    fn classification(goal: AdvocacyGoal, rule: &str) -> Classification {
        Classification {
            advocacy_goal: Some(goal),
            goal_label: Some(goal.label().to_string()),
            rule: Some(rule.to_string()),
            confidence: RuleConfidence::High,
            reason: String::new(),
            secondary_rules: Vec::new(),
            threat_metadata: None,
        }
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let paths = PathRegistry::from_path(dir.path());

        let registry = TribalRegistry::from_tribes(vec![
            sample_tribe("quinault", "Quinault Indian Nation", &[], &["WA"]),
            sample_tribe("hoopa", "Hoopa Valley Tribe", &[], &["CA"]),
        ])
        .unwrap();

        let make = |id: &str, priority: Priority| {
            let mut p = sample_program(id);
            p.priority = priority;
            p
        };
        let inventory = ProgramInventory::from_programs(vec![
            make("bia_tcr", Priority::Critical),
            make("fema_tribal_mitigation", Priority::Critical),
            make("fema_bric", Priority::High),
            make("usda_wildfire", Priority::High),
            make("noaa_coastal", Priority::Medium),
            make("usbr_water", Priority::Medium),
            make("epa_stag", Priority::Medium),
            make("doe_grid", Priority::Low),
        ])
        .unwrap();

        let mut classifications = BTreeMap::new();
        classifications.insert(
            "fema_bric".to_string(),
            classification(AdvocacyGoal::UrgentStabilization, "LOGIC-05"),
        );
        classifications.insert(
            "bia_tcr".to_string(),
            classification(AdvocacyGoal::ExpandStrengthen, "LOGIC-04"),
        );

        Fixture {
            paths,
            registry,
            congress: CongressionalMapper::new(CongressionalCache::default()),
            ecoregions: sample_ecoregions(),
            inventory,
            classifications,
            effective: EffectiveStatuses::default(),
            graph: KnowledgeGraph::new(),
            config: PacketsConfig::default(),
            _dir: dir,
        }
    }

    fn orchestrator(fixture: &Fixture) -> PacketOrchestrator<'_> {
        PacketOrchestrator {
            registry: &fixture.registry,
            congress: &fixture.congress,
            ecoregions: &fixture.ecoregions,
            inventory: &fixture.inventory,
            classifications: &fixture.classifications,
            effective: &fixture.effective,
            graph: &fixture.graph,
            paths: &fixture.paths,
            config: &fixture.config,
        }
    }

    #[test]
    fn test_build_context_with_placeholder_caches() {
        let fixture = fixture();
        let orchestrator = orchestrator(&fixture);
        let tribe = fixture.registry.get_by_id("quinault").unwrap();

        let context = orchestrator.build_context(tribe).unwrap();
        assert!(context.awards.placeholder);
        assert!(context.hazards.placeholder);
        assert_eq!(context.economic.confidence.tier, Tier::T6);
        assert!(context.relevant_programs.len() >= 8);
        // Placeholder caches drag the weighted mean down.
        assert!(context.confidence_summary.overall < 0.5);
        assert_eq!(context.confidence_summary.awards, 0.0);
    }

    #[test]
    fn test_build_context_with_populated_award_cache() {
        let fixture = fixture();
        std::fs::create_dir_all(fixture.paths.award_cache_dir()).unwrap();
        let profile = AwardProfile {
            tribe_id: "quinault".to_string(),
            awards: vec![AwardRecord {
                award_id: "AWD-1".to_string(),
                cfda: Some("97.047".to_string()),
                program_id: Some("fema_bric".to_string()),
                amount: 1_500_000.0,
                recipient: Some("Quinault Indian Nation".to_string()),
                date: None,
            }],
            placeholder: false,
        };
        store::write_json_atomic(&fixture.paths.award_cache("quinault"), &profile).unwrap();

        let orchestrator = orchestrator(&fixture);
        let tribe = fixture.registry.get_by_id("quinault").unwrap();
        let context = orchestrator.build_context(tribe).unwrap();

        assert_eq!(context.awards.award_count(), 1);
        assert_eq!(context.economic.total_obligation, 1_500_000.0);
        assert!(context.economic.bcr_framed.contains("4:1"));
        assert_eq!(context.confidence_summary.awards, 1.0);
    }

    #[test]
    fn test_primary_goal_prefers_most_urgent() {
        let fixture = fixture();
        let orchestrator = orchestrator(&fixture);
        let goal = orchestrator.primary_goal(&[
            "bia_tcr".to_string(),
            "fema_bric".to_string(),
        ]);
        assert_eq!(goal, Some(AdvocacyGoal::UrgentStabilization));
    }

    #[test]
    fn test_changes_detected_on_second_build() {
        let fixture = fixture();
        let orchestrator = orchestrator(&fixture);
        let tribe = fixture.registry.get_by_id("quinault").unwrap();

        let first = orchestrator.build_context(tribe).unwrap();
        assert!(first.changes.is_empty());

        // Populate the award cache between runs.
        std::fs::create_dir_all(fixture.paths.award_cache_dir()).unwrap();
        let profile = AwardProfile {
            tribe_id: "quinault".to_string(),
            awards: vec![AwardRecord {
                award_id: "AWD-1".to_string(),
                cfda: None,
                program_id: None,
                amount: 400_000.0,
                recipient: None,
                date: None,
            }],
            placeholder: false,
        };
        store::write_json_atomic(&fixture.paths.award_cache("quinault"), &profile).unwrap();

        let second = orchestrator.build_context(tribe).unwrap();
        assert!(second
            .changes
            .iter()
            .any(|c| matches!(c, PacketChange::NewAward { count: 1 })));
        assert!(second
            .changes
            .iter()
            .any(|c| matches!(c, PacketChange::AwardTotalChange { .. })));
    }

    #[test]
    fn test_batch_isolation_and_summary() {
        let fixture = fixture();
        let orchestrator = orchestrator(&fixture);

        let summary = orchestrator.build_all();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.errors, 0);
        assert!(summary.duration_s >= 0.0);
        assert!(fixture.paths.packet_output_dir().join("quinault.json").exists());
        assert!(fixture.paths.packet_output_dir().join("hoopa.json").exists());
    }
}
