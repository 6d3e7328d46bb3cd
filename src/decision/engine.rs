//! The five-rule decision chain.
//!
//! Rules are evaluated in fixed priority order; the first match wins and the
//! rest are recorded as secondary. The chain is total over the inventory and
//! tolerant of missing optional fields: a program without an access type
//! simply falls through the rules that test it.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{AdvocacyGoal, Classification, RuleConfidence};
use crate::graph::{Direction, EdgeMetadata, EdgeType, GraphNode, KnowledgeGraph};
use crate::model::{AccessType, CiStatus, EffectiveStatuses, FundingType, Program, ProgramInventory};
use crate::monitors::Alert;

/// Language that reads as an eliminate/reduce signal in alert text.
static ELIMINATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)eliminat|terminat|rescis|rescind|defund|zero\s+out|reduc|\bcut\b")
        .expect("Invalid regex")
});

/// Classifies programs into advocacy goals.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    urgency_threshold_days: i64,
}

struct RuleMatch {
    rule: &'static str,
    goal: AdvocacyGoal,
    confidence: RuleConfidence,
    reason: String,
    threat_metadata: Option<EdgeMetadata>,
}

impl DecisionEngine {
    pub fn new(urgency_threshold_days: i64) -> Self {
        Self {
            urgency_threshold_days,
        }
    }

    /// Classify every program in the inventory. Deterministic for identical
    /// inputs; never fails on missing optional fields.
    pub fn classify_all(
        &self,
        graph: &KnowledgeGraph,
        alerts: &[Alert],
        inventory: &ProgramInventory,
        effective: &EffectiveStatuses,
    ) -> BTreeMap<String, Classification> {
        inventory
            .iter()
            .map(|program| {
                (
                    program.id.clone(),
                    self.classify(graph, alerts, program, effective),
                )
            })
            .collect()
    }

    fn classify(
        &self,
        graph: &KnowledgeGraph,
        alerts: &[Alert],
        program: &Program,
        effective: &EffectiveStatuses,
    ) -> Classification {
        let status = effective.status_for(program);

        let mut matches = Vec::new();
        if let Some(m) = self.urgent_stabilization(graph, program) {
            matches.push(m);
        }
        if let Some(m) = self.restore_replace(graph, program, status) {
            matches.push(m);
        }
        if let Some(m) = self.protect_base(graph, alerts, program, status) {
            matches.push(m);
        }
        if let Some(m) = self.direct_access_parity(graph, program) {
            matches.push(m);
        }
        if let Some(m) = self.expand_strengthen(program, status) {
            matches.push(m);
        }

        let mut iter = matches.into_iter();
        let Some(winner) = iter.next() else {
            return Classification::unmatched();
        };
        Classification {
            advocacy_goal: Some(winner.goal),
            goal_label: Some(winner.goal.label().to_string()),
            rule: Some(winner.rule.to_string()),
            confidence: winner.confidence,
            reason: winner.reason,
            secondary_rules: iter.map(|m| m.rule.to_string()).collect(),
            threat_metadata: winner.threat_metadata,
        }
    }

    /// LOGIC-05: a THREATENS edge inside the urgency window overrides
    /// everything else.
    fn urgent_stabilization(
        &self,
        graph: &KnowledgeGraph,
        program: &Program,
    ) -> Option<RuleMatch> {
        let threat = graph
            .edges(&program.id, Some(EdgeType::Threatens), Direction::In)
            .into_iter()
            .filter(|edge| {
                edge.metadata
                    .days_remaining()
                    .is_some_and(|days| days <= self.urgency_threshold_days)
            })
            .min_by_key(|edge| edge.metadata.days_remaining().unwrap_or(i64::MAX))?;

        let (days, description) = match &threat.metadata {
            EdgeMetadata::Threat {
                days_remaining,
                description,
                ..
            } => (*days_remaining, description.clone()),
            _ => return None,
        };

        Some(RuleMatch {
            rule: "LOGIC-05",
            goal: AdvocacyGoal::UrgentStabilization,
            confidence: RuleConfidence::High,
            reason: format!("{description} ({days} days remaining)"),
            threat_metadata: Some(threat.metadata),
        })
    }

    /// LOGIC-01: a terminated or flagged program whose authority survives is
    /// a restoration target.
    fn restore_replace(
        &self,
        graph: &KnowledgeGraph,
        program: &Program,
        status: CiStatus,
    ) -> Option<RuleMatch> {
        if !matches!(status, CiStatus::Terminated | CiStatus::Flagged) {
            return None;
        }
        let authority = graph
            .edges(&program.id, Some(EdgeType::AuthorizedBy), Direction::Out)
            .into_iter()
            .find_map(|edge| match graph.node(&edge.target) {
                Some(GraphNode::Authority(auth)) if auth.is_durable() => Some(auth.clone()),
                _ => None,
            })?;

        Some(RuleMatch {
            rule: "LOGIC-01",
            goal: AdvocacyGoal::RestoreReplace,
            confidence: RuleConfidence::High,
            reason: format!(
                "Program is {status} but {} ({}) remains in force",
                authority.name, authority.citation
            ),
            threat_metadata: None,
        })
    }

    /// LOGIC-02: discretionary funding plus an eliminate/reduce signal.
    fn protect_base(
        &self,
        graph: &KnowledgeGraph,
        alerts: &[Alert],
        program: &Program,
        status: CiStatus,
    ) -> Option<RuleMatch> {
        let discretionary = program.funding_type == FundingType::Discretionary
            || graph
                .edges(&program.id, Some(EdgeType::FundedBy), Direction::Out)
                .iter()
                .any(|edge| match graph.node(&edge.target) {
                    Some(GraphNode::FundingVehicle(vehicle)) => vehicle.is_discretionary(),
                    _ => false,
                });
        if !discretionary {
            return None;
        }

        let threatened = !graph
            .edges(&program.id, Some(EdgeType::Threatens), Direction::In)
            .is_empty();
        let alert_signal = alerts
            .iter()
            .filter(|alert| alert.program_ids.iter().any(|id| *id == program.id))
            .any(|alert| {
                ELIMINATE_PATTERN.is_match(&alert.title) || ELIMINATE_PATTERN.is_match(&alert.detail)
            });
        let at_risk = matches!(status, CiStatus::AtRisk | CiStatus::Uncertain);
        if !(threatened || alert_signal || at_risk) {
            return None;
        }

        let signal = if threatened {
            "active threat edge"
        } else if alert_signal {
            "eliminate/reduce alert"
        } else {
            "at-risk confidence index"
        };
        Some(RuleMatch {
            rule: "LOGIC-02",
            goal: AdvocacyGoal::ProtectBase,
            confidence: RuleConfidence::Medium,
            reason: format!("Discretionary program with {signal}"),
            threat_metadata: None,
        })
    }

    /// LOGIC-03: state pass-through access blocked by a high-severity
    /// barrier.
    fn direct_access_parity(
        &self,
        graph: &KnowledgeGraph,
        program: &Program,
    ) -> Option<RuleMatch> {
        if program.access_type != Some(AccessType::StatePassThrough) {
            return None;
        }
        let barrier = graph
            .edges(&program.id, Some(EdgeType::BlockedBy), Direction::Out)
            .into_iter()
            .find_map(|edge| match graph.node(&edge.target) {
                Some(GraphNode::Barrier(barrier)) if barrier.is_high_severity() => {
                    Some(barrier.clone())
                }
                _ => None,
            })?;

        Some(RuleMatch {
            rule: "LOGIC-03",
            goal: AdvocacyGoal::DirectAccessParity,
            confidence: RuleConfidence::High,
            reason: format!(
                "State pass-through access blocked by high-severity barrier: {}",
                barrier.name
            ),
            threat_metadata: None,
        })
    }

    /// LOGIC-04: stable programs with a direct access path are growth
    /// targets.
    fn expand_strengthen(&self, program: &Program, status: CiStatus) -> Option<RuleMatch> {
        if !matches!(
            status,
            CiStatus::Stable | CiStatus::Secure | CiStatus::StableButVulnerable
        ) {
            return None;
        }
        let access = program.access_type?;
        if !access.is_direct_path() {
            return None;
        }

        Some(RuleMatch {
            rule: "LOGIC-04",
            goal: AdvocacyGoal::ExpandStrengthen,
            confidence: RuleConfidence::High,
            reason: format!("Program is {status} with a direct Tribal access path"),
            threat_metadata: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{AuthorityNode, BarrierNode, ThreatNode};
    use crate::graph::GraphNode;
    use crate::model::program::sample_program;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::new(30)
    }

    fn graph_with_program(program: &Program) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(GraphNode::Program(program.into())).unwrap();
        graph
    }

    fn add_threat(graph: &mut KnowledgeGraph, program_id: &str, days: i64) {
        let threat_id = ThreatNode::node_id("dhs_funding_cliff", program_id);
        graph
            .add_node(GraphNode::Threat(ThreatNode {
                id: threat_id.clone(),
                threat_type: "dhs_funding_cliff".to_string(),
                program_id: program_id.to_string(),
                description: "CR expiration".to_string(),
            }))
            .unwrap();
        graph
            .add_edge(
                &threat_id,
                program_id,
                EdgeType::Threatens,
                EdgeMetadata::Threat {
                    days_remaining: days,
                    deadline: day(2026, 2, 13),
                    description: "CR expiration".to_string(),
                    severity: "CRITICAL".to_string(),
                },
            )
            .unwrap();
    }

    #[test]
    fn test_logic_05_overrides_everything() {
        // Program that would otherwise match LOGIC-01 and LOGIC-02.
        let mut program = sample_program("fema_bric");
        program.ci_status = CiStatus::Flagged;
        let mut graph = graph_with_program(&program);
        graph
            .add_node(GraphNode::Authority(AuthorityNode {
                id: "auth_stafford".to_string(),
                name: "Stafford Act".to_string(),
                citation: "42 U.S.C. 5121".to_string(),
                durability: "Permanent".to_string(),
            }))
            .unwrap();
        graph
            .add_edge("fema_bric", "auth_stafford", EdgeType::AuthorizedBy, EdgeMetadata::Empty)
            .unwrap();
        add_threat(&mut graph, "fema_bric", 4);

        let inventory = ProgramInventory::from_programs(vec![program]).unwrap();
        let classifications =
            engine().classify_all(&graph, &[], &inventory, &EffectiveStatuses::default());
        let c = &classifications["fema_bric"];

        assert_eq!(c.advocacy_goal, Some(AdvocacyGoal::UrgentStabilization));
        assert_eq!(c.rule.as_deref(), Some("LOGIC-05"));
        assert_eq!(c.confidence, RuleConfidence::High);
        assert!(c.reason.contains("4 days remaining"));
        assert!(c.secondary_rules.contains(&"LOGIC-01".to_string()));
        assert!(c.threat_metadata.is_some());
    }

    #[test]
    fn test_threat_outside_window_does_not_trigger_logic_05() {
        let program = sample_program("fema_bric");
        let mut graph = graph_with_program(&program);
        add_threat(&mut graph, "fema_bric", 45);

        let inventory = ProgramInventory::from_programs(vec![program]).unwrap();
        let classifications =
            engine().classify_all(&graph, &[], &inventory, &EffectiveStatuses::default());
        assert_ne!(
            classifications["fema_bric"].rule.as_deref(),
            Some("LOGIC-05")
        );
    }

    #[test]
    fn test_logic_01_cites_the_authority() {
        let mut program = sample_program("usda_wildfire");
        program.ci_status = CiStatus::Terminated;
        program.access_type = None;
        let mut graph = graph_with_program(&program);
        graph
            .add_node(GraphNode::Authority(AuthorityNode {
                id: "auth_farm_bill".to_string(),
                name: "Farm Bill conservation title".to_string(),
                citation: "16 U.S.C. 3801".to_string(),
                durability: "Permanent".to_string(),
            }))
            .unwrap();
        graph
            .add_edge("usda_wildfire", "auth_farm_bill", EdgeType::AuthorizedBy, EdgeMetadata::Empty)
            .unwrap();

        let inventory = ProgramInventory::from_programs(vec![program]).unwrap();
        let classifications =
            engine().classify_all(&graph, &[], &inventory, &EffectiveStatuses::default());
        let c = &classifications["usda_wildfire"];

        assert_eq!(c.rule.as_deref(), Some("LOGIC-01"));
        assert_eq!(c.confidence, RuleConfidence::High);
        assert!(c.reason.contains("16 U.S.C. 3801"));
    }

    #[test]
    fn test_logic_02_on_at_risk_discretionary() {
        let mut program = sample_program("fema_bric");
        program.ci_status = CiStatus::AtRisk;
        program.access_type = None;
        let graph = graph_with_program(&program);

        let inventory = ProgramInventory::from_programs(vec![program]).unwrap();
        let classifications =
            engine().classify_all(&graph, &[], &inventory, &EffectiveStatuses::default());
        let c = &classifications["fema_bric"];

        assert_eq!(c.rule.as_deref(), Some("LOGIC-02"));
        assert!(!c.secondary_rules.contains(&"LOGIC-05".to_string()));
        assert!(!c.secondary_rules.contains(&"LOGIC-01".to_string()));
    }

    #[test]
    fn test_logic_03_needs_high_severity_barrier() {
        let mut program = sample_program("hud_cdbg");
        program.funding_type = FundingType::Formula;
        program.access_type = Some(AccessType::StatePassThrough);
        let mut graph = graph_with_program(&program);
        graph
            .add_node(GraphNode::Barrier(BarrierNode {
                id: "bar_pass_through".to_string(),
                name: "State administration".to_string(),
                severity: "High".to_string(),
                description: String::new(),
            }))
            .unwrap();
        graph
            .add_edge("hud_cdbg", "bar_pass_through", EdgeType::BlockedBy, EdgeMetadata::Empty)
            .unwrap();

        let inventory = ProgramInventory::from_programs(vec![program]).unwrap();
        let classifications =
            engine().classify_all(&graph, &[], &inventory, &EffectiveStatuses::default());
        assert_eq!(
            classifications["hud_cdbg"].rule.as_deref(),
            Some("LOGIC-03")
        );
    }

    #[test]
    fn test_logic_04_for_stable_direct_access() {
        let mut program = sample_program("bia_tcr");
        program.funding_type = FundingType::Mandatory;
        program.ci_status = CiStatus::Secure;
        program.access_type = Some(AccessType::TribalSetAside);
        let graph = graph_with_program(&program);

        let inventory = ProgramInventory::from_programs(vec![program]).unwrap();
        let classifications =
            engine().classify_all(&graph, &[], &inventory, &EffectiveStatuses::default());
        assert_eq!(classifications["bia_tcr"].rule.as_deref(), Some("LOGIC-04"));
    }

    #[test]
    fn test_totality_and_fallback() {
        let mut program = sample_program("odd_one");
        program.funding_type = FundingType::Mandatory;
        program.ci_status = CiStatus::Uncertain;
        program.access_type = None;
        let graph = graph_with_program(&program);

        let inventory = ProgramInventory::from_programs(vec![program]).unwrap();
        let classifications =
            engine().classify_all(&graph, &[], &inventory, &EffectiveStatuses::default());
        assert_eq!(classifications.len(), 1);

        let c = &classifications["odd_one"];
        assert_eq!(c.advocacy_goal, None);
        assert_eq!(c.confidence, RuleConfidence::Low);
        assert_eq!(c.reason, "No decision rule matched");
    }

    #[test]
    fn test_effective_status_feeds_rules() {
        // Scanner says AT_RISK (would be LOGIC-02), Hot Sheets override says
        // STABLE, so LOGIC-04 wins instead.
        let mut program = sample_program("fema_bric");
        program.ci_status = CiStatus::AtRisk;
        let graph = graph_with_program(&program);

        let mut effective = EffectiveStatuses::default();
        effective.set(
            "fema_bric",
            crate::model::EffectiveStatus {
                effective: CiStatus::Stable,
                original: Some(CiStatus::AtRisk),
            },
        );

        let inventory = ProgramInventory::from_programs(vec![program]).unwrap();
        let classifications = engine().classify_all(&graph, &[], &inventory, &effective);
        assert_eq!(
            classifications["fema_bric"].rule.as_deref(),
            Some("LOGIC-04")
        );
    }

    #[test]
    fn test_determinism() {
        let mut program = sample_program("fema_bric");
        program.ci_status = CiStatus::AtRisk;
        let mut graph = graph_with_program(&program);
        add_threat(&mut graph, "fema_bric", 10);

        let inventory = ProgramInventory::from_programs(vec![program]).unwrap();
        let a = engine().classify_all(&graph, &[], &inventory, &EffectiveStatuses::default());
        let b = engine().classify_all(&graph, &[], &inventory, &EffectiveStatuses::default());
        assert_eq!(a, b);
    }
}
