//! IIJA FY26 sunset countdown.
//!
//! Programs authorized under "Expires FY26" authorities lose supplemental
//! funding on 30 September 2026. The monitor counts down per program, unless
//! a scored legislative item already carries a reauthorization signal for it.

use std::sync::LazyLock;

use regex::Regex;

use super::{Alert, AlertMetadata, Monitor, MonitorContext, Severity};
use crate::error::Result;
use crate::graph::{Direction, EdgeType, GraphNode};
use crate::model::Source;

static REAUTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(reauthorization|reauthorize|extension of)\b").expect("Invalid regex")
});

pub struct IijaSunsetMonitor;

impl Monitor for IijaSunsetMonitor {
    fn name(&self) -> &'static str {
        "iija_sunset"
    }

    fn run(&self, ctx: &mut MonitorContext<'_>) -> Result<Vec<Alert>> {
        let config = &ctx.config.iija_sunset;
        let days_remaining = (config.fy26_end - ctx.today).num_days();
        let mut alerts = Vec::new();

        for program in ctx.inventory.iter() {
            let Some(authority) = self.sunsetting_authority(ctx, &program.id) else {
                continue;
            };

            if self.reauthorization_signalled(ctx, &program.id) {
                tracing::debug!(
                    program = %program.id,
                    "sunset alert suppressed by reauthorization signal"
                );
                continue;
            }

            let severity = if days_remaining <= config.critical_days {
                Severity::Critical
            } else if days_remaining <= config.warning_days {
                Severity::Warning
            } else {
                Severity::Info
            };

            alerts.push(
                Alert::new(
                    self.name(),
                    severity,
                    format!("IIJA sunset: {} days left for {}", days_remaining, program.name),
                    format!(
                        "{} funding under {} expires {}.",
                        program.name, authority, config.fy26_end
                    ),
                )
                .with_programs(vec![program.id.clone()])
                .with_metadata(AlertMetadata::Sunset {
                    days_remaining,
                    deadline: config.fy26_end,
                    authority,
                }),
            );
        }

        Ok(alerts)
    }
}

impl IijaSunsetMonitor {
    /// The program's FY26-expiring authority, if it has one.
    fn sunsetting_authority(&self, ctx: &MonitorContext<'_>, program_id: &str) -> Option<String> {
        ctx.graph
            .edges(program_id, Some(EdgeType::AuthorizedBy), Direction::Out)
            .iter()
            .find_map(|edge| match ctx.graph.node(&edge.target) {
                Some(GraphNode::Authority(authority)) if authority.expires_fy26() => {
                    Some(authority.name.clone())
                }
                _ => None,
            })
    }

    /// True when a matched legislative item reads like a reauthorization.
    fn reauthorization_signalled(&self, ctx: &MonitorContext<'_>, program_id: &str) -> bool {
        ctx.items
            .iter()
            .filter(|item| item.source == Source::Legislative)
            .filter(|item| item.matches_program(program_id))
            .any(|item| REAUTH_PATTERN.is_match(&item.search_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorsConfig;
    use crate::graph::schema::sample_schema;
    use crate::graph::GraphBuilder;
    use crate::model::program::sample_program;
    use crate::model::{ConfidenceScore, ProgramInventory, ScoredItem, Tier};
    use crate::monitors::MonitorState;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn iija_inventory() -> ProgramInventory {
        // sample_schema authorizes bia_tcr via auth_stafford; rewire epa_stag
        // onto the IIJA authority through an extra relation.
        let mut stag = sample_program("epa_stag");
        stag.name = "State and Tribal Assistance Grants".to_string();
        ProgramInventory::from_programs(vec![stag]).unwrap()
    }

    fn build_graph(inventory: &ProgramInventory) -> crate::graph::KnowledgeGraph {
        let mut schema = sample_schema();
        schema.trust_super_node.trust_programs.clear();
        schema.relations.retain(|r| r.source != "bia_tcr" && r.target != "bia_tcr");
        schema.relations.push(crate::graph::schema::RelationDef {
            source: "epa_stag".to_string(),
            target: "auth_iija".to_string(),
            edge_type: EdgeType::AuthorizedBy,
            description: None,
            severity: None,
        });
        GraphBuilder::build(inventory, &[], &schema).unwrap()
    }

    fn legislative_item(title: &str, matched: &[&str]) -> ScoredItem {
        let date = day(2026, 7, 1);
        ScoredItem {
            source: Source::Legislative,
            source_id: "hr119-900".to_string(),
            title: title.to_string(),
            abstract_text: String::new(),
            url: String::new(),
            published_at: Some(date),
            action_text: None,
            score: 0.7,
            matched_programs: matched.iter().map(|s| s.to_string()).collect(),
            cfda: None,
            extras: Default::default(),
            confidence: ConfidenceScore::tiered(Tier::T1, "legislative", date),
        }
    }

    fn run(items: &[ScoredItem], today: NaiveDate) -> Vec<Alert> {
        let inventory = iija_inventory();
        let graph = build_graph(&inventory);
        let config = MonitorsConfig::default();
        let mut state = MonitorState::default();
        let mut effective = Default::default();
        let mut ctx = MonitorContext {
            config: &config,
            inventory: &inventory,
            items,
            graph: &graph,
            today,
            state: &mut state,
            effective: &mut effective,
        };
        IijaSunsetMonitor.run(&mut ctx).unwrap()
    }

    #[test]
    fn test_critical_inside_90_days() {
        let alerts = run(&[], day(2026, 7, 15));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        match &alerts[0].metadata {
            AlertMetadata::Sunset { days_remaining, .. } => assert_eq!(*days_remaining, 77),
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn test_warning_inside_180_days() {
        let alerts = run(&[], day(2026, 5, 1));
        assert_eq!(alerts[0].severity, Severity::Warning);
    }

    #[test]
    fn test_info_beyond_180_days() {
        let alerts = run(&[], day(2026, 1, 15));
        assert_eq!(alerts[0].severity, Severity::Info);
    }

    #[test]
    fn test_reauthorization_signal_suppresses() {
        let item = legislative_item("STAG Reauthorization Act", &["epa_stag"]);
        let alerts = run(std::slice::from_ref(&item), day(2026, 7, 15));
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_unmatched_reauthorization_does_not_suppress() {
        let item = legislative_item("Unrelated Reauthorization Act", &[]);
        let alerts = run(std::slice::from_ref(&item), day(2026, 7, 15));
        assert_eq!(alerts.len(), 1);
    }
}
