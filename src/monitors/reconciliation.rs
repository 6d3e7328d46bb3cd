//! Reconciliation threat scanning.
//!
//! Flags active bills whose text matches reconciliation-threat keywords.
//! Bills referencing already-enacted laws and bills outside the active
//! statuses (introduced, committee, floor, conference) are excluded.

use super::{Alert, AlertMetadata, Monitor, MonitorContext, Severity};
use crate::error::Result;
use crate::model::Source;

pub struct ReconciliationMonitor;

impl Monitor for ReconciliationMonitor {
    fn name(&self) -> &'static str {
        "reconciliation"
    }

    fn run(&self, ctx: &mut MonitorContext<'_>) -> Result<Vec<Alert>> {
        let config = &ctx.config.reconciliation;
        let mut alerts = Vec::new();

        for item in ctx.items.iter().filter(|i| i.source == Source::Legislative) {
            let text = item.search_text();
            let Some(keyword) = config
                .keywords
                .iter()
                .find(|kw| text.contains(&kw.to_lowercase()))
            else {
                continue;
            };

            // Double filter: already-enacted laws are not live threats.
            let action = item.action_text.as_deref().unwrap_or("");
            let cites_enacted = config.enacted_laws_exclude.iter().any(|law| {
                let law = law.to_lowercase();
                text.contains(&law) || action.to_lowercase().contains(&law)
            });
            if cites_enacted {
                continue;
            }

            let bill_status = item
                .extras
                .get("bill_status")
                .and_then(|v| v.as_str())
                .unwrap_or("introduced")
                .to_string();
            if !config.active_bill_statuses.iter().any(|s| *s == bill_status) {
                continue;
            }

            alerts.push(
                Alert::new(
                    self.name(),
                    Severity::Warning,
                    format!("Reconciliation signal: {}", item.title),
                    format!(
                        "Bill {} matched keyword {:?} in status {bill_status}.",
                        item.source_id, keyword
                    ),
                )
                .with_programs(item.matched_programs.iter().cloned().collect())
                .with_metadata(AlertMetadata::LegislativeThreat {
                    bill_status,
                    matched_keyword: keyword.clone(),
                    item: item.key().to_string(),
                }),
            );
        }

        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorsConfig;
    use crate::graph::KnowledgeGraph;
    use crate::model::{ConfidenceScore, ProgramInventory, ScoredItem, Tier};
    use crate::monitors::MonitorState;
    use chrono::NaiveDate;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bill(id: &str, title: &str, status: &str) -> ScoredItem {
        let date = day(2026, 1, 8);
        ScoredItem {
            source: Source::Legislative,
            source_id: id.to_string(),
            title: title.to_string(),
            abstract_text: String::new(),
            url: String::new(),
            published_at: Some(date),
            action_text: None,
            score: 0.6,
            matched_programs: Default::default(),
            cfda: None,
            extras: [("bill_status".to_string(), json!(status))].into_iter().collect(),
            confidence: ConfidenceScore::tiered(Tier::T1, "legislative", date),
        }
    }

    fn run(items: &[ScoredItem]) -> Vec<Alert> {
        let config = MonitorsConfig::default();
        let inventory = ProgramInventory::from_programs(Vec::new()).unwrap();
        let graph = KnowledgeGraph::new();
        let mut state = MonitorState::default();
        let mut effective = Default::default();
        let mut ctx = MonitorContext {
            config: &config,
            inventory: &inventory,
            items,
            graph: &graph,
            today: day(2026, 1, 10),
            state: &mut state,
            effective: &mut effective,
        };
        ReconciliationMonitor.run(&mut ctx).unwrap()
    }

    #[test]
    fn test_active_reconciliation_bill_flagged() {
        let alerts = run(&[bill(
            "hr119-100",
            "Budget reconciliation rescission package",
            "committee",
        )]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);
    }

    #[test]
    fn test_enacted_law_reference_excluded() {
        let alerts = run(&[bill(
            "hr119-101",
            "Implementing reconciliation under Public Law 119-21",
            "committee",
        )]);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_inactive_status_excluded() {
        let alerts = run(&[bill(
            "hr119-102",
            "Reconciliation rescission measure",
            "enacted",
        )]);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_non_matching_bill_ignored() {
        let alerts = run(&[bill("hr119-103", "Post office naming act", "committee")]);
        assert!(alerts.is_empty());
    }
}
