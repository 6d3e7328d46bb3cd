//! Markdown briefing renderer.
//!
//! Produces `LATEST-BRIEFING.md` in a fixed section order, plus the JSON
//! mirrors. The CI-history append happens before the trend table is read, so
//! a briefing always reflects the scan it describes. The five watch sections
//! (Reconciliation Watch, IIJA Countdown, CI Trends, Advocacy Goals, Five
//! Structural Asks) render even when empty.

use std::fmt::Write as _;

use crate::config::ReporterConfig;
use crate::error::Result;
use crate::graph::{Direction, EdgeType, GraphNode, KnowledgeGraph};
use crate::model::{CiStatus, Program};
use crate::monitors::{AlertMetadata, Severity};
use crate::paths::PathRegistry;
use crate::report::history::CiHistory;
use crate::report::results::{MonitorDataJson, ScanResultsJson, ScanSummary};
use crate::report::ReportInput;
use crate::store;

/// Renders and persists the briefing and its mirrors.
pub struct ReportGenerator {
    paths: PathRegistry,
    config: ReporterConfig,
}

impl ReportGenerator {
    pub fn new(paths: PathRegistry, config: ReporterConfig) -> Self {
        Self { paths, config }
    }

    /// Snapshot CI history, render the briefing, and write all artifacts
    /// atomically. Returns the history as rendered.
    pub fn generate(&self, input: &ReportInput<'_>) -> Result<CiHistory> {
        let mut history = CiHistory::load(&self.paths.ci_history());
        history.append(
            input.scan_date,
            input.inventory,
            input.effective,
            self.config.ci_history_cap,
        );
        history.save(&self.paths.ci_history())?;

        let markdown = render_markdown(&self.config, input, &history);
        store::write_bytes_atomic(&self.paths.briefing(), markdown.as_bytes())?;
        store::write_json_atomic(
            &self.paths.results_json(),
            &ScanResultsJson::build(input, &history),
        )?;
        store::write_json_atomic(&self.paths.graph_json(), &input.graph.to_serializable())?;
        store::write_json_atomic(
            &self.paths.monitor_data_json(),
            &MonitorDataJson::build(input),
        )?;
        Ok(history)
    }
}

/// Render the full briefing to a string.
pub fn render_markdown(
    config: &ReporterConfig,
    input: &ReportInput<'_>,
    history: &CiHistory,
) -> String {
    let mut out = String::with_capacity(16 * 1024);

    render_header(&mut out, input);
    render_executive_summary(&mut out, input);
    render_reconciliation_watch(&mut out, input);
    render_iija_countdown(&mut out, input);
    render_new_developments(&mut out, input);
    render_critical_updates(&mut out, input);
    render_ci_dashboard(&mut out, input);
    render_flagged_detail(&mut out, input);
    render_advocacy_goals(&mut out, input);
    render_structural_asks(&mut out, input.graph);
    render_barriers(&mut out, input.graph);
    render_authorities(&mut out, input.graph);
    render_active_levers(&mut out, input.graph);
    render_ci_trends(&mut out, config, input, history);
    render_all_items(&mut out, input);
    render_footer(&mut out, input);

    out
}

fn render_header(out: &mut String, input: &ReportInput<'_>) {
    let _ = writeln!(out, "# Tribal Climate Resilience Policy Briefing\n");
    let _ = writeln!(
        out,
        "**Scan date:** {}\n",
        input.scan_date.format("%Y-%m-%d %H:%M UTC")
    );
}

fn render_executive_summary(out: &mut String, input: &ReportInput<'_>) {
    let summary = ScanSummary::from_input(input);
    let _ = writeln!(out, "## Executive Summary\n");
    let _ = writeln!(
        out,
        "{} items scanned across legislative, regulatory, grants, and spending \
         sources: {} new, {} changed. Alerts: {} critical, {} warning, {} informational. \
         {} tracked programs classified.\n",
        summary.total_items,
        summary.new_items,
        summary.changed_items,
        summary.critical_alerts,
        summary.warning_alerts,
        summary.info_alerts,
        summary.programs_classified,
    );
}

fn render_reconciliation_watch(out: &mut String, input: &ReportInput<'_>) {
    let _ = writeln!(out, "## Reconciliation Watch\n");
    let hits: Vec<_> = input
        .alerts
        .iter()
        .filter(|a| a.monitor == "reconciliation")
        .collect();
    if hits.is_empty() {
        let _ = writeln!(out, "No active threats detected.\n");
        return;
    }
    for alert in hits {
        let _ = writeln!(out, "- **{}** — {} ({})", alert.severity, alert.title, alert.detail);
    }
    let _ = writeln!(out);
}

fn render_iija_countdown(out: &mut String, input: &ReportInput<'_>) {
    let _ = writeln!(out, "## IIJA Countdown\n");
    let hits: Vec<_> = input
        .alerts
        .iter()
        .filter(|a| a.monitor == "iija_sunset")
        .collect();
    if hits.is_empty() {
        let _ = writeln!(out, "No IIJA-funded programs approaching sunset.\n");
        return;
    }
    for alert in &hits {
        if let AlertMetadata::Sunset {
            days_remaining,
            deadline,
            authority,
        } = &alert.metadata
        {
            let _ = writeln!(
                out,
                "- **{}** — {} ({} days to {deadline}, authority: {authority})",
                alert.severity,
                alert.title,
                days_remaining
            );
        }
    }
    let _ = writeln!(out);
}

fn render_new_developments(out: &mut String, input: &ReportInput<'_>) {
    let _ = writeln!(out, "## New Developments\n");
    if input.changes.new.is_empty() && input.cfda_deltas.is_empty() {
        let _ = writeln!(out, "No new items this scan.\n");
        return;
    }
    for item in input.changes.new.iter().take(20) {
        let _ = writeln!(
            out,
            "- [{}] {} (score {:.2})",
            item.source, item.title, item.score
        );
    }
    for delta in input.cfda_deltas.iter().filter(|d| d.first_seen) {
        let _ = writeln!(
            out,
            "- First obligations seen under CFDA {} ({} awards, {})",
            delta.cfda,
            delta.new_awards,
            format_money(delta.new_obligations)
        );
    }
    let _ = writeln!(out);
}

fn render_critical_updates(out: &mut String, input: &ReportInput<'_>) {
    let _ = writeln!(out, "## Critical Updates\n");
    let critical: Vec<_> = input
        .alerts
        .iter()
        .filter(|a| a.severity == Severity::Critical)
        .collect();
    if critical.is_empty() {
        let _ = writeln!(out, "None.\n");
        return;
    }
    for alert in critical {
        let _ = writeln!(out, "- **{}** — {}", alert.title, alert.detail);
    }
    let _ = writeln!(out);
}

fn render_ci_dashboard(out: &mut String, input: &ReportInput<'_>) {
    let _ = writeln!(out, "## CI Dashboard\n");
    let _ = writeln!(out, "| Program | CI | Status | Hot Sheets | Priority |");
    let _ = writeln!(out, "|---|---|---|---|---|");
    for program in input.inventory.iter() {
        let status = input.effective.status_for(program);
        let _ = writeln!(
            out,
            "| {} | {:.2} | {} | {} | {:?} |",
            program.name,
            program.confidence_index,
            status,
            hot_sheets_sync(program, input),
            program.priority,
        );
    }
    let _ = writeln!(out);
}

/// Hot Sheets sync cell: OVERRIDE with the transition when the scanner value
/// was replaced, ALIGNED/DIVERGED otherwise, em dash when untracked.
fn hot_sheets_sync(program: &Program, input: &ReportInput<'_>) -> String {
    let Some(hot_sheets) = &program.hot_sheets_status else {
        return "—".to_string();
    };
    let current = input.effective.status_for(program);
    if let Some(original) = input.effective.original_for(&program.id) {
        if original != current {
            return format!("OVERRIDE ({original}→{current})");
        }
    }
    if hot_sheets.status == current {
        "ALIGNED".to_string()
    } else {
        "DIVERGED".to_string()
    }
}

fn render_flagged_detail(out: &mut String, input: &ReportInput<'_>) {
    let flagged: Vec<_> = input
        .inventory
        .iter()
        .filter(|p| {
            matches!(
                input.effective.status_for(p),
                CiStatus::Flagged | CiStatus::Terminated
            )
        })
        .collect();
    if flagged.is_empty() {
        return;
    }
    let _ = writeln!(out, "## Flagged Programs\n");
    for program in flagged {
        let _ = writeln!(
            out,
            "### {} ({})\n",
            program.name,
            input.effective.status_for(program)
        );
        if !program.ci_determination.is_empty() {
            let _ = writeln!(out, "{}\n", program.ci_determination);
        }
        if !program.advocacy_lever.is_empty() {
            let _ = writeln!(out, "*Lever:* {}\n", program.advocacy_lever);
        }
    }
}

fn render_advocacy_goals(out: &mut String, input: &ReportInput<'_>) {
    let _ = writeln!(out, "## Advocacy Goals\n");
    if input.classifications.is_empty() {
        let _ = writeln!(out, "No classifications produced this scan.\n");
        return;
    }
    let _ = writeln!(out, "| Program | Goal | Rule | Confidence | Reason |");
    let _ = writeln!(out, "|---|---|---|---|---|");
    for (program_id, classification) in input.classifications {
        let name = input
            .inventory
            .get(program_id)
            .map(|p| p.name.as_str())
            .unwrap_or(program_id.as_str());
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            name,
            classification
                .goal_label
                .as_deref()
                .unwrap_or("—"),
            classification.rule.as_deref().unwrap_or("—"),
            classification.confidence,
            classification.reason,
        );
    }
    let _ = writeln!(out);
}

fn render_structural_asks(out: &mut String, graph: &KnowledgeGraph) {
    let _ = writeln!(out, "## Five Structural Asks\n");
    let asks: Vec<_> = graph
        .nodes_by_type(crate::graph::NodeType::AdvocacyLever)
        .filter_map(|node| match node {
            GraphNode::AdvocacyLever(lever) if lever.is_structural_ask() => Some(lever),
            _ => None,
        })
        .collect();
    if asks.is_empty() {
        let _ = writeln!(out, "No structural asks defined in the graph schema.\n");
        return;
    }
    for ask in asks {
        let advances: Vec<String> = graph
            .edges(&ask.id, Some(EdgeType::Advances), Direction::Out)
            .into_iter()
            .map(|e| e.target)
            .collect();
        let mitigates: Vec<String> = graph
            .edges(&ask.id, Some(EdgeType::MitigatedBy), Direction::In)
            .into_iter()
            .map(|e| e.source)
            .collect();
        let _ = writeln!(out, "### {}\n", ask.name);
        if !ask.description.is_empty() {
            let _ = writeln!(out, "{}\n", ask.description);
        }
        let _ = writeln!(
            out,
            "Advances: {}. Mitigates: {}.\n",
            if advances.is_empty() { "—".to_string() } else { advances.join(", ") },
            if mitigates.is_empty() { "—".to_string() } else { mitigates.join(", ") },
        );
    }
}

fn render_barriers(out: &mut String, graph: &KnowledgeGraph) {
    let barriers: Vec<_> = graph
        .nodes_by_type(crate::graph::NodeType::Barrier)
        .filter_map(|node| match node {
            GraphNode::Barrier(barrier) => Some(barrier),
            _ => None,
        })
        .collect();
    if barriers.is_empty() {
        return;
    }
    let _ = writeln!(out, "## Barriers\n");
    for barrier in barriers {
        let blocked: Vec<String> = graph
            .edges(&barrier.id, Some(EdgeType::BlockedBy), Direction::In)
            .into_iter()
            .map(|e| e.source)
            .collect();
        let _ = writeln!(
            out,
            "- **{}** (severity {}) — blocks: {}",
            barrier.name,
            barrier.severity,
            if blocked.is_empty() { "—".to_string() } else { blocked.join(", ") }
        );
    }
    let _ = writeln!(out);
}

fn render_authorities(out: &mut String, graph: &KnowledgeGraph) {
    let authorities: Vec<_> = graph
        .nodes_by_type(crate::graph::NodeType::Authority)
        .filter_map(|node| match node {
            GraphNode::Authority(authority) => Some(authority),
            _ => None,
        })
        .collect();
    if authorities.is_empty() {
        return;
    }
    let _ = writeln!(out, "## Authorities\n");
    let _ = writeln!(out, "| Authority | Citation | Durability |");
    let _ = writeln!(out, "|---|---|---|");
    for authority in authorities {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            authority.name, authority.citation, authority.durability
        );
    }
    let _ = writeln!(out);
}

fn render_active_levers(out: &mut String, graph: &KnowledgeGraph) {
    let levers: Vec<_> = graph
        .nodes_by_type(crate::graph::NodeType::AdvocacyLever)
        .filter_map(|node| match node {
            GraphNode::AdvocacyLever(lever) if !lever.is_structural_ask() => Some(lever),
            _ => None,
        })
        .collect();
    if levers.is_empty() {
        return;
    }
    let _ = writeln!(out, "## Active Advocacy Levers\n");
    for lever in levers {
        let advances: Vec<String> = graph
            .edges(&lever.id, Some(EdgeType::Advances), Direction::Out)
            .into_iter()
            .map(|e| e.target)
            .collect();
        let _ = writeln!(
            out,
            "- **{}** — advances: {}",
            lever.name,
            if advances.is_empty() { "—".to_string() } else { advances.join(", ") }
        );
    }
    let _ = writeln!(out);
}

fn render_ci_trends(
    out: &mut String,
    config: &ReporterConfig,
    input: &ReportInput<'_>,
    history: &CiHistory,
) {
    let _ = writeln!(out, "## CI Trends\n");
    let window = config.trend_window;
    let scans = history.window(window).len();
    if scans == 0 {
        let _ = writeln!(out, "No history recorded yet.\n");
        return;
    }

    let mut stable = 0usize;
    let mut rows: Vec<(String, f64, f64)> = Vec::new();
    for program in input.inventory.iter() {
        match history.movement(&program.id, window) {
            Some((first, last)) if (last - first).abs() >= config.delta_threshold => {
                rows.push((program.name.clone(), first, last));
            }
            Some(_) => stable += 1,
            None => {}
        }
    }

    if !rows.is_empty() {
        let _ = writeln!(out, "| Program | From | To | Trend |");
        let _ = writeln!(out, "|---|---|---|---|");
        for (name, first, last) in &rows {
            let glyph = if last > first { "▲" } else { "▼" };
            let _ = writeln!(out, "| {name} | {first:.2} | {last:.2} | {glyph} {:+.2} |", last - first);
        }
        let _ = writeln!(out);
    }
    if stable > 0 {
        let _ = writeln!(
            out,
            "{stable} programs STABLE (|ΔCI| < {:.2}) across the last {scans} scans.\n",
            config.delta_threshold
        );
    }
}

fn render_all_items(out: &mut String, input: &ReportInput<'_>) {
    let _ = writeln!(out, "## All Items\n");
    if input.items.is_empty() {
        let _ = writeln!(out, "No items cleared the relevance threshold.\n");
        return;
    }
    let _ = writeln!(out, "| Source | Id | Score | Title |");
    let _ = writeln!(out, "|---|---|---|---|");
    for item in input.items {
        let _ = writeln!(
            out,
            "| {} | {} | {:.2} | {} |",
            item.source,
            item.source_id,
            item.score,
            truncate(&item.title, 90)
        );
    }
    let _ = writeln!(out);
}

fn render_footer(out: &mut String, input: &ReportInput<'_>) {
    let _ = writeln!(out, "---\n");
    let _ = writeln!(
        out,
        "Generated by the TCR policy scanner on {}.",
        input.scan_date.format("%Y-%m-%d")
    );
}

fn format_money(amount: f64) -> String {
    if amount >= 1_000_000.0 {
        format!("${:.1}M", amount / 1_000_000.0)
    } else if amount >= 1_000.0 {
        format!("${:.0}K", amount / 1_000.0)
    } else {
        format!("${amount:.0}")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
