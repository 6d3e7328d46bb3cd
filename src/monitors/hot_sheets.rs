//! Hot Sheets validation.
//!
//! Hot Sheets positions are human-curated ground truth. When one disagrees
//! with the scanner CI, the validator publishes an effective-status override
//! (WARNING the first time, INFO on repeats, tracked in monitor state) and
//! flags positions that have gone stale.

use super::{Alert, AlertMetadata, Monitor, MonitorContext, Severity};
use crate::error::Result;
use crate::model::EffectiveStatus;

pub struct HotSheetsValidator;

impl Monitor for HotSheetsValidator {
    fn name(&self) -> &'static str {
        "hot_sheets"
    }

    fn run(&self, ctx: &mut MonitorContext<'_>) -> Result<Vec<Alert>> {
        let staleness_days = ctx.config.hot_sheets.staleness_days;
        let mut alerts = Vec::new();

        for program in ctx.inventory.iter() {
            let Some(hot_sheets) = &program.hot_sheets_status else {
                continue;
            };

            let age_days = hot_sheets
                .last_updated
                .map(|updated| (ctx.today - updated).num_days());
            let stale = match age_days {
                Some(age) => age > staleness_days,
                None => true,
            };
            if stale {
                alerts.push(
                    Alert::new(
                        self.name(),
                        Severity::Warning,
                        format!("Hot Sheets position stale for {}", program.name),
                        match age_days {
                            Some(age) => format!(
                                "Position last updated {age} days ago (threshold {staleness_days})."
                            ),
                            None => "Position has no last-updated date.".to_string(),
                        },
                    )
                    .with_programs(vec![program.id.clone()])
                    .with_metadata(AlertMetadata::Staleness {
                        last_updated: hot_sheets.last_updated,
                        age_days,
                    }),
                );
            }

            if hot_sheets.status == program.ci_status {
                continue;
            }

            // Divergence: Hot Sheets wins. The scanner value is preserved as
            // the original so the dashboard can show the override.
            ctx.effective.set(
                program.id.clone(),
                EffectiveStatus {
                    effective: hot_sheets.status,
                    original: Some(program.ci_status),
                },
            );

            let repeat = ctx.state.known_divergences.contains(&program.id);
            ctx.state.known_divergences.insert(program.id.clone());

            let severity = if repeat { Severity::Info } else { Severity::Warning };
            alerts.push(
                Alert::new(
                    self.name(),
                    severity,
                    format!("Hot Sheets override for {}", program.name),
                    format!(
                        "Scanner CI {} overridden by Hot Sheets position {}.",
                        program.ci_status, hot_sheets.status
                    ),
                )
                .with_programs(vec![program.id.clone()])
                .with_metadata(AlertMetadata::Divergence {
                    scanner_status: program.ci_status,
                    hot_sheets_status: hot_sheets.status,
                    repeat,
                }),
            );
        }

        Ok(alerts)
    }
}
