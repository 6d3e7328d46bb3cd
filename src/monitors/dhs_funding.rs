//! DHS appropriations cliff countdown.
//!
//! FEMA mitigation programs run on a continuing resolution; when it lapses,
//! obligations stop. The monitor emits one alert per configured program with
//! a days-remaining countdown, and each alert requests a THREATENS edge so
//! the decision engine can escalate inside the urgency window.

use tracing::warn;

use super::{Alert, AlertMetadata, Monitor, MonitorContext, Severity};
use crate::error::Result;

/// Days at or under which the cliff is an immediate emergency.
const CRITICAL_DAYS: i64 = 14;

pub struct DhsFundingCliffMonitor;

impl Monitor for DhsFundingCliffMonitor {
    fn name(&self) -> &'static str {
        "dhs_funding_cliff"
    }

    fn run(&self, ctx: &mut MonitorContext<'_>) -> Result<Vec<Alert>> {
        let config = &ctx.config.dhs_funding;
        let days_remaining = (config.cr_expiration - ctx.today).num_days();
        if days_remaining < 0 {
            // Past the configured expiration; the config needs a refresh, a
            // countdown would be noise.
            warn!(
                cr_expiration = %config.cr_expiration,
                "configured CR expiration is in the past; skipping cliff alerts"
            );
            return Ok(Vec::new());
        }

        let severity = if days_remaining <= CRITICAL_DAYS {
            Severity::Critical
        } else if days_remaining <= config.warning_days {
            Severity::Warning
        } else {
            Severity::Info
        };

        let mut alerts = Vec::new();
        for program_id in &config.fema_program_ids {
            let Some(program) = ctx.inventory.get(program_id) else {
                warn!(%program_id, "configured FEMA program not in inventory");
                continue;
            };

            let description = format!(
                "DHS continuing resolution expires {}; {} obligations pause at lapse.",
                config.cr_expiration, program.name
            );
            alerts.push(
                Alert::new(
                    self.name(),
                    severity,
                    format!("Funding cliff: {days_remaining} days for {}", program.name),
                    description.clone(),
                )
                .with_programs(vec![program.id.clone()])
                .with_metadata(AlertMetadata::FundingCliff {
                    days_remaining,
                    deadline: config.cr_expiration,
                    description,
                    creates_threatens_edge: true,
                }),
            );
        }

        Ok(alerts)
    }
}
